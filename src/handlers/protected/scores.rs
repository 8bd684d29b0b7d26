// handlers/protected/scores.rs - GET /api/scores

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::domain::scoring::ScoreItem;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::score_service::ScoreService;

/// GET /api/scores - life score first, then one item per active dimension
pub async fn scores_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<ScoreItem>> {
    let scores = ScoreService::new(state.pool.clone(), state.score_calculator.clone())
        .scores(auth.user_id)
        .await?;
    Ok(ApiResponse::success(scores))
}
