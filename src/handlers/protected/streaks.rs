// handlers/protected/streaks.rs - GET /api/streaks?isActive=&sort=

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::StreakWithTask;
use crate::domain::streak::StreakSort;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::streak_service::StreakService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakQuery {
    pub is_active: Option<bool>,
    /// Field name, `-` prefix for descending.
    pub sort: Option<String>,
}

pub async fn streaks_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<StreakQuery>,
) -> ApiResult<Vec<StreakWithTask>> {
    let sort = StreakSort::parse(query.sort.as_deref());
    let streaks = StreakService::new(state.pool.clone())
        .list(auth.user_id, query.is_active.unwrap_or(true), sort)
        .await?;
    Ok(ApiResponse::success(streaks))
}
