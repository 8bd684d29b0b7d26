// handlers/protected/auth.rs - GET /api/auth/me

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::app::AppState;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthType, AuthUser};
use crate::services::user_service::UserService;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub auth_type: AuthType,
}

/// GET /api/auth/me - the authenticated user
pub async fn me_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<MeResponse> {
    let user = UserService::new(state.pool.clone()).get(auth.user_id).await?;
    ApiResponse::found(
        user.map(|user| MeResponse {
            user,
            auth_type: auth.auth_type,
        }),
        "User",
    )
}
