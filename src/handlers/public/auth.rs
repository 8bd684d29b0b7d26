// handlers/public/auth.rs - POST /api/auth/{register,login,refresh}

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::{AuthError, TokenPair, TokenType};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::{RegisterUser, UserService};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// POST /api/auth/register - create an account and sign it in
pub async fn register_post(
    State(state): State<AppState>,
    Json(body): Json<RegisterUser>,
) -> ApiResult<AuthResponse> {
    let user = UserService::new(state.pool.clone()).register(body).await?;
    let tokens = state.jwt.issue_pair(user.id, &user.email)?;
    Ok(ApiResponse::created(AuthResponse { user, tokens }))
}

/// POST /api/auth/login - exchange email and password for a token pair
pub async fn login_post(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<AuthResponse> {
    let user = UserService::new(state.pool.clone())
        .authenticate(&body.email, &body.password)
        .await?
        .ok_or_else(|| {
            warn!("Failed login attempt");
            ApiError::from(AuthError::InvalidCredentials)
        })?;

    let tokens = state.jwt.issue_pair(user.id, &user.email)?;
    info!("User {} logged in", user.id);
    Ok(ApiResponse::success(AuthResponse { user, tokens }))
}

/// POST /api/auth/refresh - trade a refresh token for a new pair
pub async fn refresh_post(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let claims = state.jwt.validate(&body.refresh_token, TokenType::Refresh)?;
    let user = UserService::new(state.pool.clone())
        .get(claims.user_id()?)
        .await?
        .filter(User::is_active)
        .ok_or_else(|| ApiError::unauthorized("User no longer active"))?;

    let tokens = state.jwt.issue_pair(user.id, &user.email)?;
    Ok(ApiResponse::success(AuthResponse { user, tokens }))
}
