// handlers/protected/api_keys.rs - /api/api-keys

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::ApiKey;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::api_key_service::{ApiKeyService, CreatedApiKey};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub scopes: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// GET /api/api-keys
pub async fn api_keys_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<ApiKey>> {
    let keys = ApiKeyService::new(state.pool.clone()).list(auth.user_id).await?;
    Ok(ApiResponse::success(keys))
}

/// POST /api/api-keys - the plain key is only ever returned here
pub async fn api_keys_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateApiKeyRequest>,
) -> ApiResult<CreatedApiKey> {
    let created = ApiKeyService::new(state.pool.clone())
        .create(auth.user_id, &body.name, body.scopes.as_deref(), body.expires_at)
        .await?;
    Ok(ApiResponse::created(created))
}

/// DELETE /api/api-keys/:id - revoke
pub async fn api_key_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let revoked = ApiKeyService::new(state.pool.clone()).revoke(auth.user_id, id).await?;
    ApiResponse::<()>::deleted(revoked, "API key")
}
