// handlers/protected/dimensions.rs - /api/dimensions

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::dimension_service::{DimensionDetail, DimensionList, DimensionService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightUpdate {
    pub weight: Decimal,
    pub auto_rebalance: Option<bool>,
}

/// GET /api/dimensions - all dimensions plus the active weight total
pub async fn dimensions_get(State(state): State<AppState>) -> ApiResult<DimensionList> {
    let list = DimensionService::new(state.pool.clone()).list().await?;
    Ok(ApiResponse::success(list))
}

/// GET /api/dimensions/:id - with the caller's milestones and active tasks
pub async fn dimension_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<DimensionDetail> {
    let detail = DimensionService::new(state.pool.clone()).detail(auth.user_id, id).await?;
    ApiResponse::found(detail, "Dimension")
}

/// PATCH /api/dimensions/:id - weight update, rebalancing the others by default
pub async fn dimension_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<WeightUpdate>,
) -> ApiResult<DimensionDetail> {
    update_weight(&state, &auth, id, body).await
}

/// PUT /api/dimensions/:id/weight - same as PATCH
pub async fn dimension_weight_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<WeightUpdate>,
) -> ApiResult<DimensionDetail> {
    update_weight(&state, &auth, id, body).await
}

async fn update_weight(state: &AppState, auth: &AuthUser, id: Uuid, body: WeightUpdate) -> ApiResult<DimensionDetail> {
    let service = DimensionService::new(state.pool.clone());
    service
        .update_weight(id, body.weight, body.auto_rebalance.unwrap_or(true))
        .await?
        .ok_or_else(|| ApiError::not_found("Dimension not found"))?;

    let detail = service.detail(auth.user_id, id).await?;
    ApiResponse::found(detail, "Dimension")
}
