// handlers/protected/milestones.rs - /api/milestones

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Milestone;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::milestone_service::{MilestoneFilter, MilestonePatch, MilestoneService, NewMilestone};

/// GET /api/milestones?status=&dimensionId=
pub async fn milestones_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<MilestoneFilter>,
) -> ApiResult<Vec<Milestone>> {
    let milestones = MilestoneService::new(state.pool.clone()).list(auth.user_id, &filter).await?;
    Ok(ApiResponse::success(milestones))
}

/// POST /api/milestones
pub async fn milestones_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<NewMilestone>,
) -> ApiResult<Milestone> {
    let milestone = MilestoneService::new(state.pool.clone()).create(auth.user_id, body).await?;
    Ok(ApiResponse::created(milestone))
}

/// GET /api/milestones/:id
pub async fn milestone_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Milestone> {
    let milestone = MilestoneService::new(state.pool.clone()).get(auth.user_id, id).await?;
    ApiResponse::found(milestone, "Milestone")
}

/// PATCH /api/milestones/:id
pub async fn milestone_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<MilestonePatch>,
) -> ApiResult<Milestone> {
    let milestone = MilestoneService::new(state.pool.clone()).update(auth.user_id, id, body).await?;
    ApiResponse::found(milestone, "Milestone")
}

/// DELETE /api/milestones/:id
pub async fn milestone_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let removed = MilestoneService::new(state.pool.clone()).delete(auth.user_id, id).await?;
    ApiResponse::<()>::deleted(removed, "Milestone")
}
