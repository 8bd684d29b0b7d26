// handlers/protected/tasks.rs - /api/tasks

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Task;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::task_service::{CompleteTask, NewTask, TaskCompletion, TaskFilter, TaskPatch, TaskService};

/// GET /api/tasks?taskType=&dimensionId=&isActive=
pub async fn tasks_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Vec<Task>> {
    let tasks = TaskService::new(state.pool.clone()).list(auth.user_id, &filter).await?;
    Ok(ApiResponse::success(tasks))
}

/// POST /api/tasks
pub async fn tasks_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<NewTask>,
) -> ApiResult<Task> {
    let task = TaskService::new(state.pool.clone()).create(auth.user_id, body).await?;
    Ok(ApiResponse::created(task))
}

/// GET /api/tasks/:id
pub async fn task_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Task> {
    let task = TaskService::new(state.pool.clone()).get(auth.user_id, id).await?;
    ApiResponse::found(task, "Task")
}

/// PATCH /api/tasks/:id
pub async fn task_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<TaskPatch>,
) -> ApiResult<Task> {
    let task = TaskService::new(state.pool.clone()).update(auth.user_id, id, body).await?;
    ApiResponse::found(task, "Task")
}

/// DELETE /api/tasks/:id - soft delete
pub async fn task_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let removed = TaskService::new(state.pool.clone()).deactivate(auth.user_id, id).await?;
    ApiResponse::<()>::deleted(removed, "Task")
}

/// POST /api/tasks/:id/complete - body is optional
pub async fn task_complete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteTask>>,
) -> ApiResult<TaskCompletion> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let completion = TaskService::new(state.pool.clone()).complete(auth.user_id, id, input).await?;
    ApiResponse::found(completion, "Task")
}
