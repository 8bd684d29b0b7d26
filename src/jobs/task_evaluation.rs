use chrono::Utc;

use crate::app::AppState;
use crate::services::task_service::{TargetEvaluation, TaskService};
use crate::services::ServiceResult;

/// Auto-complete tasks whose linked metric has met its target.
pub async fn run_once(state: &AppState) -> ServiceResult<TargetEvaluation> {
    TaskService::new(state.pool.clone()).evaluate_metric_targets(Utc::now()).await
}
