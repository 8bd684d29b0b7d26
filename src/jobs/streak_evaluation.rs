use chrono::Utc;
use tracing::info;

use crate::app::AppState;
use crate::services::streak_service::{EvaluationSummary, StreakService};
use crate::services::ServiceResult;

/// Evaluate every active streak against today's UTC date.
pub async fn run_once(state: &AppState) -> ServiceResult<EvaluationSummary> {
    let today = Utc::now().date_naive();
    info!("Evaluating streaks for {}", today);
    StreakService::new(state.pool.clone()).evaluate_all(today).await
}
