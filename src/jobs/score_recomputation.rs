use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppState;
use crate::services::score_service::ScoreService;
use crate::services::user_service::UserService;
use crate::services::ServiceResult;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputationSummary {
    pub users: usize,
    pub failed: usize,
    pub records: usize,
}

/// Store today's scores for every active user. One user's failure is
/// logged and skipped.
pub async fn run_once(state: &AppState) -> ServiceResult<RecomputationSummary> {
    let users = UserService::new(state.pool.clone()).active_user_ids().await?;
    let scores = ScoreService::new(state.pool.clone(), state.score_calculator.clone());
    info!("Recomputing scores for {} users", users.len());

    let mut summary = RecomputationSummary {
        users: users.len(),
        ..RecomputationSummary::default()
    };
    for user_id in users {
        match scores.recompute_for_user(user_id).await {
            Ok(written) => summary.records += written,
            Err(e) => {
                warn!("Score recomputation failed for user {}: {}", user_id, e);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
