use chrono::Utc;
use tracing::info;

use crate::app::AppState;
use crate::services::net_worth_service::{NetWorthService, SnapshotRun};
use crate::services::ServiceResult;

/// Capture today's net worth for every active user. Rerunning on the same
/// day overwrites that day's snapshot.
pub async fn run_once(state: &AppState) -> ServiceResult<SnapshotRun> {
    let today = Utc::now().date_naive();
    info!("Capturing net worth snapshots for {}", today);
    NetWorthService::new(state.pool.clone()).snapshot_all(today).await
}
