use tracing::info;

use crate::app::AppState;
use crate::services::fx_service::{FxService, RefreshSummary};
use crate::services::ServiceResult;

pub async fn run_once(state: &AppState) -> ServiceResult<RefreshSummary> {
    info!("Refreshing FX rates from {}", state.fx_provider.source());
    FxService::new(state.pool.clone(), state.fx_provider.clone()).refresh().await
}
