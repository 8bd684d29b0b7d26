// handlers/protected/fx_rates.rs - /api/fx-rates

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::FxRate;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::fx_service::{FxService, RefreshSummary};

/// GET /api/fx-rates - latest stored rate per pair
pub async fn fx_rates_get(State(state): State<AppState>) -> ApiResult<Vec<FxRate>> {
    let rates = FxService::new(state.pool.clone(), state.fx_provider.clone()).latest().await?;
    Ok(ApiResponse::success(rates))
}

/// POST /api/fx-rates/refresh - pull from the provider now
pub async fn fx_rates_refresh_post(State(state): State<AppState>) -> ApiResult<RefreshSummary> {
    let summary = FxService::new(state.pool.clone(), state.fx_provider.clone()).refresh().await?;
    Ok(ApiResponse::success(summary))
}
