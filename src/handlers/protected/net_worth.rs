// handlers/protected/net_worth.rs - /api/net-worth

use axum::{
    extract::{Query, State},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::domain::net_worth::{HistoryPeriod, NetWorthSummary};
use crate::domain::Currency;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::net_worth_service::{NetWorthHistory, NetWorthService};
use crate::services::user_service::UserService;

#[derive(Debug, Default, Deserialize)]
pub struct NetWorthQuery {
    /// Value in this currency instead of the user's home currency
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// 1M, 3M, 6M, 1Y (default) or ALL
    pub period: Option<String>,
}

/// GET /api/net-worth - assets minus liabilities over active accounts
pub async fn net_worth_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<NetWorthQuery>,
) -> ApiResult<NetWorthSummary> {
    let currency = match query.currency.as_deref() {
        Some(code) => Currency::normalize(code)?,
        None => UserService::new(state.pool.clone()).home_currency(auth.user_id).await?,
    };
    let summary = NetWorthService::new(state.pool.clone()).summary(auth.user_id, currency).await?;
    Ok(ApiResponse::success(summary))
}

/// GET /api/net-worth/history - daily snapshots, oldest first
pub async fn net_worth_history_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<NetWorthHistory> {
    let period = HistoryPeriod::parse(query.period.as_deref());
    let history = NetWorthService::new(state.pool.clone())
        .history(auth.user_id, period, Utc::now().date_naive())
        .await?;
    Ok(ApiResponse::success(history))
}
