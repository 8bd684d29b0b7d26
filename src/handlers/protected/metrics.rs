// handlers/protected/metrics.rs - /api/metrics

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{MetricDefinition, MetricRecord};
use crate::domain::{AggregationWindow, DomainError, WindowType};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::metric_service::{
    MetricAggregate, MetricDefinitionPatch, MetricEntry, MetricService, NewMetricDefinition, RecordOutcome,
};

const DEFAULT_HISTORY_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionQuery {
    pub dimension_id: Option<Uuid>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub entries: Vec<MetricEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AggregateQuery {
    pub window: Option<WindowType>,
    /// Any instant inside the daily/weekly window; defaults to now.
    pub date: Option<DateTime<Utc>>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AggregateQuery {
    fn window(&self, now: DateTime<Utc>) -> Result<AggregationWindow, DomainError> {
        let at = self.date.unwrap_or(now);
        match self.window.unwrap_or(WindowType::Daily) {
            WindowType::Daily => Ok(AggregationWindow::daily(at)),
            WindowType::Weekly => Ok(AggregationWindow::weekly(at)),
            WindowType::Monthly => AggregationWindow::monthly(
                self.year.unwrap_or_else(|| at.year()),
                self.month.unwrap_or_else(|| at.month()),
            ),
            WindowType::Custom => match (self.from, self.to) {
                (Some(from), Some(to)) => AggregationWindow::custom(from, to),
                _ => Err(DomainError::InvalidWindow("custom windows need 'from' and 'to'".to_string())),
            },
        }
    }
}

/// GET /api/metrics/definitions
pub async fn definitions_get(
    State(state): State<AppState>,
    Query(query): Query<DefinitionQuery>,
) -> ApiResult<Vec<MetricDefinition>> {
    let definitions = MetricService::new(state.pool.clone())
        .list_definitions(query.dimension_id, query.active_only.unwrap_or(true))
        .await?;
    Ok(ApiResponse::success(definitions))
}

/// POST /api/metrics/definitions
pub async fn definitions_post(
    State(state): State<AppState>,
    Json(body): Json<NewMetricDefinition>,
) -> ApiResult<MetricDefinition> {
    let definition = MetricService::new(state.pool.clone()).create_definition(body).await?;
    Ok(ApiResponse::created(definition))
}

/// GET /api/metrics/definitions/:code
pub async fn definition_get(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<MetricDefinition> {
    let definition = MetricService::new(state.pool.clone()).get_definition(&code).await?;
    ApiResponse::found(definition, "Metric definition")
}

/// PATCH /api/metrics/definitions/:code
pub async fn definition_patch(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<MetricDefinitionPatch>,
) -> ApiResult<MetricDefinition> {
    let definition = MetricService::new(state.pool.clone()).update_definition(&code, body).await?;
    ApiResponse::found(definition, "Metric definition")
}

/// POST /api/metrics/record - batch; bad entries are reported, not fatal
pub async fn record_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<RecordRequest>,
) -> ApiResult<RecordOutcome> {
    if body.entries.is_empty() {
        return Err(ApiError::field_error("entries", "at least one entry is required"));
    }
    let outcome = MetricService::new(state.pool.clone()).record(auth.user_id, body.entries).await?;
    Ok(ApiResponse::success(outcome))
}

/// GET /api/metrics/:code/history?from=&to=&limit=
pub async fn history_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(code): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<MetricRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, DEFAULT_HISTORY_LIMIT);
    let records = MetricService::new(state.pool.clone())
        .history(auth.user_id, &code, query.from, query.to, limit)
        .await?;
    Ok(ApiResponse::success(records))
}

/// GET /api/metrics/:code/aggregate?window=daily|weekly|monthly|custom
pub async fn aggregate_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(code): Path<String>,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<MetricAggregate> {
    let window = query.window(Utc::now())?;
    let aggregate = MetricService::new(state.pool.clone())
        .aggregate(auth.user_id, &code, window)
        .await?;
    ApiResponse::found(aggregate, "Metric data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 15, 30, 0).unwrap()
    }

    #[test]
    fn default_window_is_today() {
        let window = AggregateQuery::default().window(at()).unwrap();
        assert_eq!(window, AggregationWindow::daily(at()));
    }

    #[test]
    fn monthly_window_defaults_to_current_month() {
        let query = AggregateQuery {
            window: Some(WindowType::Monthly),
            ..Default::default()
        };
        assert_eq!(query.window(at()).unwrap(), AggregationWindow::monthly(2024, 5).unwrap());

        let bad = AggregateQuery {
            window: Some(WindowType::Monthly),
            month: Some(13),
            ..Default::default()
        };
        assert!(bad.window(at()).is_err());
    }

    #[test]
    fn custom_window_needs_both_bounds() {
        let query = AggregateQuery {
            window: Some(WindowType::Custom),
            from: Some(at()),
            ..Default::default()
        };
        assert!(matches!(query.window(at()), Err(DomainError::InvalidWindow(_))));
    }
}
