use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{AggregationType, MetricValueType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub dimension_id: Option<Uuid>,
    pub unit: Option<String>,
    #[sqlx(try_from = "String")]
    pub value_type: MetricValueType,
    #[sqlx(try_from = "String")]
    pub aggregation_type: AggregationType,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub target_value: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric_code: String,
    pub value_number: Option<Decimal>,
    pub value_string: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub source: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
