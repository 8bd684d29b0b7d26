use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// End-of-day net worth for one user, in that day's home currency.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub snapshot_date: NaiveDate,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub net_worth: Decimal,
    pub home_currency: String,
    pub breakdown_by_type: Value,
    pub breakdown_by_currency: Value,
    pub account_count: i32,
    pub unconverted_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
