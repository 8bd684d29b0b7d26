use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FxRate {
    pub id: Uuid,
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: Decimal,
    pub rate_timestamp: DateTime<Utc>,
    pub source: String,
}
