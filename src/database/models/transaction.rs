use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::TransactionCategory;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_account_id: Option<Uuid>,
    pub target_account_id: Option<Uuid>,
    pub currency: String,
    pub amount: Decimal,
    pub amount_home_currency: Option<Decimal>,
    pub fx_rate_used: Option<Decimal>,
    #[sqlx(try_from = "String")]
    pub category: TransactionCategory,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub transaction_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub source: String,
    pub is_reconciled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
