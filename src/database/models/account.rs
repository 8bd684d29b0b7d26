use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{AccountType, Currency, DomainError, Money};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    pub currency: String,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub balance_updated_at: DateTime<Utc>,
    pub institution: Option<String>,
    pub is_liability: bool,
    pub interest_rate_annual: Option<Decimal>,
    pub monthly_fee: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn balance(&self) -> Result<Money, DomainError> {
        Ok(Money::new(self.current_balance, Currency::from_code(&self.currency)?))
    }
}
