use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::fx_service::FxService;
use super::{require_storable, require_text, ServiceResult};
use crate::database::models::Account;
use crate::domain::{AccountType, Currency, Money};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
    pub currency: Option<String>,
    #[serde(default)]
    pub initial_balance: Decimal,
    pub institution: Option<String>,
    #[serde(default)]
    pub is_liability: bool,
    pub interest_rate_annual: Option<Decimal>,
    #[serde(default)]
    pub monthly_fee: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub current_balance: Option<Decimal>,
    pub institution: Option<String>,
    pub is_liability: Option<bool>,
    pub interest_rate_annual: Option<Decimal>,
    pub monthly_fee: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub name: String,
    pub balance: Money,
    pub is_liability: bool,
    pub home_currency: Currency,
    /// `None` when no rate to the home currency is stored.
    pub home_value: Option<Money>,
    pub fx_rate: Option<Decimal>,
}

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, input: NewAccount) -> ServiceResult<Account> {
        let name = require_text("name", &input.name, 200)?;
        let currency = match input.currency.as_deref() {
            Some(code) => Currency::normalize(code)?,
            None => Currency::ZAR,
        };
        let initial_balance = require_storable("initialBalance", input.initial_balance)?;
        let monthly_fee = require_storable("monthlyFee", input.monthly_fee)?;

        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, user_id, name, account_type, currency, initial_balance, current_balance,
                                   institution, is_liability, interest_rate_annual, monthly_fee)
             VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&name)
        .bind(input.account_type.as_str())
        .bind(currency.code())
        .bind(initial_balance)
        .bind(&input.institution)
        .bind(input.is_liability)
        .bind(input.interest_rate_annual)
        .bind(monthly_fee)
        .fetch_one(&self.pool)
        .await?;

        info!("Created {} account {} for user {}", account.account_type, account.id, user_id);
        Ok(account)
    }

    pub async fn list(&self, user_id: Uuid, include_inactive: bool) -> ServiceResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts
             WHERE user_id = $1 AND ($2 OR is_active)
             ORDER BY name",
        )
        .bind(user_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> ServiceResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, patch: AccountPatch) -> ServiceResult<Option<Account>> {
        let Some(current) = self.get(user_id, id).await? else {
            return Ok(None);
        };
        let name = match patch.name.as_deref() {
            Some(name) => require_text("name", name, 200)?,
            None => current.name,
        };
        let balance_changed = patch.current_balance.is_some();
        let current_balance = require_storable(
            "currentBalance",
            patch.current_balance.unwrap_or(current.current_balance),
        )?;
        let monthly_fee = require_storable("monthlyFee", patch.monthly_fee.unwrap_or(current.monthly_fee))?;

        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts
             SET name = $3, account_type = $4, current_balance = $5, institution = $6, is_liability = $7,
                 interest_rate_annual = $8, monthly_fee = $9, is_active = $10,
                 balance_updated_at = CASE WHEN $11 THEN now() ELSE balance_updated_at END,
                 updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(&name)
        .bind(patch.account_type.unwrap_or(current.account_type).as_str())
        .bind(current_balance)
        .bind(patch.institution.or(current.institution))
        .bind(patch.is_liability.unwrap_or(current.is_liability))
        .bind(patch.interest_rate_annual.or(current.interest_rate_annual))
        .bind(monthly_fee)
        .bind(patch.is_active.unwrap_or(current.is_active))
        .bind(balance_changed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// Soft delete.
    pub async fn deactivate(&self, user_id: Uuid, id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET is_active = FALSE, updated_at = now()
             WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn balance(
        &self,
        user_id: Uuid,
        id: Uuid,
        home_currency: Currency,
    ) -> ServiceResult<Option<AccountBalance>> {
        let Some(account) = self.get(user_id, id).await? else {
            return Ok(None);
        };
        let balance = account.balance()?;

        let mut conn = self.pool.acquire().await?;
        let fx_rate = FxService::rate_on(&mut conn, balance.currency, home_currency).await?;

        Ok(Some(AccountBalance {
            account_id: account.id,
            name: account.name,
            balance,
            is_liability: account.is_liability,
            home_currency,
            home_value: fx_rate
                .map(|rate| balance.checked_mul(rate).map(|m| m.round(2)))
                .transpose()?,
            fx_rate,
        }))
    }
}
