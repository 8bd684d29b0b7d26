use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::fx_service::FxService;
use super::{require_storable, ServiceError, ServiceResult};
use crate::database::models::Transaction;
use crate::domain::{Currency, Money, TransactionCategory};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub source_account_id: Option<Uuid>,
    pub target_account_id: Option<Uuid>,
    pub currency: String,
    pub amount: Decimal,
    pub category: TransactionCategory,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub source: Option<String>,
}

/// Only descriptive fields change after creation; amounts and accounts are
/// fixed so the balance effects stay consistent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub subcategory: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub is_reconciled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub account_id: Option<Uuid>,
    pub category: Option<TransactionCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl TransactionFilter {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub struct TransactionService {
    pool: PgPool,
}

impl TransactionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a transaction, converting into the home currency and applying
    /// its balance effects in one database transaction.
    pub async fn create(
        &self,
        user_id: Uuid,
        home_currency: Currency,
        input: NewTransaction,
    ) -> ServiceResult<Transaction> {
        let currency = Currency::normalize(&input.currency)?;
        let amount = Money::new(input.amount, currency);
        if !amount.is_positive() {
            return Err(ServiceError::validation("amount", "amount must be greater than zero"));
        }
        require_storable("amount", amount.amount)?;
        if input.source_account_id.is_some() && input.source_account_id == input.target_account_id {
            return Err(ServiceError::validation(
                "targetAccountId",
                "source and target accounts must differ",
            ));
        }

        let mut tx = self.pool.begin().await?;

        for (field, account_id) in [
            ("sourceAccountId", input.source_account_id),
            ("targetAccountId", input.target_account_id),
        ] {
            if let Some(account_id) = account_id {
                if !owns_account(&mut *tx, user_id, account_id).await? {
                    return Err(ServiceError::validation(field, "account not found"));
                }
            }
        }

        let fx_rate = FxService::rate_on(&mut *tx, currency, home_currency).await?;
        let amount_home = fx_rate.map(|rate| home_amount(amount, rate)).transpose()?;
        let fx_rate_used = fx_rate.filter(|_| currency != home_currency);
        if fx_rate.is_none() {
            debug!("No {} -> {} rate stored; home amount left empty", currency, home_currency);
        }

        let transaction = sqlx::query_as::<_, Transaction>(
            "INSERT INTO transactions (id, user_id, source_account_id, target_account_id, currency, amount,
                                       amount_home_currency, fx_rate_used, category, subcategory, tags,
                                       description, notes, transaction_date, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.source_account_id)
        .bind(input.target_account_id)
        .bind(currency.code())
        .bind(input.amount)
        .bind(amount_home)
        .bind(fx_rate_used)
        .bind(input.category.as_str())
        .bind(&input.subcategory)
        .bind(&input.tags)
        .bind(&input.description)
        .bind(&input.notes)
        .bind(input.transaction_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(input.source.as_deref().unwrap_or("manual"))
        .fetch_one(&mut *tx)
        .await?;

        apply_balance_effects(&mut *tx, &transaction, Decimal::ONE).await?;
        tx.commit().await?;

        info!(
            "Recorded {} transaction {} of {} {}",
            transaction.category, transaction.id, transaction.amount, transaction.currency
        );
        Ok(transaction)
    }

    /// Newest first.
    pub async fn list(&self, user_id: Uuid, filter: &TransactionFilter) -> ServiceResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions
             WHERE user_id = $1
               AND ($2::UUID IS NULL OR source_account_id = $2 OR target_account_id = $2)
               AND ($3::TEXT IS NULL OR category = $3)
               AND ($4::DATE IS NULL OR transaction_date >= $4)
               AND ($5::DATE IS NULL OR transaction_date <= $5)
             ORDER BY transaction_date DESC, recorded_at DESC
             LIMIT $6",
        )
        .bind(user_id)
        .bind(filter.account_id)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit())
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> ServiceResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(transaction)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ServiceResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions
             SET subcategory = COALESCE($3, subcategory),
                 tags = COALESCE($4, tags),
                 description = COALESCE($5, description),
                 notes = COALESCE($6, notes),
                 is_reconciled = COALESCE($7, is_reconciled),
                 updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.subcategory)
        .bind(&patch.tags)
        .bind(&patch.description)
        .bind(&patch.notes)
        .bind(patch.is_reconciled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(transaction)
    }

    /// Delete and reverse the balance effects.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query_as::<_, Transaction>(
            "DELETE FROM transactions WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(transaction) = deleted else {
            tx.rollback().await?;
            return Ok(false);
        };

        apply_balance_effects(&mut *tx, &transaction, Decimal::NEGATIVE_ONE).await?;
        tx.commit().await?;
        info!("Deleted transaction {} and reversed its balance effects", id);
        Ok(true)
    }
}

/// `amount` converted at `rate` to 4 dp; the result must still fit the column.
fn home_amount(amount: Money, rate: Decimal) -> ServiceResult<Decimal> {
    let converted = amount
        .checked_mul(rate)
        .map(|m| Money::new(m.amount.round_dp(4), m.currency))
        .and_then(|m| m.ensure_storable().map(|_| m));
    match converted {
        Ok(m) => Ok(m.amount),
        Err(_) => Err(ServiceError::validation(
            "amount",
            "amount is too large to convert into the home currency",
        )),
    }
}

async fn owns_account(conn: &mut PgConnection, user_id: Uuid, account_id: Uuid) -> ServiceResult<bool> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM accounts WHERE id = $1 AND user_id = $2")
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Source balance moves by `-amount * sign`, target by `+amount * sign`.
async fn apply_balance_effects(conn: &mut PgConnection, t: &Transaction, sign: Decimal) -> ServiceResult<()> {
    let moves = [
        (t.source_account_id, -t.amount * sign),
        (t.target_account_id, t.amount * sign),
    ];
    for (account_id, delta) in moves {
        let Some(account_id) = account_id else {
            continue;
        };
        sqlx::query(
            "UPDATE accounts
             SET current_balance = current_balance + $1, balance_updated_at = now(), updated_at = now()
             WHERE id = $2 AND user_id = $3",
        )
        .bind(delta)
        .bind(account_id)
        .bind(t.user_id)
        .execute(&mut *conn)
        .await
        .map_err(balance_overflow)?;
        debug!("Account {} balance moved by {}", account_id, delta);
    }
    Ok(())
}

/// Postgres `numeric_value_out_of_range` means the running balance left the column range.
fn balance_overflow(err: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("22003") {
            return ServiceError::validation("amount", "account balance would be out of range");
        }
    }
    err.into()
}
