use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::fx_provider::FxRateProvider;
use super::ServiceResult;
use crate::database::models::FxRate;
use crate::domain::{Currency, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub fetched: usize,
    pub stored: usize,
}

pub struct FxService {
    pool: PgPool,
    provider: Arc<dyn FxRateProvider>,
}

impl FxService {
    pub fn new(pool: PgPool, provider: Arc<dyn FxRateProvider>) -> Self {
        Self { pool, provider }
    }

    /// Pull rates from the provider and store the ones not seen before.
    pub async fn refresh(&self) -> ServiceResult<RefreshSummary> {
        let quotes = self.provider.rates().await?;
        let mut stored = 0;
        for q in &quotes {
            let result = sqlx::query(
                "INSERT INTO fx_rates (id, base_currency, quote_currency, rate, rate_timestamp, source)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (base_currency, quote_currency, rate_timestamp) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(q.base.code())
            .bind(q.quote.code())
            .bind(q.rate)
            .bind(q.as_of)
            .bind(self.provider.source())
            .execute(&self.pool)
            .await?;
            stored += result.rows_affected() as usize;
        }

        info!("FX refresh stored {} of {} rates", stored, quotes.len());
        Ok(RefreshSummary {
            fetched: quotes.len(),
            stored,
        })
    }

    /// Latest stored rate for every pair.
    pub async fn latest(&self) -> ServiceResult<Vec<FxRate>> {
        let rates = sqlx::query_as::<_, FxRate>(
            "SELECT DISTINCT ON (base_currency, quote_currency) *
             FROM fx_rates
             ORDER BY base_currency, quote_currency, rate_timestamp DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rates)
    }

    pub async fn convert(&self, money: Money, to: Currency) -> ServiceResult<Option<Money>> {
        let mut conn = self.pool.acquire().await?;
        let rate = Self::rate_on(&mut conn, money.currency, to).await?;
        let converted = rate
            .map(|r| money.checked_mul(r).map(|m| Money::new(m.amount, to)))
            .transpose()?;
        Ok(converted)
    }

    /// Multiplier taking `from` amounts into `to`: 1 for the same currency,
    /// else the latest direct rate, else the inverse of the latest reverse rate.
    pub async fn rate_on(conn: &mut PgConnection, from: Currency, to: Currency) -> ServiceResult<Option<Decimal>> {
        if from == to {
            return Ok(Some(Decimal::ONE));
        }
        if let Some(rate) = Self::latest_pair(conn, from, to).await? {
            return Ok(Some(rate));
        }
        let inverse = Self::latest_pair(conn, to, from).await?;
        Ok(inverse.and_then(|r| Decimal::ONE.checked_div(r)))
    }

    async fn latest_pair(conn: &mut PgConnection, base: Currency, quote: Currency) -> ServiceResult<Option<Decimal>> {
        let rate = sqlx::query_scalar(
            "SELECT rate FROM fx_rates
             WHERE base_currency = $1 AND quote_currency = $2
             ORDER BY rate_timestamp DESC
             LIMIT 1",
        )
        .bind(base.code())
        .bind(quote.code())
        .fetch_optional(conn)
        .await?;
        Ok(rate)
    }
}
