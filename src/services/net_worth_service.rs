use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::fx_service::FxService;
use super::ServiceResult;
use crate::database::models::{Account, NetWorthSnapshot};
use crate::domain::net_worth::{history_change, summarize, HistoryPeriod, Holding, NetWorthSummary};
use crate::domain::Currency;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub value: Decimal,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthHistory {
    pub period: HistoryPeriod,
    pub history: Vec<HistoryPoint>,
    pub current_net_worth: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub data_points: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRun {
    pub users: usize,
    pub written: usize,
    pub failed: usize,
}

pub struct NetWorthService {
    pool: PgPool,
}

impl NetWorthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current net worth over the user's active accounts, valued in `home`.
    pub async fn summary(&self, user_id: Uuid, home: Currency) -> ServiceResult<NetWorthSummary> {
        let mut conn = self.pool.acquire().await?;
        summary_on(&mut conn, user_id, home).await
    }

    /// Write (or overwrite) the snapshot for `date`.
    pub async fn snapshot_user(&self, user_id: Uuid, home: Currency, date: NaiveDate) -> ServiceResult<NetWorthSnapshot> {
        let mut tx = self.pool.begin().await?;
        let summary = summary_on(&mut *tx, user_id, home).await?;

        let snapshot = sqlx::query_as::<_, NetWorthSnapshot>(
            "INSERT INTO net_worth_snapshots (id, user_id, snapshot_date, total_assets, total_liabilities, net_worth,
                                              home_currency, breakdown_by_type, breakdown_by_currency,
                                              account_count, unconverted_count)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (user_id, snapshot_date) DO UPDATE
             SET total_assets = EXCLUDED.total_assets, total_liabilities = EXCLUDED.total_liabilities,
                 net_worth = EXCLUDED.net_worth, home_currency = EXCLUDED.home_currency,
                 breakdown_by_type = EXCLUDED.breakdown_by_type,
                 breakdown_by_currency = EXCLUDED.breakdown_by_currency,
                 account_count = EXCLUDED.account_count, unconverted_count = EXCLUDED.unconverted_count,
                 updated_at = now()
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(date)
        .bind(summary.total_assets.amount)
        .bind(summary.total_liabilities.amount)
        .bind(summary.net_worth.amount)
        .bind(home.code())
        .bind(Json(&summary.by_type))
        .bind(Json(&summary.by_currency))
        .bind(summary.account_count as i32)
        .bind(summary.unconverted.len() as i32)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        if !summary.unconverted.is_empty() {
            warn!(
                "Net worth snapshot for user {} skipped {} accounts without a {} rate",
                user_id,
                summary.unconverted.len(),
                home
            );
        }
        debug!("Net worth snapshot {} for user {}: {}", date, user_id, summary.net_worth);
        Ok(snapshot)
    }

    /// Snapshot every active user. One user's failure is logged and skipped.
    pub async fn snapshot_all(&self, date: NaiveDate) -> ServiceResult<SnapshotRun> {
        let users: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, home_currency FROM users WHERE status = 'active' ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        let mut run = SnapshotRun {
            users: users.len(),
            ..SnapshotRun::default()
        };
        for (user_id, code) in users {
            let home = Currency::from_code(&code).unwrap_or(Currency::ZAR);
            match self.snapshot_user(user_id, home, date).await {
                Ok(_) => run.written += 1,
                Err(e) => {
                    warn!("Net worth snapshot failed for user {}: {}", user_id, e);
                    run.failed += 1;
                }
            }
        }
        info!("Captured {} net worth snapshots for {}", run.written, date);
        Ok(run)
    }

    /// Snapshots from the period's start through `today`, oldest first.
    pub async fn history(&self, user_id: Uuid, period: HistoryPeriod, today: NaiveDate) -> ServiceResult<NetWorthHistory> {
        let snapshots = sqlx::query_as::<_, NetWorthSnapshot>(
            "SELECT * FROM net_worth_snapshots
             WHERE user_id = $1 AND snapshot_date >= $2 AND snapshot_date <= $3
             ORDER BY snapshot_date",
        )
        .bind(user_id)
        .bind(period.start(today))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        let values: Vec<Decimal> = snapshots.iter().map(|s| s.net_worth).collect();
        let change = history_change(&values);
        let history: Vec<HistoryPoint> = snapshots
            .into_iter()
            .map(|s| HistoryPoint {
                date: s.snapshot_date,
                value: s.net_worth,
                total_assets: s.total_assets,
                total_liabilities: s.total_liabilities,
                currency: s.home_currency,
            })
            .collect();

        Ok(NetWorthHistory {
            period,
            current_net_worth: values.last().copied().unwrap_or(Decimal::ZERO),
            change: change.change,
            change_percent: change.change_percent,
            data_points: history.len(),
            history,
        })
    }
}

async fn summary_on(conn: &mut PgConnection, user_id: Uuid, home: Currency) -> ServiceResult<NetWorthSummary> {
    let accounts = sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE user_id = $1 AND is_active ORDER BY name",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut holdings = Vec::with_capacity(accounts.len());
    for account in accounts {
        let balance = account.balance()?;
        let rate = FxService::rate_on(&mut *conn, balance.currency, home).await?;
        holdings.push(Holding {
            account_id: account.id,
            account_type: account.account_type,
            is_liability: account.is_liability,
            balance,
            rate,
        });
    }
    Ok(summarize(home, &holdings)?)
}
