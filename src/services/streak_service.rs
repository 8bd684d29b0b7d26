use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::ServiceResult;
use crate::database::models::{Streak, StreakWithTask};
use crate::domain::streak::{PenaltyOutcome, StreakCounters, StreakSort};

const DEFAULT_MAX_ALLOWED_MISSES: i32 = 1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub broken: usize,
    pub penalized: usize,
}

pub struct StreakService {
    pool: PgPool,
}

impl StreakService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Streaks that have ever counted, joined with their task title.
    pub async fn list(&self, user_id: Uuid, is_active: bool, sort: StreakSort) -> ServiceResult<Vec<StreakWithTask>> {
        let sql = format!(
            "SELECT s.*, t.title AS task_title
             FROM streaks s
             LEFT JOIN tasks t ON t.id = s.task_id
             WHERE s.user_id = $1 AND s.is_active = $2
               AND (s.current_streak_length > 0 OR s.longest_streak_length > 0)
             ORDER BY {}",
            sort.order_by()
        );
        let rows = sqlx::query_as::<_, StreakWithTask>(&sql)
            .bind(user_id)
            .bind(is_active)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Record a success for `task_id` on `date` inside the caller's transaction.
    ///
    /// Updates the task's active streak, or creates one when `create_if_missing`
    /// is set. Returns the resulting streak, if any.
    pub async fn record_task_success(
        conn: &mut PgConnection,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
        create_if_missing: bool,
    ) -> ServiceResult<Option<Streak>> {
        let existing = sqlx::query_as::<_, Streak>(
            "SELECT * FROM streaks
             WHERE task_id = $1 AND user_id = $2 AND is_active
             ORDER BY created_at
             LIMIT 1
             FOR UPDATE",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        match existing {
            Some(mut streak) => {
                let mut counters = streak.counters();
                counters.record_success(date);
                streak.apply(&counters);
                Self::save_counters(conn, streak.id, &counters).await?;
                debug!("Streak {} now at {}", streak.id, counters.current_streak_length);
                Ok(Some(streak))
            }
            None if create_if_missing => {
                let mut counters = StreakCounters::with_max_allowed_misses(DEFAULT_MAX_ALLOWED_MISSES);
                counters.record_success(date);
                let streak = sqlx::query_as::<_, Streak>(
                    "INSERT INTO streaks (id, user_id, task_id, current_streak_length, longest_streak_length,
                                          last_success_date, streak_start_date, miss_count, max_allowed_misses)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(task_id)
                .bind(counters.current_streak_length)
                .bind(counters.longest_streak_length)
                .bind(counters.last_success_date)
                .bind(counters.streak_start_date)
                .bind(counters.miss_count)
                .bind(counters.max_allowed_misses)
                .fetch_one(&mut *conn)
                .await?;
                info!("Started streak {} for task {}", streak.id, task_id);
                Ok(Some(streak))
            }
            None => Ok(None),
        }
    }

    /// Daily pass over every active streak: reset broken ones, shorten
    /// penalized ones.
    pub async fn evaluate_all(&self, today: NaiveDate) -> ServiceResult<EvaluationSummary> {
        let mut tx = self.pool.begin().await?;

        let streaks = sqlx::query_as::<_, Streak>(
            "SELECT * FROM streaks WHERE is_active AND current_streak_length > 0 FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut summary = EvaluationSummary {
            evaluated: streaks.len(),
            ..EvaluationSummary::default()
        };

        for streak in streaks {
            let mut counters = streak.counters();
            match counters.apply_miss_penalty(today) {
                PenaltyOutcome::Unchanged => continue,
                PenaltyOutcome::Broken => {
                    summary.broken += 1;
                    debug!("Streak {} broken for task {:?}", streak.id, streak.task_id);
                }
                PenaltyOutcome::Penalized(days) => {
                    summary.penalized += 1;
                    debug!("Streak {} penalized by {} days", streak.id, days);
                }
            }
            Self::save_counters(&mut *tx, streak.id, &counters).await?;
        }

        tx.commit().await?;
        info!(
            "Streak evaluation completed. Evaluated {} streaks. Broken: {}, Penalized: {}",
            summary.evaluated, summary.broken, summary.penalized
        );
        Ok(summary)
    }

    async fn save_counters(conn: &mut PgConnection, id: Uuid, c: &StreakCounters) -> ServiceResult<()> {
        sqlx::query(
            "UPDATE streaks
             SET current_streak_length = $1, longest_streak_length = $2, last_success_date = $3,
                 streak_start_date = $4, miss_count = $5, updated_at = now()
             WHERE id = $6",
        )
        .bind(c.current_streak_length)
        .bind(c.longest_streak_length)
        .bind(c.last_success_date)
        .bind(c.streak_start_date)
        .bind(c.miss_count)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
