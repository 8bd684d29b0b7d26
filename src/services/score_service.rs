use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::Dimension;
use crate::domain::scoring::{
    assemble_scores, dimension_score, dimension_score_code, weighted_life_score, DimensionScore,
    DimensionScoreInputs, MetricReading, ScoreItem, LIFE_SCORE_CODE,
};
use crate::domain::PeriodType;

/// Source of per-dimension scores.
#[async_trait]
pub trait ScoreCalculator: Send + Sync {
    async fn dimension_score(&self, user_id: Uuid, dimension_id: Uuid) -> ServiceResult<Decimal>;
}

/// Scores from habits, recent metrics and streaks stored in Postgres.
pub struct PgScoreCalculator {
    pool: PgPool,
}

impl PgScoreCalculator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn inputs(&self, user_id: Uuid, dimension_id: Uuid) -> ServiceResult<DimensionScoreInputs> {
        let now = Utc::now();

        let (active_habits, completed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE completed_at IS NOT NULL AND completed_at >= $3)
             FROM tasks
             WHERE user_id = $1 AND dimension_id = $2 AND task_type = 'habit' AND is_active",
        )
        .bind(user_id)
        .bind(dimension_id)
        .bind(now - Duration::days(7))
        .fetch_one(&self.pool)
        .await?;

        let readings: Vec<(Decimal, Option<Decimal>, Option<Decimal>)> = sqlx::query_as(
            "SELECT latest.value_number, d.min_value, d.max_value
             FROM metric_definitions d
             JOIN LATERAL (
                 SELECT r.value_number FROM metric_records r
                 WHERE r.user_id = $1 AND r.metric_code = d.code AND r.recorded_at >= $3
                 ORDER BY r.recorded_at DESC
                 LIMIT 1
             ) latest ON TRUE
             WHERE d.dimension_id = $2 AND d.is_active AND latest.value_number IS NOT NULL",
        )
        .bind(user_id)
        .bind(dimension_id)
        .bind(now - Duration::days(30))
        .fetch_all(&self.pool)
        .await?;

        let streak_days: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(s.current_streak_length), 0)::BIGINT
             FROM streaks s
             JOIN tasks t ON t.id = s.task_id
             WHERE s.user_id = $1 AND t.user_id = $1 AND t.dimension_id = $2
               AND t.is_active AND s.is_active AND s.current_streak_length > 0",
        )
        .bind(user_id)
        .bind(dimension_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DimensionScoreInputs {
            active_habits: active_habits as usize,
            habits_completed_last_7_days: completed as usize,
            metric_readings: readings
                .into_iter()
                .map(|(value, min_value, max_value)| MetricReading { value, min_value, max_value })
                .collect(),
            active_streak_days: streak_days,
        })
    }
}

#[async_trait]
impl ScoreCalculator for PgScoreCalculator {
    async fn dimension_score(&self, user_id: Uuid, dimension_id: Uuid) -> ServiceResult<Decimal> {
        let inputs = self.inputs(user_id, dimension_id).await?;
        let score = dimension_score(&inputs);
        debug!("Dimension {} score for user {}: {} from {:?}", dimension_id, user_id, score, inputs);
        Ok(score)
    }
}

pub struct ScoreService {
    pool: PgPool,
    calculator: Arc<dyn ScoreCalculator>,
}

impl ScoreService {
    pub fn new(pool: PgPool, calculator: Arc<dyn ScoreCalculator>) -> Self {
        Self { pool, calculator }
    }

    /// Life score first, then every active dimension by sort order.
    pub async fn scores(&self, user_id: Uuid) -> ServiceResult<Vec<ScoreItem>> {
        let today = Utc::now().date_naive();
        let dimensions = self.active_dimensions().await?;

        // One calculation per dimension, run concurrently on the pool.
        let computed = try_join_all(dimensions.into_iter().map(|d| async move {
            let score = self.calculator.dimension_score(user_id, d.id).await?;
            let previous = self.previous_value(user_id, &dimension_score_code(&d.code), today).await?;
            Ok::<_, ServiceError>(DimensionScore {
                dimension_id: d.id,
                code: d.code,
                name: d.name,
                description: d.description,
                weight: d.weight,
                score,
                previous,
            })
        }))
        .await?;

        let previous_life = self.previous_value(user_id, LIFE_SCORE_CODE, today).await?;
        Ok(assemble_scores(&computed, previous_life))
    }

    /// Compute and store today's daily scores for one user. Returns the
    /// number of records written.
    pub async fn recompute_for_user(&self, user_id: Uuid) -> ServiceResult<usize> {
        let today = Utc::now().date_naive();
        let dimensions = self.active_dimensions().await?;

        let mut pairs = Vec::with_capacity(dimensions.len());
        let mut written = 0;
        for d in &dimensions {
            let score = self.calculator.dimension_score(user_id, d.id).await?;
            let code = dimension_score_code(&d.code);
            self.ensure_definition(&code, &format!("{} Score", d.name), d.description.as_deref(), Some(d.id))
                .await?;
            self.upsert_daily(user_id, &code, score, today).await?;
            pairs.push((score, d.weight));
            written += 1;
        }

        let life = weighted_life_score(&pairs).round_dp(1);
        self.ensure_definition(
            LIFE_SCORE_CODE,
            "Life Score",
            Some("Weighted aggregate across all dimensions"),
            None,
        )
        .await?;
        self.upsert_daily(user_id, LIFE_SCORE_CODE, life, today).await?;

        Ok(written + 1)
    }

    async fn active_dimensions(&self) -> ServiceResult<Vec<Dimension>> {
        let dimensions = sqlx::query_as::<_, Dimension>(
            "SELECT * FROM dimensions WHERE is_active ORDER BY sort_order, code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dimensions)
    }

    /// Most recent stored value strictly before `today`, whatever its period type.
    async fn previous_value(&self, user_id: Uuid, code: &str, today: NaiveDate) -> ServiceResult<Option<Decimal>> {
        let value = sqlx::query_scalar(
            "SELECT score_value FROM score_records
             WHERE user_id = $1 AND score_code = $2 AND period_start < $3
             ORDER BY period_start DESC, calculated_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(code)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn ensure_definition(
        &self,
        code: &str,
        name: &str,
        description: Option<&str>,
        dimension_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        sqlx::query(
            "INSERT INTO score_definitions (code, name, description, dimension_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .bind(dimension_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_daily(&self, user_id: Uuid, code: &str, value: Decimal, day: NaiveDate) -> ServiceResult<()> {
        sqlx::query(
            "INSERT INTO score_records (id, user_id, score_code, score_value, period_type, period_start, period_end, calculated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6, now())
             ON CONFLICT (user_id, score_code, period_type, period_start)
             DO UPDATE SET score_value = EXCLUDED.score_value, calculated_at = EXCLUDED.calculated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .bind(value)
        .bind(PeriodType::Daily.as_str())
        .bind(day)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
