use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::Dimension;
use crate::domain::rebalance::{is_valid_weight, rebalance, RebalancePlan, WeightEntry};
use crate::domain::{MilestoneStatus, TaskType};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionList {
    pub dimensions: Vec<Dimension>,
    pub total_weight: Decimal,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRef {
    pub id: Uuid,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: MilestoneStatus,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub task_type: TaskType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionDetail {
    #[serde(flatten)]
    pub dimension: Dimension,
    pub milestones: Vec<MilestoneRef>,
    pub active_tasks: Vec<TaskRef>,
}

pub struct DimensionService {
    pool: PgPool,
}

impl DimensionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> ServiceResult<DimensionList> {
        let dimensions = sqlx::query_as::<_, Dimension>("SELECT * FROM dimensions ORDER BY sort_order, code")
            .fetch_all(&self.pool)
            .await?;
        let total_weight = dimensions
            .iter()
            .filter(|d| d.is_active)
            .map(|d| d.weight)
            .sum();
        Ok(DimensionList {
            dimensions,
            total_weight,
        })
    }

    pub async fn active(&self) -> ServiceResult<Vec<Dimension>> {
        let dimensions = sqlx::query_as::<_, Dimension>(
            "SELECT * FROM dimensions WHERE is_active ORDER BY sort_order, code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dimensions)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Option<Dimension>> {
        let dimension = sqlx::query_as::<_, Dimension>("SELECT * FROM dimensions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dimension)
    }

    /// Dimension with the user's milestones and active tasks in it.
    pub async fn detail(&self, user_id: Uuid, id: Uuid) -> ServiceResult<Option<DimensionDetail>> {
        let Some(dimension) = self.get(id).await? else {
            return Ok(None);
        };

        let milestones = sqlx::query_as::<_, MilestoneRef>(
            "SELECT id, title, status FROM milestones
             WHERE dimension_id = $1 AND user_id = $2
             ORDER BY created_at DESC",
        )
        .bind(id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let active_tasks = sqlx::query_as::<_, TaskRef>(
            "SELECT id, title, task_type FROM tasks
             WHERE dimension_id = $1 AND user_id = $2 AND is_active
             ORDER BY created_at DESC",
        )
        .bind(id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(DimensionDetail {
            dimension,
            milestones,
            active_tasks,
        }))
    }

    /// Set a dimension's weight, optionally rebalancing the other active
    /// dimensions so the active total stays at 1.0.
    ///
    /// All dimension rows are locked in id order for the duration of the
    /// transaction, so concurrent rebalances serialize instead of
    /// interleaving. Every written row gets its `version` bumped.
    pub async fn update_weight(
        &self,
        id: Uuid,
        weight: Decimal,
        auto_rebalance: bool,
    ) -> ServiceResult<Option<RebalancePlan>> {
        if !is_valid_weight(weight) {
            return Err(ServiceError::validation("weight", "weight must be between 0 and 1"));
        }

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, Dimension>("SELECT * FROM dimensions ORDER BY id FOR UPDATE")
            .fetch_all(&mut *tx)
            .await?;
        let entries: Vec<WeightEntry> = locked.iter().map(Dimension::weight_entry).collect();

        let Some(plan) = rebalance(&entries, id, weight, auto_rebalance) else {
            tx.rollback().await?;
            return Ok(None);
        };

        for (dimension_id, new_weight) in &plan.updates {
            debug!("Dimension {} weight -> {}", dimension_id, new_weight);
            sqlx::query(
                "UPDATE dimensions
                 SET default_weight = $1, version = version + 1, updated_at = now()
                 WHERE id = $2",
            )
            .bind(new_weight)
            .bind(dimension_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "Updated weight of dimension {} to {} ({} rows, auto_rebalance={})",
            id,
            weight,
            plan.updates.len(),
            auto_rebalance
        );
        Ok(Some(plan))
    }
}
