use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{require_text, ServiceError, ServiceResult};
use crate::database::models::Milestone;
use crate::domain::MilestoneStatus;

const TITLE_MAX: usize = 255;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMilestone {
    pub dimension_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub target_metric_code: Option<String>,
    pub target_metric_value: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonePatch {
    pub dimension_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub target_metric_code: Option<String>,
    pub target_metric_value: Option<Decimal>,
    pub status: Option<MilestoneStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneFilter {
    pub status: Option<MilestoneStatus>,
    pub dimension_id: Option<Uuid>,
}

pub struct MilestoneService {
    pool: PgPool,
}

impl MilestoneService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, input: NewMilestone) -> ServiceResult<Milestone> {
        let title = require_text("title", &input.title, TITLE_MAX)?;
        self.require_dimension(input.dimension_id).await?;

        let milestone = sqlx::query_as::<_, Milestone>(
            "INSERT INTO milestones (id, user_id, dimension_id, title, description, target_date,
                                     target_metric_code, target_metric_value)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.dimension_id)
        .bind(&title)
        .bind(&input.description)
        .bind(input.target_date)
        .bind(&input.target_metric_code)
        .bind(input.target_metric_value)
        .fetch_one(&self.pool)
        .await?;

        info!("Created milestone {} for user {}", milestone.id, user_id);
        Ok(milestone)
    }

    pub async fn list(&self, user_id: Uuid, filter: &MilestoneFilter) -> ServiceResult<Vec<Milestone>> {
        let milestones = sqlx::query_as::<_, Milestone>(
            "SELECT * FROM milestones
             WHERE user_id = $1
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::UUID IS NULL OR dimension_id = $3)
             ORDER BY target_date ASC NULLS LAST, created_at DESC",
        )
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.dimension_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(milestones)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> ServiceResult<Option<Milestone>> {
        let milestone = sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(milestone)
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, patch: MilestonePatch) -> ServiceResult<Option<Milestone>> {
        let Some(current) = self.get(user_id, id).await? else {
            return Ok(None);
        };
        let title = match patch.title.as_deref() {
            Some(title) => require_text("title", title, TITLE_MAX)?,
            None => current.title,
        };
        if let Some(dimension_id) = patch.dimension_id {
            self.require_dimension(dimension_id).await?;
        }
        let status = patch.status.unwrap_or(current.status);
        let completed_at = completion_stamp(current.status, status, current.completed_at, Utc::now());

        let milestone = sqlx::query_as::<_, Milestone>(
            "UPDATE milestones
             SET dimension_id = $3, title = $4, description = $5, target_date = $6, target_metric_code = $7,
                 target_metric_value = $8, status = $9, completed_at = $10, updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.dimension_id.unwrap_or(current.dimension_id))
        .bind(&title)
        .bind(patch.description.or(current.description))
        .bind(patch.target_date.or(current.target_date))
        .bind(patch.target_metric_code.or(current.target_metric_code))
        .bind(patch.target_metric_value.or(current.target_metric_value))
        .bind(status.as_str())
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;

        if status != current.status {
            info!("Milestone {} moved from {} to {}", id, current.status, status);
        }
        Ok(milestone)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM milestones WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn require_dimension(&self, dimension_id: Uuid) -> ServiceResult<()> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM dimensions WHERE id = $1")
            .bind(dimension_id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(()),
            None => Err(ServiceError::validation("dimensionId", "dimension not found")),
        }
    }
}

/// `completed_at` after a status change: stamped on entering `completed`,
/// kept while completed, cleared otherwise.
fn completion_stamp(
    from: MilestoneStatus,
    to: MilestoneStatus,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (from, to) {
        (MilestoneStatus::Completed, MilestoneStatus::Completed) => current.or(Some(now)),
        (_, MilestoneStatus::Completed) => Some(now),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn completion_is_stamped_once() {
        let now = Utc::now();
        let earlier = now - Duration::days(3);
        use MilestoneStatus::*;

        assert_eq!(completion_stamp(Active, Completed, None, now), Some(now));
        assert_eq!(completion_stamp(Completed, Completed, Some(earlier), now), Some(earlier));
        assert_eq!(completion_stamp(Completed, Active, Some(earlier), now), None);
        assert_eq!(completion_stamp(Active, Abandoned, None, now), None);
    }
}
