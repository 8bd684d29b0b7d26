use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Frequency, TargetComparison, TaskType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dimension_id: Option<Uuid>,
    pub milestone_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub task_type: TaskType,
    #[sqlx(try_from = "String")]
    pub frequency: Frequency,
    pub scheduled_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub linked_metric_code: Option<String>,
    pub target_value: Option<Decimal>,
    pub target_comparison: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Metric code, target and comparison when the task completes itself
    /// from its linked metric.
    pub fn metric_target(&self) -> Option<(&str, Decimal, TargetComparison)> {
        let code = self.linked_metric_code.as_deref()?;
        let target = self.target_value?;
        let comparison = self.target_comparison.as_deref()?.parse().ok()?;
        Some((code, target, comparison))
    }
}
