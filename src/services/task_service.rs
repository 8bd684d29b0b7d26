use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metric_service::MetricService;
use super::streak_service::StreakService;
use super::{require_storable, require_text, ServiceError, ServiceResult};
use crate::database::models::Task;
use crate::domain::task_evaluation::{completed_on_same_day, condition_met, evaluation_window};
use crate::domain::{Frequency, TargetComparison, TaskType};

const TITLE_MAX: usize = 255;
pub const TASK_COMPLETION_SOURCE: &str = "task_completion";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub frequency: Option<Frequency>,
    pub dimension_id: Option<Uuid>,
    pub milestone_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub linked_metric_code: Option<String>,
    pub target_value: Option<Decimal>,
    pub target_comparison: Option<TargetComparison>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub frequency: Option<Frequency>,
    pub dimension_id: Option<Uuid>,
    pub milestone_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub linked_metric_code: Option<String>,
    pub target_value: Option<Decimal>,
    pub target_comparison: Option<TargetComparison>,
    pub is_completed: Option<bool>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub task_type: Option<TaskType>,
    pub dimension_id: Option<Uuid>,
    /// Defaults to active tasks only.
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTask {
    pub completed_at: Option<DateTime<Utc>>,
    pub metric_value: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub task_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub metric_recorded: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEvaluation {
    pub evaluated: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct TaskService {
    pool: PgPool,
}

impl TaskService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, input: NewTask) -> ServiceResult<Task> {
        let title = require_text("title", &input.title, TITLE_MAX)?;
        check_dates(input.start_date, input.end_date)?;
        check_target(input.linked_metric_code.as_deref(), input.target_value, input.target_comparison)?;
        let frequency = input.frequency.unwrap_or_else(|| default_frequency(input.task_type));

        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, user_id, dimension_id, milestone_id, title, description, task_type, frequency,
                                scheduled_date, start_date, end_date, linked_metric_code, target_value,
                                target_comparison, tags)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.dimension_id)
        .bind(input.milestone_id)
        .bind(&title)
        .bind(&input.description)
        .bind(input.task_type.as_str())
        .bind(frequency.as_str())
        .bind(input.scheduled_date)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.linked_metric_code)
        .bind(input.target_value)
        .bind(input.target_comparison.map(|c| c.as_str()))
        .bind(&input.tags)
        .fetch_one(&self.pool)
        .await?;

        info!("Created {} task {} for user {}", task.task_type, task.id, user_id);
        Ok(task)
    }

    pub async fn list(&self, user_id: Uuid, filter: &TaskFilter) -> ServiceResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks
             WHERE user_id = $1
               AND ($2::TEXT IS NULL OR task_type = $2)
               AND ($3::UUID IS NULL OR dimension_id = $3)
               AND is_active = $4
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(filter.task_type.map(|t| t.as_str()))
        .bind(filter.dimension_id)
        .bind(filter.is_active.unwrap_or(true))
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> ServiceResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, patch: TaskPatch) -> ServiceResult<Option<Task>> {
        let Some(current) = self.get(user_id, id).await? else {
            return Ok(None);
        };
        let title = match patch.title.as_deref() {
            Some(title) => require_text("title", title, TITLE_MAX)?,
            None => current.title,
        };
        let start_date = patch.start_date.or(current.start_date);
        let end_date = patch.end_date.or(current.end_date);
        check_dates(start_date, end_date)?;
        let linked_metric_code = patch.linked_metric_code.or(current.linked_metric_code);
        let target_value = patch.target_value.or(current.target_value);
        let target_comparison = patch
            .target_comparison
            .or_else(|| current.target_comparison.as_deref().and_then(|c| c.parse().ok()));
        check_target(linked_metric_code.as_deref(), target_value, target_comparison)?;

        let is_completed = patch.is_completed.unwrap_or(current.is_completed);
        let completed_at = if is_completed {
            current.completed_at.or_else(|| Some(Utc::now()))
        } else {
            None
        };

        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks
             SET title = $3, description = $4, task_type = $5, frequency = $6, dimension_id = $7,
                 milestone_id = $8, scheduled_date = $9, start_date = $10, end_date = $11,
                 linked_metric_code = $12, target_value = $13, target_comparison = $14, is_completed = $15,
                 completed_at = $16, is_active = $17, tags = $18, updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(&title)
        .bind(patch.description.or(current.description))
        .bind(patch.task_type.unwrap_or(current.task_type).as_str())
        .bind(patch.frequency.unwrap_or(current.frequency).as_str())
        .bind(patch.dimension_id.or(current.dimension_id))
        .bind(patch.milestone_id.or(current.milestone_id))
        .bind(patch.scheduled_date.or(current.scheduled_date))
        .bind(start_date)
        .bind(end_date)
        .bind(&linked_metric_code)
        .bind(target_value)
        .bind(target_comparison.map(|c| c.as_str()))
        .bind(is_completed)
        .bind(completed_at)
        .bind(patch.is_active.unwrap_or(current.is_active))
        .bind(patch.tags.unwrap_or(current.tags))
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    /// Soft delete.
    pub async fn deactivate(&self, user_id: Uuid, id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET is_active = FALSE, updated_at = now()
             WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a task done, advance (or start) its streak and record the linked
    /// metric value, all in one database transaction.
    pub async fn complete(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: CompleteTask,
    ) -> ServiceResult<Option<TaskCompletion>> {
        let completed_at = input.completed_at.unwrap_or_else(Utc::now);
        let mut tx = self.pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET is_completed = TRUE, completed_at = $3, updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(completed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(task) = task else {
            tx.rollback().await?;
            return Ok(None);
        };

        let streak = StreakService::record_task_success(
            &mut *tx,
            user_id,
            task.id,
            completed_at.date_naive(),
            task.task_type == TaskType::Habit,
        )
        .await?;

        let mut metric_recorded = false;
        if let (Some(code), Some(value)) = (task.linked_metric_code.as_deref(), input.metric_value) {
            let known: Option<String> =
                sqlx::query_scalar("SELECT code FROM metric_definitions WHERE code = $1 AND is_active")
                    .bind(code)
                    .fetch_optional(&mut *tx)
                    .await?;
            if known.is_some() {
                MetricService::record_value(&mut *tx, user_id, code, value, completed_at, TASK_COMPLETION_SOURCE)
                    .await?;
                metric_recorded = true;
            } else {
                warn!("Task {} links unknown metric {}; value not recorded", task.id, code);
            }
        }

        tx.commit().await?;
        info!("Completed task {} for user {}", task.id, user_id);

        Ok(Some(TaskCompletion {
            task_id: task.id,
            completed_at,
            current_streak: streak.as_ref().map_or(0, |s| s.current_streak_length),
            longest_streak: streak.as_ref().map_or(0, |s| s.longest_streak_length),
            metric_recorded,
        }))
    }

    /// Complete every active task whose linked metric meets its target over
    /// the window implied by the task's frequency. A task completes at most
    /// once per day; one task's failure is logged and skipped.
    pub async fn evaluate_metric_targets(&self, at: DateTime<Utc>) -> ServiceResult<TargetEvaluation> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks
             WHERE is_active AND linked_metric_code IS NOT NULL
               AND target_value IS NOT NULL AND target_comparison IS NOT NULL
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let metrics = MetricService::new(self.pool.clone());
        let mut run = TargetEvaluation {
            evaluated: tasks.len(),
            ..TargetEvaluation::default()
        };
        for task in &tasks {
            match self.evaluate_target(&metrics, task, at).await {
                Ok(true) => run.completed += 1,
                Ok(false) => run.skipped += 1,
                Err(e) => {
                    warn!("Evaluating task {} ({}) failed: {}", task.id, task.title, e);
                    run.failed += 1;
                }
            }
        }
        info!(
            "Task evaluation: {} evaluated, {} completed, {} skipped, {} failed",
            run.evaluated, run.completed, run.skipped, run.failed
        );
        Ok(run)
    }

    async fn evaluate_target(&self, metrics: &MetricService, task: &Task, at: DateTime<Utc>) -> ServiceResult<bool> {
        let Some((code, target, comparison)) = task.metric_target() else {
            warn!("Task {} has an unreadable metric target", task.id);
            return Ok(false);
        };
        if completed_on_same_day(task.completed_at, at) {
            debug!("Task {} already completed on {}", task.id, at.date_naive());
            return Ok(false);
        }

        let window = evaluation_window(task.frequency, at);
        let Some(aggregate) = metrics.aggregate(task.user_id, code, window).await? else {
            debug!("Task {}: no {} data between {} and {}", task.id, code, window.start, window.end);
            return Ok(false);
        };
        if !condition_met(aggregate.value, target, comparison) {
            debug!("Task {}: {} = {} does not meet {} {}", task.id, code, aggregate.value, comparison, target);
            return Ok(false);
        }

        let completion = CompleteTask {
            completed_at: Some(at),
            metric_value: None,
        };
        self.complete(task.user_id, task.id, completion).await?;
        info!(
            "Task {} auto-completed: {} = {} meets {} {}",
            task.id, code, aggregate.value, comparison, target
        );
        Ok(true)
    }
}

/// A metric target needs both a value and a comparison, and a linked metric.
fn check_target(
    linked_metric_code: Option<&str>,
    value: Option<Decimal>,
    comparison: Option<TargetComparison>,
) -> ServiceResult<()> {
    match (value, comparison) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(ServiceError::validation(
            "targetComparison",
            "targetComparison is required with targetValue",
        )),
        (None, Some(_)) => Err(ServiceError::validation(
            "targetValue",
            "targetValue is required with targetComparison",
        )),
        (Some(value), Some(_)) => {
            if linked_metric_code.map_or(true, |c| c.trim().is_empty()) {
                return Err(ServiceError::validation(
                    "linkedMetricCode",
                    "a metric target needs linkedMetricCode",
                ));
            }
            require_storable("targetValue", value)?;
            Ok(())
        }
    }
}

fn default_frequency(task_type: TaskType) -> Frequency {
    match task_type {
        TaskType::Habit => Frequency::Daily,
        TaskType::OneOff | TaskType::ScheduledEvent => Frequency::AdHoc,
    }
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ServiceResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(ServiceError::validation("endDate", "endDate must not be before startDate"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn habits_default_to_daily() {
        assert_eq!(default_frequency(TaskType::Habit), Frequency::Daily);
        assert_eq!(default_frequency(TaskType::OneOff), Frequency::AdHoc);
        assert_eq!(default_frequency(TaskType::ScheduledEvent), Frequency::AdHoc);
    }

    #[test]
    fn end_date_must_follow_start() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        assert!(check_dates(Some(d(1)), Some(d(1))).is_ok());
        assert!(check_dates(Some(d(2)), Some(d(1))).is_err());
        assert!(check_dates(None, Some(d(1))).is_ok());
    }

    #[test]
    fn metric_targets_come_complete_or_not_at_all() {
        let gte = Some(TargetComparison::GreaterOrEqual);
        assert!(check_target(None, None, None).is_ok());
        assert!(check_target(Some("steps"), Some(Decimal::from(8000)), gte).is_ok());

        let missing_comparison = check_target(Some("steps"), Some(Decimal::from(8000)), None).unwrap_err();
        assert!(matches!(missing_comparison, ServiceError::Validation { ref field, .. } if field == "targetComparison"));
        let missing_value = check_target(Some("steps"), None, gte).unwrap_err();
        assert!(matches!(missing_value, ServiceError::Validation { ref field, .. } if field == "targetValue"));
        let no_metric = check_target(None, Some(Decimal::ONE), gte).unwrap_err();
        assert!(matches!(no_metric, ServiceError::Validation { ref field, .. } if field == "linkedMetricCode"));
    }

    #[test]
    fn new_task_reads_metric_target() {
        let task: NewTask = serde_json::from_str(
            r#"{"title":"Walk","taskType":"habit","linkedMetricCode":"steps","targetValue":8000,"targetComparison":"gte"}"#,
        )
        .unwrap();
        assert_eq!(task.target_comparison, Some(TargetComparison::GreaterOrEqual));
        assert_eq!(task.target_value, Some(Decimal::from(8000)));
    }

    #[test]
    fn complete_task_body_is_optional() {
        let body: CompleteTask = serde_json::from_str("{}").unwrap();
        assert!(body.completed_at.is_none());
        let body: CompleteTask = serde_json::from_str(r#"{"metricValue": 5}"#).unwrap();
        assert_eq!(body.metric_value, Some(Decimal::from(5)));
    }
}
