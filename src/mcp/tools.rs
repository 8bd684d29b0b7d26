//! The tool catalogue and dispatch onto the services.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use super::{ToolResponse, API_KEY_ARGUMENT};
use crate::app::AppState;
use crate::domain::streak::StreakSort;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::account_service::AccountService;
use crate::services::dimension_service::DimensionService;
use crate::services::metric_service::{MetricEntry, MetricService};
use crate::services::milestone_service::{MilestoneFilter, MilestoneService};
use crate::services::score_service::ScoreService;
use crate::services::streak_service::StreakService;
use crate::services::task_service::{CompleteTask, TaskFilter, TaskService};
use crate::services::transaction_service::{NewTransaction, TransactionService};
use crate::services::user_service::UserService;

pub const AI_ASSISTANT_SOURCE: &str = "ai_assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ListDimensions,
    GetDimension,
    UpdateDimensionWeight,
    GetScores,
    ListStreaks,
    ListTasks,
    CompleteTask,
    RecordMetrics,
    ListAccounts,
    CreateTransaction,
    ListMilestones,
}

impl Tool {
    pub const ALL: [Tool; 11] = [
        Tool::ListDimensions,
        Tool::GetDimension,
        Tool::UpdateDimensionWeight,
        Tool::GetScores,
        Tool::ListStreaks,
        Tool::ListTasks,
        Tool::CompleteTask,
        Tool::RecordMetrics,
        Tool::ListAccounts,
        Tool::CreateTransaction,
        Tool::ListMilestones,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ListDimensions => "listDimensions",
            Tool::GetDimension => "getDimension",
            Tool::UpdateDimensionWeight => "updateDimensionWeight",
            Tool::GetScores => "getScores",
            Tool::ListStreaks => "listStreaks",
            Tool::ListTasks => "listTasks",
            Tool::CompleteTask => "completeTask",
            Tool::RecordMetrics => "recordMetrics",
            Tool::ListAccounts => "listAccounts",
            Tool::CreateTransaction => "createTransaction",
            Tool::ListMilestones => "listMilestones",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            Tool::ListDimensions => "List life dimensions with their weights",
            Tool::GetDimension => "Get one dimension with its milestones and active tasks",
            Tool::UpdateDimensionWeight => "Set a dimension's weight, rebalancing the others by default",
            Tool::GetScores => "Current life score and per-dimension scores",
            Tool::ListStreaks => "List streaks, active ones by default",
            Tool::ListTasks => "List tasks, active ones by default",
            Tool::CompleteTask => "Complete a task, advancing its streak and recording its linked metric",
            Tool::RecordMetrics => "Record one or more metric values",
            Tool::ListAccounts => "List financial accounts",
            Tool::CreateTransaction => "Create a financial transaction",
            Tool::ListMilestones => "List milestones",
        }
    }

    fn input_schema(self) -> Value {
        let properties = match self {
            Tool::ListDimensions | Tool::GetScores => json!({}),
            Tool::GetDimension => json!({ "id": { "type": "string", "format": "uuid" } }),
            Tool::UpdateDimensionWeight => json!({
                "id": { "type": "string", "format": "uuid" },
                "weight": { "type": "number", "minimum": 0, "maximum": 1 },
                "autoRebalance": { "type": "boolean", "default": true }
            }),
            Tool::ListStreaks => json!({
                "isActive": { "type": "boolean", "default": true },
                "sort": {
                    "type": "string",
                    "description": "currentStreakLength, longestStreakLength or lastSuccessDate; prefix '-' for descending"
                }
            }),
            Tool::ListTasks => json!({
                "taskType": { "type": "string", "enum": ["habit", "one_off", "scheduled_event"] },
                "dimensionId": { "type": "string", "format": "uuid" },
                "isActive": { "type": "boolean", "default": true }
            }),
            Tool::CompleteTask => json!({
                "taskId": { "type": "string", "format": "uuid" },
                "completedAt": { "type": "string", "format": "date-time" },
                "metricValue": { "type": "number" }
            }),
            Tool::RecordMetrics => json!({
                "source": { "type": "string", "default": AI_ASSISTANT_SOURCE },
                "timestamp": { "type": "string", "format": "date-time" },
                "entries": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "code": { "type": "string" },
                            "valueNumber": { "type": "number" },
                            "valueBoolean": { "type": "boolean" },
                            "valueString": { "type": "string" },
                            "notes": { "type": "string" }
                        },
                        "required": ["code"]
                    }
                },
                "metrics": { "type": "object", "additionalProperties": true }
            }),
            Tool::ListAccounts => json!({ "includeInactive": { "type": "boolean", "default": false } }),
            Tool::CreateTransaction => json!({
                "sourceAccountId": { "type": "string", "format": "uuid" },
                "targetAccountId": { "type": "string", "format": "uuid" },
                "currency": { "type": "string" },
                "amount": { "type": "number", "exclusiveMinimum": 0 },
                "category": { "type": "string", "enum": ["income", "expense", "transfer", "investment", "debt_payment"] },
                "subcategory": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "description": { "type": "string" },
                "notes": { "type": "string" },
                "transactionDate": { "type": "string", "format": "date" }
            }),
            Tool::ListMilestones => json!({
                "status": { "type": "string", "enum": ["active", "completed", "abandoned"] },
                "dimensionId": { "type": "string", "format": "uuid" }
            }),
        };
        let required: &[&str] = match self {
            Tool::GetDimension => &["id"],
            Tool::UpdateDimensionWeight => &["id", "weight"],
            Tool::CompleteTask => &["taskId"],
            Tool::CreateTransaction => &["currency", "amount", "category"],
            _ => &[],
        };
        json!({ "type": "object", "properties": properties, "required": required })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn specs() -> Vec<ToolSpec> {
    Tool::ALL
        .into_iter()
        .map(|tool| ToolSpec {
            name: tool.name(),
            description: tool.description(),
            input_schema: tool.input_schema(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct IdArgs {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeightArgs {
    id: Uuid,
    weight: Decimal,
    auto_rebalance: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreakArgs {
    is_active: Option<bool>,
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteTaskArgs {
    task_id: Uuid,
    completed_at: Option<DateTime<Utc>>,
    metric_value: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountArgs {
    include_inactive: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordMetricsArgs {
    source: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: Vec<ToolMetricEntry>,
    /// Older clients send `{ "code": value }`.
    #[serde(default)]
    metrics: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolMetricEntry {
    code: String,
    value_number: Option<Decimal>,
    value_boolean: Option<bool>,
    value_string: Option<String>,
    notes: Option<String>,
}

/// Run one tool for `user`. Every failure becomes `success: false`.
pub async fn call(state: &AppState, user: &AuthUser, name: &str, arguments: Value) -> ToolResponse {
    let Some(tool) = Tool::parse(name) else {
        return ToolResponse::fail(format!("Unknown tool: {}", name));
    };
    match dispatch(state, user, tool, arguments).await {
        Ok(response) => response,
        Err(e) => {
            if e.status_code() >= 500 {
                warn!("MCP tool {} failed for user {}: {}", tool.name(), user.user_id, e);
            }
            ToolResponse::fail(e.message())
        }
    }
}

async fn dispatch(state: &AppState, user: &AuthUser, tool: Tool, arguments: Value) -> Result<ToolResponse, ApiError> {
    let pool = state.pool.clone();
    let user_id = user.user_id;

    let response = match tool {
        Tool::ListDimensions => ToolResponse::ok(DimensionService::new(pool).list().await?),
        Tool::GetDimension => {
            let args: IdArgs = parse_args(tool, arguments)?;
            found(DimensionService::new(pool).detail(user_id, args.id).await?, "Dimension")
        }
        Tool::UpdateDimensionWeight => {
            let args: WeightArgs = parse_args(tool, arguments)?;
            let service = DimensionService::new(pool);
            match service
                .update_weight(args.id, args.weight, args.auto_rebalance.unwrap_or(true))
                .await?
            {
                Some(_) => found(service.detail(user_id, args.id).await?, "Dimension"),
                None => ToolResponse::fail("Dimension not found"),
            }
        }
        Tool::GetScores => {
            let scores = ScoreService::new(pool, state.score_calculator.clone()).scores(user_id).await?;
            ToolResponse::ok(scores)
        }
        Tool::ListStreaks => {
            let args: StreakArgs = parse_args(tool, arguments)?;
            let streaks = StreakService::new(pool)
                .list(user_id, args.is_active.unwrap_or(true), StreakSort::parse(args.sort.as_deref()))
                .await?;
            ToolResponse::ok(streaks)
        }
        Tool::ListTasks => {
            let filter: TaskFilter = parse_args(tool, arguments)?;
            ToolResponse::ok(TaskService::new(pool).list(user_id, &filter).await?)
        }
        Tool::CompleteTask => {
            let args: CompleteTaskArgs = parse_args(tool, arguments)?;
            let input = CompleteTask {
                completed_at: args.completed_at,
                metric_value: args.metric_value,
            };
            found(TaskService::new(pool).complete(user_id, args.task_id, input).await?, "Task")
        }
        Tool::RecordMetrics => {
            let args: RecordMetricsArgs = parse_args(tool, arguments)?;
            let entries = metric_entries(args)?;
            ToolResponse::ok(MetricService::new(pool).record(user_id, entries).await?)
        }
        Tool::ListAccounts => {
            let args: AccountArgs = parse_args(tool, arguments)?;
            let accounts = AccountService::new(pool)
                .list(user_id, args.include_inactive.unwrap_or(false))
                .await?;
            ToolResponse::ok(accounts)
        }
        Tool::CreateTransaction => {
            let mut input: NewTransaction = parse_args(tool, arguments)?;
            input.source.get_or_insert_with(|| AI_ASSISTANT_SOURCE.to_string());
            let home = UserService::new(pool.clone()).home_currency(user_id).await?;
            ToolResponse::ok(TransactionService::new(pool).create(user_id, home, input).await?)
        }
        Tool::ListMilestones => {
            let filter: MilestoneFilter = parse_args(tool, arguments)?;
            ToolResponse::ok(MilestoneService::new(pool).list(user_id, &filter).await?)
        }
    };
    Ok(response)
}

fn found<T: Serialize>(value: Option<T>, what: &str) -> ToolResponse {
    match value {
        Some(value) => ToolResponse::ok(value),
        None => ToolResponse::fail(format!("{} not found", what)),
    }
}

/// Deserialize tool arguments, ignoring the `apiKey` credential. Missing
/// arguments read as an empty object.
fn parse_args<T: DeserializeOwned>(tool: Tool, arguments: Value) -> Result<T, ApiError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        Value::Object(mut map) => {
            map.remove(API_KEY_ARGUMENT);
            Value::Object(map)
        }
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| ApiError::bad_request(format!("Invalid arguments for {}: {}", tool.name(), e)))
}

/// Flatten both argument styles into service entries. Null values are
/// skipped; booleans are stored as 0/1.
fn metric_entries(args: RecordMetricsArgs) -> Result<Vec<MetricEntry>, ApiError> {
    let source = args.source.unwrap_or_else(|| AI_ASSISTANT_SOURCE.to_string());
    let mut entries = Vec::with_capacity(args.entries.len() + args.metrics.len());

    for entry in args.entries {
        let value_number = entry.value_number.or(entry.value_boolean.map(bool_value));
        if value_number.is_none() && entry.value_string.is_none() {
            continue;
        }
        entries.push(MetricEntry {
            code: entry.code,
            value_number,
            value_string: entry.value_string,
            recorded_at: args.timestamp,
            source: Some(source.clone()),
            notes: entry.notes,
        });
    }

    for (code, value) in args.metrics {
        let (value_number, value_string) = match value {
            Value::Null => continue,
            Value::Bool(b) => (Some(bool_value(b)), None),
            Value::Number(n) => (Some(json_decimal(&n, &code)?), None),
            Value::String(s) => (None, Some(s)),
            _ => {
                return Err(ApiError::bad_request(format!(
                    "metrics.{} must be a number, boolean or string",
                    code
                )))
            }
        };
        entries.push(MetricEntry {
            code,
            value_number,
            value_string,
            recorded_at: args.timestamp,
            source: Some(source.clone()),
            notes: None,
        });
    }

    if entries.is_empty() {
        return Err(ApiError::bad_request("No metric values supplied"));
    }
    Ok(entries)
}

fn bool_value(b: bool) -> Decimal {
    if b {
        Decimal::ONE
    } else {
        Decimal::ZERO
    }
}

fn json_decimal(n: &serde_json::Number, code: &str) -> Result<Decimal, ApiError> {
    let text = n.to_string();
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ApiError::bad_request(format!("metrics.{} is not a representable number", code)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn every_tool_round_trips_its_name() {
        for tool in Tool::ALL {
            assert_eq!(Tool::parse(tool.name()), Some(tool));
        }
        assert_eq!(Tool::parse("dropTables"), None);
        assert_eq!(specs().len(), 11);
    }

    #[test]
    fn schemas_list_required_arguments() {
        let schema = Tool::UpdateDimensionWeight.input_schema();
        assert_eq!(schema["required"], json!(["id", "weight"]));
        assert_eq!(Tool::ListDimensions.input_schema()["required"], json!([]));
    }

    #[test]
    fn missing_arguments_read_as_empty() {
        let args: StreakArgs = parse_args(Tool::ListStreaks, Value::Null).unwrap();
        assert!(args.is_active.is_none());
        let filter: TaskFilter = parse_args(Tool::ListTasks, json!({ "apiKey": "lifeos_x_y" })).unwrap();
        assert!(filter.task_type.is_none());
    }

    #[test]
    fn bad_arguments_are_client_errors() {
        let err = parse_args::<IdArgs>(Tool::GetDimension, json!({ "id": "not-a-uuid" })).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().starts_with("Invalid arguments for getDimension"));

        let err = parse_args::<IdArgs>(Tool::GetDimension, json!([1, 2])).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn metric_entries_merge_both_styles() {
        let args: RecordMetricsArgs = parse_args(
            Tool::RecordMetrics,
            json!({
                "timestamp": "2024-05-01T07:00:00Z",
                "entries": [
                    { "code": "sleep.hours", "valueNumber": 7.5 },
                    { "code": "meditated", "valueBoolean": true },
                    { "code": "mood.note", "valueString": "calm", "notes": "after run" },
                    { "code": "skipped" }
                ],
                "metrics": { "weight.kg": 81.2, "journaled": false, "nothing": null }
            }),
        )
        .unwrap();
        let entries = metric_entries(args).unwrap();

        let codes: Vec<&str> = entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, ["sleep.hours", "meditated", "mood.note", "journaled", "weight.kg"]);
        assert_eq!(entries[0].value_number, Some(dec!(7.5)));
        assert_eq!(entries[1].value_number, Some(Decimal::ONE));
        assert_eq!(entries[2].value_string.as_deref(), Some("calm"));
        assert_eq!(entries[3].value_number, Some(Decimal::ZERO));
        assert_eq!(entries[4].value_number, Some(dec!(81.2)));
        assert!(entries.iter().all(|e| e.source.as_deref() == Some(AI_ASSISTANT_SOURCE)));
        assert!(entries.iter().all(|e| e.recorded_at.is_some()));
    }

    #[test]
    fn metric_entries_reject_empty_and_nested_values() {
        assert!(metric_entries(RecordMetricsArgs::default()).is_err());

        let mut args = RecordMetricsArgs::default();
        args.metrics.insert("steps".to_string(), json!({ "value": 1 }));
        assert_eq!(metric_entries(args).unwrap_err().status_code(), 400);
    }

    #[test]
    fn custom_source_is_kept() {
        let args: RecordMetricsArgs =
            parse_args(Tool::RecordMetrics, json!({ "source": "watch", "metrics": { "steps": 9000 } })).unwrap();
        let entries = metric_entries(args).unwrap();
        assert_eq!(entries[0].source.as_deref(), Some("watch"));
        assert_eq!(entries[0].value_number, Some(dec!(9000)));
    }
}
