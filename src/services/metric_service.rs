use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{require_text, ServiceError, ServiceResult};
use crate::database::models::{MetricDefinition, MetricRecord};
use crate::database::DatabaseError;
use crate::domain::metric_aggregation::{aggregate, Sample};
use crate::domain::{AggregationType, AggregationWindow, MetricValueType};

pub const DEFAULT_SOURCE: &str = "manual";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMetricDefinition {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub dimension_id: Option<Uuid>,
    pub unit: Option<String>,
    pub value_type: Option<MetricValueType>,
    pub aggregation_type: Option<AggregationType>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub target_value: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinitionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub dimension_id: Option<Uuid>,
    pub unit: Option<String>,
    pub aggregation_type: Option<AggregationType>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub target_value: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// One value in a record batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEntry {
    pub code: String,
    pub value_number: Option<Decimal>,
    pub value_string: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Created,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResult {
    pub code: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<EntryResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAggregate {
    pub code: String,
    pub aggregation_type: AggregationType,
    pub window: AggregationWindow,
    pub value: Decimal,
    pub sample_count: usize,
}

pub struct MetricService {
    pool: PgPool,
}

impl MetricService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_definition(&self, input: NewMetricDefinition) -> ServiceResult<MetricDefinition> {
        let code = normalize_code(&input.code)?;
        let name = require_text("name", &input.name, 200)?;
        check_bounds(input.min_value, input.max_value)?;

        let definition = sqlx::query_as::<_, MetricDefinition>(
            "INSERT INTO metric_definitions (id, code, name, description, dimension_id, unit, value_type,
                                             aggregation_type, min_value, max_value, target_value)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&code)
        .bind(&name)
        .bind(&input.description)
        .bind(input.dimension_id)
        .bind(&input.unit)
        .bind(input.value_type.unwrap_or(MetricValueType::Number).as_str())
        .bind(input.aggregation_type.unwrap_or(AggregationType::Last).as_str())
        .bind(input.min_value)
        .bind(input.max_value)
        .bind(input.target_value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_unique_violation(e, "Metric code already exists"))?;

        info!("Created metric definition {}", definition.code);
        Ok(definition)
    }

    pub async fn list_definitions(
        &self,
        dimension_id: Option<Uuid>,
        active_only: bool,
    ) -> ServiceResult<Vec<MetricDefinition>> {
        let definitions = sqlx::query_as::<_, MetricDefinition>(
            "SELECT * FROM metric_definitions
             WHERE ($1::UUID IS NULL OR dimension_id = $1) AND (NOT $2 OR is_active)
             ORDER BY code",
        )
        .bind(dimension_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(definitions)
    }

    pub async fn get_definition(&self, code: &str) -> ServiceResult<Option<MetricDefinition>> {
        let definition = sqlx::query_as::<_, MetricDefinition>("SELECT * FROM metric_definitions WHERE code = $1")
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(definition)
    }

    pub async fn update_definition(
        &self,
        code: &str,
        patch: MetricDefinitionPatch,
    ) -> ServiceResult<Option<MetricDefinition>> {
        let Some(current) = self.get_definition(code).await? else {
            return Ok(None);
        };
        let name = match patch.name.as_deref() {
            Some(name) => require_text("name", name, 200)?,
            None => current.name,
        };
        let min_value = patch.min_value.or(current.min_value);
        let max_value = patch.max_value.or(current.max_value);
        check_bounds(min_value, max_value)?;

        let definition = sqlx::query_as::<_, MetricDefinition>(
            "UPDATE metric_definitions
             SET name = $2, description = $3, dimension_id = $4, unit = $5, aggregation_type = $6,
                 min_value = $7, max_value = $8, target_value = $9, is_active = $10, updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(current.id)
        .bind(&name)
        .bind(patch.description.or(current.description))
        .bind(patch.dimension_id.or(current.dimension_id))
        .bind(patch.unit.or(current.unit))
        .bind(patch.aggregation_type.unwrap_or(current.aggregation_type).as_str())
        .bind(min_value)
        .bind(max_value)
        .bind(patch.target_value.or(current.target_value))
        .bind(patch.is_active.unwrap_or(current.is_active))
        .fetch_optional(&self.pool)
        .await?;
        Ok(definition)
    }

    /// Validate every entry against the active definitions and insert the
    /// accepted ones in a single transaction.
    pub async fn record(&self, user_id: Uuid, entries: Vec<MetricEntry>) -> ServiceResult<RecordOutcome> {
        let definitions: HashMap<String, MetricDefinition> = self
            .list_definitions(None, true)
            .await?
            .into_iter()
            .map(|d| (d.code.clone(), d))
            .collect();

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut outcome = RecordOutcome {
            accepted: 0,
            rejected: 0,
            results: Vec::with_capacity(entries.len()),
        };

        for entry in entries {
            let code = entry.code.trim().to_string();
            let checked = match definitions.get(&code) {
                Some(definition) => check_entry(definition, &entry),
                None => Err("Unknown or inactive metric code".to_string()),
            };
            match checked {
                Ok(()) => {
                    let id = insert_record(&mut *tx, user_id, &code, &entry, now).await?;
                    outcome.accepted += 1;
                    outcome.results.push(EntryResult {
                        code,
                        status: EntryStatus::Created,
                        id: Some(id),
                        error: None,
                    });
                }
                Err(reason) => {
                    debug!("Rejected metric entry {}: {}", code, reason);
                    outcome.rejected += 1;
                    outcome.results.push(EntryResult {
                        code,
                        status: EntryStatus::Rejected,
                        id: None,
                        error: Some(reason),
                    });
                }
            }
        }

        tx.commit().await?;
        info!(
            "Recorded metrics for user {}: {} accepted, {} rejected",
            user_id, outcome.accepted, outcome.rejected
        );
        Ok(outcome)
    }

    /// Records for `code`, newest first, optionally bounded by `[from, to]`.
    pub async fn history(
        &self,
        user_id: Uuid,
        code: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> ServiceResult<Vec<MetricRecord>> {
        let records = sqlx::query_as::<_, MetricRecord>(
            "SELECT * FROM metric_records
             WHERE user_id = $1 AND metric_code = $2
               AND ($3::TIMESTAMPTZ IS NULL OR recorded_at >= $3)
               AND ($4::TIMESTAMPTZ IS NULL OR recorded_at <= $4)
             ORDER BY recorded_at DESC
             LIMIT $5",
        )
        .bind(user_id)
        .bind(code.trim())
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Aggregate a metric over `window` with its definition's aggregation
    /// type. `None` when the definition or any numeric record is missing.
    pub async fn aggregate(
        &self,
        user_id: Uuid,
        code: &str,
        window: AggregationWindow,
    ) -> ServiceResult<Option<MetricAggregate>> {
        if code.trim().is_empty() {
            return Err(ServiceError::validation("code", "metric code is required"));
        }
        let Some(definition) = self.get_definition(code).await? else {
            return Ok(None);
        };

        let rows: Vec<(Decimal, DateTime<Utc>)> = sqlx::query_as(
            "SELECT value_number, recorded_at FROM metric_records
             WHERE user_id = $1 AND metric_code = $2 AND value_number IS NOT NULL
               AND recorded_at >= $3 AND recorded_at <= $4",
        )
        .bind(user_id)
        .bind(&definition.code)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        let samples: Vec<Sample> = rows
            .into_iter()
            .map(|(value, recorded_at)| Sample { value, recorded_at })
            .collect();

        Ok(aggregate(definition.aggregation_type, &samples).map(|value| MetricAggregate {
            code: definition.code,
            aggregation_type: definition.aggregation_type,
            window,
            value,
            sample_count: samples.len(),
        }))
    }

    /// Insert a single record inside the caller's transaction.
    pub async fn record_value(
        conn: &mut PgConnection,
        user_id: Uuid,
        code: &str,
        value: Decimal,
        recorded_at: DateTime<Utc>,
        source: &str,
    ) -> ServiceResult<Uuid> {
        let entry = MetricEntry {
            code: code.to_string(),
            value_number: Some(value),
            value_string: None,
            recorded_at: Some(recorded_at),
            source: Some(source.to_string()),
            notes: None,
        };
        insert_record(conn, user_id, code, &entry, recorded_at).await
    }
}

async fn insert_record(
    conn: &mut PgConnection,
    user_id: Uuid,
    code: &str,
    entry: &MetricEntry,
    now: DateTime<Utc>,
) -> ServiceResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO metric_records (id, user_id, metric_code, value_number, value_string, recorded_at, source, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(user_id)
    .bind(code)
    .bind(entry.value_number)
    .bind(&entry.value_string)
    .bind(entry.recorded_at.unwrap_or(now))
    .bind(entry.source.as_deref().unwrap_or(DEFAULT_SOURCE))
    .bind(&entry.notes)
    .execute(conn)
    .await?;
    Ok(id)
}

fn normalize_code(raw: &str) -> ServiceResult<String> {
    let code = require_text("code", raw, 100)?;
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(ServiceError::validation(
            "code",
            "code may only contain letters, digits, '_' and '.'",
        ));
    }
    Ok(code)
}

fn check_bounds(min: Option<Decimal>, max: Option<Decimal>) -> ServiceResult<()> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ServiceError::validation(
            "minValue",
            "minValue must not exceed maxValue",
        )),
        _ => Ok(()),
    }
}

/// Per-entry checks against the definition; the error is reported back to
/// the caller, not raised.
fn check_entry(definition: &MetricDefinition, entry: &MetricEntry) -> Result<(), String> {
    match definition.value_type {
        MetricValueType::Number => {
            let Some(value) = entry.value_number else {
                return Err("A numeric value is required".to_string());
            };
            if let Some(min) = definition.min_value {
                if value < min {
                    return Err(format!("Value {} is below minimum {}", value, min));
                }
            }
            if let Some(max) = definition.max_value {
                if value > max {
                    return Err(format!("Value {} is above maximum {}", value, max));
                }
            }
            Ok(())
        }
        MetricValueType::Boolean => match entry.value_number {
            Some(v) if v.is_zero() || v == Decimal::ONE => Ok(()),
            Some(_) => Err("Boolean metrics take 0 or 1".to_string()),
            None => Err("A value of 0 or 1 is required".to_string()),
        },
        MetricValueType::Text => match entry.value_string.as_deref() {
            Some(s) if !s.trim().is_empty() => Ok(()),
            _ => Err("A text value is required".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn definition(value_type: MetricValueType) -> MetricDefinition {
        let now = Utc::now();
        MetricDefinition {
            id: Uuid::new_v4(),
            code: "weight_kg".to_string(),
            name: "Weight".to_string(),
            description: None,
            dimension_id: None,
            unit: Some("kg".to_string()),
            value_type,
            aggregation_type: AggregationType::Last,
            min_value: Some(dec!(30)),
            max_value: Some(dec!(250)),
            target_value: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(value_number: Option<Decimal>, value_string: Option<&str>) -> MetricEntry {
        MetricEntry {
            code: "weight_kg".to_string(),
            value_number,
            value_string: value_string.map(str::to_string),
            recorded_at: None,
            source: None,
            notes: None,
        }
    }

    #[test]
    fn number_entries_respect_bounds() {
        let d = definition(MetricValueType::Number);
        assert!(check_entry(&d, &entry(Some(dec!(80)), None)).is_ok());
        assert!(check_entry(&d, &entry(Some(dec!(30)), None)).is_ok());
        assert_eq!(
            check_entry(&d, &entry(Some(dec!(10)), None)).unwrap_err(),
            "Value 10 is below minimum 30"
        );
        assert!(check_entry(&d, &entry(Some(dec!(300)), None)).is_err());
        assert!(check_entry(&d, &entry(None, Some("80"))).is_err());
    }

    #[test]
    fn boolean_and_text_entries() {
        let b = definition(MetricValueType::Boolean);
        assert!(check_entry(&b, &entry(Some(dec!(1)), None)).is_ok());
        assert!(check_entry(&b, &entry(Some(dec!(0)), None)).is_ok());
        assert!(check_entry(&b, &entry(Some(dec!(2)), None)).is_err());

        let t = definition(MetricValueType::Text);
        assert!(check_entry(&t, &entry(None, Some("felt great"))).is_ok());
        assert!(check_entry(&t, &entry(None, Some("  "))).is_err());
    }

    #[test]
    fn codes_and_bounds_are_validated() {
        assert_eq!(normalize_code(" sleep_hours ").unwrap(), "sleep_hours");
        assert!(normalize_code("sleep hours").is_err());
        assert!(normalize_code("").is_err());
        assert!(check_bounds(Some(dec!(5)), Some(dec!(1))).is_err());
        assert!(check_bounds(Some(dec!(1)), None).is_ok());
    }

    #[test]
    fn entries_deserialize_from_camel_case() {
        let e: MetricEntry =
            serde_json::from_str(r#"{"code":"steps","valueNumber":8000,"source":"watch"}"#).unwrap();
        assert_eq!(e.code, "steps");
        assert_eq!(e.value_number, Some(dec!(8000)));
        assert_eq!(e.source.as_deref(), Some("watch"));
        assert!(e.recorded_at.is_none());
    }
}
