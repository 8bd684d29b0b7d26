use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::rebalance::WeightEntry;

/// A life dimension. Dimensions are shared by all users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[sqlx(rename = "default_weight")]
    pub weight: Decimal,
    pub sort_order: i16,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dimension {
    pub fn weight_entry(&self) -> WeightEntry {
        WeightEntry {
            id: self.id,
            weight: self.weight,
            is_active: self.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rebalance::rebalance;
    use rust_decimal_macros::dec;

    fn dimension(code: &str, weight: Decimal, is_active: bool) -> Dimension {
        Dimension {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            icon: None,
            weight,
            sort_order: 0,
            is_active,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn locked_rows_feed_the_rebalancer() {
        let rows = [
            dimension("health", dec!(0.5), true),
            dimension("wealth", dec!(0.5), true),
            dimension("legacy", dec!(0.3), false),
        ];
        let entries: Vec<WeightEntry> = rows.iter().map(Dimension::weight_entry).collect();
        assert_eq!(entries[2].weight, dec!(0.3));
        assert!(!entries[2].is_active);

        let plan = rebalance(&entries, rows[0].id, dec!(0.8), true).unwrap();
        assert_eq!(plan.weight_of(rows[1].id), Some(dec!(0.2)));
        assert_eq!(plan.weight_of(rows[2].id), None);
    }
}
