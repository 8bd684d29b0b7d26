use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::kinds::AggregationType;

/// One numeric observation inside an aggregation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Reduce `samples` with the definition's aggregation type.
///
/// `None` when there is nothing to aggregate.
pub fn aggregate(kind: AggregationType, samples: &[Sample]) -> Option<Decimal> {
    if samples.is_empty() {
        return None;
    }

    let values = samples.iter().map(|s| s.value);
    match kind {
        AggregationType::Last => samples
            .iter()
            .max_by_key(|s| s.recorded_at)
            .map(|s| s.value),
        AggregationType::Sum => Some(values.sum()),
        AggregationType::Average => {
            let total: Decimal = values.sum();
            Some(total / Decimal::from(samples.len()))
        }
        AggregationType::Min => values.min(),
        AggregationType::Max => values.max(),
        AggregationType::Count => Some(Decimal::from(samples.len())),
    }
}
