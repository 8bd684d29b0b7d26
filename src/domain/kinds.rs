//! Enumerations stored as lowercase text columns and exposed as lowercase JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}'")]
pub struct KindParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = KindParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(KindParseError { kind: $label, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = KindParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum!(TaskType, "task type", {
    Habit => "habit",
    OneOff => "one_off",
    ScheduledEvent => "scheduled_event",
});

text_enum!(Frequency, "frequency", {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    AdHoc => "ad_hoc",
});

text_enum!(MilestoneStatus, "milestone status", {
    Active => "active",
    Completed => "completed",
    Abandoned => "abandoned",
});

text_enum!(AccountType, "account type", {
    Bank => "bank",
    Investment => "investment",
    Loan => "loan",
    Credit => "credit",
    Crypto => "crypto",
    Property => "property",
    Other => "other",
});

text_enum!(TransactionCategory, "transaction category", {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
    Investment => "investment",
    DebtPayment => "debt_payment",
});

text_enum!(AggregationType, "aggregation type", {
    Last => "last",
    Sum => "sum",
    Average => "average",
    Min => "min",
    Max => "max",
    Count => "count",
});

text_enum!(PeriodType, "period type", {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});

text_enum!(TargetComparison, "target comparison", {
    GreaterOrEqual => "gte",
    LessOrEqual => "lte",
    Equal => "eq",
});

text_enum!(MetricValueType, "metric value type", {
    Number => "number",
    Boolean => "boolean",
    Text => "string",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Habit".parse::<TaskType>().unwrap(), TaskType::Habit);
        assert_eq!("debt_payment".parse::<TransactionCategory>().unwrap(), TransactionCategory::DebtPayment);
        assert!("weekly-ish".parse::<Frequency>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TaskType::OneOff).unwrap(), "\"one_off\"");
        let parsed: AccountType = serde_json::from_str("\"crypto\"").unwrap();
        assert_eq!(parsed, AccountType::Crypto);
    }

    #[test]
    fn round_trips_through_text() {
        for kind in AggregationType::ALL {
            assert_eq!(AggregationType::try_from(kind.as_str().to_string()).unwrap(), *kind);
        }
    }
}
