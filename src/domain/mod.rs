//! Pure domain logic: value objects and the algorithms the services wrap.
//!
//! Nothing in here touches the database, so everything is unit tested in place.

pub mod aggregation_window;
pub mod currency;
pub mod kinds;
pub mod metric_aggregation;
pub mod money;
pub mod net_worth;
pub mod rebalance;
pub mod scoring;
pub mod streak;
pub mod task_evaluation;

use thiserror::Error;

pub use aggregation_window::{AggregationWindow, WindowType};
pub use currency::Currency;
pub use kinds::*;
pub use money::{Money, MAX_STORED_AMOUNT};

/// Errors raised by value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Cannot combine {left} with {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("Cannot divide money by zero")]
    DivideByZero,

    #[error("Amount is out of range")]
    Overflow,

    #[error("Invalid aggregation window: {0}")]
    InvalidWindow(String),
}
