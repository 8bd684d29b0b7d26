//! One service per aggregate; each method is one use case.
//!
//! Lookups scoped to a user return `Ok(None)` / `Ok(false)` when nothing
//! matches so handlers can answer 404.

pub mod account_service;
pub mod api_key_service;
pub mod dimension_service;
pub mod fx_provider;
pub mod fx_service;
pub mod metric_service;
pub mod milestone_service;
pub mod net_worth_service;
pub mod score_service;
pub mod streak_service;
pub mod task_service;
pub mod transaction_service;
pub mod user_service;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::domain::{DomainError, KindParseError, MAX_STORED_AMOUNT};
use crate::error::ApiError;
use fx_provider::FxError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Kind(#[from] KindParseError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fx(#[from] FxError),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { field, message } => ApiError::field_error(field, message),
            ServiceError::Database(e) => e.into(),
            ServiceError::Domain(e) => e.into(),
            ServiceError::Kind(e) => e.into(),
            ServiceError::Auth(e) => e.into(),
            ServiceError::Fx(e) => e.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trimmed, non-empty, at most `max` characters.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(field, format!("{} is required", field)));
    }
    if trimmed.chars().count() > max {
        return Err(ServiceError::validation(
            field,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(trimmed.to_string())
}

/// Amounts written to a `NUMERIC(19,4)` column.
pub(crate) fn require_storable(field: &str, value: Decimal) -> ServiceResult<Decimal> {
    if value.abs() > MAX_STORED_AMOUNT {
        return Err(ServiceError::validation(field, format!("{} is too large", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn require_text_trims_and_bounds() {
        assert_eq!(require_text("title", "  Run  ", 10).unwrap(), "Run");
        assert!(matches!(require_text("title", "   ", 10), Err(ServiceError::Validation { .. })));
        assert!(require_text("title", &"x".repeat(256), 255).is_err());
        assert!(require_text("title", &"x".repeat(255), 255).is_ok());
    }

    #[test]
    fn require_storable_rejects_amounts_beyond_the_column() {
        assert_eq!(require_storable("amount", dec!(-12.5)).unwrap(), dec!(-12.5));
        assert!(require_storable("amount", MAX_STORED_AMOUNT).is_ok());
        let err = require_storable("initialBalance", dec!(79000000000000000000000000000)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "initialBalance"));
    }

    #[test]
    fn validation_maps_to_field_error() {
        let api: ApiError = ServiceError::validation("email", "email is required").into();
        assert_eq!(api.status_code(), 400);
        assert_eq!(api.to_json()["field_errors"]["email"], "email is required");
    }
}
