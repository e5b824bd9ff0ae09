//! Error types for the gateway and ledger.
//!
//! The split matters: provider-level failures of financial operations
//! are *data* (failed-status results), never errors. The enums here
//! cover everything that is genuinely thrown: caller bugs, config
//! problems, capability gaps, and storage conflicts.

use crate::domain::{AccountId, Currency};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors thrown by gateway operations.
///
/// Reserved for programmer and configuration errors; a provider
/// rejecting a payment is not an error here but a `Failed` result.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed caller input, detected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The adapter is misconfigured (bad base URL, missing credentials).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider has no primitive for this operation.
    #[error("{provider} does not support {operation}: {reason}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
        reason: &'static str,
    },

    /// Provider failure on an operation with no failed-status result
    /// shape (tokenization, directory lookups).
    #[error("Provider error {code}: {message}")]
    Provider { code: String, message: String },
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        GatewayError::Validation(err.to_string())
    }
}

/// Errors thrown by the ledger repository.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A concurrent writer updated the row since it was read. Expected
    /// and retryable: re-read the row and try again.
    #[error("Optimistic lock conflict on {entity} {id}")]
    OptimisticLock { entity: &'static str, id: String },

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl LedgerError {
    pub fn optimistic_lock(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::OptimisticLock {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OptimisticLock { .. })
    }

    pub fn account_conflict(id: AccountId) -> Self {
        Self::Conflict(format!("Account already exists: {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_lock_is_retryable() {
        let err = LedgerError::optimistic_lock("account", "abc");
        assert!(err.is_retryable());
        assert!(!LedgerError::NotFound.is_retryable());
    }

    #[test]
    fn test_domain_error_becomes_validation() {
        let err: GatewayError = DomainError::NegativeAmount.into();
        assert!(matches!(err, GatewayError::Validation(_)));
    }
}
