//! Ledger error types.

use crate::{db::DeadlineError, room::UserId};
use std::time::Duration;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Debit would take the balance below zero
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// No account for the user
    #[error("Account not found for user {0}")]
    AccountNotFound(UserId),

    /// The ledger did not answer in time
    #[error("Ledger timed out after {0:?}")]
    Timeout(Duration),

    /// Zero-sized adjustment
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

impl LedgerError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::Timeout(_) => {
                "Internal server error".to_string()
            }
            LedgerError::AccountNotFound(_) => "Account not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl DeadlineError for LedgerError {
    fn deadline_exceeded(after: Duration) -> Self {
        LedgerError::Timeout(after)
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
