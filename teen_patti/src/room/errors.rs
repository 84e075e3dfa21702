//! Room error types.

use super::store::StoreError;
use crate::{game::CardError, ledger::LedgerError};
use thiserror::Error;

/// Errors surfaced by room operations.
///
/// Only [`RoomError::is_fatal`] errors stop the room; everything else is
/// reported to the acting connection and the room carries on.
#[derive(Debug, Error)]
pub enum RoomError {
    /// Illegal for the current phase, turn or stake
    #[error("{0}")]
    Validation(String),

    /// Room or seat vanished
    #[error(transparent)]
    NotFound(StoreError),

    /// Not enough coins for the requested stake
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Ledger failure other than an overdraft
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    /// Corrupt cards in play
    #[error("Card error: {0}")]
    Card(#[from] CardError),

    /// The store can no longer serve the room
    #[error("Fatal room error: {0}")]
    Fatal(String),
}

impl RoomError {
    pub fn validation(message: impl Into<String>) -> Self {
        RoomError::Validation(message.into())
    }

    /// Whether the room must close every connection and stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, RoomError::Fatal(_))
    }

    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            RoomError::Validation(message) => message.clone(),
            RoomError::NotFound(StoreError::SeatNotFound(_)) => {
                "You are not seated in this room".to_string()
            }
            RoomError::NotFound(_) => "Room not found".to_string(),
            RoomError::InsufficientBalance { .. } => self.to_string(),
            RoomError::Ledger(e) => e.client_message(),
            RoomError::Card(_) | RoomError::Fatal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StoreError> for RoomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => RoomError::Fatal(err.to_string()),
            other => RoomError::NotFound(other),
        }
    }
}

impl From<LedgerError> for RoomError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                available,
                required,
            } => RoomError::InsufficientBalance {
                available,
                required,
            },
            other => RoomError::Ledger(other),
        }
    }
}

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;
