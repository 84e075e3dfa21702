//! Deadlines for database work on the room's critical path.
//!
//! Ledger calls run between a player's action and the broadcast that answers
//! it, so each one is bounded. The caller's error type decides what an
//! expired deadline looks like.

use std::{future::Future, time::Duration};

/// Budget for one statement
pub const STATEMENT_DEADLINE: Duration = Duration::from_secs(5);

/// Budget for a balance transaction, row lock included
pub const BALANCE_TX_DEADLINE: Duration = Duration::from_secs(10);

/// Error types that can report a missed deadline.
pub trait DeadlineError {
    fn deadline_exceeded(after: Duration) -> Self;
}

impl DeadlineError for sqlx::Error {
    fn deadline_exceeded(_after: Duration) -> Self {
        sqlx::Error::PoolTimedOut
    }
}

/// Run `work`, giving up after `after`.
///
/// `what` names the work in the log line written when the deadline passes.
pub async fn bounded<T, S, E, F>(what: &str, after: Duration, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, S>>,
    E: DeadlineError + From<S>,
{
    match tokio::time::timeout(after, work).await {
        Ok(result) => result.map_err(E::from),
        Err(_) => {
            log::warn!("{what} missed its {after:?} deadline");
            Err(E::deadline_exceeded(after))
        }
    }
}

/// [`bounded`] with the single-statement budget
pub async fn statement<T, S, E, F>(what: &str, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, S>>,
    E: DeadlineError + From<S>,
{
    bounded(what, STATEMENT_DEADLINE, work).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;

    #[tokio::test(start_paused = true)]
    async fn test_stalled_balance_read_becomes_ledger_timeout() {
        let stalled = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<i64, sqlx::Error>(1_000)
        };
        let result: Result<i64, LedgerError> = statement("balance read", stalled).await;
        assert!(matches!(result, Err(LedgerError::Timeout(d)) if d == STATEMENT_DEADLINE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transaction_budget_outlasts_statement_budget() {
        let slow_tx = async {
            tokio::time::sleep(STATEMENT_DEADLINE + Duration::from_secs(1)).await;
            Ok::<i64, LedgerError>(900)
        };
        let result: Result<i64, LedgerError> =
            bounded("balance adjustment", BALANCE_TX_DEADLINE, slow_tx).await;
        assert_eq!(result.unwrap(), 900);
    }

    #[tokio::test]
    async fn test_inner_ledger_error_passes_through() {
        let rejected = async {
            Err::<i64, LedgerError>(LedgerError::InsufficientBalance {
                available: 50,
                required: 100,
            })
        };
        let result: Result<i64, LedgerError> =
            bounded("balance adjustment", BALANCE_TX_DEADLINE, rejected).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { available: 50, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_deadline_maps_to_pool_timeout() {
        let hung = std::future::pending::<Result<(), sqlx::Error>>();
        let result: Result<(), sqlx::Error> = statement("health check", hung).await;
        assert!(matches!(result, Err(sqlx::Error::PoolTimedOut)));
    }
}
