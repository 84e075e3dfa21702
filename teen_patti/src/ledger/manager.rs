//! Ledger implementations.

use super::errors::{LedgerError, LedgerResult};
use crate::{
    db::{BALANCE_TX_DEADLINE, bounded, statement},
    room::UserId,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::RwLock;

/// Balance operations consumed by room actors.
///
/// Every call is atomic on its own. A debit that would leave a negative
/// balance fails with [`LedgerError::InsufficientBalance`] and changes nothing.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance of a user
    async fn get_balance(&self, user_id: UserId) -> LedgerResult<i64>;

    /// Apply `delta` (negative to debit) and return the new balance
    async fn adjust_balance(&self, user_id: UserId, delta: i64) -> LedgerResult<i64>;

    /// Whether the account is a synthetic bot account
    async fn is_bot(&self, user_id: UserId) -> LedgerResult<bool>;
}

#[derive(Debug, Clone, Copy)]
struct Account {
    balance: i64,
    is_bot: bool,
}

/// In-process ledger. Unknown users are opened with the default balance on
/// first touch, mirroring accounts provisioned by the identity service.
#[derive(Debug)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<UserId, Account>>,
    default_balance: i64,
}

impl MemoryLedger {
    /// Create a ledger that opens new accounts with `default_balance`
    pub fn new(default_balance: i64) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            default_balance,
        }
    }

    /// Set a user's balance outright, opening the account if needed
    pub async fn set_balance(&self, user_id: UserId, balance: i64) {
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(user_id)
            .and_modify(|account| account.balance = balance)
            .or_insert(Account {
                balance,
                is_bot: false,
            });
    }

    /// Flag an account as a bot account
    pub async fn mark_bot(&self, user_id: UserId) {
        let mut accounts = self.accounts.write().await;
        let default_balance = self.default_balance;
        accounts
            .entry(user_id)
            .or_insert(Account {
                balance: default_balance,
                is_bot: false,
            })
            .is_bot = true;
    }

    /// Sum of every balance, used to check coin conservation
    pub async fn total(&self) -> i64 {
        self.accounts.read().await.values().map(|a| a.balance).sum()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_balance(&self, user_id: UserId) -> LedgerResult<i64> {
        if let Some(account) = self.accounts.read().await.get(&user_id) {
            return Ok(account.balance);
        }
        let mut accounts = self.accounts.write().await;
        let account = accounts.entry(user_id).or_insert(Account {
            balance: self.default_balance,
            is_bot: false,
        });
        Ok(account.balance)
    }

    async fn adjust_balance(&self, user_id: UserId, delta: i64) -> LedgerResult<i64> {
        if delta == 0 {
            return Err(LedgerError::InvalidAmount(delta));
        }

        let mut accounts = self.accounts.write().await;
        let account = accounts.entry(user_id).or_insert(Account {
            balance: self.default_balance,
            is_bot: false,
        });

        let new_balance = account.balance + delta;
        if new_balance < 0 {
            return Err(LedgerError::InsufficientBalance {
                available: account.balance,
                required: -delta,
            });
        }

        account.balance = new_balance;
        Ok(new_balance)
    }

    async fn is_bot(&self, user_id: UserId) -> LedgerResult<bool> {
        Ok(self
            .accounts
            .read()
            .await
            .get(&user_id)
            .is_some_and(|account| account.is_bot))
    }
}

/// PostgreSQL ledger over the identity service's `users` table
/// (`id BIGINT`, `coins BIGINT`, `is_bot BOOLEAN`).
#[derive(Clone)]
pub struct PgLedger {
    pool: Arc<PgPool>,
}

impl PgLedger {
    /// Create a new ledger
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn get_balance(&self, user_id: UserId) -> LedgerResult<i64> {
        let row = read(
            "balance read",
            sqlx::query("SELECT coins FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(user_id))?;

        Ok(row.get("coins"))
    }

    async fn adjust_balance(&self, user_id: UserId, delta: i64) -> LedgerResult<i64> {
        if delta == 0 {
            return Err(LedgerError::InvalidAmount(delta));
        }

        bounded(
            "balance adjustment",
            BALANCE_TX_DEADLINE,
            self.adjust_in_tx(user_id, delta),
        )
        .await
    }

    async fn is_bot(&self, user_id: UserId) -> LedgerResult<bool> {
        let row = read(
            "bot flag read",
            sqlx::query("SELECT is_bot FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(user_id))?;

        Ok(row.get("is_bot"))
    }
}

impl PgLedger {
    async fn adjust_in_tx(&self, user_id: UserId, delta: i64) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;

        // Row lock so concurrent debits from other rooms serialize here
        let row = sqlx::query("SELECT coins FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::AccountNotFound(user_id))?;

        let available: i64 = row.get("coins");
        if available + delta < 0 {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: -delta,
            });
        }

        let row = sqlx::query("UPDATE users SET coins = coins + $1 WHERE id = $2 RETURNING coins")
            .bind(delta)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.get("coins"))
    }
}

/// One bounded statement, failing as a ledger error
async fn read<T>(
    what: &str,
    work: impl Future<Output = Result<T, sqlx::Error>>,
) -> LedgerResult<T> {
    statement(what, work).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_gets_default_balance() {
        let ledger = MemoryLedger::new(10_000);
        assert_eq!(ledger.get_balance(1).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn test_debit_and_credit() {
        let ledger = MemoryLedger::new(1_000);
        assert_eq!(ledger.adjust_balance(1, -100).await.unwrap(), 900);
        assert_eq!(ledger.adjust_balance(1, 250).await.unwrap(), 1_150);
    }

    #[tokio::test]
    async fn test_overdraft_is_rejected_without_change() {
        let ledger = MemoryLedger::new(0);
        ledger.set_balance(1, 50).await;

        let err = ledger.adjust_balance(1, -100).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                available: 50,
                required: 100
            }
        ));
        assert_eq!(ledger.get_balance(1).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_zero_adjustment_is_invalid() {
        let ledger = MemoryLedger::default();
        assert!(matches!(
            ledger.adjust_balance(1, 0).await,
            Err(LedgerError::InvalidAmount(0))
        ));
    }

    #[tokio::test]
    async fn test_bot_flag() {
        let ledger = MemoryLedger::default();
        assert!(!ledger.is_bot(5).await.unwrap());
        ledger.mark_bot(5).await;
        assert!(ledger.is_bot(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let ledger = Arc::new(MemoryLedger::new(0));
        ledger.set_balance(1, 1_000).await;

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(
                async move { ledger.adjust_balance(1, -100).await },
            ));
        }

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(ledger.get_balance(1).await.unwrap(), 0);
    }

    #[test]
    fn test_client_message_hides_ids() {
        let err = LedgerError::AccountNotFound(42);
        assert!(!err.client_message().contains("42"));
    }
}
