//! PostgreSQL connection pooling.
//!
//! The room engine touches the database in two places only: the
//! [`PgLedger`](crate::ledger::PgLedger) balance adjustments and the
//! [`PgEventSink`](crate::history::PgEventSink) game history writer. Both
//! share the pool built here.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

pub mod config;
pub mod deadline;

pub use config::DatabaseConfig;
pub use deadline::{BALANCE_TX_DEADLINE, DeadlineError, STATEMENT_DEADLINE, bounded, statement};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use teen_patti::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::development()).await?;
    ///     db.health_check().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to database (pool {}..{})",
            config.min_connections,
            config.max_connections
        );
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Shared handle to the pool, as taken by the ledger and history sink
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        statement("health check", sqlx::query("SELECT 1").execute(self.pool.as_ref()))
            .await
            .map(|_| ())
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_database_fails_to_connect() {
        let config = DatabaseConfig {
            database_url: "postgres://nobody@127.0.0.1:1/missing".to_string(),
            max_connections: 1,
            min_connections: 0,
            connection_timeout_secs: 1,
            ..DatabaseConfig::development()
        };

        assert!(Database::new(&config).await.is_err());
    }
}
