//! Coin balances owned by the external identity service.
//!
//! The room engine never stores balances itself. It reads and adjusts them
//! through the [`Ledger`] trait, one atomic call at a time:
//! - [`MemoryLedger`] keeps balances in process (tests, single-node demos)
//! - [`PgLedger`] adjusts the `users.coins` column inside a row-locking transaction
//!
//! ## Example
//!
//! ```
//! use teen_patti::ledger::{Ledger, MemoryLedger};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ledger = MemoryLedger::new(10_000);
//! let balance = ledger.adjust_balance(7, -100).await.unwrap();
//! assert_eq!(balance, 9_900);
//! # }
//! ```

pub mod errors;
pub mod manager;

pub use errors::{LedgerError, LedgerResult};
pub use manager::{Ledger, MemoryLedger, PgLedger};
