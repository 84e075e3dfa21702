//! # Teen Patti
//!
//! A real-time multiplayer Teen Patti room engine.
//!
//! Up to five players share a room. Each round they are dealt three cards,
//! pay a boot into the pot and take turns betting blind or seen until one
//! player is left, a show is called, or the pot reaches the table limit.
//!
//! ## Architecture
//!
//! Every room is an async actor that owns its state outright. Clients talk to
//! a room through a [`room::RoomHandle`]; the actor answers with a
//! [`room::RoomResponse`] and fans [`room::ServerEvent`]s out to every
//! connection in the room.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hand ranking and betting arithmetic
//! - [`room`]: Room actors, turn clocks, sideshows, reconnects and matchmaking
//! - [`bot`]: Filler bots for short-handed rooms
//! - [`ledger`]: Coin balances held by the identity service
//! - [`history`]: Append-only record of every coin movement
//! - [`db`]: PostgreSQL pool shared by the ledger and history sink
//!
//! ## Example
//!
//! ```
//! use teen_patti::game::{self, Winner};
//!
//! let deck = game::shuffled_deck();
//! let (first, rest) = game::deal(deck, 3).unwrap();
//! let (second, _) = game::deal(rest, 3).unwrap();
//!
//! let winner = game::compare(&first, &second).unwrap();
//! assert!(matches!(winner, Winner::First | Winner::Second));
//! ```

/// Filler bots.
pub mod bot;

/// Database connection pooling.
pub mod db;

/// Card logic and betting rules.
pub mod game;
pub use game::{Card, HandCategory, HandRank, Winner};

/// Game history sinks.
pub mod history;

/// Coin ledger.
pub mod ledger;

/// Room actors and matchmaking.
pub mod room;
pub use room::{RoomConfig, RoomHandle, RoomManager};
