//! Real-time Teen Patti rooms.
//!
//! This module implements:
//! - RoomActor: async actor owning one room, its round and its clocks
//! - RoomManager: spawns rooms, matchmaking and private room codes
//! - Gateway: per-room fan-out of server events to live connections
//! - RoomStore: the single-writer record of a room and its seats
//!
//! ## Architecture
//!
//! Each room runs in its own Tokio task. Client actions, transport
//! disconnects and elapsed timers all arrive as messages on the actor's
//! channels and are applied strictly one at a time. After every accepted
//! transition the actor broadcasts a fresh per-viewer snapshot.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use teen_patti::history::LogEventSink;
//! use teen_patti::ledger::MemoryLedger;
//! use teen_patti::room::{RoomConfig, RoomManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = RoomManager::new(
//!         RoomConfig::default(),
//!         Arc::new(MemoryLedger::default()),
//!         Arc::new(LogEventSink),
//!     );
//!
//!     let room = manager.find_or_create_public().await;
//!     // room.join(identity, connection_id, outbound).await;
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod manager;
pub mod messages;
pub mod models;
pub mod reconnect;
pub mod sideshow;
pub mod store;
pub mod timer;

pub use actor::{RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use errors::{RoomError, RoomResult};
pub use events::{Outbound, PlayerView, RoomSummary, ServerEvent, Snapshot};
pub use gateway::ConnectionId;
pub use manager::RoomManager;
pub use messages::{ClientAction, Identity, RoomMessage, RoomResponse};
pub use models::{Phase, Room, RoomId, Seat, UserId};
pub use store::StoreError;
