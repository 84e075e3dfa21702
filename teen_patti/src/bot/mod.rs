//! Filler bots for short-handed rooms.
//!
//! When a room has one or two real players, bot seats are added so a round
//! can start: two bots for one player, one bot for two. Bots are retired at
//! every restart and re-added as needed.
//!
//! A bot's turn is driven by a weighted random policy over its hand category:
//! weak hands lean towards packing, strong hands towards betting and double
//! betting. The room actor delays every bot action by a random thinking time.

pub mod decision;
pub mod manager;

pub use decision::{BotDecision, BotDecisionConfig, BotDecisionContext, BotDecisionMaker};
pub use manager::BotManager;
