//! Teen Patti card logic.
//!
//! Everything here is pure:
//! - Deck construction, shuffling and dealing
//! - Ranking and comparing 3-card hands
//! - Stake arithmetic for blind and seen players

pub mod betting;
pub mod entities;
pub mod errors;
pub mod functional;

pub use betting::{PrevBet, double_bet, min_bet, show_stake, table_limit};
pub use entities::{ACE, Card, HAND_SIZE, HandCategory, HandRank, Suit, deal, shuffled_deck};
pub use errors::CardError;
pub use functional::{Winner, argmax, compare, rank};
