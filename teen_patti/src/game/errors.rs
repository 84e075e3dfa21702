//! Card and hand error types.

use thiserror::Error;

/// Errors raised while building decks or ranking hands.
///
/// Any of these during a live round means the dealt cards are corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// Card code could not be parsed
    #[error("Invalid card code: {0:?}")]
    InvalidCode(String),

    /// Card value outside 2..=14
    #[error("Invalid card value: {0}")]
    InvalidValue(u8),

    /// Hand does not hold exactly three cards
    #[error("A hand holds 3 cards, got {0}")]
    WrongHandSize(usize),

    /// Deck ran out while dealing
    #[error("Deck exhausted: requested {requested}, remaining {remaining}")]
    DeckExhausted { requested: usize, remaining: usize },
}
