use rand::{rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::errors::CardError;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Spade,
    Heart,
    Diamond,
    Club,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Diamond, Suit::Club];

    pub fn symbol(self) -> char {
        match self {
            Self::Spade => '♠',
            Self::Heart => '♥',
            Self::Diamond => '♦',
            Self::Club => '♣',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '♠' => Some(Self::Spade),
            '♥' => Some(Self::Heart),
            '♦' => Some(Self::Diamond),
            '♣' => Some(Self::Club),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// Lowest card value (a two).
pub const MIN_VALUE: Value = 2;

/// Highest card value. Aces only ever count high.
pub const ACE: Value = 14;

/// Number of cards in a hand.
pub const HAND_SIZE: usize = 3;

/// A card is a value (two=2u8 ... ace=14u8) and a suit.
///
/// On the wire a card is its code: the rank label followed by the suit
/// symbol, e.g. `"10♠"` or `"A♥"`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Card(pub Value, pub Suit);

impl Card {
    pub fn new(value: Value, suit: Suit) -> Result<Self, CardError> {
        if !(MIN_VALUE..=ACE).contains(&value) {
            return Err(CardError::InvalidValue(value));
        }
        Ok(Self(value, suit))
    }

    pub fn value(&self) -> Value {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }

    fn label(&self) -> String {
        match self.0 {
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            14 => "A".to_string(),
            v => v.to_string(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.label(), self.1)
    }
}

impl FromStr for Card {
    type Err = CardError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let invalid = || CardError::InvalidCode(code.to_string());
        let suit_char = code.chars().last().ok_or_else(invalid)?;
        let suit = Suit::from_symbol(suit_char).ok_or_else(invalid)?;
        let label = &code[..code.len() - suit_char.len_utf8()];
        let value = match label {
            "J" => 11,
            "Q" => 12,
            "K" => 13,
            "A" => 14,
            digits => digits.parse::<Value>().map_err(|_| invalid())?,
        };
        Card::new(value, suit).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Card {
    type Error = CardError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        code.parse()
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.to_string()
    }
}

/// Hand categories, weakest first. The discriminant is the category's
/// numeric rank.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum HandCategory {
    HighCard = 1,
    Pair = 2,
    Color = 3,
    Sequence = 4,
    PureSequence = 5,
    Trail = 6,
}

impl HandCategory {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::Pair => "pair",
            Self::Color => "color",
            Self::Sequence => "sequence",
            Self::PureSequence => "pure sequence",
            Self::Trail => "trail",
        };
        write!(f, "{repr}")
    }
}

/// Category plus tiebreak value. Field order gives the derived ordering:
/// category first, then tiebreak.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandRank {
    pub category: HandCategory,
    pub tiebreak: Value,
}

/// A fresh random permutation of the 52 cards on every call.
pub fn shuffled_deck() -> Vec<Card> {
    let mut cards: Vec<Card> = Suit::ALL
        .into_iter()
        .flat_map(|suit| (MIN_VALUE..=ACE).map(move |value| Card(value, suit)))
        .collect();
    cards.shuffle(&mut rng());
    cards
}

/// Splits `n` cards off the top of `deck`, returning them and the remainder.
pub fn deal(mut deck: Vec<Card>, n: usize) -> Result<(Vec<Card>, Vec<Card>), CardError> {
    if n > deck.len() {
        return Err(CardError::DeckExhausted {
            requested: n,
            remaining: deck.len(),
        });
    }
    let remainder = deck.split_off(n);
    Ok((deck, remainder))
}
