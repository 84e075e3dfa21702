//! Pure hand ranking and comparison.

use super::{
    entities::{Card, HAND_SIZE, HandCategory, HandRank, Value},
    errors::CardError,
};

/// Which side of a comparison takes the pot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Winner {
    First,
    Second,
}

/// Rank a 3-card hand.
///
/// Aces count high only, so A-2-3 is not a sequence while Q-K-A is. Pairs
/// break ties on the paired value, every other category on the highest card.
pub fn rank(hand: &[Card]) -> Result<HandRank, CardError> {
    if hand.len() != HAND_SIZE {
        return Err(CardError::WrongHandSize(hand.len()));
    }

    let mut values: Vec<Value> = hand.iter().map(Card::value).collect();
    values.sort_unstable();
    let (low, mid, high) = (values[0], values[1], values[2]);

    let is_color = hand.iter().all(|card| card.suit() == hand[0].suit());
    let is_sequence = mid == low + 1 && high == mid + 1;

    let rank = if low == high {
        HandRank {
            category: HandCategory::Trail,
            tiebreak: high,
        }
    } else if is_sequence && is_color {
        HandRank {
            category: HandCategory::PureSequence,
            tiebreak: high,
        }
    } else if is_sequence {
        HandRank {
            category: HandCategory::Sequence,
            tiebreak: high,
        }
    } else if is_color {
        HandRank {
            category: HandCategory::Color,
            tiebreak: high,
        }
    } else if low == mid || mid == high {
        // The middle card is always part of the pair.
        HandRank {
            category: HandCategory::Pair,
            tiebreak: mid,
        }
    } else {
        HandRank {
            category: HandCategory::HighCard,
            tiebreak: high,
        }
    };

    Ok(rank)
}

/// Compare two hands. An exact tie goes to the first hand.
pub fn compare(first: &[Card], second: &[Card]) -> Result<Winner, CardError> {
    if rank(second)? > rank(first)? {
        Ok(Winner::Second)
    } else {
        Ok(Winner::First)
    }
}

/// Index of the winning hand, folding pairwise with a running winner.
///
/// Returns `None` for an empty slice. Ties keep the earlier hand.
pub fn argmax(hands: &[&[Card]]) -> Result<Option<usize>, CardError> {
    let mut best: Option<usize> = None;
    for (idx, hand) in hands.iter().enumerate() {
        best = match best {
            None => {
                rank(hand)?;
                Some(idx)
            }
            Some(current) => match compare(hands[current], hand)? {
                Winner::First => Some(current),
                Winner::Second => Some(idx),
            },
        };
    }
    Ok(best)
}
