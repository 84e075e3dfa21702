/// Property-based tests for hand ranking using proptest
///
/// These tests check the ranking laws over randomly dealt 3-card hands
/// rather than a fixed table of examples.
use proptest::prelude::*;
use teen_patti::game::{
    Card, HandCategory, Suit, Winner,
    entities::ACE,
    functional::{argmax, compare, rank},
};

fn full_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| (2u8..=ACE).map(move |value| Card(value, suit)))
        .collect()
}

// Strategy to deal `n` distinct cards from a shuffled deck
fn unique_cards_strategy(n: usize) -> impl Strategy<Value = Vec<Card>> {
    Just(full_deck())
        .prop_shuffle()
        .prop_map(move |deck| deck[..n].to_vec())
}

fn hand_strategy() -> impl Strategy<Value = Vec<Card>> {
    unique_cards_strategy(3)
}

// Two hands dealt from the same deck
fn two_hands_strategy() -> impl Strategy<Value = (Vec<Card>, Vec<Card>)> {
    unique_cards_strategy(6).prop_map(|cards| (cards[..3].to_vec(), cards[3..].to_vec()))
}

proptest! {
    #[test]
    fn test_rank_ignores_card_order(cards in hand_strategy()) {
        let mut reversed = cards.clone();
        reversed.reverse();
        let mut rotated = cards.clone();
        rotated.rotate_left(1);

        let expected = rank(&cards).unwrap();
        prop_assert_eq!(rank(&reversed).unwrap(), expected);
        prop_assert_eq!(rank(&rotated).unwrap(), expected);
    }

    #[test]
    fn test_tiebreak_is_a_card_in_the_hand(cards in hand_strategy()) {
        let ranked = rank(&cards).unwrap();
        prop_assert!(cards.iter().any(|c| c.value() == ranked.tiebreak));
    }

    #[test]
    fn test_hand_beats_itself_never(cards in hand_strategy()) {
        // Exact tie keeps the first hand
        prop_assert_eq!(compare(&cards, &cards).unwrap(), Winner::First);
    }

    #[test]
    fn test_compare_is_antisymmetric((a, b) in two_hands_strategy()) {
        let ra = rank(&a).unwrap();
        let rb = rank(&b).unwrap();
        let forward = compare(&a, &b).unwrap();
        let backward = compare(&b, &a).unwrap();

        if ra == rb {
            prop_assert_eq!(forward, Winner::First);
            prop_assert_eq!(backward, Winner::First);
        } else {
            prop_assert_ne!(forward, backward);
        }
    }

    #[test]
    fn test_argmax_picks_a_maximal_hand(hands in unique_cards_strategy(15)) {
        let hands: Vec<&[Card]> = hands.chunks(3).collect();
        let winner = argmax(&hands).unwrap().unwrap();
        let best = rank(hands[winner]).unwrap();

        for (idx, hand) in hands.iter().enumerate() {
            let other = rank(hand).unwrap();
            prop_assert!(other <= best);
            // Earlier equal hands win ties
            if idx < winner {
                prop_assert!(other < best);
            }
        }
    }

    #[test]
    fn test_same_suit_is_at_least_color(value_a in 2u8..=ACE, value_b in 2u8..=ACE, value_c in 2u8..=ACE) {
        prop_assume!(value_a != value_b && value_b != value_c && value_a != value_c);
        let cards = [
            Card(value_a, Suit::Heart),
            Card(value_b, Suit::Heart),
            Card(value_c, Suit::Heart),
        ];
        prop_assert!(rank(&cards).unwrap().category >= HandCategory::Color);
    }

    #[test]
    fn test_trail_beats_every_non_trail(value in 2u8..=ACE, other in hand_strategy()) {
        let trail = [
            Card(value, Suit::Spade),
            Card(value, Suit::Heart),
            Card(value, Suit::Diamond),
        ];
        prop_assume!(rank(&other).unwrap().category != HandCategory::Trail);
        prop_assert_eq!(compare(&trail, &other).unwrap(), Winner::First);
        prop_assert_eq!(compare(&other, &trail).unwrap(), Winner::Second);
    }
}

#[test]
fn test_ace_low_run_is_not_a_sequence() {
    let cards = [
        Card(ACE, Suit::Spade),
        Card(2, Suit::Heart),
        Card(3, Suit::Club),
    ];
    assert_eq!(rank(&cards).unwrap().category, HandCategory::HighCard);
}
