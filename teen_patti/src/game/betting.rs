//! Stake arithmetic for blind and seen players.
//!
//! A seen stake counts double relative to a blind one, so every figure here
//! depends on whether the acting player and the previous active player have
//! looked at their cards.

/// The previous active player's position in the betting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PrevBet {
    pub is_blind: bool,
    pub amount: i64,
}

/// Smallest legal single bet. With no previous bettor the floor is 1.
pub fn min_bet(actor_is_blind: bool, prev: Option<PrevBet>) -> i64 {
    match prev {
        None => 1,
        Some(prev) => match (actor_is_blind, prev.is_blind) {
            (true, true) => prev.amount,
            (true, false) => prev.amount / 2,
            (false, true) => prev.amount * 2,
            (false, false) => prev.amount,
        },
    }
}

/// The only legal amount for a double bet: twice the single minimum.
///
/// A blind player doubling against a seen one stakes the seen amount itself,
/// so an odd stake is not rounded down by the halving.
pub fn double_bet(actor_is_blind: bool, prev: Option<PrevBet>) -> i64 {
    match prev {
        None => 2,
        Some(prev) if actor_is_blind && !prev.is_blind => prev.amount,
        Some(_) => min_bet(actor_is_blind, prev) * 2,
    }
}

/// Stake paid to call a show against the other remaining player.
///
/// A seen caller facing a blind opponent pays double; everyone else matches.
pub fn show_stake(actor_is_blind: bool, prev: PrevBet) -> i64 {
    if !actor_is_blind && prev.is_blind {
        prev.amount * 2
    } else {
        prev.amount
    }
}

/// Pot cap for a round: the poorest stake times the number of players.
pub fn table_limit<I>(balances: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let (min, count) = balances
        .into_iter()
        .fold((None::<i64>, 0i64), |(min, count), balance| {
            (Some(min.map_or(balance, |m| m.min(balance))), count + 1)
        });
    min.map_or(0, |min| min * count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLIND_100: PrevBet = PrevBet {
        is_blind: true,
        amount: 100,
    };
    const SEEN_100: PrevBet = PrevBet {
        is_blind: false,
        amount: 100,
    };

    #[test]
    fn test_first_bettor_minimum_is_one() {
        assert_eq!(min_bet(true, None), 1);
        assert_eq!(min_bet(false, None), 1);
        assert_eq!(double_bet(true, None), 2);
    }

    #[test]
    fn test_min_bet_matrix() {
        assert_eq!(min_bet(true, Some(BLIND_100)), 100);
        assert_eq!(min_bet(true, Some(SEEN_100)), 50);
        assert_eq!(min_bet(false, Some(BLIND_100)), 200);
        assert_eq!(min_bet(false, Some(SEEN_100)), 100);
    }

    #[test]
    fn test_min_bet_halving_floors() {
        let prev = PrevBet {
            is_blind: false,
            amount: 101,
        };
        assert_eq!(min_bet(true, Some(prev)), 50);
    }

    #[test]
    fn test_double_bet_matrix() {
        assert_eq!(double_bet(true, Some(BLIND_100)), 200);
        assert_eq!(double_bet(true, Some(SEEN_100)), 100);
        assert_eq!(double_bet(false, Some(BLIND_100)), 400);
        assert_eq!(double_bet(false, Some(SEEN_100)), 200);
    }

    #[test]
    fn test_blind_double_against_odd_seen_stake() {
        let prev = PrevBet {
            is_blind: false,
            amount: 101,
        };
        assert_eq!(min_bet(true, Some(prev)), 50);
        assert_eq!(double_bet(true, Some(prev)), 101);
    }

    #[test]
    fn test_show_stake() {
        assert_eq!(show_stake(true, BLIND_100), 100);
        assert_eq!(show_stake(true, SEEN_100), 100);
        assert_eq!(show_stake(false, SEEN_100), 100);
        assert_eq!(show_stake(false, BLIND_100), 200);
    }

    #[test]
    fn test_table_limit() {
        assert_eq!(table_limit([1000, 1000]), 2000);
        assert_eq!(table_limit([5000, 300, 900]), 900);
        assert_eq!(table_limit(Vec::<i64>::new()), 0);
    }
}
