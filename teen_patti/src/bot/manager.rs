//! Filler bot seats for one room.

use super::decision::BotDecisionMaker;
use crate::room::{RoomConfig, RoomId, Seat, UserId};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::time::Duration;

/// Spawns bot seats and paces their turns.
///
/// Bots live only inside the room: their ids are negative so they can never
/// collide with identity-service accounts, their coins never touch the
/// ledger, and a retired bot is gone for good.
pub struct BotManager {
    room_id: RoomId,
    next_bot: i64,
    starting_balance: i64,
    min_think_ms: u64,
    max_think_ms: u64,
    rng: StdRng,
    decisions: BotDecisionMaker,
}

impl BotManager {
    pub fn new(room_id: RoomId, config: &RoomConfig) -> Self {
        Self {
            room_id,
            next_bot: 1,
            starting_balance: config.bot_starting_balance,
            min_think_ms: config.bot_min_think_ms,
            max_think_ms: config.bot_max_think_ms,
            rng: StdRng::from_rng(&mut rand::rng()),
            decisions: BotDecisionMaker::new(),
        }
    }

    pub fn is_bot_id(user_id: UserId) -> bool {
        user_id < 0
    }

    /// Fresh bot seats, ready to insert
    pub fn spawn(&mut self, count: usize) -> Vec<Seat> {
        (0..count)
            .map(|_| {
                let bot_id = -self.next_bot;
                self.next_bot += 1;

                let mut seat = Seat::new(bot_id, self.generate_bot_name(bot_id), self.starting_balance);
                seat.is_bot = true;

                log::info!("Room {}: spawned bot {} ({})", self.room_id, bot_id, seat.username);
                seat
            })
            .collect()
    }

    /// Simulated thinking time before a bot acts
    pub fn think_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.min_think_ms..=self.max_think_ms))
    }

    pub fn decisions(&mut self) -> &mut BotDecisionMaker {
        &mut self.decisions
    }

    fn generate_bot_name(&mut self, bot_id: UserId) -> String {
        let prefixes = ["Raja", "Rani", "Chaal", "Patta", "Trail", "Sitara", "Bazi", "Jadoo"];
        let suffixes = ["Bot", "Pro", "King", "Queen", "Ace", "Shark", "Player"];

        let prefix = prefixes[self.rng.random_range(0..prefixes.len())];
        let suffix = suffixes[self.rng.random_range(0..suffixes.len())];

        format!("{}{}_{}", prefix, suffix, bot_id.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_ids_are_negative_and_unique() {
        let mut bots = BotManager::new(1, &RoomConfig::default());
        let seats: Vec<Seat> = bots.spawn(2).into_iter().chain(bots.spawn(1)).collect();

        let ids: Vec<UserId> = seats.iter().map(|s| s.user_id).collect();
        assert_eq!(ids, vec![-1, -2, -3]);
        assert!(seats.iter().all(|s| s.is_bot && s.balance == 10_000));
        assert!(ids.iter().all(|id| BotManager::is_bot_id(*id)));
    }

    #[test]
    fn test_think_delay_within_range() {
        let mut bots = BotManager::new(1, &RoomConfig::default());
        for _ in 0..100 {
            let delay = bots.think_delay();
            assert!(delay >= Duration::from_millis(1_000));
            assert!(delay <= Duration::from_millis(3_000));
        }
    }
}
