//! Room and seat records.

use crate::game::{Card, PrevBet};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Room identifier
pub type RoomId = i64;

/// User identifier issued by the identity service. Bots use negative ids.
pub type UserId = i64;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Distribution,
    Betting,
    Showdown,
    ShowdownAfterPack,
}

impl Phase {
    /// A round is in flight: seats are protected by the reconnect grace.
    pub fn is_round_active(self) -> bool {
        matches!(self, Phase::Distribution | Phase::Betting)
    }

    /// The round has been decided and a restart is pending.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Showdown | Phase::ShowdownAfterPack)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Waiting => write!(f, "waiting"),
            Phase::Distribution => write!(f, "distribution"),
            Phase::Betting => write!(f, "betting"),
            Phase::Showdown => write!(f, "showdown"),
            Phase::ShowdownAfterPack => write!(f, "showdown_after_pack"),
        }
    }
}

/// A player's seat at the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    /// Ordinal assigned on insertion, never reused within a room
    pub seat_id: u32,
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    /// Last balance reported by the ledger (or the bot's own stack)
    pub balance: i64,
    pub hand: Vec<Card>,
    pub current_bet: i64,
    pub is_blind: bool,
    pub is_folded: bool,
    pub is_spectator: bool,
    pub disconnected_at: Option<Instant>,
    pub is_bot: bool,
}

impl Seat {
    pub fn new(user_id: UserId, username: impl Into<String>, balance: i64) -> Self {
        Self {
            seat_id: 0,
            user_id,
            username: username.into(),
            avatar: None,
            balance,
            hand: Vec::new(),
            current_bet: 0,
            is_blind: true,
            is_folded: false,
            is_spectator: false,
            disconnected_at: None,
            is_bot: false,
        }
    }

    /// Still contesting the pot.
    pub fn is_active(&self) -> bool {
        !self.is_folded && !self.is_spectator
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected_at.is_some()
    }

    /// Clear per-round state before dealing.
    pub fn reset_for_round(&mut self) {
        self.hand.clear();
        self.current_bet = 0;
        self.is_blind = true;
        self.is_folded = false;
        self.is_spectator = false;
    }

    pub fn as_prev_bet(&self) -> PrevBet {
        PrevBet {
            is_blind: self.is_blind,
            amount: self.current_bet,
        }
    }
}

/// The authoritative record for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    /// Join code for private rooms
    pub code: Option<String>,
    pub is_private: bool,
    pub max_seats: usize,
    pub table_limit: i64,
    pub pot: i64,
    /// Index into `seats` of the turn holder
    pub turn: usize,
    pub phase: Phase,
    pub round_number: u32,
    /// Insertion-ordered; the order is the turn order
    pub seats: Vec<Seat>,
    next_seat_id: u32,
}

impl Room {
    pub fn new(id: RoomId, max_seats: usize, code: Option<String>) -> Self {
        Self {
            id,
            is_private: code.is_some(),
            code,
            max_seats,
            table_limit: 0,
            pot: 0,
            turn: 0,
            phase: Phase::Waiting,
            round_number: 0,
            seats: Vec::new(),
            next_seat_id: 1,
        }
    }

    /// Append a seat, assigning its ordinal
    pub fn push_seat(&mut self, mut seat: Seat) -> u32 {
        let seat_id = self.next_seat_id;
        self.next_seat_id += 1;
        seat.seat_id = seat_id;
        self.seats.push(seat);
        seat_id
    }

    pub fn index_of(&self, user_id: UserId) -> Option<usize> {
        self.seats.iter().position(|s| s.user_id == user_id)
    }

    pub fn seat(&self, user_id: UserId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.user_id == user_id)
    }

    pub fn seat_mut(&mut self, user_id: UserId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.max_seats
    }

    pub fn active_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_active()).count()
    }

    pub fn active_ids(&self) -> Vec<UserId> {
        self.seats
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.user_id)
            .collect()
    }

    pub fn real_count(&self) -> usize {
        self.seats.iter().filter(|s| !s.is_bot).count()
    }

    pub fn bot_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_bot).count()
    }

    /// The seat at the turn pointer, if it is still contesting the pot.
    pub fn turn_holder(&self) -> Option<&Seat> {
        self.seats.get(self.turn).filter(|s| s.is_active())
    }

    /// Next active seat strictly after `idx`, wrapping around.
    pub fn next_active_after(&self, idx: usize) -> Option<usize> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (idx + offset) % n)
            .find(|&i| self.seats[i].is_active() && i != idx)
    }

    /// First active seat at or after `idx`, wrapping around.
    pub fn first_active_from(&self, idx: usize) -> Option<usize> {
        let n = self.seats.len();
        (0..n)
            .map(|offset| (idx + offset) % n)
            .find(|&i| self.seats[i].is_active())
    }

    /// Previous active seat strictly before `idx`, wrapping around.
    pub fn prev_active_before(&self, idx: usize) -> Option<usize> {
        let n = self.seats.len();
        (1..n)
            .map(|offset| (idx + n - offset) % n)
            .find(|&i| self.seats[i].is_active())
    }
}

/// Seat position labels handed to clients, cycled by seat index.
pub const POSITIONS: [&str; 4] = ["top-left", "top-right", "bottom-left", "bottom-right"];

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with(n: i64) -> Room {
        let mut room = Room::new(1, 5, None);
        for id in 1..=n {
            room.push_seat(Seat::new(id, format!("p{id}"), 1_000));
        }
        room
    }

    #[test]
    fn test_seat_ids_are_ordinal() {
        let mut room = room_with(2);
        assert_eq!(room.seats[0].seat_id, 1);
        assert_eq!(room.seats[1].seat_id, 2);
        room.seats.remove(0);
        let id = room.push_seat(Seat::new(9, "late", 1_000));
        assert_eq!(id, 3);
    }

    #[test]
    fn test_next_active_skips_folded_and_spectators() {
        let mut room = room_with(4);
        room.seats[1].is_folded = true;
        room.seats[2].is_spectator = true;
        assert_eq!(room.next_active_after(0), Some(3));
        assert_eq!(room.next_active_after(3), Some(0));
    }

    #[test]
    fn test_next_active_none_when_alone() {
        let mut room = room_with(3);
        room.seats[1].is_folded = true;
        room.seats[2].is_folded = true;
        assert_eq!(room.next_active_after(0), None);
    }

    #[test]
    fn test_prev_active_wraps() {
        let mut room = room_with(4);
        room.seats[3].is_folded = true;
        assert_eq!(room.prev_active_before(0), Some(2));
        assert_eq!(room.prev_active_before(2), Some(1));
    }

    #[test]
    fn test_turn_holder_requires_active_seat() {
        let mut room = room_with(2);
        room.turn = 1;
        assert_eq!(room.turn_holder().map(|s| s.user_id), Some(2));
        room.seats[1].is_folded = true;
        assert!(room.turn_holder().is_none());
    }

    #[test]
    fn test_reset_for_round() {
        let mut seat = Seat::new(1, "p1", 500);
        seat.is_blind = false;
        seat.is_folded = true;
        seat.current_bet = 200;
        seat.reset_for_round();
        assert!(seat.is_blind && !seat.is_folded && seat.current_bet == 0);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::ShowdownAfterPack).unwrap();
        assert_eq!(json, "\"showdown_after_pack\"");
        assert_eq!(Phase::ShowdownAfterPack.to_string(), "showdown_after_pack");
    }
}
