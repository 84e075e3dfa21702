//! Game history models.

use crate::room::{RoomId, Seat, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameAction {
    Boot,
    Bet,
    DoubleBet,
    Pack,
    TimeoutPack,
    Show,
    SideshowBet,
    Win,
    Refund,
}

impl std::fmt::Display for GameAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let repr = match self {
            GameAction::Boot => "boot",
            GameAction::Bet => "bet",
            GameAction::DoubleBet => "double_bet",
            GameAction::Pack => "pack",
            GameAction::TimeoutPack => "timeout_pack",
            GameAction::Show => "show",
            GameAction::SideshowBet => "sideshow_bet",
            GameAction::Win => "win",
            GameAction::Refund => "refund",
        };
        write!(f, "{repr}")
    }
}

/// Seat state at the moment of the action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatSnapshot {
    pub user_id: UserId,
    pub username: String,
    pub balance: i64,
    pub current_bet: i64,
    pub is_blind: bool,
    pub is_folded: bool,
    pub is_bot: bool,
}

impl From<&Seat> for SeatSnapshot {
    fn from(seat: &Seat) -> Self {
        Self {
            user_id: seat.user_id,
            username: seat.username.clone(),
            balance: seat.balance,
            current_bet: seat.current_bet,
            is_blind: seat.is_blind,
            is_folded: seat.is_folded,
            is_bot: seat.is_bot,
        }
    }
}

/// One history record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameEvent {
    pub room_id: RoomId,
    pub round: u32,
    pub seat: SeatSnapshot,
    pub action: GameAction,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}
