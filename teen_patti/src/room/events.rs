//! Outbound events and room snapshots.

use super::models::{POSITIONS, Phase, Room, RoomId, UserId};
use crate::game::Card;
use serde::Serialize;
use std::collections::BTreeMap;

/// Avatar reference used when the identity service has none
pub const DEFAULT_AVATAR: &str = "/media/avatars/default.png";

/// One seat as shown to a particular viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub id: UserId,
    pub username: String,
    pub coins: i64,
    pub avatar: String,
    pub position: &'static str,
    /// `None` unless the viewer may see this hand
    pub cards: Option<Vec<Card>>,
    pub is_blind: bool,
    pub is_packed: bool,
    pub is_spectator: bool,
    pub current_bet: i64,
    pub is_disconnected: bool,
}

/// Full table state sent with every `game_update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub game_room_id: RoomId,
    pub players: Vec<PlayerView>,
    pub active_players: Vec<UserId>,
    pub table_limit: i64,
    pub pot: i64,
    pub current_turn: usize,
    pub round_status: Phase,
    /// Milliseconds on the room's monotonic clock; strictly increasing per room
    pub sent_at: u64,
}

impl Snapshot {
    /// Build the view of `room` for `viewer`.
    ///
    /// A seen player's own hand is revealed to them. Once the round is
    /// decided every hand still in contention is revealed to everyone.
    pub fn for_viewer(room: &Room, viewer: Option<UserId>, sent_at: u64) -> Self {
        let reveal_all = room.phase.is_terminal();

        let players = room
            .seats
            .iter()
            .enumerate()
            .map(|(idx, seat)| {
                let own = viewer == Some(seat.user_id) && !seat.is_blind;
                let visible = !seat.hand.is_empty()
                    && (own || (reveal_all && !seat.is_folded && !seat.is_spectator));
                PlayerView {
                    id: seat.user_id,
                    username: seat.username.clone(),
                    coins: seat.balance,
                    avatar: seat
                        .avatar
                        .clone()
                        .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
                    position: POSITIONS[idx % POSITIONS.len()],
                    cards: visible.then(|| seat.hand.clone()),
                    is_blind: seat.is_blind,
                    is_packed: seat.is_folded,
                    is_spectator: seat.is_spectator,
                    current_bet: seat.current_bet,
                    is_disconnected: seat.is_disconnected(),
                }
            })
            .collect();

        Self {
            game_room_id: room.id,
            players,
            active_players: room.active_ids(),
            table_limit: room.table_limit,
            pot: room.pot,
            current_turn: room.turn,
            round_status: room.phase,
            sent_at,
        }
    }
}

/// Room listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub is_private: bool,
    pub players: usize,
    pub bots: usize,
    pub max_seats: usize,
    pub phase: Phase,
}

impl RoomSummary {
    pub fn of(room: &Room) -> Self {
        Self {
            room_id: room.id,
            is_private: room.is_private,
            players: room.real_count(),
            bots: room.bot_count(),
            max_seats: room.max_seats,
            phase: room.phase,
        }
    }
}

/// Events pushed to connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    GameUpdate(Snapshot),
    TimerStart {
        player_id: UserId,
        /// Seconds left on the clock
        duration: u64,
    },
    PlayerPacked {
        player_id: UserId,
        message: String,
    },
    PlayerDisconnected {
        player_id: UserId,
        message: String,
    },
    PlayerReconnected {
        player_id: UserId,
        message: String,
    },
    ShowResult {
        winner_id: UserId,
        hand_winner: Vec<Card>,
        hand_loser: Vec<Card>,
        active_players_cards: BTreeMap<UserId, Vec<Card>>,
    },
    SideshowRequest {
        requester_id: UserId,
        requester_name: String,
        opponent_id: UserId,
        /// Seconds the opponent has to answer
        wait: u64,
    },
    SideshowResult {
        message: String,
        winner_id: Option<UserId>,
        loser_id: Option<UserId>,
        packed_player: Option<UserId>,
    },
    SpectatorNotification {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GameUpdate(_) => "game_update",
            ServerEvent::TimerStart { .. } => "timer_start",
            ServerEvent::PlayerPacked { .. } => "player_packed",
            ServerEvent::PlayerDisconnected { .. } => "player_disconnected",
            ServerEvent::PlayerReconnected { .. } => "player_reconnected",
            ServerEvent::ShowResult { .. } => "show_result",
            ServerEvent::SideshowRequest { .. } => "sideshow_request",
            ServerEvent::SideshowResult { .. } => "sideshow_result",
            ServerEvent::SpectatorNotification { .. } => "spectator_notification",
            ServerEvent::Error { .. } => "error",
        }
    }
}

/// What a connection's writer receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Event(ServerEvent),
    /// Close the transport with this reason
    Close { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::models::Seat;

    fn dealt_room() -> Room {
        let mut room = Room::new(42, 5, None);
        for id in 1..=3 {
            let mut seat = Seat::new(id, format!("p{id}"), 900);
            seat.hand = vec![
                "2♠".parse().unwrap(),
                "7♥".parse().unwrap(),
                "K♦".parse().unwrap(),
            ];
            room.push_seat(seat);
        }
        room.phase = Phase::Betting;
        room
    }

    #[test]
    fn test_blind_hand_hidden_even_from_owner() {
        let room = dealt_room();
        let snapshot = Snapshot::for_viewer(&room, Some(1), 1);
        assert!(snapshot.players.iter().all(|p| p.cards.is_none()));
    }

    #[test]
    fn test_seen_hand_visible_only_to_owner() {
        let mut room = dealt_room();
        room.seats[0].is_blind = false;

        let own = Snapshot::for_viewer(&room, Some(1), 1);
        assert!(own.players[0].cards.is_some());

        let other = Snapshot::for_viewer(&room, Some(2), 1);
        assert!(other.players[0].cards.is_none());
    }

    #[test]
    fn test_showdown_reveals_contending_hands() {
        let mut room = dealt_room();
        room.seats[2].is_folded = true;
        room.phase = Phase::Showdown;

        let snapshot = Snapshot::for_viewer(&room, None, 1);
        assert!(snapshot.players[0].cards.is_some());
        assert!(snapshot.players[1].cards.is_some());
        assert!(snapshot.players[2].cards.is_none());
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let room = dealt_room();
        let event = ServerEvent::GameUpdate(Snapshot::for_viewer(&room, None, 7));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "game_update");
        assert_eq!(json["game_room_id"], 42);
        assert_eq!(json["round_status"], "betting");
        assert_eq!(json["sent_at"], 7);
        assert_eq!(json["players"][1]["position"], "top-right");
        assert_eq!(json["players"][0]["avatar"], DEFAULT_AVATAR);
        assert_eq!(json["active_players"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_event_tags() {
        let json = serde_json::to_value(ServerEvent::TimerStart {
            player_id: 3,
            duration: 30,
        })
        .unwrap();
        assert_eq!(json["type"], "timer_start");
        assert_eq!(json["duration"], 30);
        assert_eq!(ServerEvent::error("x").name(), "error");
    }
}
