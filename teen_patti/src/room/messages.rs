//! Room actor message types.

use super::{
    events::{Outbound, RoomSummary, Snapshot},
    gateway::ConnectionId,
    models::UserId,
};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

/// Who is connecting, as vouched for by the identity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
}

/// Player actions accepted from a connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    PlaceBet {
        amount: i64,
    },
    PlaceDoubleBet {
        amount: i64,
    },
    Pack,
    Sideshow {
        opponent_id: UserId,
        #[serde(default)]
        amount: Option<i64>,
    },
    SideshowResponse {
        accept: bool,
    },
    ToggleSeen,
    Show,
}

impl ClientAction {
    pub fn name(&self) -> &'static str {
        match self {
            ClientAction::PlaceBet { .. } => "place_bet",
            ClientAction::PlaceDoubleBet { .. } => "place_double_bet",
            ClientAction::Pack => "pack",
            ClientAction::Sideshow { .. } => "sideshow",
            ClientAction::SideshowResponse { .. } => "sideshow_response",
            ClientAction::ToggleSeen => "toggle_seen",
            ClientAction::Show => "show",
        }
    }
}

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Attach a connection, seating the user or resuming their seat
    Join {
        identity: Identity,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<Outbound>,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Player action from a connection
    Action {
        user_id: UserId,
        connection_id: ConnectionId,
        action: ClientAction,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Transport closed
    Disconnect {
        user_id: UserId,
        connection_id: ConnectionId,
    },

    /// Current snapshot as seen by `viewer`
    GetSnapshot {
        viewer: Option<UserId>,
        response: oneshot::Sender<Option<Snapshot>>,
    },

    /// Lightweight description for room listings
    GetSummary {
        response: oneshot::Sender<Option<RoomSummary>>,
    },

    /// Take the room store out of service and close every connection
    Shutdown,
}

/// Response from room operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomResponse {
    /// Operation succeeded
    Success,

    /// Seated and playing from the next deal
    Joined,

    /// Seated as a spectator until the next round
    JoinedAsSpectator,

    /// Existing seat resumed
    Reconnected,

    /// No free seat
    RoomFull,

    /// Balance below the join minimum
    InsufficientCoins { required: i64, available: i64 },

    /// Operation failed
    Error(String),
}

impl RoomResponse {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RoomResponse::Success
                | RoomResponse::Joined
                | RoomResponse::JoinedAsSpectator
                | RoomResponse::Reconnected
        )
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            RoomResponse::RoomFull => Some("Room is full".to_string()),
            RoomResponse::InsufficientCoins { required, .. } => Some(format!(
                "Insufficient coins to join. Minimum is {required}"
            )),
            RoomResponse::Error(message) => Some(message.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inbound_actions() {
        let bet: ClientAction =
            serde_json::from_str(r#"{"action":"place_bet","player_id":3,"amount":200}"#).unwrap();
        assert_eq!(bet, ClientAction::PlaceBet { amount: 200 });

        let sideshow: ClientAction =
            serde_json::from_str(r#"{"action":"sideshow","opponent_id":9}"#).unwrap();
        assert_eq!(
            sideshow,
            ClientAction::Sideshow {
                opponent_id: 9,
                amount: None
            }
        );

        let answer: ClientAction =
            serde_json::from_str(r#"{"action":"sideshow_response","accept":false}"#).unwrap();
        assert_eq!(answer, ClientAction::SideshowResponse { accept: false });

        let seen: ClientAction = serde_json::from_str(r#"{"action":"toggle_seen"}"#).unwrap();
        assert_eq!(seen.name(), "toggle_seen");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ClientAction>(r#"{"action":"all_in"}"#).is_err());
        assert!(serde_json::from_str::<ClientAction>(r#"{"action":"place_bet"}"#).is_err());
    }

    #[test]
    fn test_response_messages() {
        assert!(RoomResponse::JoinedAsSpectator.is_success());
        let response = RoomResponse::InsufficientCoins {
            required: 100,
            available: 40,
        };
        assert!(!response.is_success());
        assert_eq!(
            response.error_message().unwrap(),
            "Insufficient coins to join. Minimum is 100"
        );
    }
}
