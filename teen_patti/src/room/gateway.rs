//! Per-room fan-out to live connections.
//!
//! The gateway holds one outbound channel per seated user. It never blocks
//! the room actor: a full or closed channel drops the message for that
//! connection. A closed channel stays registered until the transport reports
//! its disconnect, so that report is never mistaken for a stale one.

use super::{
    events::{Outbound, ServerEvent, Snapshot},
    models::{Room, RoomId, UserId},
};
use std::collections::HashMap;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::Instant,
};
use uuid::Uuid;

/// Identifies one transport session
pub type ConnectionId = Uuid;

/// A live transport session for one user in one room
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    sender: mpsc::Sender<Outbound>,
}

#[derive(Debug)]
pub struct Gateway {
    room_id: RoomId,
    connections: HashMap<UserId, Connection>,
    epoch: Instant,
    last_sent_at: u64,
}

impl Gateway {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            connections: HashMap::new(),
            epoch: Instant::now(),
            last_sent_at: 0,
        }
    }

    /// Attach a connection. Returns the connection it replaced, if any.
    pub fn join(
        &mut self,
        user_id: UserId,
        id: ConnectionId,
        sender: mpsc::Sender<Outbound>,
    ) -> Option<Connection> {
        self.connections.insert(
            user_id,
            Connection {
                id,
                user_id,
                sender,
            },
        )
    }

    /// Detach `id` if it is still the user's current connection
    pub fn leave(&mut self, user_id: UserId, id: ConnectionId) -> bool {
        if self.is_current(user_id, id) {
            self.connections.remove(&user_id);
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, user_id: UserId, id: ConnectionId) -> bool {
        self.connections
            .get(&user_id)
            .is_some_and(|connection| connection.id == id)
    }

    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// Monotonic stamp for the next snapshot
    pub fn stamp(&mut self) -> u64 {
        let elapsed = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_sent_at = elapsed.max(self.last_sent_at + 1);
        self.last_sent_at
    }

    fn deliver(&self, connection: &Connection, message: Outbound) {
        match connection.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::warn!(
                "Room {}: outbound channel full for user {}, dropping message",
                self.room_id,
                connection.user_id
            ),
            // The transport's own disconnect detaches it
            Err(TrySendError::Closed(_)) => log::debug!(
                "Room {}: connection for user {} is closing, dropping message",
                self.room_id,
                connection.user_id
            ),
        }
    }

    /// Send one event to one user
    pub fn send(&self, user_id: UserId, event: ServerEvent) {
        if let Some(connection) = self.connections.get(&user_id) {
            self.deliver(connection, Outbound::Event(event));
        }
    }

    /// Send one event to everyone in the room
    pub fn broadcast(&self, event: ServerEvent) {
        for connection in self.connections.values() {
            self.deliver(connection, Outbound::Event(event.clone()));
        }
    }

    /// Send every connection its own view of `room` with one shared stamp
    pub fn broadcast_snapshot(&mut self, room: &Room) {
        let sent_at = self.stamp();
        for (&user_id, connection) in &self.connections {
            let snapshot = Snapshot::for_viewer(room, Some(user_id), sent_at);
            self.deliver(connection, Outbound::Event(ServerEvent::GameUpdate(snapshot)));
        }
    }

    /// Close one user's connection
    pub fn close(&mut self, user_id: UserId, reason: &str) {
        if let Some(connection) = self.connections.remove(&user_id) {
            close_connection(&connection, reason);
        }
    }

    /// Close every connection, e.g. on a fatal store failure
    pub fn close_all(&mut self, reason: &str) {
        for (_, connection) in self.connections.drain() {
            close_connection(&connection, reason);
        }
    }
}

/// Ask a connection's writer to shut the transport down
pub fn close_connection(connection: &Connection, reason: &str) {
    let _ = connection.sender.try_send(Outbound::Close {
        reason: reason.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::models::Seat;

    fn room() -> Room {
        let mut room = Room::new(1, 5, None);
        room.push_seat(Seat::new(1, "asha", 1_000));
        room.push_seat(Seat::new(2, "ravi", 1_000));
        room
    }

    fn sent_at(message: Outbound) -> u64 {
        match message {
            Outbound::Event(ServerEvent::GameUpdate(snapshot)) => snapshot.sent_at,
            other => panic!("expected game_update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let mut gateway = Gateway::new(1);
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        gateway.join(1, Uuid::new_v4(), tx1);
        gateway.join(2, Uuid::new_v4(), tx2);

        gateway.broadcast_snapshot(&room());

        let a = sent_at(rx1.recv().await.unwrap());
        let b = sent_at(rx2.recv().await.unwrap());
        assert_eq!(a, b, "one snapshot stamp per broadcast");
    }

    #[tokio::test]
    async fn test_sent_at_strictly_increases() {
        let mut gateway = Gateway::new(1);
        let (tx, mut rx) = mpsc::channel(8);
        gateway.join(1, Uuid::new_v4(), tx);

        let room = room();
        gateway.broadcast_snapshot(&room);
        gateway.broadcast_snapshot(&room);

        let first = sent_at(rx.recv().await.unwrap());
        let second = sent_at(rx.recv().await.unwrap());
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_closed_channel_still_leaves_cleanly() {
        let mut gateway = Gateway::new(1);
        let (tx, rx) = mpsc::channel(8);
        let id = Uuid::new_v4();
        gateway.join(1, id, tx);
        drop(rx);

        gateway.broadcast(ServerEvent::error("ping"));
        gateway.broadcast_snapshot(&room());
        assert!(gateway.is_current(1, id));

        assert!(gateway.leave(1, id));
        assert!(!gateway.is_connected(1));
    }

    #[tokio::test]
    async fn test_stale_connection_cannot_leave() {
        let mut gateway = Gateway::new(1);
        let (old_tx, mut old_rx) = mpsc::channel(8);
        let (new_tx, _new_rx) = mpsc::channel(8);
        let old_id = Uuid::new_v4();
        gateway.join(1, old_id, old_tx);

        let replaced = gateway.join(1, Uuid::new_v4(), new_tx).unwrap();
        close_connection(&replaced, "replaced");
        assert_eq!(
            old_rx.recv().await.unwrap(),
            Outbound::Close {
                reason: "replaced".to_string()
            }
        );

        assert!(!gateway.leave(1, old_id));
        assert!(gateway.is_connected(1));
    }
}
