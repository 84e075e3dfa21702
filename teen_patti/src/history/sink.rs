//! Event sink implementations.

use super::models::GameEvent;
use crate::db::statement;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tokio::{sync::mpsc, task::JoinHandle};

/// Destination for game history. `record` must return immediately.
pub trait EventSink: Send + Sync {
    fn record(&self, event: GameEvent);
}

/// Writes each event to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn record(&self, event: GameEvent) {
        log::info!(
            "Room {} round {}: user {} {} {} (balance {}, bet {})",
            event.room_id,
            event.round,
            event.seat.user_id,
            event.action,
            event.amount,
            event.seat.balance,
            event.seat.current_bet
        );
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<GameEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<GameEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: GameEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Appends events to the `game_history` table from a background writer task.
pub struct PgEventSink {
    sender: mpsc::UnboundedSender<GameEvent>,
    writer: JoinHandle<()>,
}

impl PgEventSink {
    /// Spawn the writer task on the current runtime
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn spawn(pool: Arc<PgPool>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<GameEvent>();

        let writer = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = insert_event(&pool, &event).await {
                    log::error!(
                        "Failed to record {} for user {} in room {}: {}",
                        event.action,
                        event.seat.user_id,
                        event.room_id,
                        e
                    );
                }
            }
        });

        Self { sender, writer }
    }
}

impl EventSink for PgEventSink {
    fn record(&self, event: GameEvent) {
        if self.sender.send(event).is_err() {
            log::warn!("Game history writer has stopped; dropping event");
        }
    }
}

impl Drop for PgEventSink {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

async fn insert_event(pool: &PgPool, event: &GameEvent) -> Result<(), sqlx::Error> {
    let seat = serde_json::to_value(&event.seat).unwrap_or(serde_json::Value::Null);

    let query = sqlx::query(
        r#"
        INSERT INTO game_history (room_id, round, user_id, seat, action, amount, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.room_id)
    .bind(event.round as i32)
    .bind(event.seat.user_id)
    .bind(seat.to_string())
    .bind(event.action.to_string())
    .bind(event.amount)
    .bind(event.timestamp)
    .execute(pool);

    statement("history insert", query).await.map(|_| ())
}
