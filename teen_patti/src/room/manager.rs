//! Room manager for spawning and finding room actors.

use super::{
    actor::{RoomActor, RoomHandle},
    config::RoomConfig,
    errors::{RoomError, RoomResult},
    events::RoomSummary,
    models::RoomId,
    store::StoreError,
};
use crate::{history::EventSink, ledger::Ledger};
use rand::Rng;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::RwLock;

const CODE_LENGTH: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Owns every live room and hands out their handles
pub struct RoomManager {
    config: RoomConfig,
    ledger: Arc<dyn Ledger>,
    history: Arc<dyn EventSink>,

    /// Live room handles
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,

    next_room_id: Arc<RwLock<RoomId>>,

    /// Rooms spawned since startup
    spawned: AtomicU64,
}

impl RoomManager {
    /// Create a manager that spawns rooms with `config`
    pub fn new(config: RoomConfig, ledger: Arc<dyn Ledger>, history: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            ledger,
            history,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            next_room_id: Arc::new(RwLock::new(1)),
            spawned: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    async fn spawn_room(&self, private: bool) -> RoomHandle {
        // Held until the insert so no two rooms can claim the same code
        let mut rooms = self.rooms.write().await;
        let code = private.then(|| unique_code(&rooms, generate_code));

        let mut next_id = self.next_room_id.write().await;
        let room_id = *next_id;
        *next_id += 1;
        drop(next_id);

        let (actor, handle) = RoomActor::new(
            room_id,
            code,
            self.config.clone(),
            self.ledger.clone(),
            self.history.clone(),
        );

        rooms.insert(room_id, handle.clone());
        drop(rooms);
        tokio::spawn(actor.run());
        self.spawned.fetch_add(1, Ordering::Relaxed);

        log::info!(
            "Created {} room {}",
            if handle.is_private() { "private" } else { "public" },
            room_id
        );
        handle
    }

    /// Spawn a new public room
    pub async fn create_room(&self) -> RoomHandle {
        self.spawn_room(false).await
    }

    /// First public room with a free seat, or a new one
    pub async fn find_or_create_public(&self) -> RoomHandle {
        self.prune().await;

        let open = {
            let rooms = self.rooms.read().await;
            let mut candidates: Vec<&RoomHandle> = rooms
                .values()
                .filter(|h| !h.is_private() && !h.is_closed() && h.has_free_seat())
                .collect();
            candidates.sort_by_key(|h| h.room_id());
            candidates.first().map(|h| (*h).clone())
        };

        match open {
            Some(handle) => handle,
            None => self.create_room().await,
        }
    }

    /// Spawn a private room reachable only by its code
    pub async fn create_private(&self) -> RoomHandle {
        self.spawn_room(true).await
    }

    /// Look up a private room by code, ignoring case
    pub async fn join_by_code(&self, code: &str) -> RoomResult<RoomHandle> {
        let code = code.trim().to_ascii_uppercase();
        let handle = self
            .rooms
            .read()
            .await
            .values()
            .find(|h| h.code() == Some(code.as_str()) && !h.is_closed())
            .cloned()
            .ok_or(RoomError::NotFound(StoreError::RoomNotFound))?;

        if !handle.has_free_seat() {
            return Err(RoomError::validation("Room is full"));
        }
        Ok(handle)
    }

    pub async fn get(&self, room_id: RoomId) -> Option<RoomHandle> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .filter(|h| !h.is_closed())
            .cloned()
    }

    /// Summaries of the live public rooms, ordered by id
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        self.prune().await;

        let mut handles: Vec<RoomHandle> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|h| !h.is_private())
            .cloned()
            .collect();
        handles.sort_by_key(|h| h.room_id());

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(Some(summary)) = handle.summary().await {
                summaries.push(summary);
            }
        }
        summaries
    }

    /// Forget rooms whose actor has finished. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, h| !h.is_closed());
        let removed = before - rooms.len();
        if removed > 0 {
            log::debug!("Pruned {} closed rooms", removed);
        }
        removed
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Total rooms spawned, closed ones included
    pub fn rooms_spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Take every room out of service
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = self.rooms.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }
}

/// First generated code no live room is using
fn unique_code(
    rooms: &HashMap<RoomId, RoomHandle>,
    mut generate: impl FnMut() -> String,
) -> String {
    loop {
        let code = generate();
        if !rooms.values().any(|h| h.code() == Some(code.as_str())) {
            return code;
        }
    }
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{history::MemoryEventSink, ledger::MemoryLedger};

    fn manager() -> RoomManager {
        let config = RoomConfig {
            bots_enabled: false,
            ..Default::default()
        };
        RoomManager::new(
            config,
            Arc::new(MemoryLedger::new(1_000)),
            Arc::new(MemoryEventSink::new()),
        )
    }

    #[test]
    fn test_generated_codes_are_uppercase_alphanumeric() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[tokio::test]
    async fn test_matchmaking_reuses_open_public_room() {
        let manager = manager();
        let first = manager.find_or_create_public().await;
        let second = manager.find_or_create_public().await;
        assert_eq!(first.room_id(), second.room_id());
        assert_eq!(manager.room_count().await, 1);
        assert_eq!(manager.rooms_spawned(), 1);
    }

    #[tokio::test]
    async fn test_private_rooms_are_not_matchmade_or_listed() {
        let manager = manager();
        let private = manager.create_private().await;
        let public = manager.find_or_create_public().await;
        assert_ne!(private.room_id(), public.room_id());

        let listed: Vec<RoomId> = manager.list_rooms().await.iter().map(|s| s.room_id).collect();
        assert_eq!(listed, vec![public.room_id()]);
    }

    #[tokio::test]
    async fn test_join_by_code_ignores_case() {
        let manager = manager();
        let private = manager.create_private().await;
        let code = private.code().unwrap().to_ascii_lowercase();

        let found = manager.join_by_code(&code).await.unwrap();
        assert_eq!(found.room_id(), private.room_id());

        assert!(matches!(
            manager.join_by_code("NOPE42").await,
            Err(RoomError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_taken_code_is_regenerated() {
        let manager = manager();
        let taken = manager.create_private().await.code().unwrap().to_string();

        let mut script = vec!["FRESH1".to_string(), taken.clone()];
        let rooms = manager.rooms.read().await;
        let code = unique_code(&rooms, || script.pop().unwrap());
        assert_eq!(code, "FRESH1");
        assert!(script.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_private_rooms_get_distinct_codes() {
        let manager = Arc::new(manager());
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.create_private().await })
            })
            .collect();

        let mut codes = std::collections::HashSet::new();
        for task in tasks {
            let handle = task.await.unwrap();
            assert!(codes.insert(handle.code().unwrap().to_string()));
        }
        assert_eq!(manager.room_count().await, 32);
        assert_eq!(manager.rooms_spawned(), 32);
    }

    #[tokio::test]
    async fn test_shut_down_rooms_are_pruned() {
        let manager = manager();
        let handle = manager.create_room().await;
        handle.shutdown().await.unwrap();

        // Give the actor a chance to stop
        for _ in 0..10 {
            tokio::task::yield_now().await;
            if handle.is_closed() {
                break;
            }
        }
        assert!(handle.is_closed());
        assert_eq!(manager.prune().await, 1);
        assert!(manager.get(handle.room_id()).await.is_none());
    }
}
