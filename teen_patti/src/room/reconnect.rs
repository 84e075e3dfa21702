//! Disconnect grace records.

use super::models::UserId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// One outstanding grace window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceRecord {
    pub user_id: UserId,
    pub disconnected_at: Instant,
}

/// How a reconnect attempt lines up with the grace window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// Back inside the window; the seat resumes as it was
    WithinGrace,
    /// The window ran out before the actor processed the expiry
    GraceElapsed,
    /// No record for this user
    Unknown,
}

/// Tracks disconnected players of one room. At most one record per player.
#[derive(Debug)]
pub struct ReconnectManager {
    grace: Duration,
    records: HashMap<UserId, GraceRecord>,
}

impl ReconnectManager {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            records: HashMap::new(),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Open a grace window, replacing any stale record for the same user
    pub fn begin(&mut self, user_id: UserId, disconnected_at: Instant) {
        self.records.insert(
            user_id,
            GraceRecord {
                user_id,
                disconnected_at,
            },
        );
    }

    /// Resolve a reconnect at `now`, clearing the record
    pub fn reconnect(&mut self, user_id: UserId, now: Instant) -> ReconnectOutcome {
        match self.records.remove(&user_id) {
            Some(record) if now.duration_since(record.disconnected_at) < self.grace => {
                ReconnectOutcome::WithinGrace
            }
            Some(_) => ReconnectOutcome::GraceElapsed,
            None => ReconnectOutcome::Unknown,
        }
    }

    /// Clear the record when the grace timer fires. Returns the record if it
    /// was still outstanding.
    pub fn expire(&mut self, user_id: UserId) -> Option<GraceRecord> {
        self.records.remove(&user_id)
    }

    pub fn is_pending(&self, user_id: UserId) -> bool {
        self.records.contains_key(&user_id)
    }

    /// Drop every record, e.g. when the room is torn down
    pub fn clear(&mut self) -> Vec<UserId> {
        self.records.drain().map(|(user_id, _)| user_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_within_grace() {
        let mut manager = ReconnectManager::new(Duration::from_secs(10));
        manager.begin(1, Instant::now());

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(
            manager.reconnect(1, Instant::now()),
            ReconnectOutcome::WithinGrace
        );
        assert!(!manager.is_pending(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_grace() {
        let mut manager = ReconnectManager::new(Duration::from_secs(10));
        manager.begin(1, Instant::now());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(
            manager.reconnect(1, Instant::now()),
            ReconnectOutcome::GraceElapsed
        );
    }

    #[test]
    fn test_expire_resolves_once() {
        let mut manager = ReconnectManager::new(Duration::from_secs(10));
        manager.begin(3, Instant::now());
        assert!(manager.expire(3).is_some());
        assert!(manager.expire(3).is_none());
        assert_eq!(
            manager.reconnect(3, Instant::now()),
            ReconnectOutcome::Unknown
        );
    }

    #[test]
    fn test_one_record_per_player() {
        let mut manager = ReconnectManager::new(Duration::from_secs(10));
        let first = Instant::now();
        manager.begin(2, first);
        manager.begin(2, first + Duration::from_secs(1));
        assert_eq!(manager.clear(), vec![2]);
    }
}
