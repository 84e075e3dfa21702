//! Pending sideshow requests of one room.

use super::models::UserId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A sideshow waiting on the opponent's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSideshow {
    pub requester: UserId,
    pub opponent: UserId,
    pub requested_at: Instant,
    pub wait: Duration,
}

/// How a sideshow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideshowOutcome {
    Accepted,
    Declined,
    TimedOut,
    /// One side left the round before answering
    Abandoned,
}

/// Requests keyed by (requester, opponent)
#[derive(Debug, Default)]
pub struct SideshowRegistry {
    pending: HashMap<(UserId, UserId), PendingSideshow>,
}

impl SideshowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. Only one may be outstanding per room at a time.
    pub fn open(
        &mut self,
        requester: UserId,
        opponent: UserId,
        wait: Duration,
    ) -> Result<PendingSideshow, String> {
        if !self.pending.is_empty() {
            return Err("A sideshow is already pending".to_string());
        }
        let request = PendingSideshow {
            requester,
            opponent,
            requested_at: Instant::now(),
            wait,
        };
        self.pending.insert((requester, opponent), request);
        Ok(request)
    }

    /// Remove and return the request addressed to `opponent`
    pub fn take_for_opponent(&mut self, opponent: UserId) -> Option<PendingSideshow> {
        let key = self.pending.keys().find(|(_, o)| *o == opponent).copied()?;
        self.pending.remove(&key)
    }

    /// Remove and return a specific request
    pub fn take(&mut self, requester: UserId, opponent: UserId) -> Option<PendingSideshow> {
        self.pending.remove(&(requester, opponent))
    }

    /// Remove and return the request `user_id` is part of, on either side
    pub fn take_involving(&mut self, user_id: UserId) -> Option<PendingSideshow> {
        let key = self
            .pending
            .keys()
            .find(|(r, o)| *r == user_id || *o == user_id)
            .copied()?;
        self.pending.remove(&key)
    }

    /// The outstanding request, if any, left in place
    pub fn current(&self) -> Option<PendingSideshow> {
        self.pending.values().next().copied()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn clear(&mut self) -> Vec<PendingSideshow> {
        self.pending.drain().map(|(_, request)| request).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_resolves_exactly_once() {
        let mut registry = SideshowRegistry::new();
        registry.open(1, 2, Duration::from_secs(20)).unwrap();

        let request = registry.take_for_opponent(2).unwrap();
        assert_eq!((request.requester, request.opponent), (1, 2));
        assert!(registry.take_for_opponent(2).is_none());
        assert!(!registry.has_pending());
    }

    #[test]
    fn test_only_one_pending_request() {
        let mut registry = SideshowRegistry::new();
        registry.open(1, 2, Duration::from_secs(20)).unwrap();
        assert!(registry.open(3, 1, Duration::from_secs(20)).is_err());
    }

    #[test]
    fn test_requester_cannot_answer_own_request() {
        let mut registry = SideshowRegistry::new();
        registry.open(1, 2, Duration::from_secs(20)).unwrap();
        assert!(registry.take_for_opponent(1).is_none());
        assert!(registry.take_involving(1).is_some());
    }
}
