//! Turn clock and cancellable delayed events for one room.
//!
//! [`TurnTimer`] answers "how long does the turn holder have left" and guards
//! expiry against stale holders. [`Scheduler`] owns every background delay of
//! the room (turn expiry, reconnect grace, start and restart delays, bot
//! thinking, sideshow waits). A delay delivers a [`TimerFired`] into the
//! actor's timer channel; the actor claims it with [`Scheduler::claim`], which
//! rejects anything cancelled or superseded after it was sent.

use super::models::UserId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep},
};

/// Turn timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running {
        user_id: UserId,
        started_at: Instant,
    },
    Expired {
        user_id: UserId,
    },
    Cancelled,
}

/// Clock for the current turn holder
#[derive(Debug)]
pub struct TurnTimer {
    duration: Duration,
    state: TimerState,
}

impl TurnTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: TimerState::Idle,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Start the clock for `user_id`, replacing whatever was running
    pub fn start(&mut self, user_id: UserId) {
        self.state = TimerState::Running {
            user_id,
            started_at: Instant::now(),
        };
    }

    /// Stop a running clock. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            TimerState::Running { .. } => {
                self.state = TimerState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Mark the clock expired if it is still running for `user_id`
    pub fn expire(&mut self, user_id: UserId) -> bool {
        match self.state {
            TimerState::Running { user_id: holder, .. } if holder == user_id => {
                self.state = TimerState::Expired { user_id };
                true
            }
            _ => false,
        }
    }

    /// Who the clock is running for
    pub fn holder(&self) -> Option<UserId> {
        match self.state {
            TimerState::Running { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    /// Time left for `user_id`, floored at zero. `None` unless the clock is
    /// running for that user.
    pub fn remaining(&self, user_id: UserId) -> Option<Duration> {
        match self.state {
            TimerState::Running {
                user_id: holder,
                started_at,
            } if holder == user_id => Some(self.duration.saturating_sub(started_at.elapsed())),
            _ => None,
        }
    }
}

/// A named delay owned by a room. At most one is live per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Turn,
    JoinGrace,
    Restart,
    BotThink,
    ReconnectGrace(UserId),
    Sideshow { requester: UserId, opponent: UserId },
}

/// Delivered to the actor when a delay elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub slot: TimerSlot,
    pub generation: u64,
}

/// Spawns and cancels the room's delayed events
#[derive(Debug)]
pub struct Scheduler {
    sender: mpsc::UnboundedSender<TimerFired>,
    live: HashMap<TimerSlot, (u64, JoinHandle<()>)>,
    next_generation: u64,
}

impl Scheduler {
    pub fn new(sender: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            sender,
            live: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Arm `slot` to fire after `delay`, cancelling and awaiting any delay
    /// already armed on it first.
    pub async fn schedule(&mut self, slot: TimerSlot, delay: Duration) {
        self.cancel(slot).await;

        let generation = self.next_generation;
        self.next_generation += 1;

        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = sender.send(TimerFired { slot, generation });
        });

        self.live.insert(slot, (generation, task));
    }

    /// Cancel `slot` and wait for its task to stop. Returns whether it was armed.
    pub async fn cancel(&mut self, slot: TimerSlot) -> bool {
        match self.live.remove(&slot) {
            Some((_, task)) => {
                task.abort();
                let _ = task.await;
                true
            }
            None => false,
        }
    }

    /// Cancel every slot matching `predicate`
    pub async fn cancel_where<P>(&mut self, predicate: P)
    where
        P: Fn(&TimerSlot) -> bool,
    {
        let slots: Vec<TimerSlot> = self.live.keys().filter(|s| predicate(s)).copied().collect();
        for slot in slots {
            self.cancel(slot).await;
        }
    }

    pub async fn cancel_all(&mut self) {
        self.cancel_where(|_| true).await;
    }

    /// Accept a fired event if it belongs to the delay currently armed on its
    /// slot. Cancelled or superseded events are rejected.
    pub fn claim(&mut self, fired: &TimerFired) -> bool {
        match self.live.get(&fired.slot) {
            Some((generation, _)) if *generation == fired.generation => {
                self.live.remove(&fired.slot);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.live.contains_key(&slot)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, task) in self.live.values() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_and_floors_at_zero() {
        let mut timer = TurnTimer::new(Duration::from_secs(30));
        timer.start(1);

        tokio::time::advance(Duration::from_secs(12)).await;
        assert_eq!(timer.remaining(1), Some(Duration::from_secs(18)));
        assert_eq!(timer.remaining(2), None);

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(timer.remaining(1), Some(Duration::ZERO));
    }

    #[test]
    fn test_expire_only_for_current_holder() {
        let mut timer = TurnTimer::new(Duration::from_secs(30));
        timer.start(1);
        assert!(!timer.expire(2));
        assert!(timer.expire(1));
        assert_eq!(timer.state(), TimerState::Expired { user_id: 1 });
        assert!(!timer.expire(1), "expiry applies once");
    }

    #[test]
    fn test_cancelled_timer_cannot_expire() {
        let mut timer = TurnTimer::new(Duration::from_secs(30));
        timer.start(1);
        assert!(timer.cancel());
        assert!(!timer.expire(1));
        assert_eq!(timer.holder(), None);
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_event_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        scheduler.schedule(TimerSlot::Turn, Duration::from_secs(30)).await;
        let fired = rx.recv().await.unwrap();

        assert_eq!(fired.slot, TimerSlot::Turn);
        assert!(scheduler.claim(&fired));
        assert!(!scheduler.claim(&fired), "a claimed event is spent");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_supersedes_previous_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        scheduler.schedule(TimerSlot::Turn, Duration::from_secs(1)).await;
        scheduler.schedule(TimerSlot::Turn, Duration::from_secs(5)).await;

        let fired = rx.recv().await.unwrap();
        assert!(scheduler.claim(&fired));
        assert!(rx.try_recv().is_err(), "the first delay never fires");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_event_is_rejected_even_if_already_sent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        scheduler
            .schedule(TimerSlot::ReconnectGrace(4), Duration::from_secs(10))
            .await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        // Fired but not yet claimed when the cancel lands
        assert!(scheduler.cancel(TimerSlot::ReconnectGrace(4)).await);
        let fired = rx.recv().await.unwrap();
        assert!(!scheduler.claim(&fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_where_only_hits_matching_slots() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        scheduler.schedule(TimerSlot::Turn, Duration::from_secs(30)).await;
        scheduler
            .schedule(TimerSlot::ReconnectGrace(1), Duration::from_secs(10))
            .await;

        scheduler
            .cancel_where(|slot| matches!(slot, TimerSlot::ReconnectGrace(_)))
            .await;

        assert!(scheduler.is_armed(TimerSlot::Turn));
        assert!(!scheduler.is_armed(TimerSlot::ReconnectGrace(1)));
    }
}
