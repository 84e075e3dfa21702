//! Room actor implementation with async message handling.
//!
//! One actor owns one room. Player actions, disconnects and timer expiries all
//! arrive on the actor's channels and are applied one at a time, so the pot,
//! the turn pointer and the clocks can never be mutated concurrently.
//!
//! Every externally triggered transition runs against a checkpoint of the
//! room: if it fails part way the checkpoint is restored, ledger adjustments
//! made along the way are reversed and the turn clock is re-armed, so the next
//! action always finds a consistent table.

use super::{
    config::RoomConfig,
    errors::{RoomError, RoomResult},
    events::{Outbound, RoomSummary, ServerEvent, Snapshot},
    gateway::{ConnectionId, Gateway, close_connection},
    messages::{ClientAction, Identity, RoomMessage, RoomResponse},
    models::{Phase, Room, RoomId, Seat, UserId},
    reconnect::{ReconnectManager, ReconnectOutcome},
    sideshow::{PendingSideshow, SideshowOutcome, SideshowRegistry},
    store::{RoomStore, StoreError},
    timer::{Scheduler, TimerFired, TimerSlot, TurnTimer},
};
use crate::{
    bot::{BotDecision, BotDecisionContext, BotManager},
    game::{self, Card, HAND_SIZE, PrevBet, Winner},
    history::{EventSink, GameAction, GameEvent, SeatSnapshot},
    ledger::Ledger,
};
use chrono::Utc;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

/// Room actor handle for sending messages
#[derive(Debug, Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: RoomId,
    code: Option<String>,
    max_seats: usize,
    /// Real players seated, published by the actor
    occupancy: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Join code for private rooms
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_private(&self) -> bool {
        self.code.is_some()
    }

    pub fn max_seats(&self) -> usize {
        self.max_seats
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    pub fn has_free_seat(&self) -> bool {
        self.occupancy() < self.max_seats
    }

    /// The actor has stopped and the room is gone
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the room
    pub async fn send(&self, message: RoomMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Room is closed".to_string())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, String> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| "Room is closed".to_string())
    }

    /// Attach a connection for `identity`
    pub async fn join(
        &self,
        identity: Identity,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<Outbound>,
    ) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::Join {
            identity,
            connection_id,
            outbound,
            response,
        })
        .await
    }

    /// Submit a player action
    pub async fn act(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        action: ClientAction,
    ) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::Action {
            user_id,
            connection_id,
            action,
            response,
        })
        .await
    }

    /// Report a closed transport
    pub async fn disconnect(&self, user_id: UserId, connection_id: ConnectionId) {
        let _ = self
            .send(RoomMessage::Disconnect {
                user_id,
                connection_id,
            })
            .await;
    }

    pub async fn snapshot(&self, viewer: Option<UserId>) -> Result<Option<Snapshot>, String> {
        self.request(|response| RoomMessage::GetSnapshot { viewer, response })
            .await
    }

    pub async fn summary(&self) -> Result<Option<RoomSummary>, String> {
        self.request(|response| RoomMessage::GetSummary { response })
            .await
    }

    /// Take the room out of service
    pub async fn shutdown(&self) -> Result<(), String> {
        self.send(RoomMessage::Shutdown).await
    }
}

/// Room actor managing a single table
pub struct RoomActor {
    id: RoomId,
    config: RoomConfig,
    store: RoomStore,
    gateway: Gateway,
    turn_timer: TurnTimer,
    scheduler: Scheduler,
    reconnects: ReconnectManager,
    sideshows: SideshowRegistry,
    bots: BotManager,
    ledger: Arc<dyn Ledger>,
    history: Arc<dyn EventSink>,
    inbox: mpsc::Receiver<RoomMessage>,
    timers: mpsc::UnboundedReceiver<TimerFired>,
    occupancy: Arc<AtomicUsize>,
    /// Ledger adjustments applied by the transition in progress
    journal: Vec<(UserId, i64)>,
    /// A round start is armed; later joins must not arm another
    starting: bool,
    stopped: bool,
}

impl RoomActor {
    /// Create a new room actor and its handle
    pub fn new(
        id: RoomId,
        code: Option<String>,
        config: RoomConfig,
        ledger: Arc<dyn Ledger>,
        history: Arc<dyn EventSink>,
    ) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let (timer_sender, timers) = mpsc::unbounded_channel();
        let occupancy = Arc::new(AtomicUsize::new(0));

        let handle = RoomHandle {
            sender,
            room_id: id,
            code: code.clone(),
            max_seats: config.max_seats,
            occupancy: occupancy.clone(),
        };

        let actor = Self {
            id,
            store: RoomStore::new(Room::new(id, config.max_seats, code)),
            gateway: Gateway::new(id),
            turn_timer: TurnTimer::new(config.turn_timeout()),
            scheduler: Scheduler::new(timer_sender),
            reconnects: ReconnectManager::new(config.reconnect_grace()),
            sideshows: SideshowRegistry::new(),
            bots: BotManager::new(id, &config),
            config,
            ledger,
            history,
            inbox,
            timers,
            occupancy,
            journal: Vec::new(),
            starting: false,
            stopped: false,
        };

        (actor, handle)
    }

    /// Run the actor until the room is destroyed, shut down, or every handle
    /// is dropped
    pub async fn run(mut self) {
        log::info!("Room {}: starting", self.id);

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => break,
                },
                Some(fired) = self.timers.recv() => self.handle_timer(fired).await,
            }

            if self.stopped {
                break;
            }
        }

        self.scheduler.cancel_all().await;
        log::info!("Room {}: closed", self.id);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                identity,
                connection_id,
                outbound,
                response,
            } => {
                let result = self.handle_join(identity, connection_id, outbound).await;
                let _ = response.send(result);
            }

            RoomMessage::Action {
                user_id,
                connection_id,
                action,
                response,
            } => {
                let result = self.handle_action(user_id, connection_id, action).await;
                let _ = response.send(result);
            }

            RoomMessage::Disconnect {
                user_id,
                connection_id,
            } => self.handle_disconnect(user_id, connection_id).await,

            RoomMessage::GetSnapshot { viewer, response } => {
                let snapshot = match self.store.get_room() {
                    Ok(room) => Some(Snapshot::for_viewer(room, viewer, self.gateway.stamp())),
                    Err(_) => None,
                };
                let _ = response.send(snapshot);
            }

            RoomMessage::GetSummary { response } => {
                let _ = response.send(self.store.get_room().ok().map(RoomSummary::of));
            }

            RoomMessage::Shutdown => {
                self.store.shutdown();
                self.escalate(&RoomError::from(StoreError::Unavailable)).await;
            }
        }
    }

    // === Transition plumbing ===

    async fn checkpoint(&mut self) -> RoomResult<Room> {
        match self.store.checkpoint() {
            Ok(room) => Ok(room),
            Err(e) => {
                let error = RoomError::from(e);
                if error.is_fatal() {
                    self.escalate(&error).await;
                }
                Err(error)
            }
        }
    }

    /// Commit or roll back a finished transition
    async fn settle<T>(&mut self, checkpoint: Room, result: RoomResult<T>) -> RoomResult<T> {
        match result {
            Ok(value) => {
                self.journal.clear();
                Ok(value)
            }
            Err(e) if e.is_fatal() => {
                self.journal.clear();
                self.escalate(&e).await;
                Err(e)
            }
            Err(e) => {
                self.undo(checkpoint).await;
                if let Err(recovery) = self.recover_turn_clock().await {
                    log::error!(
                        "Room {}: failed to re-arm the turn clock after rollback: {}",
                        self.id,
                        recovery
                    );
                }
                Err(e)
            }
        }
    }

    /// Reverse journaled ledger adjustments and restore `checkpoint`
    async fn undo(&mut self, checkpoint: Room) {
        for (user_id, delta) in std::mem::take(&mut self.journal).into_iter().rev() {
            if let Err(e) = self.ledger.adjust_balance(user_id, -delta).await {
                log::error!(
                    "Room {}: failed to reverse adjustment of {} for user {}: {}",
                    self.id,
                    delta,
                    user_id,
                    e
                );
            }
        }

        if let Err(e) = self.store.restore(checkpoint) {
            log::error!("Room {}: failed to restore checkpoint: {}", self.id, e);
        }
    }

    /// Make sure a betting round always has a running clock
    async fn recover_turn_clock(&mut self) -> RoomResult<()> {
        let next = {
            let room = self.store.get_room()?;
            if room.phase != Phase::Betting
                || self.sideshows.has_pending()
                || self.scheduler.is_armed(TimerSlot::Turn)
            {
                return Ok(());
            }
            if room.turn_holder().is_some() {
                Some(room.turn)
            } else {
                room.first_active_from(room.turn)
            }
        };

        if let Some(idx) = next {
            self.begin_turn(idx).await?;
        }
        Ok(())
    }

    /// Close every connection and stop the actor
    async fn escalate(&mut self, error: &RoomError) {
        log::error!("Room {}: {}, closing all connections", self.id, error);
        self.scheduler.cancel_all().await;
        self.turn_timer.cancel();
        self.gateway.close_all("Room unavailable");
        self.occupancy.store(0, Ordering::Relaxed);
        self.stopped = true;
    }

    fn publish(&mut self) {
        if let Ok(room) = self.store.get_room() {
            self.gateway.broadcast_snapshot(room);
        }
    }

    fn sync_occupancy(&self) {
        if let Ok(room) = self.store.get_room() {
            self.occupancy.store(room.real_count(), Ordering::Relaxed);
        }
    }

    fn record(&self, user_id: UserId, action: GameAction, amount: i64) {
        let Ok(room) = self.store.get_room() else {
            return;
        };
        let Some(seat) = room.seat(user_id) else {
            return;
        };

        self.history.record(GameEvent {
            room_id: self.id,
            round: room.round_number,
            seat: SeatSnapshot::from(seat),
            action,
            amount,
            timestamp: Utc::now(),
        });
    }

    // === Coins ===

    /// Take `amount` from a player. Bots pay from their own stack.
    async fn debit(&mut self, user_id: UserId, amount: i64) -> RoomResult<i64> {
        let (is_bot, balance) = {
            let seat = self.store.get_seat(user_id)?;
            (seat.is_bot, seat.balance)
        };

        let balance = if is_bot {
            if balance < amount {
                return Err(RoomError::InsufficientBalance {
                    available: balance,
                    required: amount,
                });
            }
            balance - amount
        } else {
            let balance = self.ledger.adjust_balance(user_id, -amount).await?;
            self.journal.push((user_id, -amount));
            balance
        };

        self.store.mutate_seat(user_id, |seat| seat.balance = balance)?;
        Ok(balance)
    }

    async fn credit(&mut self, user_id: UserId, amount: i64) -> RoomResult<i64> {
        let (is_bot, balance) = {
            let seat = self.store.get_seat(user_id)?;
            (seat.is_bot, seat.balance)
        };

        let balance = if is_bot {
            balance + amount
        } else {
            let balance = self.ledger.adjust_balance(user_id, amount).await?;
            self.journal.push((user_id, amount));
            balance
        };

        self.store.mutate_seat(user_id, |seat| seat.balance = balance)?;
        Ok(balance)
    }

    /// Put a stake in the pot and make it the player's current bet
    async fn stake(&mut self, user_id: UserId, amount: i64, action: GameAction) -> RoomResult<()> {
        let expected = self.store.get_room()?.pot + amount;

        self.debit(user_id, amount).await?;
        self.cancel_turn().await;

        self.store.mutate_room(|room| {
            room.pot += amount;
            if let Some(seat) = room.seat_mut(user_id) {
                seat.current_bet = amount;
            }
        })?;

        self.record(user_id, action, amount);
        self.verify_pot(expected)
    }

    /// Restore the known-good pot if it drifted
    fn verify_pot(&mut self, expected: i64) -> RoomResult<()> {
        let pot = self.store.get_room()?.pot;
        if pot != expected {
            log::warn!(
                "Room {}: pot integrity violation (found {}, expected {}), restoring",
                self.id,
                pot,
                expected
            );
            self.store.mutate_room(|room| room.pot = expected)?;
        }
        Ok(())
    }

    // === Turn sequencing ===

    async fn cancel_turn(&mut self) {
        self.turn_timer.cancel();
        self.scheduler.cancel(TimerSlot::Turn).await;
        self.scheduler.cancel(TimerSlot::BotThink).await;
    }

    /// Hand the turn to seat `idx` and start its clock
    async fn begin_turn(&mut self, idx: usize) -> RoomResult<()> {
        self.cancel_turn().await;

        let (user_id, is_bot) = {
            let room = self.store.get_room()?;
            let seat = room
                .seats
                .get(idx)
                .ok_or_else(|| RoomError::validation("Turn pointer out of range"))?;
            (seat.user_id, seat.is_bot)
        };

        self.store.mutate_room(|room| room.turn = idx)?;
        self.turn_timer.start(user_id);

        let timeout = self.turn_timer.duration();
        self.scheduler.schedule(TimerSlot::Turn, timeout).await;
        self.gateway.broadcast(ServerEvent::TimerStart {
            player_id: user_id,
            duration: whole_secs(timeout),
        });

        if is_bot {
            let delay = self.bots.think_delay();
            self.scheduler.schedule(TimerSlot::BotThink, delay).await;
        }

        Ok(())
    }

    async fn advance_turn(&mut self) -> RoomResult<()> {
        let next = {
            let room = self.store.get_room()?;
            if room.active_count() <= 1 {
                None
            } else {
                room.next_active_after(room.turn)
            }
        };

        match next {
            Some(idx) => self.begin_turn(idx).await,
            None => self.award_last_standing().await,
        }
    }

    /// After a stake: force the showdown at the table limit, else pass the turn
    async fn after_stake(&mut self) -> RoomResult<()> {
        let (pot, limit) = {
            let room = self.store.get_room()?;
            (room.pot, room.table_limit)
        };

        if limit > 0 && pot >= limit {
            log::info!(
                "Room {}: pot {} reached table limit {}, forcing showdown",
                self.id,
                pot,
                limit
            );
            self.forced_showdown().await
        } else {
            self.advance_turn().await
        }
    }

    fn fold(&mut self, user_id: UserId) -> RoomResult<()> {
        self.store.mutate_seat(user_id, |seat| seat.is_folded = true)?;
        Ok(())
    }

    /// The acting player must hold the turn in an open betting round
    fn require_turn(&self, user_id: UserId) -> RoomResult<usize> {
        let room = self.store.get_room()?;
        let seat = self.store.get_seat(user_id)?;

        if room.phase != Phase::Betting {
            return Err(RoomError::validation("Betting is not open"));
        }
        if !seat.is_active() {
            return Err(RoomError::validation("You are not playing this round"));
        }
        if room.turn_holder().map(|s| s.user_id) != Some(user_id) {
            return Err(RoomError::validation("Not your turn"));
        }
        if self.sideshows.has_pending() {
            return Err(RoomError::validation("Waiting for a sideshow response"));
        }

        Ok(room.turn)
    }

    // === Player actions ===

    async fn handle_action(
        &mut self,
        user_id: UserId,
        connection_id: ConnectionId,
        action: ClientAction,
    ) -> RoomResponse {
        if !self.gateway.is_current(user_id, connection_id) {
            return RoomResponse::Error("Connection is no longer active".to_string());
        }

        let name = action.name();
        let result = match self.checkpoint().await {
            Ok(checkpoint) => {
                let result = self.dispatch_action(user_id, action).await;
                self.settle(checkpoint, result).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                log::info!("Room {}: user {} {}", self.id, user_id, name);
                self.publish();
                RoomResponse::Success
            }
            Err(e) => {
                log::debug!(
                    "Room {}: rejected {} from user {}: {}",
                    self.id,
                    name,
                    user_id,
                    e
                );
                let message = e.client_message();
                if !e.is_fatal() {
                    self.gateway.send(user_id, ServerEvent::error(message.clone()));
                }
                RoomResponse::Error(message)
            }
        }
    }

    async fn dispatch_action(&mut self, user_id: UserId, action: ClientAction) -> RoomResult<()> {
        match action {
            ClientAction::PlaceBet { amount } => self.place_bet(user_id, amount).await,
            ClientAction::PlaceDoubleBet { amount } => self.place_double_bet(user_id, amount).await,
            ClientAction::Pack => self.pack(user_id).await,
            ClientAction::Sideshow {
                opponent_id,
                amount,
            } => self.request_sideshow(user_id, opponent_id, amount).await,
            ClientAction::SideshowResponse { accept } => self.answer_sideshow(user_id, accept).await,
            ClientAction::ToggleSeen => self.toggle_seen(user_id),
            ClientAction::Show => self.show(user_id).await,
        }
    }

    async fn place_bet(&mut self, user_id: UserId, amount: i64) -> RoomResult<()> {
        let idx = self.require_turn(user_id)?;
        if amount <= 0 {
            return Err(RoomError::validation("Bet amount must be positive"));
        }

        let minimum = {
            let room = self.store.get_room()?;
            game::min_bet(room.seats[idx].is_blind, prev_bet(room, idx))
        };
        if amount < minimum {
            return Err(RoomError::validation(format!("Minimum bet is {minimum}")));
        }

        self.stake(user_id, amount, GameAction::Bet).await?;
        self.after_stake().await
    }

    async fn place_double_bet(&mut self, user_id: UserId, amount: i64) -> RoomResult<()> {
        let idx = self.require_turn(user_id)?;

        let required = {
            let room = self.store.get_room()?;
            game::double_bet(room.seats[idx].is_blind, prev_bet(room, idx))
        };
        if amount != required {
            return Err(RoomError::validation(format!(
                "Double bet must be exactly {required}"
            )));
        }

        self.stake(user_id, amount, GameAction::DoubleBet).await?;
        self.after_stake().await
    }

    /// Fold out of the round. Allowed out of turn; the turn only moves if the
    /// packer held it or a pending sideshow with them is dropped.
    async fn pack(&mut self, user_id: UserId) -> RoomResult<()> {
        let (held_turn, username) = {
            let room = self.store.get_room()?;
            let seat = self.store.get_seat(user_id)?;
            if room.phase != Phase::Betting {
                return Err(RoomError::validation("Betting is not open"));
            }
            if seat.is_spectator {
                return Err(RoomError::validation("You are not playing this round"));
            }
            if seat.is_folded {
                return Err(RoomError::validation("You have already packed"));
            }
            (
                room.turn_holder().is_some_and(|s| s.user_id == user_id),
                seat.username.clone(),
            )
        };

        if held_turn {
            self.cancel_turn().await;
        }
        let abandoned = self.abandon_sideshow(user_id).await?;

        self.fold(user_id)?;
        self.record(user_id, GameAction::Pack, 0);
        self.gateway.broadcast(ServerEvent::PlayerPacked {
            player_id: user_id,
            message: format!("{username} packed"),
        });

        if self.store.get_room()?.active_count() <= 1 {
            self.award_last_standing().await
        } else if held_turn || abandoned {
            self.advance_turn().await
        } else {
            Ok(())
        }
    }

    /// Look at one's own cards. Does not use up the turn.
    fn toggle_seen(&mut self, user_id: UserId) -> RoomResult<()> {
        let pot = {
            let room = self.store.get_room()?;
            let seat = self.store.get_seat(user_id)?;
            if room.phase != Phase::Betting {
                return Err(RoomError::validation("Betting is not open"));
            }
            if !seat.is_active() {
                return Err(RoomError::validation("You are not playing this round"));
            }
            if !seat.is_blind {
                return Err(RoomError::validation("You have already seen your cards"));
            }
            room.pot
        };

        self.store.mutate_seat(user_id, |seat| seat.is_blind = false)?;
        self.verify_pot(pot)
    }

    /// Call a show against the other remaining player. The caller's hand is
    /// compared first, so an exact tie goes to the caller.
    async fn show(&mut self, user_id: UserId) -> RoomResult<()> {
        let idx = self.require_turn(user_id)?;

        let (stake, own_hand, other_id, other_hand) = {
            let room = self.store.get_room()?;
            if room.active_count() != 2 {
                return Err(RoomError::validation(
                    "Show is only allowed when two players remain",
                ));
            }
            let other_idx = room
                .prev_active_before(idx)
                .ok_or_else(|| RoomError::validation("No opponent for a show"))?;
            let own = &room.seats[idx];
            let other = &room.seats[other_idx];
            (
                game::show_stake(own.is_blind, other.as_prev_bet()),
                own.hand.clone(),
                other.user_id,
                other.hand.clone(),
            )
        };

        if stake > 0 {
            self.stake(user_id, stake, GameAction::Show).await?;
        } else {
            self.cancel_turn().await;
            self.record(user_id, GameAction::Show, 0);
        }

        let (winner_id, hand_winner, hand_loser) = match game::compare(&own_hand, &other_hand)? {
            Winner::First => (user_id, own_hand, other_hand),
            Winner::Second => (other_id, other_hand, own_hand),
        };

        log::info!("Room {}: user {} called a show", self.id, user_id);
        self.finish_showdown(winner_id, hand_winner, hand_loser).await
    }

    async fn request_sideshow(
        &mut self,
        user_id: UserId,
        opponent_id: UserId,
        amount: Option<i64>,
    ) -> RoomResult<()> {
        let idx = self.require_turn(user_id)?;

        let (requester_name, opponent_is_bot) = {
            let room = self.store.get_room()?;
            let seat = &room.seats[idx];
            let prev_idx = room
                .prev_active_before(idx)
                .ok_or_else(|| RoomError::validation("No previous player for a sideshow"))?;
            let opponent = &room.seats[prev_idx];

            if opponent.user_id != opponent_id {
                return Err(RoomError::validation(
                    "Sideshow can only be requested with the previous player",
                ));
            }
            if seat.is_blind || opponent.is_blind {
                return Err(RoomError::validation(
                    "Sideshow is only available between seen players",
                ));
            }
            if amount.is_some_and(|a| a <= 0) {
                return Err(RoomError::validation("Sideshow amount must be positive"));
            }
            if amount.unwrap_or(seat.current_bet) < opponent.current_bet {
                return Err(RoomError::validation(
                    "You must match the previous bet for a sideshow",
                ));
            }
            (seat.username.clone(), opponent.is_bot)
        };

        // The opponent gets whatever is left of the requester's clock
        let wait = self
            .turn_timer
            .remaining(user_id)
            .filter(|remaining| !remaining.is_zero())
            .unwrap_or(self.config.sideshow_fallback());

        if let Some(amount) = amount {
            self.stake(user_id, amount, GameAction::SideshowBet).await?;
            let room = self.store.get_room()?;
            if room.table_limit > 0 && room.pot >= room.table_limit {
                return self.forced_showdown().await;
            }
        }

        self.cancel_turn().await;
        let request = self
            .sideshows
            .open(user_id, opponent_id, wait)
            .map_err(RoomError::Validation)?;
        self.scheduler
            .schedule(
                TimerSlot::Sideshow {
                    requester: request.requester,
                    opponent: request.opponent,
                },
                wait,
            )
            .await;

        log::info!(
            "Room {}: user {} requested a sideshow with user {}",
            self.id,
            user_id,
            opponent_id
        );
        self.gateway.broadcast(ServerEvent::SideshowRequest {
            requester_id: user_id,
            requester_name,
            opponent_id,
            wait: whole_secs(wait),
        });

        if opponent_is_bot {
            let delay = self.bots.think_delay().min(wait);
            self.scheduler.schedule(TimerSlot::BotThink, delay).await;
        }

        Ok(())
    }

    /// Answering twice is an error with no effect: the first answer consumed
    /// the request.
    async fn answer_sideshow(&mut self, user_id: UserId, accept: bool) -> RoomResult<()> {
        let request = self
            .sideshows
            .take_for_opponent(user_id)
            .ok_or_else(|| RoomError::validation("No active sideshow request"))?;

        self.scheduler
            .cancel(TimerSlot::Sideshow {
                requester: request.requester,
                opponent: request.opponent,
            })
            .await;

        let outcome = if accept {
            SideshowOutcome::Accepted
        } else {
            SideshowOutcome::Declined
        };
        self.resolve_sideshow(request, outcome).await
    }

    /// Drop a pending sideshow `user_id` is part of. Returns whether one was
    /// pending.
    async fn abandon_sideshow(&mut self, user_id: UserId) -> RoomResult<bool> {
        let Some(request) = self.sideshows.take_involving(user_id) else {
            return Ok(false);
        };

        self.scheduler
            .cancel(TimerSlot::Sideshow {
                requester: request.requester,
                opponent: request.opponent,
            })
            .await;
        self.resolve_sideshow(request, SideshowOutcome::Abandoned)
            .await?;
        Ok(true)
    }

    async fn clear_sideshows(&mut self) {
        for request in self.sideshows.clear() {
            self.scheduler
                .cancel(TimerSlot::Sideshow {
                    requester: request.requester,
                    opponent: request.opponent,
                })
                .await;
        }
    }

    /// Announce the outcome and, unless the sideshow was abandoned, pass the
    /// turn on from the requester.
    async fn resolve_sideshow(
        &mut self,
        request: PendingSideshow,
        outcome: SideshowOutcome,
    ) -> RoomResult<()> {
        let (requester, opponent) = {
            let room = self.store.get_room()?;
            (
                room.seat(request.requester).cloned(),
                room.seat(request.opponent).cloned(),
            )
        };
        let opponent_name = opponent
            .as_ref()
            .map_or_else(|| request.opponent.to_string(), |s| s.username.clone());

        let result = match outcome {
            SideshowOutcome::Accepted => {
                let (Some(requester), Some(opponent)) = (requester, opponent) else {
                    return Err(RoomError::validation("Sideshow player left the room"));
                };
                let (winner, loser) = match game::compare(&requester.hand, &opponent.hand)? {
                    Winner::First => (requester, opponent),
                    Winner::Second => (opponent, requester),
                };

                self.fold(loser.user_id)?;
                self.record(loser.user_id, GameAction::Pack, 0);

                ServerEvent::SideshowResult {
                    message: format!(
                        "Sideshow: {} wins against {}!",
                        winner.username, loser.username
                    ),
                    winner_id: Some(winner.user_id),
                    loser_id: Some(loser.user_id),
                    packed_player: Some(loser.user_id),
                }
            }
            SideshowOutcome::Declined => no_comparison(format!("Sideshow declined by {opponent_name}")),
            SideshowOutcome::TimedOut => {
                no_comparison(format!("Sideshow declined by {opponent_name} (timeout)"))
            }
            SideshowOutcome::Abandoned => no_comparison(format!(
                "Sideshow with {opponent_name} cancelled, a player left the round"
            )),
        };

        log::info!(
            "Room {}: sideshow {} -> {} resolved as {:?}",
            self.id,
            request.requester,
            request.opponent,
            outcome
        );
        self.gateway.broadcast(result);

        if outcome == SideshowOutcome::Abandoned {
            return Ok(());
        }
        self.advance_turn().await
    }

    // === Round resolution ===

    /// Compare every remaining hand with a running winner
    async fn forced_showdown(&mut self) -> RoomResult<()> {
        self.cancel_turn().await;
        self.clear_sideshows().await;

        let contenders: Vec<(UserId, Vec<Card>)> = self
            .store
            .get_room()?
            .seats
            .iter()
            .filter(|s| s.is_active())
            .map(|s| (s.user_id, s.hand.clone()))
            .collect();

        if contenders.len() < 2 {
            return self.award_last_standing().await;
        }

        let hands: Vec<&[Card]> = contenders.iter().map(|(_, h)| h.as_slice()).collect();
        let winner = game::argmax(&hands)?.unwrap_or(0);

        let others: Vec<usize> = (0..hands.len()).filter(|&i| i != winner).collect();
        let other_hands: Vec<&[Card]> = others.iter().map(|&i| hands[i]).collect();
        let runner_up = others[game::argmax(&other_hands)?.unwrap_or(0)];

        let (winner_id, hand_winner) = contenders[winner].clone();
        let hand_loser = contenders[runner_up].1.clone();
        self.finish_showdown(winner_id, hand_winner, hand_loser)
            .await
    }

    async fn finish_showdown(
        &mut self,
        winner_id: UserId,
        hand_winner: Vec<Card>,
        hand_loser: Vec<Card>,
    ) -> RoomResult<()> {
        let active_players_cards: BTreeMap<UserId, Vec<Card>> = self
            .store
            .get_room()?
            .seats
            .iter()
            .filter(|s| s.is_active())
            .map(|s| (s.user_id, s.hand.clone()))
            .collect();

        self.award(winner_id, Phase::Showdown).await?;
        self.gateway.broadcast(ServerEvent::ShowResult {
            winner_id,
            hand_winner,
            hand_loser,
            active_players_cards,
        });
        Ok(())
    }

    async fn award_last_standing(&mut self) -> RoomResult<()> {
        self.clear_sideshows().await;
        let winner = self.store.get_room()?.active_ids().first().copied();

        match winner {
            Some(winner_id) => self.award(winner_id, Phase::ShowdownAfterPack).await,
            None => {
                log::error!("Room {}: no player left to award the pot", self.id);
                self.cancel_turn().await;
                self.store
                    .mutate_room(|room| room.phase = Phase::ShowdownAfterPack)?;
                self.scheduler
                    .schedule(TimerSlot::Restart, self.config.restart_delay())
                    .await;
                Ok(())
            }
        }
    }

    /// Pay the whole pot to `winner_id`, end the round and schedule the restart
    async fn award(&mut self, winner_id: UserId, phase: Phase) -> RoomResult<()> {
        self.cancel_turn().await;

        let pot = self.store.get_room()?.pot;
        if pot > 0 {
            self.credit(winner_id, pot).await?;
        }
        self.record(winner_id, GameAction::Win, pot);

        self.store.mutate_room(|room| {
            room.pot = 0;
            room.phase = phase;
        })?;

        log::info!(
            "Room {}: user {} wins pot of {} ({})",
            self.id,
            winner_id,
            pot,
            phase
        );
        self.scheduler
            .schedule(TimerSlot::Restart, self.config.restart_delay())
            .await;
        Ok(())
    }

    // === Round lifecycle ===

    /// Deal, collect the boot and open the betting
    async fn start_round(&mut self) -> RoomResult<()> {
        self.starting = false;
        self.scheduler
            .cancel_where(|slot| !matches!(slot, TimerSlot::ReconnectGrace(_)))
            .await;
        self.turn_timer.cancel();
        self.sideshows.clear();

        let boot = self.config.boot_amount;
        let table_limit = self.store.mutate_room(|room| {
            room.phase = Phase::Distribution;
            room.round_number += 1;
            room.pot = 0;
            room.turn = 0;
            for seat in &mut room.seats {
                seat.reset_for_round();
                if seat.is_disconnected() || seat.balance < boot {
                    seat.is_spectator = true;
                }
            }
            // Limit from the stakes players sat down with, before the boot
            game::table_limit(room.seats.iter().filter(|s| s.is_active()).map(|s| s.balance))
        })?;

        let players = self.store.get_room()?.active_ids();
        let mut deck = game::shuffled_deck();
        for &user_id in &players {
            let (hand, rest) = game::deal(deck, HAND_SIZE)?;
            deck = rest;
            self.store.mutate_seat(user_id, |seat| seat.hand = hand)?;
        }

        let mut paid = Vec::with_capacity(players.len());
        for &user_id in &players {
            match self.debit(user_id, boot).await {
                Ok(_) => {
                    self.store.mutate_room(|room| room.pot += boot)?;
                    // The boot is everyone's opening stake for minimum-bet purposes
                    self.store.mutate_seat(user_id, |seat| seat.current_bet = boot)?;
                    self.record(user_id, GameAction::Boot, boot);
                    paid.push(user_id);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Room {}: user {} could not pay the boot: {}",
                        self.id,
                        user_id,
                        e
                    );
                    self.fold(user_id)?;
                }
            }
        }

        if paid.len() < 2 {
            for user_id in paid {
                self.credit(user_id, boot).await?;
                self.record(user_id, GameAction::Refund, boot);
            }
            self.store.mutate_room(|room| {
                room.pot = 0;
                room.table_limit = 0;
                room.phase = Phase::Waiting;
                for seat in &mut room.seats {
                    seat.reset_for_round();
                }
            })?;
            log::info!(
                "Room {}: not enough players could pay the boot, waiting",
                self.id
            );
            return Ok(());
        }

        let (round, pot) = self.store.mutate_room(|room| {
            room.table_limit = table_limit;
            room.phase = Phase::Betting;
            (room.round_number, room.pot)
        })?;
        log::info!(
            "Room {}: round {} started with {} players, pot {}, table limit {}",
            self.id,
            round,
            paid.len(),
            pot,
            table_limit
        );

        if pot >= table_limit {
            return self.forced_showdown().await;
        }

        let first = self.store.get_room()?.first_active_from(0).unwrap_or(0);
        self.begin_turn(first).await
    }

    /// Clear the table after a decided round and deal again if possible
    async fn restart_round(&mut self) -> RoomResult<()> {
        self.cancel_turn().await;
        self.clear_sideshows().await;

        let boot = self.config.boot_amount;
        let (departed, bankrupt, bots) = {
            let room = self.store.get_room()?;
            (
                ids_where(room, |s| s.is_disconnected()),
                ids_where(room, |s| !s.is_bot && !s.is_disconnected() && s.balance < boot),
                ids_where(room, |s| s.is_bot),
            )
        };

        for user_id in departed {
            self.remove_player(user_id, "removed: disconnected").await?;
        }
        for user_id in bankrupt {
            self.remove_player(user_id, "removed: insufficient coins")
                .await?;
        }
        for user_id in bots {
            self.store.remove_seat(user_id)?;
        }

        if self.store.get_room()?.real_count() == 0 {
            return self.destroy_room().await;
        }

        self.store.mutate_room(|room| {
            room.pot = 0;
            room.turn = 0;
            room.table_limit = 0;
            room.phase = Phase::Waiting;
            for seat in &mut room.seats {
                seat.reset_for_round();
            }
        })?;
        self.adjust_bots()?;
        self.sync_occupancy();

        if self.store.get_room()?.seats.len() >= 2 {
            self.start_round().await
        } else {
            log::info!("Room {}: waiting for players", self.id);
            Ok(())
        }
    }

    async fn destroy_room(&mut self) -> RoomResult<()> {
        self.scheduler.cancel_all().await;
        self.turn_timer.cancel();
        self.reconnects.clear();
        self.sideshows.clear();
        self.gateway.close_all("Room closed");
        self.store.destroy()?;
        self.occupancy.store(0, Ordering::Relaxed);
        self.stopped = true;
        log::info!("Room {}: destroyed, no players left", self.id);
        Ok(())
    }

    /// Bring the bot count in line with the number of real players
    fn adjust_bots(&mut self) -> RoomResult<()> {
        let (missing, surplus, free) = {
            let room = self.store.get_room()?;
            let target = self.config.bots_for(room.real_count());
            let surplus: Vec<UserId> = room
                .seats
                .iter()
                .rev()
                .filter(|s| s.is_bot)
                .skip(target)
                .map(|s| s.user_id)
                .collect();
            let missing = target.saturating_sub(room.bot_count());
            let free = room.max_seats.saturating_sub(room.seats.len());
            (missing, surplus, free)
        };

        for bot_id in surplus {
            self.store.remove_seat(bot_id)?;
            log::info!("Room {}: retired bot {}", self.id, bot_id);
        }
        for seat in self.bots.spawn(missing.min(free)) {
            self.store.insert_seat(seat)?;
        }
        Ok(())
    }

    /// Arm the join grace once two players could start a round
    async fn maybe_arm_start(&mut self) -> RoomResult<()> {
        if self.starting {
            return Ok(());
        }

        let eligible = {
            let room = self.store.get_room()?;
            if room.phase != Phase::Waiting {
                return Ok(());
            }
            room.seats
                .iter()
                .filter(|s| !s.is_disconnected() && s.balance >= self.config.boot_amount)
                .count()
        };
        if eligible < 2 {
            return Ok(());
        }

        self.starting = true;
        log::info!(
            "Room {}: {} players seated, dealing in {:?}",
            self.id,
            eligible,
            self.config.join_grace()
        );
        self.scheduler
            .schedule(TimerSlot::JoinGrace, self.config.join_grace())
            .await;
        Ok(())
    }

    // === Connections ===

    async fn handle_join(
        &mut self,
        identity: Identity,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<Outbound>,
    ) -> RoomResponse {
        let user_id = identity.user_id;
        let result = match self.checkpoint().await {
            Ok(checkpoint) => {
                let result = self.apply_join(identity, connection_id, outbound).await;
                self.settle(checkpoint, result).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                if response.is_success() {
                    self.publish();
                }
                if response == RoomResponse::Reconnected {
                    self.resync(user_id);
                }
                response
            }
            Err(e) => {
                log::warn!("Room {}: join failed for user {}: {}", self.id, user_id, e);
                RoomResponse::Error(e.client_message())
            }
        }
    }

    async fn apply_join(
        &mut self,
        identity: Identity,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<Outbound>,
    ) -> RoomResult<RoomResponse> {
        let user_id = identity.user_id;

        let existing = self
            .store
            .get_seat(user_id)
            .ok()
            .map(|seat| (seat.is_disconnected(), seat.username.clone()));

        let Some((disconnected, username)) = existing else {
            return self.seat_new_player(identity, connection_id, outbound).await;
        };

        if let Some(old) = self.gateway.join(user_id, connection_id, outbound) {
            log::info!(
                "Room {}: user {} opened a new connection, closing {}",
                self.id,
                user_id,
                old.id
            );
            close_connection(&old, "replaced");
        }

        if disconnected {
            self.resume_seat(user_id, &username).await?;
        }
        Ok(RoomResponse::Reconnected)
    }

    async fn seat_new_player(
        &mut self,
        identity: Identity,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<Outbound>,
    ) -> RoomResult<RoomResponse> {
        let user_id = identity.user_id;

        // A waiting room gives up a bot seat for a real player
        let evict = {
            let room = self.store.get_room()?;
            (room.phase == Phase::Waiting && room.is_full())
                .then(|| room.seats.iter().rev().find(|s| s.is_bot).map(|s| s.user_id))
                .flatten()
        };
        if let Some(bot_id) = evict {
            self.store.remove_seat(bot_id)?;
            log::info!("Room {}: retired bot {} for user {}", self.id, bot_id, user_id);
        }

        let phase = {
            let room = self.store.get_room()?;
            if room.is_full() {
                return Ok(RoomResponse::RoomFull);
            }
            room.phase
        };

        if BotManager::is_bot_id(user_id) || self.ledger.is_bot(user_id).await? {
            return Ok(RoomResponse::Error(
                "Bot accounts cannot take a seat".to_string(),
            ));
        }

        let balance = self.ledger.get_balance(user_id).await?;
        if balance < self.config.min_join_balance {
            return Ok(RoomResponse::InsufficientCoins {
                required: self.config.min_join_balance,
                available: balance,
            });
        }

        let mut seat = Seat::new(user_id, identity.username, balance);
        seat.avatar = identity.avatar;
        let spectator = phase != Phase::Waiting;
        seat.is_spectator = spectator;

        self.store.insert_seat(seat)?;
        self.gateway.join(user_id, connection_id, outbound);
        log::info!(
            "Room {}: user {} joined{}",
            self.id,
            user_id,
            if spectator { " as spectator" } else { "" }
        );

        if spectator {
            self.gateway.send(
                user_id,
                ServerEvent::SpectatorNotification {
                    message: "You will join the next round".to_string(),
                },
            );
        } else {
            self.adjust_bots()?;
            self.maybe_arm_start().await?;
        }

        self.sync_occupancy();
        Ok(if spectator {
            RoomResponse::JoinedAsSpectator
        } else {
            RoomResponse::Joined
        })
    }

    /// A disconnected player is back
    async fn resume_seat(&mut self, user_id: UserId, username: &str) -> RoomResult<()> {
        self.scheduler
            .cancel(TimerSlot::ReconnectGrace(user_id))
            .await;
        let outcome = self.reconnects.reconnect(user_id, Instant::now());

        let round_active = self.store.get_room()?.phase.is_round_active();
        if outcome == ReconnectOutcome::GraceElapsed && round_active {
            self.bench_seat(user_id).await?;
        }

        self.store
            .mutate_seat(user_id, |seat| seat.disconnected_at = None)?;
        log::info!(
            "Room {}: user {} reconnected ({:?})",
            self.id,
            user_id,
            outcome
        );

        self.gateway.broadcast(ServerEvent::PlayerReconnected {
            player_id: user_id,
            message: format!("{username} reconnected"),
        });

        let benched = self.store.get_seat(user_id)?.is_spectator;
        if benched && round_active {
            self.gateway.send(
                user_id,
                ServerEvent::SpectatorNotification {
                    message: "You will join the next round".to_string(),
                },
            );
        }
        Ok(())
    }

    /// Out-of-band resend of the clocks to a returning client
    fn resync(&mut self, user_id: UserId) {
        if let Some(holder) = self.turn_timer.holder()
            && let Some(remaining) = self.turn_timer.remaining(holder)
        {
            self.gateway.send(
                user_id,
                ServerEvent::TimerStart {
                    player_id: holder,
                    duration: whole_secs(remaining),
                },
            );
        }

        if let Some(request) = self.sideshows.current()
            && request.opponent == user_id
        {
            let requester_name = self
                .store
                .get_seat(request.requester)
                .map(|s| s.username.clone())
                .unwrap_or_default();
            let remaining = request.wait.saturating_sub(request.requested_at.elapsed());
            self.gateway.send(
                user_id,
                ServerEvent::SideshowRequest {
                    requester_id: request.requester,
                    requester_name,
                    opponent_id: request.opponent,
                    wait: whole_secs(remaining),
                },
            );
        }
    }

    async fn handle_disconnect(&mut self, user_id: UserId, connection_id: ConnectionId) {
        if !self.gateway.leave(user_id, connection_id) {
            log::debug!(
                "Room {}: ignoring disconnect of stale connection for user {}",
                self.id,
                user_id
            );
            return;
        }

        let Ok(checkpoint) = self.checkpoint().await else {
            return;
        };
        let result = self.apply_disconnect(user_id).await;
        match self.settle(checkpoint, result).await {
            Ok(()) => self.publish(),
            Err(e) => log::warn!(
                "Room {}: disconnect handling failed for user {}: {}",
                self.id,
                user_id,
                e
            ),
        }
    }

    async fn apply_disconnect(&mut self, user_id: UserId) -> RoomResult<()> {
        let (phase, username) = {
            let room = self.store.get_room()?;
            let Some(seat) = room.seat(user_id) else {
                return Ok(());
            };
            (room.phase, seat.username.clone())
        };

        if phase.is_round_active() {
            let now = Instant::now();
            self.store
                .mutate_seat(user_id, |seat| seat.disconnected_at = Some(now))?;
            self.reconnects.begin(user_id, now);
            self.scheduler
                .schedule(TimerSlot::ReconnectGrace(user_id), self.reconnects.grace())
                .await;

            log::info!(
                "Room {}: user {} disconnected, holding seat for {:?}",
                self.id,
                user_id,
                self.reconnects.grace()
            );
            self.gateway.broadcast(ServerEvent::PlayerDisconnected {
                player_id: user_id,
                message: format!("{username} disconnected"),
            });
        } else {
            self.remove_player(user_id, &format!("{username} left the room"))
                .await?;
            self.after_departure().await?;
        }
        Ok(())
    }

    /// The player sits out the rest of the round
    async fn bench_seat(&mut self, user_id: UserId) -> RoomResult<()> {
        let (was_active, held_turn, phase) = {
            let room = self.store.get_room()?;
            let seat = self.store.get_seat(user_id)?;
            (
                seat.is_active(),
                room.turn_holder().is_some_and(|s| s.user_id == user_id),
                room.phase,
            )
        };

        let abandoned = self.abandon_sideshow(user_id).await?;
        if held_turn {
            self.cancel_turn().await;
        }
        self.store
            .mutate_seat(user_id, |seat| seat.is_spectator = true)?;
        log::info!("Room {}: user {} moved to spectators", self.id, user_id);

        if was_active && phase == Phase::Betting {
            if self.store.get_room()?.active_count() <= 1 {
                self.award_last_standing().await?;
            } else if held_turn || abandoned {
                self.advance_turn().await?;
            }
        }
        Ok(())
    }

    async fn remove_player(&mut self, user_id: UserId, message: &str) -> RoomResult<()> {
        let seat = self.store.remove_seat(user_id)?;
        self.reconnects.expire(user_id);
        self.scheduler
            .cancel(TimerSlot::ReconnectGrace(user_id))
            .await;

        log::info!("Room {}: {} ({})", self.id, seat.username, message);
        self.gateway.broadcast(ServerEvent::PlayerDisconnected {
            player_id: user_id,
            message: message.to_string(),
        });
        self.gateway.close(user_id, message);
        self.sync_occupancy();
        Ok(())
    }

    async fn after_departure(&mut self) -> RoomResult<()> {
        let (real, phase) = {
            let room = self.store.get_room()?;
            (room.real_count(), room.phase)
        };

        if real == 0 {
            return self.destroy_room().await;
        }
        if phase == Phase::Waiting {
            self.adjust_bots()?;
            self.maybe_arm_start().await?;
        }
        self.sync_occupancy();
        Ok(())
    }

    // === Timers ===

    async fn handle_timer(&mut self, fired: TimerFired) {
        if !self.scheduler.claim(&fired) {
            log::debug!("Room {}: dropping stale {:?} timer", self.id, fired.slot);
            return;
        }

        let Ok(checkpoint) = self.checkpoint().await else {
            return;
        };
        let result = self.dispatch_timer(fired.slot).await;
        match self.settle(checkpoint, result).await {
            Ok(true) => self.publish(),
            Ok(false) => {}
            Err(e) => log::warn!("Room {}: {:?} timer failed: {}", self.id, fired.slot, e),
        }
    }

    /// Apply an elapsed delay. Returns whether the room changed.
    async fn dispatch_timer(&mut self, slot: TimerSlot) -> RoomResult<bool> {
        let phase = self.store.get_room()?.phase;

        match slot {
            TimerSlot::Turn => self.on_turn_expired().await,
            TimerSlot::JoinGrace => {
                self.starting = false;
                if phase != Phase::Waiting {
                    return Ok(false);
                }
                self.start_round().await?;
                Ok(true)
            }
            TimerSlot::Restart => {
                if !phase.is_terminal() {
                    return Ok(false);
                }
                self.restart_round().await?;
                Ok(true)
            }
            TimerSlot::BotThink => self.on_bot_think().await,
            TimerSlot::ReconnectGrace(user_id) => self.on_grace_expired(user_id).await,
            TimerSlot::Sideshow {
                requester,
                opponent,
            } => match self.sideshows.take(requester, opponent) {
                Some(request) => {
                    self.resolve_sideshow(request, SideshowOutcome::TimedOut)
                        .await?;
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    /// Forced fold for a holder who let the clock run out. A no-op if the
    /// turn moved on while the expiry was in flight.
    async fn on_turn_expired(&mut self) -> RoomResult<bool> {
        let Some(holder) = self.turn_timer.holder() else {
            return Ok(false);
        };

        let (still_holding, username) = {
            let room = self.store.get_room()?;
            (
                room.phase == Phase::Betting
                    && room.turn_holder().is_some_and(|s| s.user_id == holder),
                room.seat(holder)
                    .map(|s| s.username.clone())
                    .unwrap_or_default(),
            )
        };
        if !still_holding || !self.turn_timer.expire(holder) {
            return Ok(false);
        }

        self.scheduler.cancel(TimerSlot::BotThink).await;
        self.fold(holder)?;
        self.record(holder, GameAction::TimeoutPack, 0);

        log::info!("Room {}: user {} timed out and packed", self.id, holder);
        self.gateway.broadcast(ServerEvent::PlayerPacked {
            player_id: holder,
            message: format!("{username} packed due to timeout"),
        });

        self.advance_turn().await?;
        Ok(true)
    }

    async fn on_grace_expired(&mut self, user_id: UserId) -> RoomResult<bool> {
        if self.reconnects.expire(user_id).is_none() {
            return Ok(false);
        }

        let (still_away, round_active) = {
            let room = self.store.get_room()?;
            (
                room.seat(user_id).is_some_and(|s| s.is_disconnected()),
                room.phase.is_round_active(),
            )
        };
        if !still_away {
            return Ok(false);
        }

        log::info!(
            "Room {}: reconnect grace expired for user {}",
            self.id,
            user_id
        );
        if round_active {
            self.bench_seat(user_id).await?;
        } else {
            self.remove_player(user_id, "removed: disconnected").await?;
            self.after_departure().await?;
        }
        Ok(true)
    }

    // === Bots ===

    async fn on_bot_think(&mut self) -> RoomResult<bool> {
        if self.store.get_room()?.phase != Phase::Betting {
            return Ok(false);
        }

        // A bot asked for a sideshow answers it
        if let Some(request) = self.sideshows.current()
            && BotManager::is_bot_id(request.opponent)
        {
            let hand = self.store.get_seat(request.opponent)?.hand.clone();
            let category = game::rank(&hand)?.category;
            let accept = self.bots.decisions().accept_sideshow(category);
            self.answer_sideshow(request.opponent, accept).await?;
            return Ok(true);
        }

        if self.sideshows.has_pending() {
            return Ok(false);
        }
        let Some(bot_id) = self
            .store
            .get_room()?
            .turn_holder()
            .filter(|s| s.is_bot)
            .map(|s| s.user_id)
        else {
            return Ok(false);
        };

        if self.store.get_seat(bot_id)?.is_blind && self.bots.decisions().should_see() {
            self.toggle_seen(bot_id)?;
        }

        let action = self.choose_bot_action(bot_id)?;
        log::debug!("Room {}: bot {} chose {}", self.id, bot_id, action.name());

        let checkpoint = self.store.checkpoint()?;
        if let Err(e) = self.dispatch_action(bot_id, action).await {
            if e.is_fatal() {
                return Err(e);
            }
            log::debug!(
                "Room {}: bot {} action failed ({}), packing",
                self.id,
                bot_id,
                e
            );
            self.undo(checkpoint).await;
            self.pack(bot_id).await?;
        }
        Ok(true)
    }

    /// Turn the policy's choice into a concrete action the bot can afford
    fn choose_bot_action(&mut self, bot_id: UserId) -> RoomResult<ClientAction> {
        let room = self.store.get_room()?;
        let idx = room.turn;
        let bot = &room.seats[idx];
        let prev = room.prev_active_before(idx).map(|i| &room.seats[i]);
        let prev_stake = prev_bet(room, idx);

        let ctx = BotDecisionContext {
            category: game::rank(&bot.hand)?.category,
            can_show: room.active_count() == 2,
            can_sideshow: !bot.is_blind && prev.is_some_and(|p| !p.is_blind),
        };

        let action = match self.bots.decisions().decide_action(&ctx) {
            BotDecision::Pack => ClientAction::Pack,
            BotDecision::Bet => ClientAction::PlaceBet {
                amount: game::min_bet(bot.is_blind, prev_stake),
            },
            BotDecision::DoubleBet => ClientAction::PlaceDoubleBet {
                amount: game::double_bet(bot.is_blind, prev_stake),
            },
            BotDecision::Show => ClientAction::Show,
            BotDecision::Sideshow => match prev {
                Some(opponent) => ClientAction::Sideshow {
                    opponent_id: opponent.user_id,
                    amount: (bot.current_bet < opponent.current_bet)
                        .then_some(opponent.current_bet),
                },
                None => ClientAction::Pack,
            },
        };

        let stake = match &action {
            ClientAction::PlaceBet { amount } | ClientAction::PlaceDoubleBet { amount } => *amount,
            ClientAction::Sideshow {
                amount: Some(amount),
                ..
            } => *amount,
            _ => 0,
        };

        debug_assert_eq!(bot.user_id, bot_id);
        Ok(if stake > bot.balance {
            ClientAction::Pack
        } else {
            action
        })
    }
}

/// The previous active player's stake, or `None` when nobody else is active
fn prev_bet(room: &Room, idx: usize) -> Option<PrevBet> {
    room.prev_active_before(idx)
        .map(|i| room.seats[i].as_prev_bet())
}

fn ids_where(room: &Room, pred: impl Fn(&Seat) -> bool) -> Vec<UserId> {
    room.seats
        .iter()
        .filter(|s| pred(s))
        .map(|s| s.user_id)
        .collect()
}

fn no_comparison(message: String) -> ServerEvent {
    ServerEvent::SideshowResult {
        message,
        winner_id: None,
        loser_id: None,
        packed_player: None,
    }
}

/// Whole seconds, rounded up so a running clock never shows zero
fn whole_secs(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis().div_ceil(1_000)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_secs_rounds_up() {
        assert_eq!(whole_secs(Duration::from_secs(30)), 30);
        assert_eq!(whole_secs(Duration::from_millis(12_001)), 13);
        assert_eq!(whole_secs(Duration::ZERO), 0);
    }

    #[test]
    fn test_prev_bet_reads_previous_active_seat() {
        let mut room = Room::new(1, 5, None);
        room.push_seat(Seat::new(1, "asha", 1_000));
        assert_eq!(prev_bet(&room, 0), None);

        room.push_seat(Seat::new(2, "ravi", 1_000));
        room.seats[0].current_bet = 100;
        room.seats[0].is_blind = false;
        assert_eq!(
            prev_bet(&room, 1),
            Some(PrevBet {
                is_blind: false,
                amount: 100
            })
        );
    }
}
