//! Table session lifecycle.
//!
//! The controller owns the join/leave choreography on top of two seams:
//! [`SeatApi`] (the REST side of taking and giving up a seat) and
//! [`TableChannel`] (the realtime side). The flow for joining:
//!
//! 1. balance guard — refuse locally when chips cannot cover the buy-in
//! 2. REST join — the seat is taken server-side
//! 3. ensure the realtime link is up
//! 4. subscribe to the table's topic
//! 5. announce presence
//!
//! Failures after step 2 are surfaced but never rolled back: the backend
//! keeps the seat and the user retries the realtime half. Leaving is best
//! effort end to end; the session always ends locally.
//!
//! Every operation is stamped with a generation. An operation that was
//! overtaken by a newer one stops mutating state and reports
//! [`JoinOutcome::Superseded`] instead of clobbering the winner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use spade_api::Table;
use spade_core::{MessageHandler, SpadeError, SubscriptionId, TableId, TableMessage, Topic};
use spade_realtime::ConnectionState;

use crate::events::UiEvent;
use crate::status::StatusBanner;

/// REST operations the session flow needs.
#[async_trait]
pub trait SeatApi: Send + Sync {
    /// The current user's chip balance.
    async fn chips(&self) -> Result<i64, SpadeError>;
    /// Take a seat at a table.
    async fn join_table(&self, id: TableId, buy_in: i64) -> Result<Table, SpadeError>;
    /// Give the seat up.
    async fn leave_table(&self, id: TableId) -> Result<(), SpadeError>;
}

/// Realtime operations the session flow needs.
#[async_trait]
pub trait TableChannel: Send + Sync {
    /// Bring the link up if it is not already.
    async fn ensure_connected(&self) -> Result<(), SpadeError>;
    /// Attach a handler to a topic.
    fn subscribe(
        &self,
        topic: &Topic,
        handler: MessageHandler,
    ) -> Result<SubscriptionId, SpadeError>;
    /// Detach a subscription.
    fn unsubscribe(&self, id: &SubscriptionId);
    /// Fire-and-forget publish.
    fn publish(&self, topic: &Topic, body: TableMessage);
    /// Watch link state changes.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;
}

/// Where the session currently stands.
#[derive(Clone, Debug)]
pub enum SessionState {
    /// Not seated anywhere.
    Idle,
    /// A join flow is in flight.
    Joining,
    /// Seated, subscribed, live.
    Active {
        /// The joined table.
        table: Table,
        /// The live topic subscription.
        subscription: SubscriptionId,
    },
    /// A leave flow is in flight.
    Leaving,
}

/// How a join attempt ended.
#[derive(Clone, Debug)]
pub enum JoinOutcome {
    /// Seated and live.
    Joined(Table),
    /// Refused locally: chips cannot cover the buy-in. No backend call
    /// was made.
    InsufficientBalance {
        /// Buy-in that was asked for.
        required: i64,
        /// Chips actually available.
        available: i64,
    },
    /// Already seated at a table; leave it first.
    AlreadySeated(TableId),
    /// A newer join or leave overtook this one mid-flight; nothing was
    /// changed locally.
    Superseded,
}

/// Drives a user's table session.
pub struct SessionController {
    api: Arc<dyn SeatApi>,
    channel: Arc<dyn TableChannel>,
    username: String,
    banner: StatusBanner,
    events: mpsc::UnboundedSender<UiEvent>,
    state: parking_lot::Mutex<SessionState>,
    generation: AtomicU64,
}

impl SessionController {
    /// Build a controller and the event stream it feeds.
    ///
    /// Spawns a watcher on the channel's connection state, so this must be
    /// called from within a tokio runtime.
    pub fn new(
        api: Arc<dyn SeatApi>,
        channel: Arc<dyn TableChannel>,
        username: impl Into<String>,
        status_clear_ms: u64,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let banner = StatusBanner::new(status_clear_ms, events.clone());
        let controller = Arc::new(Self {
            api,
            channel,
            username: username.into(),
            banner,
            events,
            state: parking_lot::Mutex::new(SessionState::Idle),
            generation: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&controller);
        let mut state_rx = controller.channel.watch_state();
        let _ = tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let lost = *state_rx.borrow_and_update() == ConnectionState::Disconnected;
                if !lost {
                    continue;
                }
                let Some(controller) = weak.upgrade() else { break };
                controller.on_link_lost();
            }
        });

        (controller, events_rx)
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// The table currently seated at, if any.
    #[must_use]
    pub fn seated_table(&self) -> Option<TableId> {
        match &*self.state.lock() {
            SessionState::Active { table, .. } => Some(table.id),
            _ => None,
        }
    }

    /// Join a table with the given buy-in.
    pub async fn join(&self, table_id: TableId, buy_in: i64) -> Result<JoinOutcome, SpadeError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock();
            if let SessionState::Active { table, .. } = &*state {
                return Ok(JoinOutcome::AlreadySeated(table.id));
            }
            *state = SessionState::Joining;
        }

        // Balance guard, before the backend is touched.
        let available = match self.api.chips().await {
            Ok(chips) => chips,
            Err(e) => {
                self.reset_if_current(generation);
                return Err(e);
            }
        };
        if self.is_stale(generation) {
            return Ok(JoinOutcome::Superseded);
        }
        if available < buy_in {
            self.reset_if_current(generation);
            let _ = self.events.send(UiEvent::InsufficientBalance {
                required: buy_in,
                available,
            });
            return Ok(JoinOutcome::InsufficientBalance {
                required: buy_in,
                available,
            });
        }

        let table = match self.api.join_table(table_id, buy_in).await {
            Ok(table) => table,
            Err(e) => {
                self.reset_if_current(generation);
                return Err(e);
            }
        };
        if self.is_stale(generation) {
            debug!(table = %table_id, "join superseded after seat was taken");
            return Ok(JoinOutcome::Superseded);
        }

        // The seat is taken server-side from here on. Realtime failures
        // surface to the caller without rolling the seat back.
        if let Err(e) = self.channel.ensure_connected().await {
            self.reset_if_current(generation);
            return Err(e);
        }

        let topic = Topic::table(table_id);
        let subscription = match self.channel.subscribe(&topic, self.message_handler()) {
            Ok(subscription) => subscription,
            Err(e) => {
                self.reset_if_current(generation);
                return Err(e);
            }
        };

        // Commit under the state lock; the staleness check and the write
        // must be one step or an overtaking operation can interleave.
        {
            let mut state = self.state.lock();
            if self.is_stale(generation) {
                drop(state);
                debug!(table = %table_id, "join superseded after subscribing, backing out");
                self.channel.unsubscribe(&subscription);
                return Ok(JoinOutcome::Superseded);
            }
            *state = SessionState::Active {
                table: table.clone(),
                subscription,
            };
        }

        self.channel.publish(
            &topic,
            TableMessage::presence_announcement(&self.username, true),
        );
        let _ = self.events.send(UiEvent::Joined {
            table: table.clone(),
        });
        Ok(JoinOutcome::Joined(table))
    }

    /// Leave the current table. No-op when not seated.
    ///
    /// Everything here is best effort: presence and unsubscribe may be
    /// dropped by a dead link, and a failed REST leave is logged. The
    /// session always ends locally.
    pub async fn leave(&self) -> Result<(), SpadeError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (table_id, subscription) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, SessionState::Leaving) {
                SessionState::Active {
                    table,
                    subscription,
                } => (table.id, subscription),
                previous => {
                    *state = previous;
                    return Ok(());
                }
            }
        };

        let topic = Topic::table(table_id);
        self.channel.publish(
            &topic,
            TableMessage::presence_announcement(&self.username, false),
        );
        self.channel.unsubscribe(&subscription);

        if let Err(e) = self.api.leave_table(table_id).await {
            warn!(table = %table_id, "leave request failed, session ends locally anyway: {e}");
        }

        {
            let mut state = self.state.lock();
            if !self.is_stale(generation) {
                *state = SessionState::Idle;
            }
        }
        let _ = self.events.send(UiEvent::Left { table_id });
        Ok(())
    }

    fn on_link_lost(&self) {
        let was_active = {
            let mut state = self.state.lock();
            if matches!(*state, SessionState::Active { .. }) {
                *state = SessionState::Idle;
                true
            } else {
                false
            }
        };
        if was_active {
            warn!("realtime link lost while seated, session reset");
            let _ = self.events.send(UiEvent::ConnectionLost);
        }
    }

    fn message_handler(&self) -> MessageHandler {
        let events = self.events.clone();
        let banner = self.banner.clone();
        Arc::new(move |msg: TableMessage| {
            if let Some(presence) = msg.presence() {
                let verb = if presence.connected {
                    "connected"
                } else {
                    "disconnected"
                };
                banner.show(format!("Player {} {verb}", presence.player));
                let _ = events.send(UiEvent::Presence {
                    player: presence.player,
                    connected: presence.connected,
                });
            } else {
                let _ = events.send(UiEvent::Table(msg));
            }
        })
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn reset_if_current(&self, generation: u64) {
        if !self.is_stale(generation) {
            *self.state.lock() = SessionState::Idle;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
