//! Topic subscriptions and request/response correlation.
//!
//! The registry is the routing brain shared between callers and the link
//! task. It owns three pieces of state:
//!
//! - the connection state, observable through a `watch` channel
//! - the subscription table, keyed by [`SubscriptionId`] derived from the
//!   topic, so subscribing twice to the same topic replaces the handler
//! - the pending map of correlated requests awaiting a `responseId`
//!
//! Inbound messages are dispatched by one stable code path: the pending map
//! is consulted first, and only uncorrelated messages reach the topic
//! handler. Handlers are never swapped to intercept responses.
//!
//! Subscriptions do not survive the link: when the socket drops, the table
//! is cleared and callers must subscribe again once reconnected.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use spade_core::{MessageHandler, RequestId, SpadeError, SubscriptionId, TableMessage, Topic};

use crate::wire::{ClientFrame, ServerFrame};

/// State of the table socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link, and nothing trying to establish one.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The link is up.
    Connected,
}

struct Subscription {
    topic: Topic,
    handler: MessageHandler,
}

struct Inner {
    state: watch::Sender<ConnectionState>,
    subscriptions: parking_lot::Mutex<HashMap<SubscriptionId, Subscription>>,
    pending: parking_lot::Mutex<HashMap<RequestId, oneshot::Sender<TableMessage>>>,
    out_tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<ClientFrame>>>,
    request_timeout_ms: u64,
}

/// Handle to the subscription registry. Cheap to clone.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<Inner>,
}

impl SubscriptionRegistry {
    /// New registry with the given correlated-request timeout.
    #[must_use]
    pub fn new(request_timeout_ms: u64) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                state,
                subscriptions: parking_lot::Mutex::new(HashMap::new()),
                pending: parking_lot::Mutex::new(HashMap::new()),
                out_tx: parking_lot::Mutex::new(None),
                request_timeout_ms,
            }),
        }
    }

    // ── State observation ───────────────────────────────────────────

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Whether the link is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Topics with a live subscription, for diagnostics.
    #[must_use]
    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.inner
            .subscriptions
            .lock()
            .values()
            .map(|s| s.topic.clone())
            .collect()
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Attach a handler to a topic.
    ///
    /// Fails with [`SpadeError::NotConnected`] when the link is down. A
    /// second subscription to the same topic replaces the first; the old
    /// handler stops receiving messages.
    ///
    /// The handler is recorded only once the frames were accepted by the
    /// link, so a failed subscribe registers nothing.
    pub fn subscribe(
        &self,
        topic: &Topic,
        handler: MessageHandler,
    ) -> Result<SubscriptionId, SpadeError> {
        if !self.is_connected() {
            return Err(SpadeError::NotConnected);
        }

        let id = SubscriptionId::for_topic(topic);
        if self.inner.subscriptions.lock().contains_key(&id) {
            debug!(topic = %topic, "replacing existing subscription");
            self.send_frame(ClientFrame::Unsubscribe {
                topic: topic.clone(),
            })?;
        }
        self.send_frame(ClientFrame::Subscribe {
            topic: topic.clone(),
        })?;
        let _ = self.inner.subscriptions.lock().insert(
            id.clone(),
            Subscription {
                topic: topic.clone(),
                handler,
            },
        );
        Ok(id)
    }

    /// Detach a subscription. No-op for unknown ids.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        let removed = self.inner.subscriptions.lock().remove(id);
        if let Some(sub) = removed {
            // Best effort; the link may already be gone.
            let _ = self.send_frame(ClientFrame::Unsubscribe { topic: sub.topic });
        }
    }

    /// Detach every subscription.
    pub fn unsubscribe_all(&self) {
        let drained: Vec<Subscription> = {
            let mut subs = self.inner.subscriptions.lock();
            subs.drain().map(|(_, sub)| sub).collect()
        };
        for sub in drained {
            let _ = self.send_frame(ClientFrame::Unsubscribe { topic: sub.topic });
        }
    }

    // ── Outbound ────────────────────────────────────────────────────

    /// Publish a message to a topic, fire and forget.
    ///
    /// A publish while disconnected is dropped with a log line, never an
    /// error; senders of game events have nothing useful to do with one.
    pub fn publish(&self, topic: &Topic, body: TableMessage) {
        if !self.is_connected() {
            warn!(topic = %topic, "dropping publish while disconnected");
            return;
        }
        if self
            .send_frame(ClientFrame::Send {
                topic: topic.clone(),
                body,
            })
            .is_err()
        {
            warn!(topic = %topic, "dropping publish, link went away");
        }
    }

    /// Publish a request on a topic and await its correlated response,
    /// using the registry's configured timeout.
    pub async fn request(
        &self,
        topic: &Topic,
        body: TableMessage,
    ) -> Result<TableMessage, SpadeError> {
        self.request_with_timeout(topic, body, self.inner.request_timeout_ms)
            .await
    }

    /// Publish a request on a topic and await its correlated response
    /// within the given deadline.
    ///
    /// A fresh [`RequestId`] is stamped on the message; the response is the
    /// message that comes back carrying it as `responseId`. Concurrent
    /// requests on the same topic are fine, each waits on its own id.
    pub async fn request_with_timeout(
        &self,
        topic: &Topic,
        mut body: TableMessage,
        timeout_ms: u64,
    ) -> Result<TableMessage, SpadeError> {
        if !self.is_connected() {
            return Err(SpadeError::NotConnected);
        }

        let request_id = RequestId::new();
        body.request_id = Some(request_id.clone());

        let (tx, rx) = oneshot::channel();
        {
            let _ = self
                .inner
                .pending
                .lock()
                .insert(request_id.clone(), tx);
        }

        if let Err(e) = self.send_frame(ClientFrame::Send {
            topic: topic.clone(),
            body,
        }) {
            let _ = self.inner.pending.lock().remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(response)) => Ok(response),
            // Sender dropped: the link died and the pending map was drained.
            Ok(Err(_)) => Err(SpadeError::connection(
                "connection lost while awaiting response",
            )),
            Err(_) => {
                let _ = self.inner.pending.lock().remove(&request_id);
                Err(SpadeError::Timeout { timeout_ms })
            }
        }
    }

    // ── Link-side plumbing (called by the transport) ────────────────

    /// Install the outbound channel of a fresh link and mark connected.
    pub(crate) fn attach(&self, out_tx: mpsc::UnboundedSender<ClientFrame>) {
        *self.inner.out_tx.lock() = Some(out_tx);
        let _ = self.inner.state.send_replace(ConnectionState::Connected);
    }

    /// Tear down after the link is gone.
    ///
    /// Drops the outbound channel, fails every pending request, clears the
    /// subscription table, and moves to the given state.
    pub(crate) fn detach(&self, state: ConnectionState) {
        *self.inner.out_tx.lock() = None;
        self.fail_pending();
        let cleared = {
            let mut subs = self.inner.subscriptions.lock();
            let n = subs.len();
            subs.clear();
            n
        };
        if cleared > 0 {
            debug!(count = cleared, "dropped subscriptions with the link");
        }
        let _ = self.inner.state.send_replace(state);
    }

    /// Mark a connection attempt in flight.
    pub(crate) fn set_connecting(&self) {
        let _ = self.inner.state.send_replace(ConnectionState::Connecting);
    }

    /// Route one inbound frame.
    ///
    /// Correlated responses go to their waiter and nowhere else; everything
    /// else goes to the topic's handler, if one is registered.
    pub(crate) fn dispatch(&self, frame: ServerFrame) {
        let ServerFrame::Message { topic, body } = frame;

        if let Some(response_id) = &body.response_id {
            let waiter = self.inner.pending.lock().remove(response_id);
            if let Some(tx) = waiter {
                let _ = tx.send(body);
                return;
            }
            debug!(response_id = %response_id, "response with no waiter, dropping");
            return;
        }

        let handler = {
            let subs = self.inner.subscriptions.lock();
            subs.get(&SubscriptionId::for_topic(&topic))
                .map(|s| Arc::clone(&s.handler))
        };
        match handler {
            Some(handler) => handler(body),
            None => debug!(topic = %topic, "message on unsubscribed topic, dropping"),
        }
    }

    fn fail_pending(&self) {
        let drained: Vec<_> = {
            let mut pending = self.inner.pending.lock();
            pending.drain().collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing pending requests");
        }
        // Dropping the senders wakes every waiter with a recv error.
    }

    fn send_frame(&self, frame: ClientFrame) -> Result<(), SpadeError> {
        let tx = {
            let guard = self.inner.out_tx.lock();
            guard.clone()
        };
        match tx {
            Some(tx) if tx.send(frame).is_ok() => Ok(()),
            _ => Err(SpadeError::NotConnected),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
