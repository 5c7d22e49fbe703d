//! Table socket lifecycle.
//!
//! One socket, one link task. The link task is the only reader and writer:
//! outbound frames arrive on an mpsc channel, inbound frames are handed to
//! the registry's dispatcher. When an established link drops, a supervisor
//! keeps redialing at a fixed delay until [`TableTransport::disconnect`] is
//! called. Subscriptions are not replayed across reconnects; callers watch
//! the connection state and subscribe again.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use spade_core::{ReconnectPolicy, SpadeError};
use spade_settings::RealtimeSettings;

use crate::registry::{ConnectionState, SubscriptionRegistry};
use crate::wire::{ClientFrame, ServerFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client end of the table socket.
pub struct TableTransport {
    registry: SubscriptionRegistry,
    url: String,
    policy: ReconnectPolicy,
    connect_gate: tokio::sync::Mutex<()>,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl TableTransport {
    /// Build a transport from settings.
    #[must_use]
    pub fn new(settings: &RealtimeSettings) -> Self {
        Self::with_url(
            &settings.url,
            settings.reconnect_policy(),
            settings.request_timeout_ms,
        )
    }

    /// Build a transport against an explicit endpoint.
    #[must_use]
    pub fn with_url(url: &str, policy: ReconnectPolicy, request_timeout_ms: u64) -> Self {
        Self {
            registry: SubscriptionRegistry::new(request_timeout_ms),
            url: url.to_owned(),
            policy,
            connect_gate: tokio::sync::Mutex::new(()),
            supervisor: parking_lot::Mutex::new(None),
        }
    }

    /// The registry routing messages on this socket.
    #[must_use]
    pub fn registry(&self) -> SubscriptionRegistry {
        self.registry.clone()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.registry.state()
    }

    /// Watch connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.registry.watch_state()
    }

    /// Establish the link.
    ///
    /// Idempotent: when already connected this returns immediately, and
    /// concurrent calls serialize on an internal gate so only one dial
    /// happens. On failure the transport is left disconnected; the caller
    /// decides whether to retry. Automatic redialing only starts once a
    /// link has been established and then lost.
    pub async fn connect(&self) -> Result<(), SpadeError> {
        let _gate = self.connect_gate.lock().await;
        if self.registry.is_connected() {
            return Ok(());
        }

        // A supervisor from an earlier link may still be redialing; this
        // explicit connect takes over.
        if let Some(old) = self.supervisor.lock().take() {
            old.abort();
        }

        self.registry.set_connecting();
        let ws = match connect_async(&self.url).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                self.registry.detach(ConnectionState::Disconnected);
                return Err(SpadeError::connection(format!(
                    "failed to connect to {}: {e}",
                    self.url
                )));
            }
        };
        info!(url = %self.url, "table socket connected");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.registry.attach(out_tx);

        let handle = tokio::spawn(supervise(
            ws,
            out_rx,
            self.registry.clone(),
            self.url.clone(),
            self.policy,
        ));
        *self.supervisor.lock() = Some(handle);
        Ok(())
    }

    /// Tear the link down.
    ///
    /// Unsubscribes everything, fails pending requests, and stops the
    /// reconnect supervisor. Idempotent; calling while disconnected is a
    /// no-op.
    pub async fn disconnect(&self) {
        let _gate = self.connect_gate.lock().await;

        // Send unsubscribe frames while the link might still flush them.
        self.registry.unsubscribe_all();

        if let Some(handle) = self.supervisor.lock().take() {
            handle.abort();
        }
        self.registry.detach(ConnectionState::Disconnected);
        debug!("table socket disconnected");
    }
}

/// Own the link for its whole life: pump it until it drops, then redial
/// forever at the fixed delay.
async fn supervise(
    ws: WsStream,
    out_rx: mpsc::UnboundedReceiver<ClientFrame>,
    registry: SubscriptionRegistry,
    url: String,
    policy: ReconnectPolicy,
) {
    let mut ws = ws;
    let mut out_rx = out_rx;
    loop {
        run_link(ws, &mut out_rx, &registry).await;
        warn!(url = %url, "table socket lost");
        registry.detach(ConnectionState::Disconnected);

        loop {
            tokio::time::sleep(policy.delay()).await;
            registry.set_connecting();
            match connect_async(&url).await {
                Ok((socket, _)) => {
                    info!(url = %url, "table socket reconnected");
                    let (out_tx, rx) = mpsc::unbounded_channel();
                    registry.attach(out_tx);
                    ws = socket;
                    out_rx = rx;
                    break;
                }
                Err(e) => {
                    debug!(url = %url, "reconnect attempt failed: {e}");
                    registry.detach(ConnectionState::Disconnected);
                }
            }
        }
    }
}

/// Pump one link until it closes or errors. Consumes the socket.
async fn run_link(
    ws: WsStream,
    out_rx: &mut mpsc::UnboundedReceiver<ClientFrame>,
    registry: &SubscriptionRegistry,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    loop {
        tokio::select! {
            frame = out_rx.recv() => {
                let Some(frame) = frame else { break };
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(frame) => registry.dispatch(frame),
                    Err(e) => debug!("unparseable frame, dropping: {e}"),
                }
            }
        }
    }
}
