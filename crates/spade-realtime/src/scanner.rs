//! Card scanner channel.
//!
//! Separate socket to the scanner sidecar. Every operation is a correlated
//! request: the sidecar acknowledges each `event` frame with a reply
//! carrying the request's `responseId`. Unsolicited frames are dropped.
//! The link reconnects at its own, slower cadence than the table socket;
//! the sidecar restarts more often than the backend.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use spade_core::{
    CalibrationResult, FrameImage, FrameResult, ReconnectPolicy, RequestId, SpadeError, TableId,
};
use spade_settings::ScannerSettings;

use crate::registry::ConnectionState;
use crate::wire::{ScannerReply, ScannerRequest};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Inner {
    state: watch::Sender<ConnectionState>,
    pending: parking_lot::Mutex<HashMap<RequestId, oneshot::Sender<serde_json::Value>>>,
    out_tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<ScannerRequest>>>,
    ack_timeout_ms: u64,
}

/// Client end of the scanner socket.
pub struct ScannerChannel {
    inner: Arc<Inner>,
    url: String,
    policy: ReconnectPolicy,
    connect_gate: tokio::sync::Mutex<()>,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ScannerChannel {
    /// Build a channel from settings.
    #[must_use]
    pub fn new(settings: &ScannerSettings) -> Self {
        Self::with_url(
            &settings.url,
            settings.reconnect_policy(),
            settings.ack_timeout_ms,
        )
    }

    /// Build a channel against an explicit endpoint.
    #[must_use]
    pub fn with_url(url: &str, policy: ReconnectPolicy, ack_timeout_ms: u64) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                state,
                pending: parking_lot::Mutex::new(HashMap::new()),
                out_tx: parking_lot::Mutex::new(None),
                ack_timeout_ms,
            }),
            url: url.to_owned(),
            policy,
            connect_gate: tokio::sync::Mutex::new(()),
            supervisor: parking_lot::Mutex::new(None),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Whether the scanner link is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Establish the link. Idempotent, like the table socket.
    pub async fn connect(&self) -> Result<(), SpadeError> {
        let _gate = self.connect_gate.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if let Some(old) = self.supervisor.lock().take() {
            old.abort();
        }

        let _ = self.inner.state.send_replace(ConnectionState::Connecting);
        let ws = match connect_async(&self.url).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                let _ = self
                    .inner
                    .state
                    .send_replace(ConnectionState::Disconnected);
                return Err(SpadeError::connection(format!(
                    "failed to connect to scanner at {}: {e}",
                    self.url
                )));
            }
        };
        info!(url = %self.url, "scanner socket connected");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        *self.inner.out_tx.lock() = Some(out_tx);
        let _ = self.inner.state.send_replace(ConnectionState::Connected);

        let handle = tokio::spawn(supervise(
            ws,
            out_rx,
            Arc::clone(&self.inner),
            self.url.clone(),
            self.policy,
        ));
        *self.supervisor.lock() = Some(handle);
        Ok(())
    }

    /// Tear the link down. Idempotent.
    pub async fn disconnect(&self) {
        let _gate = self.connect_gate.lock().await;
        if let Some(handle) = self.supervisor.lock().take() {
            handle.abort();
        }
        detach(&self.inner, ConnectionState::Disconnected);
        debug!("scanner socket disconnected");
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Submit a webcam frame for card detection.
    ///
    /// `n` is how many cards the sidecar should look for.
    pub async fn submit_frame(&self, image: &[u8], n: u32) -> Result<FrameResult, SpadeError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let reply = self
            .request(|request_id| ScannerRequest::Frame {
                request_id,
                n,
                image: encoded,
            })
            .await?;
        parse_reply(reply)
    }

    /// Fetch the camera's current view for calibration.
    pub async fn calibration_frame(&self, table_id: TableId) -> Result<FrameImage, SpadeError> {
        let reply = self
            .request(|request_id| ScannerRequest::GetFrame {
                request_id,
                table_id,
            })
            .await?;
        parse_reply(reply)
    }

    /// Re-run camera calibration.
    ///
    /// A failed calibration is a successful request: the outcome is in
    /// [`CalibrationResult::success`], not the `Result`.
    pub async fn recalibrate(&self, table_id: TableId) -> Result<CalibrationResult, SpadeError> {
        let reply = self
            .request(|request_id| ScannerRequest::Recalibrate {
                request_id,
                table_id,
            })
            .await?;
        parse_reply(reply)
    }

    async fn request(
        &self,
        build: impl FnOnce(RequestId) -> ScannerRequest,
    ) -> Result<serde_json::Value, SpadeError> {
        if !self.is_connected() {
            return Err(SpadeError::NotConnected);
        }

        let request_id = RequestId::new();
        let (tx, rx) = oneshot::channel();
        {
            let _ = self
                .inner
                .pending
                .lock()
                .insert(request_id.clone(), tx);
        }

        let sent = {
            let guard = self.inner.out_tx.lock();
            guard
                .as_ref()
                .is_some_and(|out| out.send(build(request_id.clone())).is_ok())
        };
        if !sent {
            let _ = self.inner.pending.lock().remove(&request_id);
            return Err(SpadeError::NotConnected);
        }

        let timeout_ms = self.inner.ack_timeout_ms;
        match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(SpadeError::connection(
                "scanner connection lost while awaiting acknowledgement",
            )),
            Err(_) => {
                let _ = self.inner.pending.lock().remove(&request_id);
                Err(SpadeError::Timeout { timeout_ms })
            }
        }
    }
}

fn parse_reply<T: serde::de::DeserializeOwned>(
    payload: serde_json::Value,
) -> Result<T, SpadeError> {
    serde_json::from_value(payload)
        .map_err(|e| SpadeError::connection(format!("malformed scanner reply: {e}")))
}

fn detach(inner: &Inner, state: ConnectionState) {
    *inner.out_tx.lock() = None;
    let drained: Vec<_> = {
        let mut pending = inner.pending.lock();
        pending.drain().collect()
    };
    if !drained.is_empty() {
        debug!(count = drained.len(), "failing pending scanner requests");
    }
    let _ = inner.state.send_replace(state);
}

async fn supervise(
    ws: WsStream,
    out_rx: mpsc::UnboundedReceiver<ScannerRequest>,
    inner: Arc<Inner>,
    url: String,
    policy: ReconnectPolicy,
) {
    let mut ws = ws;
    let mut out_rx = out_rx;
    loop {
        run_link(ws, &mut out_rx, &inner).await;
        warn!(url = %url, "scanner socket lost");
        detach(&inner, ConnectionState::Disconnected);

        loop {
            tokio::time::sleep(policy.delay()).await;
            let _ = inner.state.send_replace(ConnectionState::Connecting);
            match connect_async(&url).await {
                Ok((socket, _)) => {
                    info!(url = %url, "scanner socket reconnected");
                    let (out_tx, rx) = mpsc::unbounded_channel();
                    *inner.out_tx.lock() = Some(out_tx);
                    let _ = inner.state.send_replace(ConnectionState::Connected);
                    ws = socket;
                    out_rx = rx;
                    break;
                }
                Err(e) => {
                    debug!(url = %url, "scanner reconnect attempt failed: {e}");
                    let _ = inner
                        .state
                        .send_replace(ConnectionState::Disconnected);
                }
            }
        }
    }
}

async fn run_link(
    ws: WsStream,
    out_rx: &mut mpsc::UnboundedReceiver<ScannerRequest>,
    inner: &Inner,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    loop {
        tokio::select! {
            req = out_rx.recv() => {
                let Some(req) = req else { break };
                let Ok(text) = serde_json::to_string(&req) else { continue };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                match serde_json::from_str::<ScannerReply>(&text) {
                    Ok(reply) => {
                        let waiter = inner.pending.lock().remove(&reply.response_id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(reply.payload);
                            }
                            None => debug!(
                                response_id = %reply.response_id,
                                "scanner reply with no waiter, dropping"
                            ),
                        }
                    }
                    Err(e) => debug!("unparseable scanner frame, dropping: {e}"),
                }
            }
        }
    }
}
