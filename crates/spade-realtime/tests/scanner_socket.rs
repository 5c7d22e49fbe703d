//! End-to-end tests for the scanner channel against an in-process sidecar.

use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use spade_core::{ReconnectPolicy, SpadeError, TableId};
use spade_realtime::wire::ScannerRequest;
use spade_realtime::{ConnectionState, ScannerChannel};

/// Serve scanner acknowledgements for every known event.
async fn serve_scanner_protocol(mut ws: WebSocketStream<TcpStream>) {
    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let Ok(req) = serde_json::from_str::<ScannerRequest>(&text) else {
            continue;
        };
        let response_id = req.request_id().clone();
        let reply = match req {
            ScannerRequest::Frame { .. } => serde_json::json!({
                "responseId": response_id,
                "found": true,
                "predictions": ["AS", "KH"],
            }),
            ScannerRequest::GetFrame { .. } => serde_json::json!({
                "responseId": response_id,
                "image": "aGVsbG8=",
            }),
            ScannerRequest::Recalibrate { .. } => serde_json::json!({
                "responseId": response_id,
                "success": false,
                "message": "no markers visible",
            }),
        };
        if ws
            .send(Message::Text(reply.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }
}

async fn spawn_sidecar() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _ = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                serve_scanner_protocol(ws).await;
            });
        }
    });
    format!("ws://{addr}")
}

fn channel(url: &str) -> ScannerChannel {
    ScannerChannel::with_url(url, ReconnectPolicy::fixed(100), 1_000)
}

#[tokio::test]
async fn operations_fail_before_connect() {
    let url = spawn_sidecar().await;
    let scanner = channel(&url);
    let err = scanner.submit_frame(b"jpeg", 2).await.unwrap_err();
    assert_matches!(err, SpadeError::NotConnected);
}

#[tokio::test]
async fn submit_frame_returns_predictions() {
    let url = spawn_sidecar().await;
    let scanner = channel(&url);
    scanner.connect().await.unwrap();

    let result = scanner.submit_frame(b"jpeg-bytes", 2).await.unwrap();
    assert!(result.found);
    assert_eq!(result.predictions, vec!["AS", "KH"]);
}

#[tokio::test]
async fn calibration_frame_returns_image() {
    let url = spawn_sidecar().await;
    let scanner = channel(&url);
    scanner.connect().await.unwrap();

    let frame = scanner.calibration_frame(TableId::new(4)).await.unwrap();
    assert_eq!(frame.image, "aGVsbG8=");
}

#[tokio::test]
async fn recalibrate_reports_failure_in_payload() {
    let url = spawn_sidecar().await;
    let scanner = channel(&url);
    scanner.connect().await.unwrap();

    let result = scanner.recalibrate(TableId::new(4)).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("no markers visible"));
}

#[tokio::test]
async fn connect_is_idempotent() {
    let url = spawn_sidecar().await;
    let scanner = channel(&url);
    scanner.connect().await.unwrap();
    scanner.connect().await.unwrap();
    assert_eq!(scanner.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn acknowledgement_timeout_surfaces() {
    // Sidecar that never acknowledges.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _ = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    let scanner =
        ScannerChannel::with_url(&format!("ws://{addr}"), ReconnectPolicy::fixed(100), 200);
    scanner.connect().await.unwrap();

    let err = scanner.submit_frame(b"jpeg", 2).await.unwrap_err();
    assert_matches!(err, SpadeError::Timeout { timeout_ms: 200 });
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let url = spawn_sidecar().await;
    let scanner = channel(&url);
    scanner.connect().await.unwrap();
    scanner.disconnect().await;
    scanner.disconnect().await;
    assert_eq!(scanner.state(), ConnectionState::Disconnected);

    let err = scanner.submit_frame(b"jpeg", 2).await.unwrap_err();
    assert_matches!(err, SpadeError::NotConnected);
}

#[tokio::test]
async fn reconnects_after_sidecar_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _ = tokio::spawn(async move {
        let mut first = true;
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let serve_fully = !first;
            first = false;
            let _ = tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                if serve_fully {
                    serve_scanner_protocol(ws).await;
                } else {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    drop(ws);
                }
            });
        }
    });

    let scanner =
        ScannerChannel::with_url(&format!("ws://{addr}"), ReconnectPolicy::fixed(100), 1_000);
    scanner.connect().await.unwrap();

    let mut state = scanner.watch_state();
    tokio::time::timeout(Duration::from_secs(3), async {
        let _ = state
            .wait_for(|s| *s == ConnectionState::Disconnected)
            .await
            .unwrap();
        let _ = state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .unwrap();
    })
    .await
    .unwrap();

    let result = scanner.submit_frame(b"jpeg", 2).await.unwrap();
    assert!(result.found);
}
