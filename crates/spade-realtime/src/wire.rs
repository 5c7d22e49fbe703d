//! JSON frames on the two sockets.
//!
//! The table socket speaks `op`-tagged frames; the scanner socket speaks
//! `event`-tagged requests whose acknowledgements come back correlated by
//! `responseId` rather than tagged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use spade_core::{RequestId, TableId, TableMessage, Topic};

/// Frame sent by the client on the table socket.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Start receiving messages on a topic.
    Subscribe {
        /// Topic to attach to.
        topic: Topic,
    },
    /// Stop receiving messages on a topic.
    Unsubscribe {
        /// Topic to detach from.
        topic: Topic,
    },
    /// Publish a message to a topic.
    Send {
        /// Destination topic.
        topic: Topic,
        /// Message payload.
        body: TableMessage,
    },
}

/// Frame received from the server on the table socket.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// A message delivered on a subscribed topic.
    Message {
        /// Topic the message arrived on.
        topic: Topic,
        /// Message payload.
        body: TableMessage,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner frames
// ─────────────────────────────────────────────────────────────────────────────

/// Request sent to the card scanner sidecar.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ScannerRequest {
    /// Submit a webcam frame for card detection.
    Frame {
        /// Correlation id for the acknowledgement.
        request_id: RequestId,
        /// How many cards to look for.
        n: u32,
        /// Base64-encoded JPEG.
        image: String,
    },
    /// Fetch the camera's current view for calibration.
    GetFrame {
        /// Correlation id for the acknowledgement.
        request_id: RequestId,
        /// Table whose camera to read.
        table_id: TableId,
    },
    /// Re-run camera calibration.
    Recalibrate {
        /// Correlation id for the acknowledgement.
        request_id: RequestId,
        /// Table whose camera to calibrate.
        table_id: TableId,
    },
}

impl ScannerRequest {
    /// The correlation id carried by this request.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::Frame { request_id, .. }
            | Self::GetFrame { request_id, .. }
            | Self::Recalibrate { request_id, .. } => request_id,
        }
    }
}

/// Acknowledgement from the scanner sidecar.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerReply {
    /// Correlation id of the request this answers.
    pub response_id: RequestId,
    /// Operation-specific payload.
    #[serde(flatten)]
    pub payload: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use spade_core::TableId;

    #[test]
    fn subscribe_frame_shape() {
        let frame = ClientFrame::Subscribe {
            topic: Topic::table(TableId::new(7)),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["op"], "subscribe");
        assert_eq!(json["topic"], "tables/7");
    }

    #[test]
    fn send_frame_carries_body() {
        let frame = ClientFrame::Send {
            topic: Topic::table(TableId::new(7)),
            body: TableMessage::of_kind("PLAYER_CONNECTED"),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["op"], "send");
        assert_eq!(json["body"]["type"], "PLAYER_CONNECTED");
    }

    #[test]
    fn server_message_frame_parses() {
        let frame: ServerFrame = serde_json::from_str(
            r#"{"op":"message","topic":"tables/3","body":{"type":"HAND_RESULT","pot":10}}"#,
        )
        .unwrap();
        let ServerFrame::Message { topic, body } = frame;
        assert_eq!(topic.as_str(), "tables/3");
        assert_eq!(body.kind.as_deref(), Some("HAND_RESULT"));
    }

    #[test]
    fn scanner_request_event_names() {
        let frame = ScannerRequest::GetFrame {
            request_id: RequestId::from("req-1"),
            table_id: TableId::new(4),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "getFrame");
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["tableId"], 4);

        let frame = ScannerRequest::Frame {
            request_id: RequestId::from("req-2"),
            n: 2,
            image: "aGk=".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "frame");
        assert_eq!(json["n"], 2);
    }

    #[test]
    fn scanner_reply_flattens_payload() {
        let reply: ScannerReply = serde_json::from_str(
            r#"{"responseId":"req-9","found":true,"predictions":["AS"]}"#,
        )
        .unwrap();
        assert_eq!(reply.response_id.as_str(), "req-9");
        assert_eq!(reply.payload["found"], true);
    }
}
