//! Message envelopes crossing the two realtime channels.
//!
//! [`TableMessage`] is the loose JSON envelope flowing over per-table
//! topics. Only three fields are interpreted client-side: the `type` tag
//! (presence classification), and the `requestId`/`responseId` pair used for
//! request/response correlation. Everything else rides along opaquely and is
//! handed to the UI untouched. Unrecognized types are accepted and ignored,
//! never rejected.
//!
//! The scanner channel's acknowledgement payloads ([`FrameResult`],
//! [`FrameImage`], [`CalibrationResult`]) are fully typed since the client
//! acts on every field.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::RequestId;

/// `type` tag announcing a player joined a table's live session.
pub const PLAYER_CONNECTED: &str = "PLAYER_CONNECTED";
/// `type` tag announcing a player left a table's live session.
pub const PLAYER_DISCONNECTED: &str = "PLAYER_DISCONNECTED";

/// Callback invoked for every message delivered to a live subscription.
pub type MessageHandler = Arc<dyn Fn(TableMessage) + Send + Sync>;

/// A message on a table topic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMessage {
    /// Message classification tag. Absent tags are treated as opaque.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Player a presence event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,

    /// Correlation id on an outgoing request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,

    /// Correlation id echoed back on a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<RequestId>,

    /// Everything else, passed through opaquely.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Presence change extracted from a [`TableMessage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Presence {
    /// Player the event refers to.
    pub player: String,
    /// `true` for connect, `false` for disconnect.
    pub connected: bool,
}

impl TableMessage {
    /// Build a message carrying only a `type` tag.
    #[must_use]
    pub fn of_kind(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_owned()),
            ..Self::default()
        }
    }

    /// Build a presence announcement for the named player.
    #[must_use]
    pub fn presence_announcement(player: &str, connected: bool) -> Self {
        Self {
            kind: Some(
                if connected {
                    PLAYER_CONNECTED
                } else {
                    PLAYER_DISCONNECTED
                }
                .to_owned(),
            ),
            player_name: Some(player.to_owned()),
            ..Self::default()
        }
    }

    /// Interpret this message as a presence event, if it is one.
    ///
    /// Presence events without a player name are not presence events.
    #[must_use]
    pub fn presence(&self) -> Option<Presence> {
        let connected = match self.kind.as_deref() {
            Some(PLAYER_CONNECTED) => true,
            Some(PLAYER_DISCONNECTED) => false,
            _ => return None,
        };
        let player = self.player_name.clone()?;
        Some(Presence { player, connected })
    }

    /// Serialize into a JSON object for the wire.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner acknowledgements
// ─────────────────────────────────────────────────────────────────────────────

/// Server acknowledgement for a submitted webcam frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameResult {
    /// Whether cards were detected in the frame.
    pub found: bool,
    /// Detected card labels (e.g. `"AS"`, `"KH"`), rank then suit letter.
    #[serde(default)]
    pub predictions: Vec<String>,
}

/// Server acknowledgement for a calibration-frame fetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameImage {
    /// Base64-encoded JPEG of the camera's current view.
    pub image: String,
}

/// Server acknowledgement for a recalibration request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationResult {
    /// Whether calibration succeeded.
    pub success: bool,
    /// Failure detail, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_connected_classified() {
        let msg: TableMessage =
            serde_json::from_str(r#"{"type":"PLAYER_CONNECTED","playerName":"alice"}"#).unwrap();
        let presence = msg.presence().unwrap();
        assert_eq!(presence.player, "alice");
        assert!(presence.connected);
    }

    #[test]
    fn presence_disconnected_classified() {
        let msg = TableMessage::presence_announcement("bob", false);
        let presence = msg.presence().unwrap();
        assert_eq!(presence.player, "bob");
        assert!(!presence.connected);
    }

    #[test]
    fn presence_without_player_name_is_opaque() {
        let msg = TableMessage::of_kind(PLAYER_CONNECTED);
        assert!(msg.presence().is_none());
    }

    #[test]
    fn unknown_type_is_accepted_not_rejected() {
        let msg: TableMessage =
            serde_json::from_str(r#"{"type":"HAND_RESULT","pot":420}"#).unwrap();
        assert!(msg.presence().is_none());
        assert_eq!(msg.kind.as_deref(), Some("HAND_RESULT"));
        assert_eq!(msg.extra["pot"], 420);
    }

    #[test]
    fn missing_type_is_accepted() {
        let msg: TableMessage = serde_json::from_str(r#"{"chips":100}"#).unwrap();
        assert!(msg.kind.is_none());
        assert!(msg.presence().is_none());
        assert_eq!(msg.extra["chips"], 100);
    }

    #[test]
    fn correlation_ids_roundtrip() {
        let mut msg = TableMessage::of_kind("DEAL_REQUEST");
        msg.request_id = Some(RequestId::from("req-1"));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"requestId\":\"req-1\""));
        let back: TableMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.request_id.unwrap().as_str(), "req-1");
        assert!(back.response_id.is_none());
    }

    #[test]
    fn response_id_deserializes() {
        let msg: TableMessage =
            serde_json::from_str(r#"{"responseId":"req-9","result":"ok"}"#).unwrap();
        assert_eq!(msg.response_id.unwrap().as_str(), "req-9");
        assert_eq!(msg.extra["result"], "ok");
    }

    #[test]
    fn frame_result_defaults_predictions() {
        let result: FrameResult = serde_json::from_str(r#"{"found":false}"#).unwrap();
        assert!(!result.found);
        assert!(result.predictions.is_empty());
    }

    #[test]
    fn frame_result_with_predictions() {
        let result: FrameResult =
            serde_json::from_str(r#"{"found":true,"predictions":["AS","KH"]}"#).unwrap();
        assert!(result.found);
        assert_eq!(result.predictions, vec!["AS", "KH"]);
    }

    #[test]
    fn calibration_failure_carries_message() {
        let result: CalibrationResult =
            serde_json::from_str(r#"{"success":false,"message":"no markers visible"}"#).unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("no markers visible"));
    }
}
