//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON wire
//! format, and `#[serde(default)]` so a partial settings file deserializes
//! with defaults filled in for missing fields.

use serde::{Deserialize, Serialize};
use spade_core::policy::{
    DEFAULT_SCANNER_RECONNECT_MS, DEFAULT_TABLE_RECONNECT_MS, ReconnectPolicy,
};

/// Root settings type for the spade client.
///
/// Loaded from `~/.spade/settings.json` with defaults applied for missing
/// fields. `SPADE_*` environment variables override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpadeSettings {
    /// Settings schema version.
    pub version: String,
    /// REST API settings.
    pub api: ApiSettings,
    /// Table realtime socket settings.
    pub realtime: RealtimeSettings,
    /// Card scanner socket settings.
    pub scanner: ScannerSettings,
    /// UI behavior settings.
    pub ui: UiSettings,
}

impl Default for SpadeSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            api: ApiSettings::default(),
            realtime: RealtimeSettings::default(),
            scanner: ScannerSettings::default(),
            ui: UiSettings::default(),
        }
    }
}

/// REST API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the REST API, including the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Table realtime socket settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealtimeSettings {
    /// WebSocket endpoint for table topics.
    pub url: String,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// How long a correlated request waits for its response, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            reconnect_delay_ms: DEFAULT_TABLE_RECONNECT_MS,
            request_timeout_ms: 10_000,
        }
    }
}

impl RealtimeSettings {
    /// Reconnect policy derived from these settings.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(self.reconnect_delay_ms)
    }
}

/// Card scanner socket settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerSettings {
    /// WebSocket endpoint of the scanner sidecar.
    pub url: String,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// How long a frame or calibration request waits for its
    /// acknowledgement, in milliseconds.
    pub ack_timeout_ms: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5001/ws".to_string(),
            reconnect_delay_ms: DEFAULT_SCANNER_RECONNECT_MS,
            ack_timeout_ms: 10_000,
        }
    }
}

impl ScannerSettings {
    /// Reconnect policy derived from these settings.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(self.reconnect_delay_ms)
    }
}

/// UI behavior settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSettings {
    /// How long a transient status banner stays up before auto-clearing,
    /// in milliseconds.
    pub status_clear_ms: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            status_clear_ms: 3_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
