//! Reconnect policy shared by both realtime sockets.
//!
//! Both the table socket and the scanner socket reconnect forever at a fixed
//! delay. There is no backoff and no attempt cap: the client is assumed to be
//! sitting in front of a local or LAN server, and a flat cadence keeps the
//! reconnect behavior predictable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default reconnect delay for the table socket, in milliseconds.
pub const DEFAULT_TABLE_RECONNECT_MS: u64 = 5_000;
/// Default reconnect delay for the scanner socket, in milliseconds.
pub const DEFAULT_SCANNER_RECONNECT_MS: u64 = 10_000;

/// Fixed-delay, unbounded reconnect policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Delay between a lost link and the next connection attempt.
    pub delay_ms: u64,
}

impl ReconnectPolicy {
    /// Policy with the given fixed delay.
    #[must_use]
    pub fn fixed(delay_ms: u64) -> Self {
        Self { delay_ms }
    }

    /// Default policy for the table socket.
    #[must_use]
    pub fn table() -> Self {
        Self::fixed(DEFAULT_TABLE_RECONNECT_MS)
    }

    /// Default policy for the scanner socket.
    #[must_use]
    pub fn scanner() -> Self {
        Self::fixed(DEFAULT_SCANNER_RECONNECT_MS)
    }

    /// The delay as a [`Duration`].
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_both_sockets() {
        assert_eq!(ReconnectPolicy::table().delay(), Duration::from_secs(5));
        assert_eq!(ReconnectPolicy::scanner().delay(), Duration::from_secs(10));
    }

    #[test]
    fn serde_uses_camel_case() {
        let policy: ReconnectPolicy = serde_json::from_str(r#"{"delayMs":250}"#).unwrap();
        assert_eq!(policy.delay(), Duration::from_millis(250));
        assert_eq!(
            serde_json::to_string(&policy).unwrap(),
            r#"{"delayMs":250}"#
        );
    }
}
