//! Error taxonomy for the spade client.
//!
//! Four domains map onto the failure modes of a thin realtime client:
//!
//! - [`SpadeError::Connection`]: transport unreachable or handshake failure
//! - [`SpadeError::NotConnected`]: operation attempted while disconnected
//! - [`SpadeError::Timeout`]: correlated request left unanswered
//! - [`SpadeError::Api`]: non-2xx REST response, carrying the server message
//!
//! Plus [`SpadeError::Store`] for local auth-file I/O. No error is fatal to
//! the process; callers on non-critical paths log and swallow, callers on
//! critical paths surface a transient status banner.

use thiserror::Error;

/// Top-level error type for the spade client.
#[derive(Debug, Error)]
pub enum SpadeError {
    /// Transport unreachable or the handshake failed.
    #[error("connection error: {message}")]
    Connection {
        /// Human-readable description of the failure.
        message: String,
    },

    /// Operation attempted while the realtime link is down.
    #[error("not connected to the realtime server")]
    NotConnected,

    /// A correlated request was not answered in time.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Non-2xx REST response.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// Server-provided message, or a generic fallback.
        message: String,
    },

    /// Local auth-store read/write failure.
    #[error("auth store error: {message}")]
    Store {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying I/O or serialization error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SpadeError {
    /// Create a [`SpadeError::Connection`] from any displayable cause.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a [`SpadeError::Store`] wrapping an underlying error.
    #[must_use]
    pub fn store(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Api { .. } => "API_ERROR",
            Self::Store { .. } => "STORE_ERROR",
        }
    }

    /// Whether retrying the same operation can reasonably succeed.
    ///
    /// Connection and timeout failures are transient; a rejected REST call
    /// or a store failure will not fix itself.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::NotConnected | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Store { .. } => false,
        }
    }

    /// Whether this error invalidates the stored bearer token.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_code_and_retryable() {
        let err = SpadeError::connection("refused");
        assert_eq!(err.code(), "CONNECTION_ERROR");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn not_connected_is_retryable() {
        let err = SpadeError::NotConnected;
        assert_eq!(err.code(), "NOT_CONNECTED");
        assert!(err.is_retryable());
    }

    #[test]
    fn timeout_carries_duration() {
        let err = SpadeError::Timeout { timeout_ms: 10_000 };
        assert_eq!(err.code(), "TIMEOUT");
        assert!(err.to_string().contains("10000 ms"));
        assert!(err.is_retryable());
    }

    #[test]
    fn api_error_4xx_not_retryable() {
        let err = SpadeError::Api {
            status: 400,
            message: "bad buy-in".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("bad buy-in"));
    }

    #[test]
    fn api_error_5xx_retryable() {
        let err = SpadeError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn only_401_is_auth_failure() {
        let unauthorized = SpadeError::Api {
            status: 401,
            message: "expired".into(),
        };
        let forbidden = SpadeError::Api {
            status: 403,
            message: "nope".into(),
        };
        assert!(unauthorized.is_auth_failure());
        assert!(!forbidden.is_auth_failure());
        assert!(!SpadeError::NotConnected.is_auth_failure());
    }

    #[test]
    fn store_error_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SpadeError::store("failed to write auth file", io);
        assert_eq!(err.code(), "STORE_ERROR");
        assert!(!err.is_retryable());
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
    }
}
