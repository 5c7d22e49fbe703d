//! Branded ID newtypes and the topic naming scheme.
//!
//! Distinct newtypes prevent passing a subscription key where a correlation
//! id is expected. Correlation ids are UUID v7 (time-ordered); subscription
//! keys are derived deterministically from their topic, so subscribing twice
//! to the same topic lands on the same key.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id! {
    /// Correlation id attached to an outgoing request so the matching
    /// response can be routed back on a channel with no native
    /// request/response semantics.
    RequestId
}

branded_id! {
    /// Key of a live topic subscription, derived from the topic itself.
    SubscriptionId
}

impl RequestId {
    /// Generate a fresh correlation id (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(format!("req-{}", Uuid::now_v7()))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionId {
    /// Derive the subscription key for a topic.
    ///
    /// Deterministic: the same topic always yields the same key, which is
    /// what makes re-subscribing replace the prior registration.
    #[must_use]
    pub fn for_topic(topic: &Topic) -> Self {
        Self(topic.as_str().replace('/', "-"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TableId
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric identifier of a poker table, as issued by the REST API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(i64);

impl TableId {
    /// Wrap a raw table id.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Return the raw id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TableId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Topic
// ─────────────────────────────────────────────────────────────────────────────

/// Named channel on the publish/subscribe transport, one per table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// The topic carrying a table's live events: `tables/{id}`.
    #[must_use]
    pub fn table(id: TableId) -> Self {
        Self(format!("tables/{id}"))
    }

    /// Return the topic name as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
