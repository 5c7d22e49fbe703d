//! # spade-core
//!
//! Shared building blocks for the spade poker client:
//!
//! - [`errors::SpadeError`]: the error taxonomy used across every crate
//! - [`ids`]: branded ID newtypes (`TableId`, `RequestId`, `SubscriptionId`)
//!   and the [`ids::Topic`] naming scheme for per-table channels
//! - [`messages`]: the table message envelope and scanner result payloads
//! - [`policy`]: fixed-delay reconnect policy shared by both sockets

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod messages;
pub mod policy;

pub use errors::SpadeError;
pub use ids::{RequestId, SubscriptionId, TableId, Topic};
pub use messages::{CalibrationResult, FrameImage, FrameResult, MessageHandler, TableMessage};
pub use policy::ReconnectPolicy;
