//! # spade-realtime
//!
//! The two WebSocket channels of the spade client:
//!
//! - [`transport::TableTransport`] + [`registry::SubscriptionRegistry`]:
//!   the table socket, with topic subscriptions, fire-and-forget publishes,
//!   and correlated request/response on top of a single link task
//! - [`scanner::ScannerChannel`]: the card scanner sidecar socket, where
//!   every operation is a correlated request
//!
//! Both links reconnect forever at a fixed delay once established; neither
//! replays subscriptions across reconnects.

#![deny(unsafe_code)]

pub mod registry;
pub mod scanner;
pub mod transport;
pub mod wire;

pub use registry::{ConnectionState, SubscriptionRegistry};
pub use scanner::ScannerChannel;
pub use transport::TableTransport;
