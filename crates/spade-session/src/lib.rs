//! Table session lifecycle on top of the REST API and the realtime channel.
//!
//! [`SessionController`] drives the join/leave choreography, classifies
//! incoming table messages, and feeds the UI a single ordered stream of
//! [`UiEvent`]s. [`StatusBanner`] handles transient, self-clearing status
//! text.

mod controller;
mod events;
mod status;

pub use controller::{JoinOutcome, SeatApi, SessionController, SessionState, TableChannel};
pub use events::UiEvent;
pub use status::StatusBanner;
