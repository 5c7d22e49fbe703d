//! # spade-api
//!
//! REST client for the poker backend plus the persisted auth state it
//! authenticates with.
//!
//! - [`client::ApiClient`]: typed wrappers over every backend endpoint
//! - [`store::AuthStore`]: `~/.spade/auth.json`, bearer token and profile
//!   stored and invalidated as a unit
//! - [`types`]: the camelCase wire DTOs

#![deny(unsafe_code)]

pub mod client;
pub mod store;
pub mod types;

pub use client::ApiClient;
pub use store::{AuthStore, Session};
pub use types::{
    Credentials, CurrentTableStatus, LoginResponse, NewTable, PasswordChange, Player,
    Registration, Table, User,
};
