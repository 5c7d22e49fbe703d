//! REST client for the poker backend.
//!
//! Thin wrapper over `reqwest` with three cross-cutting behaviors:
//!
//! - the stored bearer token is attached to every request when present
//! - a 401 response clears the persisted session before the error is
//!   surfaced, so a dead token is never retried
//! - non-2xx responses are mapped to [`SpadeError::Api`], carrying the
//!   backend's `message` field when it sends one

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use spade_core::{SpadeError, TableId};
use spade_settings::ApiSettings;
use tracing::{debug, warn};

use crate::store::AuthStore;
use crate::types::{
    Credentials, CurrentTableStatus, ErrorBody, LoginResponse, NewTable, PasswordChange, Player,
    Registration, Table, User,
};

/// Client for the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<AuthStore>,
}

impl ApiClient {
    /// Build a client from settings, sharing the given auth store.
    pub fn new(settings: &ApiSettings, store: Arc<AuthStore>) -> Result<Self, SpadeError> {
        Self::with_base_url(&settings.base_url, settings.timeout_ms, store)
    }

    /// Build a client against an explicit base URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_ms: u64,
        store: Arc<AuthStore>,
    ) -> Result<Self, SpadeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| SpadeError::connection(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            store,
        })
    }

    /// The auth store backing this client.
    #[must_use]
    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Register a new account.
    pub async fn register(&self, registration: &Registration) -> Result<User, SpadeError> {
        self.send(self.http.post(self.url("/users/register")).json(registration))
            .await
    }

    /// Log in, persist the session, and return the profile.
    ///
    /// The token and the profile it belongs to are stored together. When the
    /// backend omits the profile from the login response, it is fetched
    /// immediately so the store never holds a token without knowing whose
    /// it is.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, SpadeError> {
        let resp: LoginResponse = self
            .send(self.http.post(self.url("/users/login")).json(credentials))
            .await?;
        self.store.set_session(&resp.token, resp.user.clone())?;
        match resp.user {
            Some(user) => Ok(user),
            None => self.current_user().await,
        }
    }

    /// Drop the persisted session.
    pub fn logout(&self) -> Result<(), SpadeError> {
        self.store.clear()
    }

    /// Fetch the current user's profile and refresh the stored copy.
    ///
    /// When the profile omits the seated-table id, the player record is
    /// consulted to fill it in; not every backend build includes it on the
    /// user object.
    pub async fn current_user(&self) -> Result<User, SpadeError> {
        let mut user: User = self.send(self.http.get(self.url("/users/me"))).await?;

        if user.current_table_id.is_none() {
            match self.current_player().await {
                Ok(player) => user.current_table_id = player.current_table_id,
                Err(e) => debug!("no player record for current user: {e}"),
            }
        }

        self.store.set_user(user.clone())?;
        Ok(user)
    }

    /// Update the current user's profile.
    pub async fn update_user(&self, user: &User) -> Result<User, SpadeError> {
        let updated: User = self
            .send(self.http.put(self.url("/users/me")).json(user))
            .await?;
        self.store.set_user(updated.clone())?;
        Ok(updated)
    }

    /// Change the current user's password.
    pub async fn update_password(&self, change: &PasswordChange) -> Result<(), SpadeError> {
        let _: Value = self
            .send(self.http.put(self.url("/users/me/password")).json(change))
            .await?;
        Ok(())
    }

    /// Upload a new avatar image.
    pub async fn upload_avatar(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<User, SpadeError> {
        let part = reqwest::multipart::Part::bytes(image).file_name(filename.to_owned());
        let form = reqwest::multipart::Form::new().part("avatar", part);
        self.send(self.http.put(self.url("/users/me/avatar")).multipart(form))
            .await
    }

    // ── Players ─────────────────────────────────────────────────────

    /// Where the current user is seated, if anywhere.
    pub async fn current_table(&self) -> Result<CurrentTableStatus, SpadeError> {
        self.send(self.http.get(self.url("/players/current-table")))
            .await
    }

    /// The current user's player record.
    pub async fn current_player(&self) -> Result<Player, SpadeError> {
        self.send(self.http.get(self.url("/players/me"))).await
    }

    /// The current user's chip balance.
    pub async fn chips(&self) -> Result<i64, SpadeError> {
        Ok(self.current_player().await?.chips)
    }

    // ── Tables ──────────────────────────────────────────────────────

    /// All tables visible to the current user.
    pub async fn tables(&self) -> Result<Vec<Table>, SpadeError> {
        self.send(self.http.get(self.url("/tables"))).await
    }

    /// Public tables only.
    pub async fn public_tables(&self) -> Result<Vec<Table>, SpadeError> {
        self.send(self.http.get(self.url("/tables/public"))).await
    }

    /// A single table by id.
    pub async fn table(&self, id: TableId) -> Result<Table, SpadeError> {
        self.send(self.http.get(self.url(&format!("/tables/{id}"))))
            .await
    }

    /// Create a table.
    pub async fn create_table(&self, table: &NewTable) -> Result<Table, SpadeError> {
        self.send(self.http.post(self.url("/tables")).json(table))
            .await
    }

    /// Take a seat at a table with the given buy-in.
    pub async fn join_table(&self, id: TableId, buy_in: i64) -> Result<Table, SpadeError> {
        self.send(
            self.http
                .post(self.url(&format!("/tables/{id}/join")))
                .query(&[("buyIn", buy_in)]),
        )
        .await
    }

    /// Give up the seat at a table.
    pub async fn leave_table(&self, id: TableId) -> Result<(), SpadeError> {
        let _: Value = self
            .send(self.http.post(self.url(&format!("/tables/{id}/leave"))))
            .await?;
        Ok(())
    }

    /// Delete a table (owner only).
    pub async fn delete_table(&self, id: TableId) -> Result<(), SpadeError> {
        let _: Value = self
            .send(self.http.delete(self.url(&format!("/tables/{id}"))))
            .await?;
        Ok(())
    }

    // ── Plumbing ────────────────────────────────────────────────────

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, SpadeError> {
        let req = match self.store.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req
            .send()
            .await
            .map_err(|e| SpadeError::connection(e.to_string()))?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            // Token is dead; drop the whole session before surfacing the error.
            if let Err(e) = self.store.clear() {
                warn!("failed to clear auth state after 401: {e}");
            }
        }

        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "request failed".to_owned());
            return Err(SpadeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| SpadeError::connection(format!("invalid response body: {e}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
