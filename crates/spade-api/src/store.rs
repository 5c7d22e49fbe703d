//! Persisted auth state.
//!
//! The bearer token and the profile it belongs to live together in
//! `~/.spade/auth.json` (0o600) and are always written and invalidated as a
//! unit, so a token can never outlive the profile it was issued for. The
//! in-memory copy behind a mutex is the source of truth between saves;
//! reads never touch disk after construction.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use spade_core::SpadeError;

use crate::types::User;

/// Auth file schema version this build reads and writes.
const AUTH_VERSION: u32 = 1;

/// On-disk shape of `~/.spade/auth.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthFile {
    version: u32,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    last_updated: String,
}

impl Default for AuthFile {
    fn default() -> Self {
        Self {
            version: AUTH_VERSION,
            token: None,
            user: None,
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Persisted session: bearer token plus the profile it authenticates.
#[derive(Clone, Debug)]
pub struct Session {
    /// Bearer token for REST requests.
    pub token: String,
    /// Profile the token was issued for, when known.
    pub user: Option<User>,
}

/// Handle to the auth file.
pub struct AuthStore {
    path: PathBuf,
    state: Mutex<AuthFile>,
}

impl AuthStore {
    /// Open the store at the given file path, reading any existing state.
    ///
    /// A missing, unreadable, unparseable, or wrong-version file yields an
    /// empty store; stale auth state is never worth failing startup over.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_auth_file(&path).unwrap_or_default();
        Self {
            path: path.clone(),
            state: Mutex::new(state),
        }
    }

    /// Open the store at the default location (`~/.spade/auth.json`).
    #[must_use]
    pub fn open_default() -> Self {
        Self::open(spade_settings::config_dir().join("auth.json"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current bearer token, if a session is stored.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    /// The stored profile, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.lock().user.clone()
    }

    /// The stored session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        let state = self.state.lock();
        state.token.clone().map(|token| Session {
            token,
            user: state.user.clone(),
        })
    }

    /// Store a new session (token and profile together) and persist it.
    pub fn set_session(&self, token: &str, user: Option<User>) -> Result<(), SpadeError> {
        let snapshot = {
            let mut state = self.state.lock();
            state.token = Some(token.to_owned());
            state.user = user;
            state.last_updated = chrono::Utc::now().to_rfc3339();
            state.clone()
        };
        self.persist(&snapshot)
    }

    /// Update only the stored profile, keeping the token.
    ///
    /// No-op when no session is stored; a profile without a token is
    /// meaningless.
    pub fn set_user(&self, user: User) -> Result<(), SpadeError> {
        let snapshot = {
            let mut state = self.state.lock();
            if state.token.is_none() {
                return Ok(());
            }
            state.user = Some(user);
            state.last_updated = chrono::Utc::now().to_rfc3339();
            state.clone()
        };
        self.persist(&snapshot)
    }

    /// Drop the session: token and profile go together.
    ///
    /// Persists the cleared state so a restart cannot resurrect the token.
    pub fn clear(&self) -> Result<(), SpadeError> {
        let snapshot = {
            let mut state = self.state.lock();
            state.token = None;
            state.user = None;
            state.last_updated = chrono::Utc::now().to_rfc3339();
            state.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, state: &AuthFile) -> Result<(), SpadeError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SpadeError::store("failed to create auth directory", e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| SpadeError::store("failed to serialize auth state", e))?;
        std::fs::write(&self.path, &json)
            .map_err(|e| SpadeError::store("failed to write auth file", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&self.path, perms);
        }

        Ok(())
    }
}

/// Read and validate the auth file. `None` when absent or unusable.
fn load_auth_file(path: &Path) -> Option<AuthFile> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read auth file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<AuthFile>(&data) {
        Ok(file) if file.version == AUTH_VERSION => Some(file),
        Ok(file) => {
            tracing::warn!("unsupported auth file version: {}", file.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse auth file: {e}");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
