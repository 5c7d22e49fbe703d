//! Wire types for the REST API.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the backend's
//! JSON. Response types take `#[serde(default)]` on fields the backend omits
//! in some contexts, so partial payloads still deserialize.

use serde::{Deserialize, Serialize};
use spade_core::TableId;

/// A registered user, as returned by the `/users` endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend-assigned user id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Unique login name.
    pub username: String,
    /// Contact email, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Chip balance, when the backend includes it on the profile.
    #[serde(default)]
    pub chips: Option<i64>,
    /// Table the user is currently seated at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_table_id: Option<TableId>,
    /// Base64-encoded avatar image, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_base64: Option<String>,
}

/// Login request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Plaintext password (sent over the wire, never stored).
    pub password: String,
}

/// Registration request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Desired login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Contact email, optional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Password-change request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    /// The password currently on file.
    pub current_password: String,
    /// The replacement password.
    pub new_password: String,
}

/// Successful login response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Profile of the user who logged in, when the backend includes it.
    #[serde(default)]
    pub user: Option<User>,
}

/// A player seated at a table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Backend-assigned player id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Display name, usually the username.
    #[serde(default)]
    pub name: Option<String>,
    /// Chip balance.
    #[serde(default)]
    pub chips: i64,
    /// Table the player is currently seated at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_table_id: Option<TableId>,
}

/// A poker table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Backend-assigned table id.
    pub id: TableId,
    /// Display name.
    pub name: String,
    /// User id of the table's creator.
    #[serde(default)]
    pub owner_id: Option<i64>,
    /// Small blind amount.
    #[serde(default)]
    pub small_blind: Option<i64>,
    /// Big blind amount.
    #[serde(default)]
    pub big_blind: Option<i64>,
    /// Seat cap.
    #[serde(default)]
    pub max_players: Option<u32>,
    /// Whether the table is invite-only.
    #[serde(default)]
    pub private: bool,
    /// Players currently seated.
    #[serde(default)]
    pub players: Vec<Player>,
}

/// Table creation request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTable {
    /// Display name.
    pub name: String,
    /// Small blind amount.
    pub small_blind: i64,
    /// Big blind amount.
    pub big_blind: i64,
    /// Seat cap.
    pub max_players: u32,
    /// Whether the table is invite-only.
    #[serde(default)]
    pub private: bool,
}

/// Response of `/players/current-table`: where the current user is seated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTableStatus {
    /// Whether the user is seated at any table.
    #[serde(default)]
    pub is_at_table: bool,
    /// The table the user is seated at, when seated.
    #[serde(default)]
    pub table_id: Option<TableId>,
    /// Full table details, when the backend inlines them.
    #[serde(default)]
    pub table: Option<Table>,
}

impl CurrentTableStatus {
    /// The seated table id, or `None` when unseated.
    #[must_use]
    pub fn seated_at(&self) -> Option<TableId> {
        if self.is_at_table { self.table_id } else { None }
    }
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Human-readable failure description.
    #[serde(default)]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_partial_payload_deserializes() {
        let user: User = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.chips.is_none());
        assert!(user.current_table_id.is_none());
    }

    #[test]
    fn user_with_table_id() {
        let user: User =
            serde_json::from_str(r#"{"username":"alice","currentTableId":7}"#).unwrap();
        assert_eq!(user.current_table_id, Some(TableId::new(7)));
    }

    #[test]
    fn login_response_without_user() {
        let resp: LoginResponse = serde_json::from_str(r#"{"token":"jwt-abc"}"#).unwrap();
        assert_eq!(resp.token, "jwt-abc");
        assert!(resp.user.is_none());
    }

    #[test]
    fn table_defaults_fill_missing_fields() {
        let table: Table = serde_json::from_str(r#"{"id":3,"name":"High Rollers"}"#).unwrap();
        assert_eq!(table.id, TableId::new(3));
        assert!(!table.private);
        assert!(table.players.is_empty());
    }

    #[test]
    fn new_table_serializes_camel_case() {
        let body = NewTable {
            name: "Casual".into(),
            small_blind: 5,
            big_blind: 10,
            max_players: 6,
            private: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["smallBlind"], 5);
        assert_eq!(json["maxPlayers"], 6);
    }

    #[test]
    fn current_table_status_seated() {
        let status: CurrentTableStatus =
            serde_json::from_str(r#"{"isAtTable":true,"tableId":9}"#).unwrap();
        assert_eq!(status.seated_at(), Some(TableId::new(9)));

        let unseated: CurrentTableStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(unseated.seated_at(), None);

        // A stale tableId without the flag does not count as seated.
        let stale: CurrentTableStatus =
            serde_json::from_str(r#"{"isAtTable":false,"tableId":9}"#).unwrap();
        assert_eq!(stale.seated_at(), None);
    }

    #[test]
    fn error_body_tolerates_empty_object() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message.is_none());
    }
}
