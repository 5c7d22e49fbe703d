//! Events the session controller emits toward the UI.

use spade_api::Table;
use spade_core::{TableId, TableMessage};

/// Something the UI should react to.
#[derive(Clone, Debug)]
pub enum UiEvent {
    /// Show a transient status banner.
    Status {
        /// Banner text, e.g. `"Player alice connected"`.
        text: String,
    },
    /// The last status banner expired; hide it.
    StatusCleared,
    /// The join flow completed and the session is live.
    Joined {
        /// The table that was joined.
        table: Table,
    },
    /// The session ended; back to the lobby.
    Left {
        /// The table that was left.
        table_id: TableId,
    },
    /// A join was refused locally for lack of chips.
    InsufficientBalance {
        /// Buy-in that was asked for.
        required: i64,
        /// Chips actually available.
        available: i64,
    },
    /// A player joined or left the table's live session.
    Presence {
        /// Player the event refers to.
        player: String,
        /// `true` for connect, `false` for disconnect.
        connected: bool,
    },
    /// A game message on the table topic, passed through untouched.
    Table(TableMessage),
    /// The realtime link dropped while a session was active.
    ConnectionLost,
}
