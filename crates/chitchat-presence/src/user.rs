//! The `User` record and name normalization.

use chitchat_transport::ConnectionId;

/// Normalizes a username or room name for comparison: surrounding
/// whitespace trimmed, lowercased.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// One participant bound to one live connection.
///
/// Only [`UserRegistry::add_user`](crate::UserRegistry::add_user) creates
/// users, and nothing mutates them afterwards: there is no rename or
/// room change. A user disappears when its connection does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: ConnectionId,
    /// Trimmed, with the casing the user typed.
    username: String,
    /// Lowercased username, used for uniqueness checks.
    username_key: String,
    /// Normalized room name.
    room: String,
}

impl User {
    /// Builds a user from already-trimmed, non-empty fields.
    pub(crate) fn new(id: ConnectionId, username: &str, room: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            username_key: username.to_lowercase(),
            room: room.to_lowercase(),
        }
    }

    /// The connection this user is bound to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Display name, trimmed but otherwise as typed.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Lowercased username.
    pub fn username_key(&self) -> &str {
        &self.username_key
    }

    /// Normalized (trimmed, lowercased) room name.
    pub fn room(&self) -> &str {
        &self.room
    }
}
