//! Error types for the presence layer.

use chitchat_transport::ConnectionId;

/// Errors returned by [`UserRegistry::add_user`](crate::UserRegistry::add_user).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    /// Username or room was empty after trimming.
    #[error("username and room are required")]
    MissingFields,

    /// Another user in the same room already goes by this name
    /// (compared case-insensitively).
    #[error("username {username:?} is already taken in room {room:?}")]
    UsernameTaken { username: String, room: String },

    /// The connection already has a user. Callers are expected to check
    /// [`UserRegistry::contains`](crate::UserRegistry::contains) first;
    /// debug builds panic instead of returning this.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}
