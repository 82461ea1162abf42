//! Error types for the routing layer.

use chitchat_presence::PresenceError;

/// Why an inbound chat event was rejected.
///
/// Errors go back only to the connection that sent the event, inside its
/// acknowledgment. None of them affect other connections, and none are
/// retried by the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Join without a username or room.
    #[error("Username and room are required")]
    MissingFields,

    /// Join under a name already used in that room.
    #[error("Username {username:?} is already in use in room {room:?}")]
    UsernameTaken { username: String, room: String },

    /// Chat or location event from a connection that has not joined.
    #[error("You must join a room first")]
    NotJoined,

    /// Join from a connection that is already in a room.
    #[error("Already joined a room")]
    AlreadyJoined,

    /// The message tripped the moderation filter.
    #[error("Profanity is not allowed")]
    Profanity,

    /// The router task has stopped.
    #[error("Chat router is unavailable")]
    Unavailable,
}

/// Broad category of a [`ChatError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request.
    Validation,
    /// Clashes with another user's state.
    Conflict,
    /// Not valid for the connection's current state.
    State,
    /// Refused by content policy.
    Policy,
    /// Server-side failure.
    Internal,
}

impl ChatError {
    /// Returns the error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields => ErrorKind::Validation,
            Self::UsernameTaken { .. } => ErrorKind::Conflict,
            Self::NotJoined | Self::AlreadyJoined => ErrorKind::State,
            Self::Profanity => ErrorKind::Policy,
            Self::Unavailable => ErrorKind::Internal,
        }
    }

    /// Stable identifier sent to clients in `ack.error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "MissingFields",
            Self::UsernameTaken { .. } => "UsernameTaken",
            Self::NotJoined => "NotJoined",
            Self::AlreadyJoined => "AlreadyJoined",
            Self::Profanity => "Profanity",
            Self::Unavailable => "Unavailable",
        }
    }
}

impl From<PresenceError> for ChatError {
    fn from(err: PresenceError) -> Self {
        match err {
            PresenceError::MissingFields => Self::MissingFields,
            PresenceError::UsernameTaken { username, room } => {
                Self::UsernameTaken { username, room }
            }
            PresenceError::AlreadyRegistered(_) => Self::AlreadyJoined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chitchat_transport::ConnectionId;

    #[test]
    fn test_profanity_message_is_exact() {
        assert_eq!(ChatError::Profanity.to_string(), "Profanity is not allowed");
    }

    #[test]
    fn test_kind_covers_taxonomy() {
        assert_eq!(ChatError::MissingFields.kind(), ErrorKind::Validation);
        assert_eq!(
            ChatError::UsernameTaken {
                username: "a".into(),
                room: "r".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(ChatError::NotJoined.kind(), ErrorKind::State);
        assert_eq!(ChatError::Profanity.kind(), ErrorKind::Policy);
    }

    #[test]
    fn test_from_presence_error_maps_variants() {
        assert_eq!(
            ChatError::from(PresenceError::MissingFields),
            ChatError::MissingFields
        );
        assert_eq!(
            ChatError::from(PresenceError::AlreadyRegistered(ConnectionId::new(1))),
            ChatError::AlreadyJoined
        );
        let taken = ChatError::from(PresenceError::UsernameTaken {
            username: "Bob".into(),
            room: "r1".into(),
        });
        assert_eq!(taken.code(), "UsernameTaken");
        assert!(taken.to_string().contains("Bob"));
    }
}
