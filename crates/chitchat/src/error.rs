//! Unified error type for Chitchat.

use chitchat_protocol::ProtocolError;
use chitchat_room::ChatError;
use chitchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `chitchat` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ChitchatError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A rejected chat event or an unavailable router. Registry errors
    /// reach this layer already converted to [`ChatError`].
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Bad server configuration (environment, denylist file).
    #[error("configuration error: {0}")]
    Config(String),
}
