//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The handler never calls `serde_json` directly; it goes through a
//! [`Codec`], so a compact binary format can replace JSON without touching
//! the connection loop.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts protocol types to bytes and back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Returns `true` if encoded output is always valid UTF-8 and should
    /// go out as text frames.
    fn is_text(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what browser clients speak natively, so this is the default.
///
/// ```rust
/// use chitchat_protocol::{Codec, JsonCodec, ServerEvent, Ack};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ServerEvent::Ack(Ack::ok(1))).unwrap();
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ServerEvent::Ack(Ack::ok(1)));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn is_text(&self) -> bool {
        true
    }
}
