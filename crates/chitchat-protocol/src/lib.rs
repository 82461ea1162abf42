//! Wire protocol for Chitchat.
//!
//! - **Types** ([`ClientFrame`], [`ServerEvent`], ...): what travels on
//!   the wire.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how those types become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! ```text
//! Transport (bytes) → Protocol (frames) → Router (chat semantics)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Ack, AckError, ChatMessage, ClientEvent, ClientFrame, FrameHeader, JoinRequest,
    Location, LocationMessage, MAP_URL_BASE, RoomData, ServerEvent,
};
