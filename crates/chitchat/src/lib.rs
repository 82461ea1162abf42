//! # Chitchat
//!
//! Real-time chat rooms over WebSocket.
//!
//! Clients join a room under a display name, post messages and shared
//! locations, and see who else is in the room. A single router task owns
//! every piece of chat state; each connection gets a handler task that
//! decodes its frames and forwards them to the router.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chitchat::prelude::*;
//!
//! # async fn start() -> Result<(), ChitchatError> {
//! let config = ServerConfig::from_env()?;
//! let server = ChitchatServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::ChitchatError;
pub use server::{ChitchatServer, ChitchatServerBuilder};

pub use chitchat_presence as presence;
pub use chitchat_protocol as protocol;
pub use chitchat_room as room;
pub use chitchat_transport as transport;

/// Everything needed to start a server and talk to it.
pub mod prelude {
    pub use crate::{
        ChitchatError, ChitchatServer, ChitchatServerBuilder, ServerConfig,
    };
    pub use chitchat_protocol::{
        Ack, AckError, ChatMessage, ClientEvent, ClientFrame, Codec,
        JoinRequest, JsonCodec, Location, LocationMessage, RoomData,
        ServerEvent,
    };
    pub use chitchat_room::{
        AllowAll, ChatError, ContentFilter, Denylist, RouterConfig,
        RouterHandle,
    };
    pub use chitchat_transport::ConnectionId;
}
