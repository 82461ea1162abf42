//! Presence tracking for Chitchat.
//!
//! This crate answers "who is connected, under which name, in which room":
//!
//! 1. **Users** ([`User`]): one participant bound to one live connection.
//! 2. **Registry** ([`UserRegistry`]): the authoritative set of users;
//!    enforces unique names per room.
//! 3. **Room index** ([`RoomIndex`]): room name → members in join order,
//!    kept in step with the registry.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)     ← owns a UserRegistry, serializes every mutation
//!     ↕
//! Presence (this crate)
//!     ↕
//! Transport (below)  ← provides ConnectionId
//! ```

mod error;
mod index;
mod registry;
mod user;

pub use error::PresenceError;
pub use index::RoomIndex;
pub use registry::UserRegistry;
pub use user::{User, normalize};
