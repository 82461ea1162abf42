//! Chat routing for Chitchat.
//!
//! All chat state lives in one Tokio task (actor model): the router owns
//! the [`UserRegistry`](chitchat_presence::UserRegistry) and every
//! connection's outbound queue, and handles one event at a time. That
//! single owner is what keeps usernames unique under concurrent joins and
//! keeps fan-out from two events from interleaving.
//!
//! # Key types
//!
//! - [`RouterHandle`]: send events to the running router
//! - [`spawn_router`]: start the router task
//! - [`ContentFilter`] / [`Denylist`]: message moderation
//! - [`ChatError`]: why an event was rejected
//! - [`RouterConfig`]: router settings

mod config;
mod error;
mod moderation;
mod router;

pub use config::RouterConfig;
pub use error::{ChatError, ErrorKind};
pub use moderation::{AllowAll, ContentFilter, Denylist};
pub use router::{ClientSender, RouterHandle, spawn_router};
