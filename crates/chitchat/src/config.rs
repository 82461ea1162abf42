//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use chitchat_room::RouterConfig;
use serde::{Deserialize, Serialize};

use crate::ChitchatError;

/// Port used when neither `PORT` nor `CHITCHAT_BIND` is set.
pub const DEFAULT_PORT: u16 = 3000;

/// Everything needed to start a [`ChitchatServer`](crate::ChitchatServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Optional denylist file, one term per line. When unset the
    /// built-in list is used.
    pub denylist_path: Option<PathBuf>,

    /// Router task settings.
    pub router: RouterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            denylist_path: None,
            router: RouterConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `PORT` | bind `0.0.0.0:<PORT>` |
    /// | `CHITCHAT_BIND` | bind this exact address (wins over `PORT`) |
    /// | `CHITCHAT_DENYLIST` | load the denylist from this file |
    ///
    /// # Errors
    /// Returns [`ChitchatError::Config`] if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ChitchatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ChitchatError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(port) = var("PORT") {
            let port: u16 = port.parse().map_err(|_| {
                ChitchatError::Config(format!("PORT {port:?} is not a valid port"))
            })?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(addr) = var("CHITCHAT_BIND") {
            addr.parse::<SocketAddr>().map_err(|_| {
                ChitchatError::Config(format!(
                    "CHITCHAT_BIND {addr:?} is not a socket address"
                ))
            })?;
            config.bind_addr = addr;
        }

        config.denylist_path = var("CHITCHAT_DENYLIST").map(PathBuf::from);

        Ok(config)
    }
}
