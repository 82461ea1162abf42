//! Router configuration.

use serde::{Deserialize, Serialize};

/// Settings for the router task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Capacity of the inbound command channel. When it fills up,
    /// connection handlers wait for the router to catch up.
    pub channel_size: usize,

    /// Private notice sent to a connection right after it joins.
    pub welcome_text: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            welcome_text: "Welcome!".to_string(),
        }
    }
}
