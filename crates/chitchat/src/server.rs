//! `ChitchatServer` builder and accept loop.
//!
//! This is the entry point for running a chat server. It ties the layers
//! together: transport → protocol → router.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use chitchat_protocol::{Codec, JsonCodec};
use chitchat_room::{
    ContentFilter, Denylist, RouterConfig, RouterHandle, spawn_router,
};
use chitchat_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ChitchatError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// The router handle is the only way to reach chat state; there is no
/// lock here.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) router: RouterHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a chat server.
///
/// # Example
///
/// ```rust,no_run
/// use chitchat::prelude::*;
///
/// # async fn start() -> Result<(), ChitchatError> {
/// let server = ChitchatServer::builder()
///     .bind("0.0.0.0:3000")
///     .filter(Denylist::default().with_words(["heck"]))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ChitchatServerBuilder {
    config: ServerConfig,
    filter: Option<Box<dyn ContentFilter>>,
}

impl ChitchatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            filter: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the router configuration.
    pub fn router_config(mut self, config: RouterConfig) -> Self {
        self.config.router = config;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `filter` for moderation instead of the configured denylist.
    pub fn filter(mut self, filter: impl ContentFilter) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Binds the listener and starts the router.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// [`ChitchatError::Config`] if the denylist file cannot be read, or
    /// [`ChitchatError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<ChitchatServer<JsonCodec>, ChitchatError> {
        let filter = match self.filter {
            Some(filter) => filter,
            None => Box::new(
                load_denylist(self.config.denylist_path.as_deref()).await?,
            ),
        };

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            router: spawn_router(filter, self.config.router),
            codec: JsonCodec,
        });

        Ok(ChitchatServer { transport, state })
    }
}

impl Default for ChitchatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a denylist file, or falls back to the built-in list.
async fn load_denylist(path: Option<&Path>) -> Result<Denylist, ChitchatError> {
    let Some(path) = path else {
        return Ok(Denylist::default());
    };

    let source = tokio::fs::read_to_string(path).await.map_err(|e| {
        ChitchatError::Config(format!(
            "cannot read denylist {}: {e}",
            path.display()
        ))
    })?;
    let denylist = Denylist::parse(&source);

    if denylist.is_empty() {
        tracing::warn!(path = %path.display(), "denylist file has no terms");
    } else {
        tracing::info!(
            path = %path.display(),
            terms = denylist.len(),
            "denylist loaded"
        );
    }
    Ok(denylist)
}

/// A bound chat server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ChitchatServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ChitchatServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ChitchatServerBuilder {
        ChitchatServerBuilder::new()
    }
}

impl<C: Codec> ChitchatServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ChitchatError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns a handle to the router, for inspecting chat state.
    pub fn router(&self) -> RouterHandle {
        self.state.router.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ChitchatError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// router.
    ///
    /// Each accepted connection gets its own handler task. Accept
    /// failures (a bad upgrade, a dropped TCP handshake) are logged and
    /// the loop carries on.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ChitchatError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "chat server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        // Already stopped is fine.
        let _ = self.state.router.shutdown().await;
        Ok(())
    }
}
