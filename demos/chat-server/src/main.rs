//! Runnable chat server.
//!
//! Configured from the environment (`PORT`, `CHITCHAT_BIND`,
//! `CHITCHAT_DENYLIST`); log verbosity follows `RUST_LOG`.

use chitchat::prelude::*;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(addr = %config.bind_addr, "starting chat server");

    let server = ChitchatServer::builder().config(config).build().await?;
    server.run_until(shutdown_signal()).await?;

    tracing::info!("chat server stopped");
    Ok(())
}
