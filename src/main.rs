//! Duel Lobby Server
//!
//! Serves the lobby protocol over WebSocket until ctrl-c.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use duel_lobby::{
    network::server::{GameServer, ServerConfig},
    VERSION,
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "duel_lobby=trace,info";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Duel Lobby Server v{}", VERSION);

    let config = ServerConfig::from_env();
    info!("Max connections: {}", config.max_connections);

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => warn!("Failed to listen for ctrl-c: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
