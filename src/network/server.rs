//! WebSocket Lobby Server
//!
//! Async WebSocket front end for the lobby manager.
//!
//! ```text
//!  TcpListener ──accept──▶ per-connection task
//!                            │
//!                            ├─ reader: text frame ─▶ ClientMessage
//!                            │            lock(manager) ─▶ dispatch
//!                            │
//!                            └─ writer: ChannelConnection rx ─▶ text frame
//!                                       Outbound::Close ─▶ close frame
//! ```
//!
//! Every message is handled with the manager lock held, so lobby state is
//! only ever touched by one message at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::connection::{ChannelConnection, Outbound};
use crate::network::handlers::dispatch;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::session::manager::LobbyManager;

/// Environment variable overriding the bind address.
pub const BIND_ADDR_ENV: &str = "LOBBY_BIND_ADDR";

/// Environment variable overriding the connection limit.
pub const MAX_CONNECTIONS_ENV: &str = "LOBBY_MAX_CONNECTIONS";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or(BIND_ADDR_ENV, defaults.bind_addr),
            max_connections: env_or(MAX_CONNECTIONS_ENV, defaults.max_connections),
            version: defaults.version,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Lobby server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The lobby server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared lobby state.
    manager: Arc<Mutex<LobbyManager>>,
    /// Open connections.
    connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new server with an empty lobby manager.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_manager(config, LobbyManager::new())
    }

    /// Create a server around an existing manager.
    pub fn with_manager(config: ServerConfig, manager: LobbyManager) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            manager: Arc::new(Mutex::new(manager)),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!(
            "Lobby server v{} listening on {}",
            self.config.version,
            listener.local_addr()?
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::SeqCst) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new TCP connection on its own task.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let manager = self.manager.clone();
        let connections = self.connections.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, addr, manager, shutdown_rx).await {
                error!("Connection {} failed: {}", addr, e);
            }
            connections.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get open connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Get live lobby count.
    pub async fn lobby_count(&self) -> usize {
        self.manager.lock().await.lobby_count()
    }
}

/// Run one WebSocket session from handshake to disconnect.
async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    manager: Arc<Mutex<LobbyManager>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), GameServerError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (connection, mut outbound_rx) = ChannelConnection::new();
    let id = manager
        .lock()
        .await
        .register_client(Arc::new(connection), Some(addr));

    // Drain queued messages onto the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(item) = outbound_rx.recv().await {
            let frame = match item {
                Outbound::Message(message) => match message.to_json() {
                    Ok(text) => Message::Text(text),
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                },
                Outbound::Close => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let mut manager = manager.lock().await;
                        match ClientMessage::from_json(&text) {
                            Ok(message) => {
                                if let Err(e) = dispatch(&mut manager, id, message) {
                                    debug!("Rejected action from {}: {}", addr, e);
                                }
                            }
                            Err(e) => {
                                debug!("Invalid message from {}: {}", addr, e);
                                manager.send_to(id, ServerMessage::error("Invalid message format"));
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error for {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }
            _ = shutdown_rx.recv() => {
                if let Some(client) = manager.lock().await.client(id) {
                    client.close();
                }
                break;
            }
        }
    }

    manager.lock().await.disconnect(id);
    // The client's sender is gone, so the writer ends once drained.
    let _ = sender_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(env_or("LOBBY_TEST_UNSET_VARIABLE", 42usize), 42);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.lobby_count().await, 0);
        server.shutdown();
    }

    async fn next_message<S>(ws: &mut S) -> ServerMessage
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return ServerMessage::from_json(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("Unexpected frame: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_create_and_join_over_websocket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameServer::new(ServerConfig::default()));
        let serving = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let url = format!("ws://{}", addr);
        let (mut host, _) = connect_async(url.as_str()).await.unwrap();
        let (mut guest, _) = connect_async(url.as_str()).await.unwrap();

        host.send(Message::Text(r#"{"action":"createLobby"}"#.into()))
            .await
            .unwrap();
        let ServerMessage::JoinedLobby { code, .. } = next_message(&mut host).await else {
            panic!("Expected joinedLobby");
        };

        let join = format!(r#"{{"action":"joinLobby","code":"{}"}}"#, code);
        guest.send(Message::Text(join)).await.unwrap();
        assert!(matches!(
            next_message(&mut guest).await,
            ServerMessage::JoinedLobby { .. }
        ));
        assert!(matches!(
            next_message(&mut guest).await,
            ServerMessage::LobbyOptions(_)
        ));
        let ServerMessage::LobbyInfo(info) = next_message(&mut host).await else {
            panic!("Expected lobbyInfo");
        };
        assert!(info.is_host);
        assert_eq!(server.lobby_count().await, 1);

        guest.send(Message::Text("not json".into())).await.unwrap();
        // Skip the guest's lobbyInfo.
        let _ = next_message(&mut guest).await;
        assert_eq!(
            next_message(&mut guest).await,
            ServerMessage::error("Invalid message format")
        );

        // Host hangs up; guest is promoted and told the game stopped.
        host.close(None).await.unwrap();
        assert_eq!(next_message(&mut guest).await, ServerMessage::StopGame);

        server.shutdown();
        serving.await.unwrap().unwrap();
    }
}
