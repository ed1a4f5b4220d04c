//! Network Layer
//!
//! Wire protocol, connection handles, action dispatch, and the WebSocket
//! server. Lobby state itself lives in `session/`.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use connection::{ChannelConnection, Connection, Outbound};
pub use handlers::dispatch;
pub use protocol::{ClientMessage, EnemyInfo, LobbyInfo, ServerMessage};
pub use server::{GameServer, GameServerError, ServerConfig};
