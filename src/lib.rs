//! # Duel Lobby Server
//!
//! Lobby coordinator for two-player online matches: one host, one guest,
//! joined by a five-letter code. The server relays each player's progress to
//! the opponent; it does not simulate the game itself.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DUEL LOBBY SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Value types                            │
//! │  ├── code.rs        - Lobby codes and code sources           │
//! │  └── insane_int.rs  - Score numbers beyond f64 range         │
//! │                                                              │
//! │  game/              - Game rules                             │
//! │  ├── mode.rs        - Game modes and blind tables            │
//! │  └── options.rs     - Host-set lobby options                 │
//! │                                                              │
//! │  session/           - Lobby state machine                    │
//! │  ├── client.rs      - Per-connection player state            │
//! │  ├── lobby.rs       - Host/guest slots                       │
//! │  └── manager.rs     - Client and lobby registry              │
//! │                                                              │
//! │  network/           - Transport                              │
//! │  ├── protocol.rs    - Message types                          │
//! │  ├── connection.rs  - Outbound connection handles            │
//! │  ├── handlers.rs    - Action dispatch                        │
//! │  └── server.rs      - WebSocket server                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! The [`LobbyManager`] owns every client and every lobby. Lobbies name their
//! occupants by [`ClientId`]; clients name their lobby by [`LobbyCode`]. All
//! state changes go through `&mut LobbyManager`, so the server serializes
//! access with a single lock.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod session;

// Re-export commonly used types
pub use core::code::LobbyCode;
pub use core::insane_int::InsaneInt;
pub use game::mode::GameMode;
pub use network::protocol::{ClientMessage, ServerMessage};
pub use session::client::ClientId;
pub use session::manager::{LobbyError, LobbyManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
