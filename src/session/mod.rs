//! Session Layer
//!
//! Clients, lobbies, and the manager that owns both.

pub mod client;
pub mod lobby;
pub mod manager;

pub use client::{Client, ClientId};
pub use lobby::{Lobby, Seat};
pub use manager::{LobbyError, LobbyManager};
