//! Game Rules Module
//!
//! Game modes, their blind tables, and host-set lobby options.
//!
//! ## Module Structure
//!
//! - `mode`: Game modes and per-ante blind selection
//! - `options`: Lobby option storage and coercion

pub mod mode;
pub mod options;

// Re-export key types
pub use mode::{BlindInfo, BlindProvider, GameMode};
pub use options::{LobbyOptions, OptionValue};
