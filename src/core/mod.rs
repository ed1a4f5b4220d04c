//! Core value types.
//!
//! Lobby codes and the score number format. No I/O, no shared state.

pub mod code;
pub mod insane_int;

// Re-export core types
pub use code::{CodeSource, LobbyCode, RandomCodes, CODE_ALPHABET, CODE_LENGTH};
pub use insane_int::{InsaneInt, ParseInsaneIntError};
