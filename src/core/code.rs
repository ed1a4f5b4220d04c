//! Lobby Codes
//!
//! Short human-readable lobby identifiers: five uppercase ASCII letters,
//! drawn uniformly from A-Z. The source of letters is pluggable so tests
//! can force collisions.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of letters in a lobby code.
pub const CODE_LENGTH: usize = 5;

/// Alphabet lobby codes are drawn from.
pub const CODE_ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A lobby code (registry key).
///
/// Always [`CODE_LENGTH`] uppercase ASCII letters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyCode(String);

impl LobbyCode {
    /// Parse user input into a code. Case-insensitive.
    ///
    /// Returns `None` unless the input is exactly five ASCII letters.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.len() != CODE_LENGTH || !input.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        Some(Self(input.to_ascii_uppercase()))
    }

    /// Build a code from alphabet indices (each taken modulo 26).
    pub fn from_indices(indices: [u8; CODE_LENGTH]) -> Self {
        let code = indices
            .iter()
            .map(|&i| CODE_ALPHABET[(i % 26) as usize] as char)
            .collect();
        Self(code)
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of candidate lobby codes.
///
/// Uniqueness is not this trait's concern; the registry retries on collision.
pub trait CodeSource: Send {
    /// Draw the next candidate code.
    fn next_code(&mut self) -> LobbyCode;
}

/// Uniformly random codes backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomCodes<R = StdRng> {
    rng: R,
}

impl RandomCodes<StdRng> {
    /// Random codes seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible codes from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomCodes<R> {
    /// Wrap an existing generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> CodeSource for RandomCodes<R> {
    fn next_code(&mut self) -> LobbyCode {
        let mut indices = [0u8; CODE_LENGTH];
        for index in indices.iter_mut() {
            *index = self.rng.gen_range(0..CODE_ALPHABET.len() as u8);
        }
        LobbyCode::from_indices(indices)
    }
}
