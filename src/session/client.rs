//! Client State
//!
//! One connected user's session-scoped state. A client never owns its
//! lobby; it only remembers the lobby's code, and that reference changes
//! only through [`Client::set_lobby`].

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::code::LobbyCode;
use crate::core::insane_int::InsaneInt;
use crate::network::connection::Connection;
use crate::network::protocol::{EnemyInfo, ServerMessage};

/// Lives every client starts with.
pub const STARTING_LIVES: u32 = 5;

/// Hands per round.
pub const STARTING_HANDS: u32 = 4;

/// Username before the client sets one.
pub const DEFAULT_USERNAME: &str = "Guest";

/// Mod hash before the client reports one.
pub const DEFAULT_MOD_HASH: &str = "NULL";

/// Location before the client reports one.
pub const DEFAULT_LOCATION: &str = "loc_selecting";

/// Process-unique client identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected client.
pub struct Client {
    id: ClientId,
    /// Peer address, informational only.
    pub address: Option<SocketAddr>,
    connection: Arc<dyn Connection>,

    /// Display name.
    pub username: String,
    /// Client build/content hash.
    pub mod_hash: String,
    /// Content readiness.
    pub is_cached: bool,
    lobby: Option<LobbyCode>,

    /// Free-form label for the current in-game screen.
    pub location: String,
    /// Ready in the pre-game lobby.
    pub is_ready_lobby: bool,
    /// Ready for the next blind.
    pub is_ready: bool,
    /// First to ready up this round.
    pub first_ready: bool,
    /// Lives left.
    pub lives: u32,
    /// Current score.
    pub score: InsaneInt,
    /// Hands left this round.
    pub hands_left: u32,
    /// Current ante.
    pub ante: u32,
    /// Blinds skipped.
    pub skips: u32,
    /// Furthest blind reached.
    pub furthest_blind: u32,
    lives_blocker: bool,
}

impl Client {
    /// Wrap a freshly accepted connection.
    pub fn new(connection: Arc<dyn Connection>, address: Option<SocketAddr>) -> Self {
        Self {
            id: ClientId::new(),
            address,
            connection,
            username: DEFAULT_USERNAME.to_string(),
            mod_hash: DEFAULT_MOD_HASH.to_string(),
            is_cached: true,
            lobby: None,
            location: DEFAULT_LOCATION.to_string(),
            is_ready_lobby: false,
            is_ready: false,
            first_ready: false,
            lives: STARTING_LIVES,
            score: InsaneInt::ZERO,
            hands_left: STARTING_HANDS,
            ante: 1,
            skips: 0,
            furthest_blind: 0,
            lives_blocker: false,
        }
    }

    /// Client identifier.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Code of the lobby this client is in.
    pub fn lobby(&self) -> Option<&LobbyCode> {
        self.lobby.as_ref()
    }

    /// Point this client at a lobby (or none). Sends nothing.
    pub fn set_lobby(&mut self, lobby: Option<LobbyCode>) {
        self.lobby = lobby;
    }

    /// Send a message to this client.
    pub fn send(&self, message: ServerMessage) {
        self.connection.send(message);
    }

    /// Close this client's connection.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Whether a life was already lost this round.
    pub fn lives_blocked(&self) -> bool {
        self.lives_blocker
    }

    /// Re-arm life loss for the next round.
    pub fn reset_blocker(&mut self) {
        self.lives_blocker = false;
    }

    /// Take one life unless one was already taken this round.
    ///
    /// Returns `true` if a life was taken.
    pub fn take_life(&mut self) -> bool {
        if self.lives_blocker {
            return false;
        }
        self.lives = self.lives.saturating_sub(1);
        self.lives_blocker = true;
        true
    }

    /// Set the skip count. No broadcast.
    pub fn set_skips(&mut self, skips: u32) {
        self.skips = skips;
    }

    /// Clear per-round state at a round boundary.
    pub(crate) fn reset_round(&mut self) {
        self.is_ready = false;
        self.reset_blocker();
        self.furthest_blind = 0;
        self.skips = 0;
    }

    /// Status snapshot the opponent sees.
    pub fn enemy_info(&self) -> EnemyInfo {
        EnemyInfo {
            hands_left: self.hands_left,
            score: self.score.to_string(),
            skips: self.skips,
            lives: self.lives,
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("lobby", &self.lobby)
            .field("lives", &self.lives)
            .finish_non_exhaustive()
    }
}
