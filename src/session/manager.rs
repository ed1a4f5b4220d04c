//! Lobby Manager
//!
//! Owns every connected client and every live lobby, and implements the
//! lobby state machine on top of them: creation, join, leave with host
//! promotion, and the notifications each transition sends.
//!
//! Clients refer to lobbies by code and lobbies refer to clients by id, so
//! neither owns the other. All mutation goes through `&mut self`; callers
//! that share a manager across tasks serialize access with one lock held for
//! the whole of each incoming message.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::code::{CodeSource, LobbyCode, RandomCodes};
use crate::core::insane_int::ParseInsaneIntError;
use crate::game::mode::{BlindInfo, GameMode};
use crate::network::connection::Connection;
use crate::network::protocol::{LobbyInfo, ServerMessage};
use crate::session::client::{Client, ClientId};
use crate::session::lobby::Lobby;

/// Draws allowed before code generation gives up.
pub const MAX_CODE_ATTEMPTS: usize = 1024;

/// Location clients are reset to between rounds.
pub const RESET_LOCATION: &str = "Blind Select";

/// Lobby errors.
///
/// The display text is what the requesting client is shown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LobbyError {
    /// Lobby already has a guest.
    #[error("Lobby is full or does not exist.")]
    LobbyFull,

    /// No lobby with that code.
    #[error("Lobby is full or does not exist.")]
    LobbyNotFound,

    /// Requester is not host or guest of the lobby.
    #[error("Client not in Lobby")]
    NotInLobby,

    /// Requester is not the host.
    #[error("Only the host can do that")]
    NotHost,

    /// No such client.
    #[error("Client not found")]
    ClientNotFound,

    /// Mode name outside the known set.
    #[error("Unknown game mode: {0}")]
    UnknownGameMode(String),

    /// Every drawn code was taken.
    #[error("Could not allocate a lobby code")]
    CodeSpaceExhausted,

    /// Reported score could not be parsed.
    #[error("Invalid score: {0}")]
    InvalidScore(#[from] ParseInsaneIntError),
}

/// Registry of clients and lobbies.
pub struct LobbyManager {
    clients: BTreeMap<ClientId, Client>,
    lobbies: BTreeMap<LobbyCode, Lobby>,
    codes: Box<dyn CodeSource>,
}

impl Default for LobbyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LobbyManager {
    /// Create a manager drawing random codes.
    pub fn new() -> Self {
        Self::with_code_source(RandomCodes::from_entropy())
    }

    /// Create a manager with a specific code source.
    pub fn with_code_source(codes: impl CodeSource + 'static) -> Self {
        Self {
            clients: BTreeMap::new(),
            lobbies: BTreeMap::new(),
            codes: Box::new(codes),
        }
    }

    // =========================================================================
    // CLIENTS
    // =========================================================================

    /// Track a newly accepted connection.
    pub fn register_client(
        &mut self,
        connection: Arc<dyn Connection>,
        address: Option<SocketAddr>,
    ) -> ClientId {
        let client = Client::new(connection, address);
        let id = client.id();
        self.clients.insert(id, client);
        debug!("Registered client {}", id);
        id
    }

    /// Leave any lobby and forget the client. Safe to call twice.
    ///
    /// Returns true if the client was known.
    pub fn disconnect(&mut self, id: ClientId) -> bool {
        self.leave(id);
        let removed = self.clients.remove(&id).is_some();
        if removed {
            debug!("Client {} disconnected", id);
        }
        removed
    }

    /// Get a client.
    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Get a mutable client.
    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    /// Connected client count.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Send to a client; absent clients are skipped.
    pub fn send_to(&self, id: ClientId, message: ServerMessage) {
        match self.clients.get(&id) {
            Some(client) => client.send(message),
            None => debug!("Skipping send to departed client {}", id),
        }
    }

    /// Report `err` to the requester and hand it back.
    pub(crate) fn reject<T>(&self, id: ClientId, err: LobbyError) -> Result<T, LobbyError> {
        self.send_to(id, ServerMessage::error(err.to_string()));
        Err(err)
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    /// Find a lobby by user-supplied code. Case-insensitive.
    pub fn lookup(&self, code: &str) -> Option<&Lobby> {
        self.lobbies.get(&LobbyCode::parse(code)?)
    }

    /// Get a lobby by code.
    pub fn lobby(&self, code: &LobbyCode) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    /// Live lobby count.
    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    /// Draw codes until one is free.
    fn generate_unique_code(&mut self) -> Result<LobbyCode, LobbyError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.codes.next_code();
            if !self.lobbies.contains_key(&code) {
                return Ok(code);
            }
        }
        warn!(
            "No free lobby code after {} attempts ({} lobbies live)",
            MAX_CODE_ATTEMPTS,
            self.lobbies.len()
        );
        Err(LobbyError::CodeSpaceExhausted)
    }

    /// The lobby `id` is in, and the other occupant.
    ///
    /// `(lobby, None)` when the client points at a lobby it does not occupy;
    /// `(None, None)` when it points at none.
    pub fn opponent(&self, id: ClientId) -> (Option<&Lobby>, Option<ClientId>) {
        let Some(code) = self.clients.get(&id).and_then(Client::lobby) else {
            return (None, None);
        };
        match self.lobbies.get(code) {
            Some(lobby) => (Some(lobby), lobby.opponent_of(id)),
            None => (None, None),
        }
    }

    // =========================================================================
    // LOBBY TRANSITIONS
    // =========================================================================

    /// Open a new lobby with `host` in it.
    ///
    /// A host already in another lobby leaves it once a code is allocated;
    /// if allocation fails it stays where it was.
    pub fn create_lobby(
        &mut self,
        host: ClientId,
        game_mode: GameMode,
    ) -> Result<LobbyCode, LobbyError> {
        if !self.clients.contains_key(&host) {
            return Err(LobbyError::ClientNotFound);
        }

        let code = match self.generate_unique_code() {
            Ok(code) => code,
            Err(err) => return self.reject(host, err),
        };
        // Leaving only frees codes, so `code` stays unique.
        self.leave(host);
        self.lobbies
            .insert(code.clone(), Lobby::new(code.clone(), host, game_mode));

        if let Some(client) = self.clients.get_mut(&host) {
            client.set_lobby(Some(code.clone()));
            client.is_ready_lobby = false;
            client.send(ServerMessage::JoinedLobby {
                code: code.clone(),
                game_mode,
            });
        }

        info!("Lobby {} created ({})", code, game_mode);
        Ok(code)
    }

    /// Join the lobby with `code` as guest.
    pub fn join(&mut self, code: &str, id: ClientId) -> Result<(), LobbyError> {
        if !self.clients.contains_key(&id) {
            return Err(LobbyError::ClientNotFound);
        }
        let Some(lobby) = self.lookup(code) else {
            return self.reject(id, LobbyError::LobbyNotFound);
        };
        if lobby.guest.is_some() || lobby.host == Some(id) {
            return self.reject(id, LobbyError::LobbyFull);
        }
        let code = lobby.code().clone();

        // Switching lobbies.
        self.leave(id);

        let Some(lobby) = self.lobbies.get_mut(&code) else {
            // Leaving our previous lobby cannot remove this one.
            return self.reject(id, LobbyError::LobbyNotFound);
        };
        lobby.guest = Some(id);
        let game_mode = lobby.game_mode;
        let options = lobby.options.clone();

        if let Some(client) = self.clients.get_mut(&id) {
            client.set_lobby(Some(code.clone()));
            client.is_ready_lobby = false;
            client.send(ServerMessage::JoinedLobby {
                code: code.clone(),
                game_mode,
            });
            client.send(ServerMessage::lobby_options(game_mode, options));
        }

        info!("Client {} joined lobby {}", id, code);
        self.broadcast_lobby_info(&code);
        Ok(())
    }

    /// Leave the current lobby, promoting the guest if the host leaves.
    ///
    /// A lobby left without a host is removed silently. Otherwise the game is
    /// stopped and the remaining occupant gets fresh lobby info. No-op when
    /// the client is in no lobby.
    pub fn leave(&mut self, id: ClientId) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        let Some(code) = client.lobby().cloned() else {
            return;
        };
        client.set_lobby(None);

        let Some(lobby) = self.lobbies.get_mut(&code) else {
            debug!("Client {} pointed at vanished lobby {}", id, code);
            return;
        };
        if lobby.vacate(id).is_none() {
            debug!("Client {} was not an occupant of lobby {}", id, code);
            return;
        }

        if lobby.host.is_none() {
            self.lobbies.remove(&code);
            info!("Lobby {} closed", code);
            return;
        }

        debug!("Client {} left lobby {}", id, code);
        self.broadcast(&code, ServerMessage::StopGame);
        self.reset_players(&code);
        self.broadcast_lobby_info(&code);
    }

    // =========================================================================
    // BROADCAST
    // =========================================================================

    /// Send to host, then guest.
    pub fn broadcast(&self, code: &LobbyCode, message: ServerMessage) {
        let Some(lobby) = self.lobbies.get(code) else {
            return;
        };
        for id in lobby.occupants() {
            self.send_to(id, message.clone());
        }
    }

    /// Send each occupant the lobby summary, flagged with its own role.
    pub fn broadcast_lobby_info(&self, code: &LobbyCode) {
        let Some(lobby) = self.lobbies.get(code) else {
            return;
        };
        let Some(host) = lobby.host.and_then(|id| self.clients.get(&id)) else {
            return;
        };

        let mut info = LobbyInfo {
            host: host.username.clone(),
            host_hash: host.mod_hash.clone(),
            host_cached: host.is_cached,
            is_host: false,
            guest: None,
            guest_hash: None,
            guest_cached: None,
            guest_ready: None,
        };

        if let Some(guest) = lobby.guest.and_then(|id| self.clients.get(&id)) {
            if !guest.username.is_empty() {
                info.guest = Some(guest.username.clone());
                info.guest_hash = Some(guest.mod_hash.clone());
                info.guest_cached = Some(guest.is_cached);
                info.guest_ready = Some(guest.is_ready_lobby);
                guest.send(ServerMessage::LobbyInfo(info.clone()));
            }
        }

        info.is_host = true;
        host.send(ServerMessage::LobbyInfo(info));
    }

    // =========================================================================
    // LOBBY-WIDE STATE
    // =========================================================================

    /// Overwrite both occupants' lives and tell them.
    pub fn set_players_lives(&mut self, code: &LobbyCode, lives: u32) {
        let Some(lobby) = self.lobbies.get(code) else {
            return;
        };
        for id in lobby.occupants() {
            if let Some(client) = self.clients.get_mut(&id) {
                client.lives = lives;
            }
        }
        self.broadcast(code, ServerMessage::PlayerInfo { lives });
    }

    /// Send the requester the blinds for its current ante.
    pub fn get_blind_info(&self, code: &LobbyCode, id: ClientId) -> Result<BlindInfo, LobbyError> {
        let lobby = match self.lobbies.get(code) {
            Some(lobby) if lobby.has_member(id) => lobby,
            _ => return self.reject(id, LobbyError::NotInLobby),
        };
        let Some(client) = self.clients.get(&id) else {
            return Err(LobbyError::ClientNotFound);
        };

        let info = lobby
            .game_mode
            .provider()
            .blind_from_ante(client.ante, &lobby.options);
        client.send(ServerMessage::GameInfo(info.clone()));
        Ok(info)
    }

    /// Merge options and echo the raw input to the guest.
    pub fn set_options(
        &mut self,
        code: &LobbyCode,
        raw: &BTreeMap<String, String>,
    ) -> Result<(), LobbyError> {
        let lobby = self
            .lobbies
            .get_mut(code)
            .ok_or(LobbyError::LobbyNotFound)?;
        let echo = lobby.apply_options(raw);
        let gamemode = lobby.game_mode;

        if let Some(guest) = lobby.guest {
            self.send_to(guest, ServerMessage::lobby_options(gamemode, echo));
        }
        Ok(())
    }

    /// Clear per-round state for every occupant. Lives and score stay.
    pub fn reset_players(&mut self, code: &LobbyCode) {
        let Some(lobby) = self.lobbies.get(code) else {
            return;
        };
        let occupants: Vec<ClientId> = lobby.occupants().collect();

        for id in occupants {
            if let Some(client) = self.clients.get_mut(&id) {
                client.reset_round();
            }
            self.set_location(id, RESET_LOCATION);
        }
    }

    // =========================================================================
    // CLIENT MUTATORS
    // =========================================================================

    /// Update a client's location and tell its opponent.
    pub fn set_location(&mut self, id: ClientId, location: &str) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        client.location = location.to_string();

        if let (_, Some(opponent)) = self.opponent(id) {
            self.send_to(
                opponent,
                ServerMessage::EnemyLocation {
                    location: location.to_string(),
                },
            );
        }
    }

    /// Update a client's display name.
    pub fn set_username(&mut self, id: ClientId, username: &str) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        client.username = username.to_string();
        if let Some(code) = client.lobby().cloned() {
            self.broadcast_lobby_info(&code);
        }
    }

    /// Update a client's mod hash.
    pub fn set_mod_hash(&mut self, id: ClientId, mod_hash: &str) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        client.mod_hash = mod_hash.to_string();
        if let Some(code) = client.lobby().cloned() {
            self.broadcast_lobby_info(&code);
        }
    }

    /// Re-arm life loss for a client.
    pub fn reset_round_guard(&mut self, id: ClientId) {
        if let Some(client) = self.clients.get_mut(&id) {
            client.reset_blocker();
        }
    }

    /// Take one life, at most once per round.
    ///
    /// The loser always hears its new life count; the opponent hears about it
    /// only while both slots are filled. Returns true if a life was taken.
    pub fn lose_life(&mut self, id: ClientId) -> bool {
        let Some(client) = self.clients.get_mut(&id) else {
            return false;
        };
        if !client.take_life() {
            return false;
        }
        let lives = client.lives;
        client.send(ServerMessage::PlayerInfo { lives });
        let status = client.enemy_info();

        if let (Some(lobby), Some(opponent)) = self.opponent(id) {
            if lobby.is_full() {
                self.send_to(opponent, ServerMessage::EnemyInfo(status));
            }
        }
        true
    }

    /// Set a client's skip count. No broadcast.
    pub fn set_skips(&mut self, id: ClientId, skips: u32) {
        if let Some(client) = self.clients.get_mut(&id) {
            client.set_skips(skips);
        }
    }
}
