//! Action Dispatch
//!
//! Routes one decoded [`ClientMessage`] from one client into the
//! [`LobbyManager`]. The caller holds the manager lock for the whole call.
//!
//! Rejections are reported to the requesting client as `error` messages
//! before `dispatch` returns; the returned `Err` is for logging only.

use tracing::debug;

use crate::core::code::LobbyCode;
use crate::core::insane_int::InsaneInt;
use crate::game::mode::GameMode;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::session::client::{ClientId, STARTING_LIVES};
use crate::session::manager::{LobbyError, LobbyManager};

/// Option key overriding the lives each player starts a game with.
pub const STARTING_LIVES_OPTION: &str = "starting_lives";

/// Apply one client action.
pub fn dispatch(
    manager: &mut LobbyManager,
    id: ClientId,
    message: ClientMessage,
) -> Result<(), LobbyError> {
    if manager.client(id).is_none() {
        return Err(LobbyError::ClientNotFound);
    }
    debug!("Client {} sent {:?}", id, message);

    match message {
        // ===== LOBBY LIFECYCLE =====
        ClientMessage::CreateLobby { game_mode } => {
            let mode = match game_mode {
                None => GameMode::default(),
                Some(name) => match name.parse::<GameMode>() {
                    Ok(mode) => mode,
                    Err(name) => return manager.reject(id, LobbyError::UnknownGameMode(name)),
                },
            };
            manager.create_lobby(id, mode).map(|_| ())
        }

        ClientMessage::JoinLobby { code } => manager.join(&code, id),

        ClientMessage::LeaveLobby => {
            manager.leave(id);
            Ok(())
        }

        ClientMessage::LobbyInfo => {
            let code = current_lobby(manager, id)?;
            manager.broadcast_lobby_info(&code);
            Ok(())
        }

        // ===== IDENTITY =====
        ClientMessage::Username { username, mod_hash } => {
            if let Some(hash) = mod_hash {
                if let Some(client) = manager.client_mut(id) {
                    client.mod_hash = hash;
                }
            }
            manager.set_username(id, &username);
            Ok(())
        }

        ClientMessage::ReadyLobby => set_lobby_ready(manager, id, true),
        ClientMessage::UnreadyLobby => set_lobby_ready(manager, id, false),

        ClientMessage::SetLocation { location } => {
            manager.set_location(id, &location);
            Ok(())
        }

        // ===== HOST CONTROLS =====
        ClientMessage::LobbyOptions { options } => {
            let code = require_host(manager, id)?;
            manager.set_options(&code, &options)
        }

        ClientMessage::StartGame => {
            let code = require_host(manager, id)?;
            let lives = manager
                .lobby(&code)
                .and_then(|lobby| lobby.options.integer(STARTING_LIVES_OPTION))
                .unwrap_or(STARTING_LIVES);

            manager.set_players_lives(&code, lives);
            manager.reset_players(&code);
            manager.broadcast(&code, ServerMessage::StartGame);
            Ok(())
        }

        ClientMessage::StopGame => {
            let code = current_lobby(manager, id)?;
            manager.broadcast(&code, ServerMessage::StopGame);
            manager.reset_players(&code);
            Ok(())
        }

        // ===== ROUND PROGRESS =====
        ClientMessage::SetAnte { ante } => {
            if let Some(client) = manager.client_mut(id) {
                client.ante = ante;
            }
            Ok(())
        }

        ClientMessage::PlayHand { score, hands_left } => {
            let score = match score.parse::<InsaneInt>() {
                Ok(score) => score,
                Err(err) => return manager.reject(id, err.into()),
            };
            let Some(client) = manager.client_mut(id) else {
                return Err(LobbyError::ClientNotFound);
            };
            client.score = score;
            client.hands_left = hands_left;
            let status = client.enemy_info();

            if let (_, Some(opponent)) = manager.opponent(id) {
                manager.send_to(opponent, ServerMessage::EnemyInfo(status));
            }
            Ok(())
        }

        ClientMessage::FailRound => {
            let lives_before = manager.client(id).map_or(0, |c| c.lives);
            if !manager.lose_life(id) {
                return Ok(());
            }
            // Game over fires once, on the life that reaches zero.
            let out_of_lives =
                lives_before > 0 && manager.client(id).is_some_and(|c| c.lives == 0);
            if out_of_lives {
                manager.send_to(id, ServerMessage::LoseGame);
                if let (_, Some(opponent)) = manager.opponent(id) {
                    manager.send_to(opponent, ServerMessage::WinGame);
                }
            }
            Ok(())
        }

        ClientMessage::NewRound => {
            manager.reset_round_guard(id);
            Ok(())
        }

        ClientMessage::Skip { skips } => {
            manager.set_skips(id, skips);
            Ok(())
        }

        ClientMessage::SetFurthestBlind { furthest_blind } => {
            if let Some(client) = manager.client_mut(id) {
                client.furthest_blind = furthest_blind;
            }
            Ok(())
        }

        ClientMessage::ReadyBlind => {
            let opponent_ready = match manager.opponent(id) {
                (_, Some(opponent)) => manager.client(opponent).is_some_and(|c| c.is_ready),
                _ => false,
            };
            if let Some(client) = manager.client_mut(id) {
                client.is_ready = true;
                client.first_ready = !opponent_ready;
            }
            Ok(())
        }

        ClientMessage::UnreadyBlind => {
            if let Some(client) = manager.client_mut(id) {
                client.is_ready = false;
                client.first_ready = false;
            }
            Ok(())
        }

        ClientMessage::GameInfo => {
            let code = current_lobby(manager, id)?;
            manager.get_blind_info(&code, id).map(|_| ())
        }
    }
}

/// Code of the requester's lobby, or a reported `NotInLobby`.
fn current_lobby(manager: &LobbyManager, id: ClientId) -> Result<LobbyCode, LobbyError> {
    match manager.client(id).and_then(|c| c.lobby()) {
        Some(code) => Ok(code.clone()),
        None => manager.reject(id, LobbyError::NotInLobby),
    }
}

/// Code of the lobby the requester hosts.
fn require_host(manager: &LobbyManager, id: ClientId) -> Result<LobbyCode, LobbyError> {
    let code = current_lobby(manager, id)?;
    match manager.lobby(&code) {
        Some(lobby) if lobby.host() == Some(id) => Ok(code),
        Some(_) => manager.reject(id, LobbyError::NotHost),
        None => manager.reject(id, LobbyError::NotInLobby),
    }
}

fn set_lobby_ready(manager: &mut LobbyManager, id: ClientId, ready: bool) -> Result<(), LobbyError> {
    let Some(client) = manager.client_mut(id) else {
        return Err(LobbyError::ClientNotFound);
    };
    client.is_ready_lobby = ready;
    if let Some(code) = client.lobby().cloned() {
        manager.broadcast_lobby_info(&code);
    }
    Ok(())
}
