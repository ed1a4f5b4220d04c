//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON object tagged by its `"action"` field.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::code::LobbyCode;
use crate::game::mode::{BlindInfo, GameMode};
use crate::game::options::{LobbyOptions, OptionValue};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Open a new lobby as host.
    #[serde(rename_all = "camelCase")]
    CreateLobby {
        /// Mode name; defaults to attrition.
        #[serde(default)]
        game_mode: Option<String>,
    },

    /// Join an existing lobby as guest.
    JoinLobby {
        /// Lobby code, any case.
        code: String,
    },

    /// Leave the current lobby.
    LeaveLobby,

    /// Ask for a fresh lobby info broadcast.
    LobbyInfo,

    /// Set display name (and optionally the mod hash).
    #[serde(rename_all = "camelCase")]
    Username {
        /// New display name.
        username: String,
        /// Client build hash, if it changed.
        #[serde(default)]
        mod_hash: Option<String>,
    },

    /// Mark ready in the pre-game lobby.
    ReadyLobby,

    /// Clear pre-game readiness.
    UnreadyLobby,

    /// Report the current in-game screen.
    SetLocation {
        /// Screen label, passed through untouched.
        location: String,
    },

    /// Update lobby options (host only).
    LobbyOptions {
        /// Every non-`action` key, as raw text.
        #[serde(flatten)]
        options: BTreeMap<String, String>,
    },

    /// Report the current ante.
    SetAnte {
        /// Ante number.
        ante: u32,
    },

    /// Report a played hand.
    #[serde(rename_all = "camelCase")]
    PlayHand {
        /// Score in text form.
        score: String,
        /// Hands left this round.
        hands_left: u32,
    },

    /// Lost the current PvP round.
    FailRound,

    /// A new round began.
    NewRound,

    /// Report the skip count.
    Skip {
        /// Total blinds skipped.
        skips: u32,
    },

    /// Report the furthest blind reached.
    #[serde(rename_all = "camelCase")]
    SetFurthestBlind {
        /// Blind index.
        furthest_blind: u32,
    },

    /// Ready for the next blind.
    ReadyBlind,

    /// No longer ready for the next blind.
    UnreadyBlind,

    /// Start the game (host only).
    StartGame,

    /// Abort the running game.
    StopGame,

    /// Request blind info for the current ante. Deprecated.
    GameInfo,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Entered a lobby (created or joined).
    JoinedLobby {
        /// Lobby code.
        code: LobbyCode,
        /// Lobby game mode.
        #[serde(rename = "type")]
        game_mode: GameMode,
    },

    /// Current lobby options.
    LobbyOptions(LobbyOptionsInfo),

    /// Occupant summary; `is_host` tells the recipient its own role.
    LobbyInfo(LobbyInfo),

    /// The opponent moved to another screen.
    EnemyLocation {
        /// Opponent's screen label.
        location: String,
    },

    /// Own life count.
    PlayerInfo {
        /// Lives left.
        lives: u32,
    },

    /// Opponent status after it lost a life or played a hand.
    EnemyInfo(EnemyInfo),

    /// Game aborted; back to the lobby.
    StopGame,

    /// Game started.
    StartGame,

    /// Opponent ran out of lives.
    WinGame,

    /// Ran out of lives.
    LoseGame,

    /// Blinds for the requested ante.
    GameInfo(BlindInfo),

    /// Rejected request.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

/// Lobby info payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyInfo {
    /// Host display name.
    pub host: String,
    /// Host mod hash.
    pub host_hash: String,
    /// Host content readiness.
    pub host_cached: bool,
    /// Whether the recipient is the host.
    pub is_host: bool,
    /// Guest display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<String>,
    /// Guest mod hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_hash: Option<String>,
    /// Guest content readiness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_cached: Option<bool>,
    /// Guest lobby readiness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_ready: Option<bool>,
}

/// Opponent status payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyInfo {
    /// Hands left this round.
    pub hands_left: u32,
    /// Score in canonical text form.
    pub score: String,
    /// Skip count.
    pub skips: u32,
    /// Lives left.
    pub lives: u32,
}

/// Key the game mode travels under in `lobbyOptions`.
const GAMEMODE_KEY: &str = "gamemode";

/// Lobby options payload.
///
/// On the wire the options sit flat beside `gamemode`. An option that is
/// itself named `gamemode` takes that key instead of repeating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyOptionsInfo {
    /// Lobby game mode.
    pub gamemode: GameMode,
    /// Options, coerced or raw depending on the recipient.
    pub options: LobbyOptions,
}

impl Serialize for LobbyOptionsInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let overridden = self.options.get(GAMEMODE_KEY).is_some();
        let len = self.options.len() + usize::from(!overridden);
        let mut map = serializer.serialize_map(Some(len))?;
        if !overridden {
            map.serialize_entry(GAMEMODE_KEY, &self.gamemode)?;
        }
        for (key, value) in self.options.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LobbyOptionsInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut options = LobbyOptions::deserialize(deserializer)?;
        let named_mode = options
            .get(GAMEMODE_KEY)
            .and_then(OptionValue::as_text)
            .and_then(|name| name.parse::<GameMode>().ok());

        // A `gamemode` that is not a mode name was an option.
        let gamemode = match named_mode {
            Some(mode) => {
                options.remove(GAMEMODE_KEY);
                mode
            }
            None => GameMode::default(),
        };
        Ok(Self { gamemode, options })
    }
}

impl ServerMessage {
    /// Build a lobby options message.
    pub fn lobby_options(gamemode: GameMode, options: LobbyOptions) -> Self {
        Self::LobbyOptions(LobbyOptionsInfo { gamemode, options })
    }

    /// Build an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_parsing() {
        let msg = ClientMessage::from_json(r#"{"action":"joinLobby","code":"ABCDE"}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinLobby { code: "ABCDE".into() });

        let msg = ClientMessage::from_json(r#"{"action":"createLobby"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CreateLobby { game_mode: None });

        let msg =
            ClientMessage::from_json(r#"{"action":"playHand","score":"1.5e3","handsLeft":2}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayHand {
                score: "1.5e3".into(),
                hands_left: 2
            }
        );

        assert_eq!(
            ClientMessage::from_json(r#"{"action":"failRound"}"#).unwrap(),
            ClientMessage::FailRound
        );
    }

    #[test]
    fn test_lobby_options_action_collects_extra_keys() {
        let msg =
            ClientMessage::from_json(r#"{"action":"lobbyOptions","fast":"true","label":"x"}"#)
                .unwrap();
        let ClientMessage::LobbyOptions { options } = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(options["fast"], "true");
        assert_eq!(options["label"], "x");
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(ClientMessage::from_json(r#"{"action":"selfDestruct"}"#).is_err());
    }

    #[test]
    fn test_joined_lobby_wire_shape() {
        let msg = ServerMessage::JoinedLobby {
            code: LobbyCode::parse("ABCDE").unwrap(),
            game_mode: GameMode::Attrition,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "action": "joinedLobby", "code": "ABCDE", "type": "attrition" })
        );
    }

    #[test]
    fn test_lobby_info_omits_absent_guest() {
        let msg = ServerMessage::LobbyInfo(LobbyInfo {
            host: "Alice".into(),
            host_hash: "NULL".into(),
            host_cached: true,
            is_host: true,
            guest: None,
            guest_hash: None,
            guest_cached: None,
            guest_ready: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "lobbyInfo",
                "host": "Alice",
                "hostHash": "NULL",
                "hostCached": true,
                "isHost": true,
            })
        );
    }

    #[test]
    fn test_enemy_info_and_unit_actions() {
        let msg = ServerMessage::EnemyInfo(EnemyInfo {
            hands_left: 4,
            score: "0e0".into(),
            skips: 0,
            lives: 4,
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "action": "enemyInfo", "handsLeft": 4, "score": "0e0", "skips": 0, "lives": 4 })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::StopGame).unwrap(),
            json!({ "action": "stopGame" })
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::error("nope")).unwrap(),
            json!({ "action": "error", "message": "nope" })
        );
    }

    #[test]
    fn test_lobby_options_flattened() {
        let mut raw = BTreeMap::new();
        raw.insert("fast".to_string(), "true".to_string());
        let mut options = LobbyOptions::new();
        options.merge_raw(&raw);

        let msg = ServerMessage::lobby_options(GameMode::Showdown, options);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "action": "lobbyOptions", "gamemode": "showdown", "fast": true })
        );
    }

    #[test]
    fn test_lobby_options_gamemode_option_replaces_mode_key() {
        let mut raw = BTreeMap::new();
        raw.insert("gamemode".to_string(), "survival".to_string());
        raw.insert("fast".to_string(), "true".to_string());
        let msg = ServerMessage::lobby_options(GameMode::Attrition, LobbyOptions::uncoerced(&raw));

        let text = msg.to_json().unwrap();
        assert_eq!(text.matches("\"gamemode\"").count(), 1);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&text).unwrap(),
            json!({ "action": "lobbyOptions", "gamemode": "survival", "fast": "true" })
        );

        let ServerMessage::LobbyOptions(info) = ServerMessage::from_json(&text).unwrap() else {
            panic!("Wrong message type");
        };
        assert_eq!(info.gamemode, GameMode::Survival);
        assert_eq!(info.options.get("fast"), Some(&OptionValue::Text("true".into())));
        assert!(info.options.get("gamemode").is_none());
    }

    #[test]
    fn test_lobby_options_reparse() {
        let mut raw = BTreeMap::new();
        raw.insert("gamemode".to_string(), "chaos".to_string());
        let msg = ServerMessage::lobby_options(GameMode::Showdown, LobbyOptions::uncoerced(&raw));

        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        let ServerMessage::LobbyOptions(info) = parsed else {
            panic!("Wrong message type");
        };
        // Not a mode name, so it stays an option.
        assert_eq!(info.options.get("gamemode"), Some(&OptionValue::Text("chaos".into())));

        let plain = ServerMessage::lobby_options(GameMode::Showdown, LobbyOptions::new());
        assert_eq!(ServerMessage::from_json(&plain.to_json().unwrap()).unwrap(), plain);
    }
}
