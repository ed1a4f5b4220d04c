//! Lobby State
//!
//! A lobby is a two-slot session: one host, at most one guest. Slots hold
//! client ids; the clients themselves live in the manager.
//!
//! ```text
//!              join                    leave(host)
//!  host-only ────────▶ host+guest ───────────────┐
//!      ▲                   │ leave(guest)        │ guest promoted
//!      └───────────────────┴─────────────────────┘
//!      │
//!      │ leave(host), no guest
//!      ▼
//!  removed from registry
//! ```

use std::collections::BTreeMap;

use crate::core::code::LobbyCode;
use crate::game::mode::GameMode;
use crate::game::options::LobbyOptions;
use crate::session::client::ClientId;

/// Which slot a client occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    /// Lobby owner.
    Host,
    /// Second player.
    Guest,
}

/// A lobby.
#[derive(Debug, Clone)]
pub struct Lobby {
    code: LobbyCode,
    /// Host slot. A lobby without a host is removed from the registry.
    pub(crate) host: Option<ClientId>,
    /// Guest slot.
    pub(crate) guest: Option<ClientId>,
    /// Game mode.
    pub game_mode: GameMode,
    /// Host-provided options.
    pub options: LobbyOptions,
}

impl Lobby {
    pub(crate) fn new(code: LobbyCode, host: ClientId, game_mode: GameMode) -> Self {
        Self {
            code,
            host: Some(host),
            guest: None,
            game_mode,
            options: LobbyOptions::new(),
        }
    }

    /// Lobby code.
    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    /// Host client.
    pub fn host(&self) -> Option<ClientId> {
        self.host
    }

    /// Guest client.
    pub fn guest(&self) -> Option<ClientId> {
        self.guest
    }

    /// Whether both slots are filled.
    pub fn is_full(&self) -> bool {
        self.host.is_some() && self.guest.is_some()
    }

    /// Slot held by `client`, if any.
    pub fn seat_of(&self, client: ClientId) -> Option<Seat> {
        if self.host == Some(client) {
            Some(Seat::Host)
        } else if self.guest == Some(client) {
            Some(Seat::Guest)
        } else {
            None
        }
    }

    /// Check if `client` occupies a slot.
    pub fn has_member(&self, client: ClientId) -> bool {
        self.seat_of(client).is_some()
    }

    /// The occupant opposite `client`.
    pub fn opponent_of(&self, client: ClientId) -> Option<ClientId> {
        match self.seat_of(client)? {
            Seat::Host => self.guest,
            Seat::Guest => self.host,
        }
    }

    /// Occupants, host first.
    pub fn occupants(&self) -> impl Iterator<Item = ClientId> {
        self.host.into_iter().chain(self.guest)
    }

    /// Vacate `client`'s slot, promoting the guest if the host left.
    ///
    /// Returns the slot that was vacated, or `None` if `client` held none.
    pub(crate) fn vacate(&mut self, client: ClientId) -> Option<Seat> {
        let seat = self.seat_of(client)?;
        match seat {
            Seat::Host => self.host = self.guest.take(),
            Seat::Guest => self.guest = None,
        }
        Some(seat)
    }

    /// Merge raw options and return what the guest should be told.
    pub(crate) fn apply_options(&mut self, raw: &BTreeMap<String, String>) -> LobbyOptions {
        self.options.merge_raw(raw);
        LobbyOptions::uncoerced(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::options::OptionValue;

    fn lobby_with_host() -> (Lobby, ClientId) {
        let host = ClientId::new();
        let code = LobbyCode::parse("ABCDE").unwrap();
        (Lobby::new(code, host, GameMode::default()), host)
    }

    #[test]
    fn test_new_lobby() {
        let (lobby, host) = lobby_with_host();
        assert_eq!(lobby.code().as_str(), "ABCDE");
        assert_eq!(lobby.host(), Some(host));
        assert!(lobby.guest().is_none());
        assert!(!lobby.is_full());
        assert_eq!(lobby.game_mode, GameMode::Attrition);
        assert!(lobby.options.is_empty());
    }

    #[test]
    fn test_seats_and_opponents() {
        let (mut lobby, host) = lobby_with_host();
        let guest = ClientId::new();
        let stranger = ClientId::new();
        lobby.guest = Some(guest);

        assert_eq!(lobby.seat_of(host), Some(Seat::Host));
        assert_eq!(lobby.seat_of(guest), Some(Seat::Guest));
        assert_eq!(lobby.seat_of(stranger), None);
        assert_eq!(lobby.opponent_of(host), Some(guest));
        assert_eq!(lobby.opponent_of(guest), Some(host));
        assert_eq!(lobby.opponent_of(stranger), None);
        assert_eq!(lobby.occupants().collect::<Vec<_>>(), vec![host, guest]);
    }

    #[test]
    fn test_vacate_host_promotes_guest() {
        let (mut lobby, host) = lobby_with_host();
        let guest = ClientId::new();
        lobby.guest = Some(guest);

        assert_eq!(lobby.vacate(host), Some(Seat::Host));
        assert_eq!(lobby.host(), Some(guest));
        assert!(lobby.guest().is_none());
    }

    #[test]
    fn test_vacate_sole_host_empties_lobby() {
        let (mut lobby, host) = lobby_with_host();
        assert_eq!(lobby.vacate(host), Some(Seat::Host));
        assert!(lobby.host().is_none());
        assert_eq!(lobby.occupants().count(), 0);
    }

    #[test]
    fn test_vacate_twice_is_noop() {
        let (mut lobby, host) = lobby_with_host();
        let guest = ClientId::new();
        lobby.guest = Some(guest);

        assert_eq!(lobby.vacate(guest), Some(Seat::Guest));
        assert_eq!(lobby.vacate(guest), None);
        assert_eq!(lobby.host(), Some(host));
    }

    #[test]
    fn test_apply_options_returns_raw_echo() {
        let (mut lobby, _) = lobby_with_host();
        let mut raw = BTreeMap::new();
        raw.insert("fast".to_string(), "true".to_string());

        let echo = lobby.apply_options(&raw);
        assert_eq!(lobby.options.get("fast"), Some(&OptionValue::Bool(true)));
        assert_eq!(echo.get("fast"), Some(&OptionValue::Text("true".into())));
    }
}
