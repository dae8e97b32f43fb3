//! Match seating and action resolution.

use bannerfall_core::{GameAction, GameError, GameEvent, GameState, Team};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{MatchInfo, MatchStatus, SeatInfo};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Match is full")]
    MatchFull,

    #[error("Player not in match")]
    PlayerNotInMatch,

    #[error("Match has not started")]
    MatchNotStarted,

    #[error("Match is over")]
    MatchOver,

    #[error(transparent)]
    Rejected(#[from] GameError),
}

/// A player holding one side of a match.
#[derive(Debug, Clone)]
pub struct Seat {
    pub player_id: Uuid,
    pub name: String,
    pub team: Team,
    pub connected: bool,
}

impl Seat {
    pub fn new(player_id: Uuid, name: String, team: Team) -> Self {
        Self {
            player_id,
            name,
            team,
            connected: true,
        }
    }

    pub fn to_info(&self) -> SeatInfo {
        SeatInfo {
            id: self.player_id,
            name: self.name.clone(),
            team: self.team,
            connected: self.connected,
        }
    }
}

/// A two-seat match. The host plays Player 1.
#[derive(Debug, Clone)]
pub struct MatchRoom {
    pub id: Uuid,
    pub join_code: String,
    pub host: Seat,
    pub guest: Option<Seat>,
    pub status: MatchStatus,
}

impl MatchRoom {
    pub fn new(id: Uuid, join_code: String, host_id: Uuid, host_name: String) -> Self {
        Self {
            id,
            join_code,
            host: Seat::new(host_id, host_name, Team::Player1),
            guest: None,
            status: MatchStatus::Waiting,
        }
    }

    pub fn is_full(&self) -> bool {
        self.guest.is_some()
    }

    /// Seat the second player and start the match
    pub fn add_guest(&mut self, player_id: Uuid, name: String) -> Result<Team, RoomError> {
        if self.status != MatchStatus::Waiting || self.is_full() {
            return Err(RoomError::MatchFull);
        }
        self.guest = Some(Seat::new(player_id, name, Team::Player2));
        self.status = MatchStatus::Active;
        Ok(Team::Player2)
    }

    pub fn seat(&self, player_id: Uuid) -> Option<&Seat> {
        std::iter::once(&self.host)
            .chain(self.guest.as_ref())
            .find(|seat| seat.player_id == player_id)
    }

    pub fn team_of(&self, player_id: Uuid) -> Option<Team> {
        self.seat(player_id).map(|seat| seat.team)
    }

    pub fn player_ids(&self) -> Vec<Uuid> {
        std::iter::once(&self.host)
            .chain(self.guest.as_ref())
            .map(|seat| seat.player_id)
            .collect()
    }

    /// Mark a player as gone. Returns true once nobody is connected.
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        if self.seat(player_id).is_none() {
            return Err(RoomError::PlayerNotInMatch);
        }

        // Only the host is seated while waiting. Started matches keep both seats.
        if self.status == MatchStatus::Waiting {
            return Ok(true);
        }
        self.set_player_connected(player_id, false);

        Ok(!self.host.connected && !self.guest.as_ref().is_some_and(|g| g.connected))
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if self.host.player_id == player_id {
            self.host.connected = connected;
        } else if let Some(guest) = self.guest.as_mut().filter(|g| g.player_id == player_id) {
            guest.connected = connected;
        }
    }

    /// Run an action for the player's seat against `state` without writing anything.
    pub fn resolve(
        &self,
        player_id: Uuid,
        state: &GameState,
        action: GameAction,
    ) -> Result<(GameState, Vec<GameEvent>), RoomError> {
        match self.status {
            MatchStatus::Waiting => return Err(RoomError::MatchNotStarted),
            MatchStatus::Completed => return Err(RoomError::MatchOver),
            MatchStatus::Active => {}
        }
        let team = self
            .team_of(player_id)
            .ok_or(RoomError::PlayerNotInMatch)?;

        let mut next = state.clone();
        let events = next.apply_action(team, action)?;
        Ok((next, events))
    }

    pub fn winner_name(&self, winner: Team) -> Option<String> {
        std::iter::once(&self.host)
            .chain(self.guest.as_ref())
            .find(|seat| seat.team == winner)
            .map(|seat| seat.name.clone())
    }

    pub fn to_info(&self) -> MatchInfo {
        MatchInfo {
            id: self.id,
            join_code: self.join_code.clone(),
            seats: std::iter::once(&self.host)
                .chain(self.guest.as_ref())
                .map(Seat::to_info)
                .collect(),
            host_id: self.host.player_id,
            status: self.status,
        }
    }
}
