//! In-memory match store.
//!
//! Each match keeps its latest snapshot under a version number. Writers must
//! name the version they read; a write against an older version is refused so
//! two clients racing on the same turn cannot both land. Accepted writes are
//! pushed to every subscriber of the match.

use bannerfall_core::{GameAction, GameEvent, GameState};
use dashmap::DashMap;
use rand::Rng;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::protocol::{MatchInfo, MatchStatus};
use crate::room::{MatchRoom, RoomError};

/// Join codes skip characters that are easy to misread (I, O, 0, 1)
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LEN: usize = 6;

const UPDATE_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Match not found")]
    MatchNotFound,

    #[error("No waiting match with code {0}")]
    UnknownJoinCode(String),

    #[error("Snapshot is stale: expected version {expected}, current is {current}")]
    VersionConflict { expected: u64, current: u64 },

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// The persisted state of one match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub version: u64,
    pub status: MatchStatus,
    pub state: GameState,
}

struct MatchRecord {
    room: MatchRoom,
    snapshot: MatchSnapshot,
    updates: broadcast::Sender<MatchSnapshot>,
}

pub struct MatchStore {
    matches: DashMap<Uuid, MatchRecord>,
    /// Codes of matches still waiting for a second player
    codes: DashMap<String, Uuid>,
}

impl MatchStore {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
            codes: DashMap::new(),
        }
    }

    /// Open a match with the host in the Player 1 seat.
    pub fn create_match(&self, host_id: Uuid, host_name: String) -> (Uuid, String) {
        let match_id = Uuid::new_v4();
        let join_code = self.unused_code();
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);

        let record = MatchRecord {
            room: MatchRoom::new(match_id, join_code.clone(), host_id, host_name),
            snapshot: MatchSnapshot {
                version: 0,
                status: MatchStatus::Waiting,
                state: GameState::new(),
            },
            updates,
        };
        self.matches.insert(match_id, record);
        self.codes.insert(join_code.clone(), match_id);

        (match_id, join_code)
    }

    /// Seat a second player in the waiting match with this code.
    pub fn join_match(
        &self,
        join_code: &str,
        player_id: Uuid,
        player_name: String,
    ) -> Result<(Uuid, MatchInfo), StoreError> {
        let code = join_code.trim().to_ascii_uppercase();
        let match_id = *self
            .codes
            .get(&code)
            .ok_or_else(|| StoreError::UnknownJoinCode(code.clone()))?;

        let info = {
            let mut record = self
                .matches
                .get_mut(&match_id)
                .ok_or(StoreError::MatchNotFound)?;
            record.room.add_guest(player_id, player_name)?;
            record.snapshot.status = record.room.status;
            record.room.to_info()
        };
        self.codes.remove(&code);

        Ok((match_id, info))
    }

    pub fn room(&self, match_id: Uuid) -> Result<MatchRoom, StoreError> {
        self.matches
            .get(&match_id)
            .map(|record| record.room.clone())
            .ok_or(StoreError::MatchNotFound)
    }

    pub fn get_snapshot(&self, match_id: Uuid) -> Result<MatchSnapshot, StoreError> {
        self.matches
            .get(&match_id)
            .map(|record| record.snapshot.clone())
            .ok_or(StoreError::MatchNotFound)
    }

    /// Store `state` as the next version, provided nobody wrote since `expected_version`.
    pub fn apply_and_persist(
        &self,
        match_id: Uuid,
        expected_version: u64,
        state: GameState,
    ) -> Result<MatchSnapshot, StoreError> {
        let mut record = self
            .matches
            .get_mut(&match_id)
            .ok_or(StoreError::MatchNotFound)?;

        let current = record.snapshot.version;
        if current != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                current,
            });
        }

        if state.is_finished() {
            record.room.status = MatchStatus::Completed;
        }
        record.snapshot = MatchSnapshot {
            version: current + 1,
            status: record.room.status,
            state,
        };

        let snapshot = record.snapshot.clone();
        // No subscribers is not an error
        let _ = record.updates.send(snapshot.clone());
        Ok(snapshot)
    }

    /// Resolve a player's action against the stored snapshot and persist the result.
    pub fn submit(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        expected_version: u64,
        action: GameAction,
    ) -> Result<(MatchSnapshot, Vec<GameEvent>), StoreError> {
        let (room, current) = {
            let record = self
                .matches
                .get(&match_id)
                .ok_or(StoreError::MatchNotFound)?;
            (record.room.clone(), record.snapshot.clone())
        };

        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                current: current.version,
            });
        }

        let (next, events) = room.resolve(player_id, &current.state, action)?;
        let snapshot = self.apply_and_persist(match_id, expected_version, next)?;
        Ok((snapshot, events))
    }

    pub fn subscribe(&self, match_id: Uuid) -> Result<broadcast::Receiver<MatchSnapshot>, StoreError> {
        self.matches
            .get(&match_id)
            .map(|record| record.updates.subscribe())
            .ok_or(StoreError::MatchNotFound)
    }

    /// Take a player out of a match. Returns the updated info, or None if the match was dropped.
    pub fn leave_match(&self, match_id: Uuid, player_id: Uuid) -> Result<Option<MatchInfo>, StoreError> {
        let abandoned = {
            let mut record = self
                .matches
                .get_mut(&match_id)
                .ok_or(StoreError::MatchNotFound)?;
            if !record.room.remove_player(player_id)? {
                return Ok(Some(record.room.to_info()));
            }
            record.room.join_code.clone()
        };

        self.matches.remove(&match_id);
        self.codes.remove(&abandoned);
        Ok(None)
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    fn unused_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = generate_join_code(&mut rng);
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for MatchStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn generate_join_code<R: Rng>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}
