//! WebSocket protocol messages for Bannerfall multiplayer.

use bannerfall_core::{GameAction, GameEvent, Team};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open a new match and take the Player 1 seat
    CreateMatch { player_name: String },

    /// Take the Player 2 seat of a waiting match
    JoinMatch {
        join_code: String,
        player_name: String,
    },

    /// Leave current match
    LeaveMatch,

    /// Submit a game action against the snapshot version the client last saw
    SubmitAction {
        expected_version: u64,
        action: GameAction,
    },

    /// Request the latest snapshot
    GetSnapshot,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    Welcome { player_id: Uuid },

    /// Match created; share the join code with the opponent
    MatchCreated { match_id: Uuid, join_code: String },

    /// Seated in a match
    JoinedMatch { info: MatchInfo, team: Team },

    /// Left match successfully
    LeftMatch,

    /// Seats or status changed
    MatchUpdated { info: MatchInfo },

    /// Game state at a version
    Snapshot {
        version: u64,
        status: MatchStatus,
        state: serde_json::Value,
    },

    /// Outcome of a submitted action, sent to the submitter only
    ActionResult {
        success: bool,
        events: Vec<GameEvent>,
        error: Option<String>,
    },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,

    /// A flag was captured
    GameOver { winner: Team, winner_name: String },
}

/// Match information for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: Uuid,
    pub join_code: String,
    pub seats: Vec<SeatInfo>,
    pub host_id: Uuid,
    pub status: MatchStatus,
}

/// One occupied seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub id: Uuid,
    pub name: String,
    pub team: Team,
    pub connected: bool,
}

/// Match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Waiting for a second player
    Waiting,
    Active,
    Completed,
}
