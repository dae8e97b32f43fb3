//! Append-only match log.
//!
//! The log is an audit trail for players. Rules never read it back.

use crate::units::{Team, UnitType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameLogKind {
    Setup,
    Move,
    Attack,
    CardCast,
    /// Hand management (cycling)
    Card,
    UnitDefeated,
    TurnStart,
    Victory,
    /// Chained effect resolution (splash, push, heal on kill...)
    Effect,
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogEntry {
    /// Position in the log, starting at 1
    pub sequence: u64,
    pub kind: GameLogKind,
    pub player: Team,
    /// Match turn (each player's turn counts once per round)
    pub turn: u32,
    pub message: String,
    pub unit_type: Option<UnitType>,
    pub target_unit_type: Option<UnitType>,
    pub damage: Option<i32>,
}

impl GameLogEntry {
    pub fn new(kind: GameLogKind, player: Team, turn: u32, message: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind,
            player,
            turn,
            message: message.into(),
            unit_type: None,
            target_unit_type: None,
            damage: None,
        }
    }

    pub fn with_units(mut self, unit_type: UnitType, target: Option<UnitType>) -> Self {
        self.unit_type = Some(unit_type);
        self.target_unit_type = target;
        self
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = Some(damage);
        self
    }
}

/// The log itself. Entries get their sequence number when appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    entries: Vec<GameLogEntry>,
}

impl GameLog {
    pub fn push(&mut self, mut entry: GameLogEntry) -> &GameLogEntry {
        entry.sequence = self.entries.len() as u64 + 1;
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[GameLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries appended after the first `count`
    pub fn since(&self, count: usize) -> &[GameLogEntry] {
        self.entries.get(count..).unwrap_or(&[])
    }
}
