//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::hex::HexCoord;
use crate::units::{Team, UnitType};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Setup Phase ====================
    /// Deploy a unit in your zone
    PlaceUnit { unit_type: UnitType, at: HexCoord },
    /// Take back one of your deployed units
    RemoveUnit { unit_id: String },
    /// Raise a plateau in your zone
    PlacePlateau { at: HexCoord },
    /// Lower one of your plateaus
    RemovePlateau { at: HexCoord },
    /// Finish deploying
    Ready,

    // ==================== Play Phase ====================
    /// Move a unit (or swap with a friendly unit)
    Move { unit_id: String, to: HexCoord },
    /// Attack an enemy unit
    Attack {
        attacker_id: String,
        target_id: String,
    },
    /// Cast a card from your hand with one of your Mages
    CastCard {
        card_index: usize,
        caster_id: String,
        target_id: String,
    },
    /// Discard the cards at these hand positions and draw back up to six
    CycleCards { discard: Vec<usize> },

    // ==================== Turn Management ====================
    /// End your turn
    EndTurn,
}

impl GameAction {
    /// Whether this action belongs to the setup phase
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            GameAction::PlaceUnit { .. }
                | GameAction::RemoveUnit { .. }
                | GameAction::PlacePlateau { .. }
                | GameAction::RemovePlateau { .. }
                | GameAction::Ready
        )
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A unit was deployed
    UnitPlaced {
        unit_id: String,
        unit_type: UnitType,
        team: Team,
        at: HexCoord,
    },

    /// A deployed unit was taken back
    UnitRemoved { unit_id: String },

    /// A plateau was raised
    PlateauPlaced { team: Team, at: HexCoord },

    /// A plateau was lowered during setup
    PlateauRemoved { team: Team, at: HexCoord },

    /// A player finished deploying
    PlayerReady { team: Team },

    /// Both players deployed; hands were dealt
    BattleStarted,

    /// A unit moved
    UnitMoved {
        unit_id: String,
        from: HexCoord,
        to: HexCoord,
        cost: u8,
    },

    /// Two friendly units traded places
    UnitsSwapped { unit_id: String, other_id: String },

    /// An attack landed
    UnitAttacked {
        attacker_id: String,
        target_id: String,
        damage: i32,
        defeated: bool,
    },

    /// A unit was removed after reaching zero hp
    UnitDefeated {
        unit_id: String,
        unit_type: UnitType,
        team: Team,
    },

    /// An attacker was knocked back by a push effect
    AttackerPushed { unit_id: String, to: HexCoord },

    /// A card was cast
    CardCast {
        team: Team,
        title: String,
        caster_id: String,
        target_id: String,
    },

    /// A plateau was destroyed in play
    PlateauDestroyed { at: HexCoord },

    /// A player cycled part of their hand
    CardsCycled {
        team: Team,
        discarded: usize,
        drawn: usize,
    },

    /// Turn ended
    TurnEnded { player: Team, next_player: Team },

    /// A player captured the enemy flag
    GameWon { player: Team },
}
