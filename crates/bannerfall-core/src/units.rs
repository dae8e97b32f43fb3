//! Unit types, base stats and per-unit turn state.

use crate::effects::{Effect, EffectKind};
use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Player1,
    Player2,
}

impl Team {
    /// Both teams, Player 1 first
    pub const ALL: [Team; 2] = [Team::Player1, Team::Player2];

    /// The other side
    pub fn opponent(self) -> Team {
        match self {
            Team::Player1 => Team::Player2,
            Team::Player2 => Team::Player1,
        }
    }

    /// Index into per-team arrays
    pub fn index(self) -> usize {
        match self {
            Team::Player1 => 0,
            Team::Player2 => 1,
        }
    }

    /// Lowercase identifier, used in unit ids
    pub fn slug(self) -> &'static str {
        match self {
            Team::Player1 => "player1",
            Team::Player2 => "player2",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Player1 => write!(f, "Player 1"),
            Team::Player2 => write!(f, "Player 2"),
        }
    }
}

/// Kinds of unit that can stand on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Warlord,
    Brute,
    Archer,
    Mage,
    Assassin,
    Plateau,
    Flag,
}

impl UnitType {
    /// All unit types
    pub const ALL: [UnitType; 7] = [
        UnitType::Warlord,
        UnitType::Brute,
        UnitType::Archer,
        UnitType::Mage,
        UnitType::Assassin,
        UnitType::Plateau,
        UnitType::Flag,
    ];

    /// Units that fight. Flags and plateaus never block movement and
    /// can't be targeted in combat.
    pub fn is_combat(self) -> bool {
        !matches!(self, UnitType::Flag | UnitType::Plateau)
    }

    /// How many of this type one player may deploy
    pub fn deploy_limit(self) -> usize {
        match self {
            UnitType::Warlord => 1,
            UnitType::Brute => 5,
            UnitType::Archer => 4,
            UnitType::Mage => 2,
            UnitType::Assassin => 2,
            UnitType::Plateau => 2,
            UnitType::Flag => 1,
        }
    }

    /// Whether this unit steps into the hex of a unit it defeats
    pub fn advances_on_kill(self) -> bool {
        matches!(self, UnitType::Brute | UnitType::Warlord | UnitType::Assassin)
    }

    /// Static definition for this type
    pub fn definition(self) -> &'static UnitDefinition {
        match self {
            UnitType::Warlord => &UNIT_DEFINITIONS[0],
            UnitType::Brute => &UNIT_DEFINITIONS[1],
            UnitType::Archer => &UNIT_DEFINITIONS[2],
            UnitType::Mage => &UNIT_DEFINITIONS[3],
            UnitType::Assassin => &UNIT_DEFINITIONS[4],
            UnitType::Plateau => &UNIT_DEFINITIONS[5],
            UnitType::Flag => &UNIT_DEFINITIONS[6],
        }
    }

    /// Lowercase identifier, used in unit ids
    pub fn slug(self) -> &'static str {
        match self {
            UnitType::Warlord => "warlord",
            UnitType::Brute => "brute",
            UnitType::Archer => "archer",
            UnitType::Mage => "mage",
            UnitType::Assassin => "assassin",
            UnitType::Plateau => "plateau",
            UnitType::Flag => "flag",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

/// Base stats and rules text for a unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitDefinition {
    pub unit_type: UnitType,
    pub name: &'static str,
    pub hp: i32,
    pub attack: i32,
    pub movement: i32,
    pub range: Option<i32>,
    pub description: &'static str,
    pub ability: &'static str,
}

/// Definitions in [`UnitType::ALL`] order
pub static UNIT_DEFINITIONS: [UnitDefinition; 7] = [
    UnitDefinition {
        unit_type: UnitType::Warlord,
        name: "Warlord",
        hp: 14,
        attack: 5,
        movement: 2,
        range: Some(1),
        description: "Elite commander",
        ability: "Can use special Warlord Buff cards, but only if the total Attack exceeds the remaining HP of the opposing unit",
    },
    UnitDefinition {
        unit_type: UnitType::Brute,
        name: "Brute",
        hp: 7,
        attack: 3,
        movement: 1,
        range: Some(1),
        description: "Powerful force",
        ability: "Can choose to \"push\" an opposing unit into any open adjacent hex (opponent takes 1 damage)",
    },
    UnitDefinition {
        unit_type: UnitType::Archer,
        name: "Archer",
        hp: 4,
        attack: 2,
        movement: 1,
        range: Some(2),
        description: "Ranged attacker",
        ability: "Can shoot over any friendly or opposition unit",
    },
    UnitDefinition {
        unit_type: UnitType::Mage,
        name: "Mage",
        hp: 4,
        attack: 0,
        movement: 1,
        range: Some(3),
        description: "Spellcaster",
        ability: "Only unit that can Cast Nerfs and Buffs",
    },
    UnitDefinition {
        unit_type: UnitType::Assassin,
        name: "Assassin",
        hp: 2,
        attack: 1,
        movement: 4,
        range: Some(4),
        description: "Swift killer",
        ability: "Can jump other units into an empty hex. Deals +3 damage (4 total) when adjacent to an opposing unit. Can attack targets within 4 tiles if any clear path exists",
    },
    UnitDefinition {
        unit_type: UnitType::Plateau,
        name: "Plateau",
        hp: 0,
        attack: 0,
        movement: 0,
        range: None,
        description: "Elevated terrain",
        ability: "Gives Mages +1 range. Archers deal +1 damage and receive -1 damage. Takes 2 actions to climb, 1 action to descend",
    },
    UnitDefinition {
        unit_type: UnitType::Flag,
        name: "Flag",
        hp: 3,
        attack: 0,
        movement: 0,
        range: None,
        description: "Team objective",
        ability: "Defeat the enemy flag to win! Cannot move or attack",
    },
];

/// Base stats of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub range: Option<i32>,
    pub movement: i32,
}

/// Actions a single unit may spend per turn
pub const UNIT_ACTIONS_PER_TURN: u8 = 2;

/// A unit on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier
    pub id: String,
    pub unit_type: UnitType,
    pub team: Team,
    pub position: HexCoord,
    pub stats: UnitStats,
    /// Actions spent by this unit this turn (0..=2)
    pub actions_used: u8,
    pub has_attacked: bool,
    pub has_moved: bool,
    pub has_cast: bool,
    /// Active effects in the order they were applied
    pub effects: Vec<Effect>,
}

impl Unit {
    /// Create a fresh unit at full health with no effects
    pub fn new(id: impl Into<String>, unit_type: UnitType, team: Team, position: HexCoord) -> Self {
        let def = unit_type.definition();
        Self {
            id: id.into(),
            unit_type,
            team,
            position,
            stats: UnitStats {
                hp: def.hp,
                max_hp: def.hp,
                attack: def.attack,
                range: def.range,
                movement: def.movement,
            },
            actions_used: 0,
            has_attacked: false,
            has_moved: false,
            has_cast: false,
            effects: Vec::new(),
        }
    }

    pub fn is_combat(&self) -> bool {
        self.unit_type.is_combat()
    }

    /// Combat unit with no hp left
    pub fn is_dying(&self) -> bool {
        self.is_combat() && self.stats.hp <= 0
    }

    /// Actions this unit can still spend this turn
    pub fn actions_left(&self) -> u8 {
        UNIT_ACTIONS_PER_TURN.saturating_sub(self.actions_used)
    }

    /// Reduce hp, never below zero
    pub fn take_damage(&mut self, amount: i32) {
        self.stats.hp = (self.stats.hp - amount.max(0)).max(0);
    }

    /// Restore hp, never above max
    pub fn heal(&mut self, amount: i32) {
        self.stats.hp = (self.stats.hp + amount.max(0)).min(self.stats.max_hp);
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// First effect of a kind
    pub fn find_effect(&self, kind: EffectKind) -> Option<&Effect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    /// Remove an effect by id, returning it
    pub fn remove_effect(&mut self, effect_id: &str) -> Option<Effect> {
        let index = self.effects.iter().position(|e| e.id == effect_id)?;
        Some(self.effects.remove(index))
    }

    /// Clear per-turn flags at a turn boundary
    pub fn reset_turn_flags(&mut self) {
        self.actions_used = 0;
        self.has_attacked = false;
        self.has_moved = false;
        self.has_cast = false;
    }
}
