//! Temporary effects on units and the effective-stat calculation.
//!
//! Effects are the only way a unit's stats change temporarily. Each effect
//! carries a duration and, for `NextTurn` effects, a small lifecycle:
//!
//! - `Armed`: applied and counting towards effective stats
//! - `Used`: the unit took a matching action; still applies until the
//!   next turn boundary
//! - `Expired`: past its window or used; removed by
//!   [`cleanup_expired_effects`] at the turn boundary
//!
//! Only `Armed` and `Used` are ever stored. `Expired` is what
//! [`Effect::lifecycle`] reports for an effect the next sweep will drop.

use crate::board::Board;
use crate::units::{Team, Unit, UnitType};
use serde::{Deserialize, Serialize};

/// What an effect does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    AttackBuff,
    AttackNerf,
    AttackBlocked,
    DamageReduction,
    MovementBuff,
    MovementBlocked,
    RangeBuff,
    RangeNerf,
    Heal,
    Invisible,
    CardDamage,
    BuffBlocked,
    PlateauDebuff,
    ExtraMovement,
    DamageOnDeath,
    OnDeathMageDamage,
    Push,
    ExtraAttack,
    HealOnKill,
    IgnoreDamageReduction,
    AreaDamage,
    MovementOnKill,
}

/// Kind of action that can consume `NextTurn` effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    Attack,
    Movement,
}

impl EffectKind {
    /// Which action, if any, uses up an effect of this kind
    pub fn category(self) -> Option<ActionCategory> {
        match self {
            EffectKind::AttackBuff
            | EffectKind::AttackNerf
            | EffectKind::AttackBlocked
            | EffectKind::RangeBuff
            | EffectKind::RangeNerf
            | EffectKind::IgnoreDamageReduction
            | EffectKind::AreaDamage => Some(ActionCategory::Attack),
            EffectKind::MovementBuff | EffectKind::MovementBlocked => {
                Some(ActionCategory::Movement)
            }
            _ => None,
        }
    }

    /// Effects that fire when their carrier dies
    pub fn is_death_trigger(self) -> bool {
        matches!(self, EffectKind::OnDeathMageDamage | EffectKind::DamageOnDeath)
    }
}

/// How long an effect lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    Instant,
    /// Only during the turn it was applied
    ThisTurn,
    /// Through the turn after it was applied
    NextTurn,
    /// Until a specific event consumes it
    UntilTriggered,
    Permanent,
}

/// Stored lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectStatus {
    #[default]
    Armed,
    Used,
}

/// Lifecycle as seen at a particular turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectLifecycle {
    Armed,
    Used,
    Expired,
}

/// An effect attached to a single unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: String,
    pub kind: EffectKind,
    pub duration: EffectDuration,
    pub value: i32,
    /// Title of the card that created it
    pub source_card: Option<String>,
    pub applied_on_turn: Option<u32>,
    #[serde(default)]
    pub status: EffectStatus,
    /// Team of the Mage that cast it, for effects that care
    pub caster_team: Option<Team>,
}

impl Effect {
    pub fn new(id: impl Into<String>, kind: EffectKind, duration: EffectDuration, value: i32) -> Self {
        Self {
            id: id.into(),
            kind,
            duration,
            value,
            source_card: None,
            applied_on_turn: None,
            status: EffectStatus::Armed,
            caster_team: None,
        }
    }

    pub fn from_card(mut self, title: &str) -> Self {
        self.source_card = Some(title.to_string());
        self
    }

    pub fn applied_on(mut self, turn: u32) -> Self {
        self.applied_on_turn = Some(turn);
        self
    }

    pub fn cast_by(mut self, team: Team) -> Self {
        self.caster_team = Some(team);
        self
    }

    /// Whether the turn-boundary sweep at `current_turn` keeps this effect
    pub fn survives_boundary(&self, current_turn: u32) -> bool {
        match self.duration {
            EffectDuration::Instant | EffectDuration::Permanent | EffectDuration::UntilTriggered => {
                true
            }
            EffectDuration::ThisTurn => self.applied_on_turn == Some(current_turn),
            EffectDuration::NextTurn => {
                if self.status == EffectStatus::Used {
                    return false;
                }
                match self.applied_on_turn {
                    Some(applied) => current_turn <= applied + 1,
                    None => true,
                }
            }
        }
    }

    /// Whether the effect counts toward stats on `current_turn`.
    /// A `NextTurn` effect only starts counting the turn after it was applied.
    pub fn is_active_on(&self, current_turn: u32) -> bool {
        !(self.duration == EffectDuration::NextTurn && self.applied_on_turn == Some(current_turn))
    }

    /// Lifecycle of this effect when viewed on `current_turn`
    pub fn lifecycle(&self, current_turn: u32) -> EffectLifecycle {
        let in_window = match (self.duration, self.applied_on_turn) {
            (EffectDuration::ThisTurn, Some(applied)) => applied == current_turn,
            (EffectDuration::NextTurn, Some(applied)) => current_turn <= applied + 1,
            _ => true,
        };
        match (in_window, self.status) {
            (false, _) => EffectLifecycle::Expired,
            (true, EffectStatus::Used) => EffectLifecycle::Used,
            (true, EffectStatus::Armed) => EffectLifecycle::Armed,
        }
    }

    /// Short description for tooltips, e.g. "Attack +1"
    pub fn description(&self) -> String {
        let signed = if self.value > 0 {
            format!("+{}", self.value)
        } else {
            self.value.to_string()
        };

        match self.kind {
            EffectKind::AttackBuff => format!("Attack {signed}"),
            EffectKind::AttackNerf => format!("Attack -{}", self.value),
            EffectKind::AttackBlocked => "Cannot attack".to_string(),
            EffectKind::DamageReduction => format!("Damage reduction {signed}"),
            EffectKind::MovementBuff => format!("Movement {signed}"),
            EffectKind::MovementBlocked => "Cannot move".to_string(),
            EffectKind::RangeBuff => format!("Range {signed}"),
            EffectKind::RangeNerf => format!("Range -{}", self.value),
            EffectKind::Heal => format!("Healed {} HP", self.value),
            EffectKind::Invisible => "Invisible to enemies".to_string(),
            EffectKind::CardDamage => format!("Took {} damage", self.value.abs()),
            EffectKind::BuffBlocked => "Cannot receive buffs".to_string(),
            EffectKind::PlateauDebuff => "Plateau bonuses removed".to_string(),
            EffectKind::ExtraMovement => format!("+{} movement", self.value),
            EffectKind::DamageOnDeath => format!("Deals {} damage on death", self.value),
            EffectKind::OnDeathMageDamage => "Damages mages on death".to_string(),
            EffectKind::Push => "Pushes back attackers".to_string(),
            EffectKind::ExtraAttack => "Can attack again this turn".to_string(),
            EffectKind::HealOnKill => format!("Heals {} HP on kill", self.value),
            EffectKind::IgnoreDamageReduction => "Ignores damage reduction".to_string(),
            EffectKind::AreaDamage => format!("Deals {} damage to nearby enemies", self.value),
            EffectKind::MovementOnKill => format!("Gains {signed} movement on kill"),
        }
    }

    /// Duration label for tooltips; empty for instant effects
    pub fn duration_label(&self) -> &'static str {
        match self.duration {
            EffectDuration::Instant => "",
            EffectDuration::ThisTurn => "This turn",
            EffectDuration::NextTurn if self.status == EffectStatus::Used => "Expired",
            EffectDuration::NextTurn => "Next turn",
            EffectDuration::UntilTriggered => "Until triggered",
            EffectDuration::Permanent => "Permanent",
        }
    }

    /// Full tooltip line: description, duration and source card
    pub fn tooltip(&self) -> String {
        let source = self
            .source_card
            .as_ref()
            .map(|title| format!(" ({title})"))
            .unwrap_or_default();
        match self.duration_label() {
            "" => format!("{}{}", self.description(), source),
            label => format!("{} - {}{}", self.description(), label, source),
        }
    }
}

/// Hands out unique effect ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectIds {
    next: u64,
}

impl EffectIds {
    pub fn next_id(&mut self) -> String {
        self.next += 1;
        format!("effect-{}", self.next)
    }
}

/// Stats after folding effects and terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectiveStats {
    pub attack: i32,
    pub range: i32,
    pub movement: i32,
    pub damage_reduction: i32,
}

/// Fold a unit's effects active on `current_turn` over its base stats, then
/// add the plateau bonus.
///
/// Terrain comes last so a plateau never interacts with nerf floors.
pub fn calculate_effective_stats(unit: &Unit, board: &Board, current_turn: u32) -> EffectiveStats {
    let mut stats = EffectiveStats {
        attack: unit.stats.attack,
        range: unit.stats.range.unwrap_or(1),
        movement: unit.stats.movement,
        damage_reduction: 0,
    };

    for effect in unit.effects.iter().filter(|e| e.is_active_on(current_turn)) {
        match effect.kind {
            EffectKind::AttackBuff => stats.attack += effect.value,
            EffectKind::AttackNerf => stats.attack = (stats.attack - effect.value).max(0),
            EffectKind::RangeBuff => stats.range += effect.value,
            EffectKind::RangeNerf => stats.range = (stats.range - effect.value).max(1),
            EffectKind::MovementBuff => stats.movement += effect.value,
            EffectKind::MovementBlocked => stats.movement = 0,
            EffectKind::DamageReduction => stats.damage_reduction += effect.value,
            _ => {}
        }
    }

    if board.is_plateau(&unit.position) && !unit.has_effect(EffectKind::PlateauDebuff) {
        match unit.unit_type {
            UnitType::Mage => stats.range += 1,
            UnitType::Archer => {
                stats.attack += 1;
                stats.damage_reduction += 1;
            }
            _ => {}
        }
    }

    stats
}

/// Mark `NextTurn` effects applied before `current_turn` as used when the
/// unit takes an action of the matching category.
pub fn mark_effects_as_used(unit: &mut Unit, category: ActionCategory, current_turn: u32) {
    for effect in &mut unit.effects {
        let applied_earlier = effect.applied_on_turn.is_some_and(|t| t < current_turn);
        if applied_earlier
            && effect.duration == EffectDuration::NextTurn
            && effect.status == EffectStatus::Armed
            && effect.kind.category() == Some(category)
        {
            effect.status = EffectStatus::Used;
        }
    }
}

/// Turn-boundary sweep: drop every expired effect on every unit
pub fn cleanup_expired_effects(units: &mut [Unit], current_turn: u32) {
    for unit in units {
        unit.effects.retain(|e| e.survives_boundary(current_turn));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;

    fn archer() -> Unit {
        Unit::new("archer", UnitType::Archer, Team::Player1, HexCoord::new(3, 2))
    }

    fn effect(kind: EffectKind, duration: EffectDuration, value: i32) -> Effect {
        Effect::new(format!("{kind:?}"), kind, duration, value)
    }

    #[test]
    fn test_attack_buff_adds_exactly_its_value() {
        let board = Board::new();
        let mut unit = archer();
        let before = calculate_effective_stats(&unit, &board, 0).attack;

        unit.effects.push(effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 3));
        assert_eq!(calculate_effective_stats(&unit, &board, 0).attack, before + 3);
    }

    #[test]
    fn test_nerfs_respect_floors() {
        let board = Board::new();
        let mut unit = archer();
        unit.effects.push(effect(EffectKind::AttackNerf, EffectDuration::NextTurn, 5));
        unit.effects.push(effect(EffectKind::AttackNerf, EffectDuration::NextTurn, 1));
        unit.effects.push(effect(EffectKind::RangeNerf, EffectDuration::NextTurn, 4));

        let stats = calculate_effective_stats(&unit, &board, 0);
        assert_eq!(stats.attack, 0);
        assert_eq!(stats.range, 1);
    }

    #[test]
    fn test_movement_blocked_zeroes_movement() {
        let board = Board::new();
        let mut unit = archer();
        unit.effects.push(effect(EffectKind::MovementBuff, EffectDuration::ThisTurn, 2));
        unit.effects.push(effect(EffectKind::MovementBlocked, EffectDuration::NextTurn, 1));

        assert_eq!(calculate_effective_stats(&unit, &board, 0).movement, 0);
    }

    #[test]
    fn test_plateau_bonus_applied_after_effects() {
        let mut board = Board::new();
        board.add_plateau(HexCoord::new(3, 2), Team::Player1);

        let mut unit = archer();
        let stats = calculate_effective_stats(&unit, &board, 0);
        assert_eq!(stats.attack, 3);
        assert_eq!(stats.damage_reduction, 1);

        // Nerf floors at 0 before the plateau bonus is added back on top
        unit.effects.push(effect(EffectKind::AttackNerf, EffectDuration::NextTurn, 9));
        assert_eq!(calculate_effective_stats(&unit, &board, 0).attack, 1);

        unit.effects.push(effect(EffectKind::PlateauDebuff, EffectDuration::NextTurn, 1));
        let stats = calculate_effective_stats(&unit, &board, 0);
        assert_eq!(stats.attack, 0);
        assert_eq!(stats.damage_reduction, 0);
    }

    #[test]
    fn test_mage_gets_range_on_plateau() {
        let mut board = Board::new();
        let hex = HexCoord::new(4, 1);
        board.add_plateau(hex, Team::Player1);
        let mage = Unit::new("mage", UnitType::Mage, Team::Player1, hex);

        assert_eq!(calculate_effective_stats(&mage, &board, 0).range, 4);
    }

    #[test]
    fn test_next_turn_effect_waits_a_turn() {
        let board = Board::new();
        let mut unit = archer();
        unit.effects
            .push(effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 2).applied_on(4));
        unit.effects
            .push(effect(EffectKind::RangeBuff, EffectDuration::ThisTurn, 1).applied_on(4));

        let cast_turn = calculate_effective_stats(&unit, &board, 4);
        assert_eq!(cast_turn.attack, 2);
        assert_eq!(cast_turn.range, 3);

        let next_turn = calculate_effective_stats(&unit, &board, 5);
        assert_eq!(next_turn.attack, 4);
    }

    #[test]
    fn test_mark_used_only_for_matching_earlier_effects() {
        let mut unit = archer();
        unit.effects.push(effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 1).applied_on(3));
        unit.effects.push(effect(EffectKind::MovementBuff, EffectDuration::NextTurn, 1).applied_on(3));
        unit.effects.push(effect(EffectKind::RangeBuff, EffectDuration::NextTurn, 1).applied_on(4));

        mark_effects_as_used(&mut unit, ActionCategory::Attack, 4);

        assert_eq!(unit.effects[0].status, EffectStatus::Used);
        assert_eq!(unit.effects[1].status, EffectStatus::Armed);
        // Applied this turn: not yet eligible
        assert_eq!(unit.effects[2].status, EffectStatus::Armed);
        assert_eq!(unit.effects.len(), 3);
    }

    #[test]
    fn test_cleanup_windows() {
        let mut units = vec![archer()];
        units[0].effects = vec![
            effect(EffectKind::RangeBuff, EffectDuration::ThisTurn, 1).applied_on(2),
            effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 1).applied_on(2),
            effect(EffectKind::Push, EffectDuration::UntilTriggered, 1).applied_on(2),
            effect(EffectKind::DamageReduction, EffectDuration::Permanent, 1),
        ];

        cleanup_expired_effects(&mut units, 3);
        let kinds: Vec<_> = units[0].effects.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EffectKind::AttackBuff, EffectKind::Push, EffectKind::DamageReduction]
        );

        cleanup_expired_effects(&mut units, 4);
        let kinds: Vec<_> = units[0].effects.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EffectKind::Push, EffectKind::DamageReduction]);
    }

    #[test]
    fn test_used_effect_lingers_until_boundary() {
        let mut units = vec![archer()];
        units[0]
            .effects
            .push(effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 2).applied_on(0));

        mark_effects_as_used(&mut units[0], ActionCategory::Attack, 1);
        assert_eq!(units[0].effects[0].lifecycle(1), EffectLifecycle::Used);
        // Still counts for the rest of the turn
        assert_eq!(calculate_effective_stats(&units[0], &Board::new(), 1).attack, 4);

        cleanup_expired_effects(&mut units, 1);
        assert!(units[0].effects.is_empty());
    }

    #[test]
    fn test_lifecycle_reports_expired_outside_window() {
        let e = effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 1).applied_on(5);
        assert_eq!(e.lifecycle(5), EffectLifecycle::Armed);
        assert_eq!(e.lifecycle(6), EffectLifecycle::Armed);
        assert_eq!(e.lifecycle(7), EffectLifecycle::Expired);
    }

    #[test]
    fn test_tooltip_text() {
        let e = effect(EffectKind::AttackBuff, EffectDuration::NextTurn, 1).from_card("Axehound");
        assert_eq!(e.tooltip(), "Attack +1 - Next turn (Axehound)");

        let blocked = effect(EffectKind::MovementBlocked, EffectDuration::Instant, 1);
        assert_eq!(blocked.tooltip(), "Cannot move");
    }

    #[test]
    fn test_effect_ids_are_unique() {
        let mut ids = EffectIds::default();
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
