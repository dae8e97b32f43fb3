//! Movement and attack resolution.
//!
//! Both actions are split into a validation step, shared with the
//! projections in [`crate::view`], and a resolution step that mutates the
//! state and writes the log.

use crate::actions::GameEvent;
use crate::board::is_on_board;
use crate::effects::{
    calculate_effective_stats, mark_effects_as_used, ActionCategory, Effect, EffectDuration,
    EffectKind, EffectiveStats,
};
use crate::game::{GameError, GamePhase, GameState};
use crate::hex::{has_path_within_range, HexCoord};
use crate::log::GameLogKind;
use crate::units::{Team, Unit, UnitType, UNIT_ACTIONS_PER_TURN};
use tracing::{debug, info};

/// Extra damage an Assassin deals to an adjacent target
pub const ASSASSIN_ADJACENT_BONUS: i32 = 3;

/// Splash radius of area damage, measured from the target
pub const AREA_DAMAGE_RADIUS: i32 = 2;

/// A validated move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    /// Friendly combat unit that trades places with the mover
    pub swap_with: Option<String>,
    /// Actions the move costs the unit and the pool
    pub cost: u8,
    /// Whether the move goes from flat ground onto a plateau
    pub climbs: bool,
}

/// Damage dealt by one attack.
///
/// Pure: the same units and stats always give the same number.
pub fn compute_damage(
    attacker: &Unit,
    attacker_stats: &EffectiveStats,
    target: &Unit,
    target_stats: &EffectiveStats,
) -> i32 {
    let bonus = if attacker.unit_type == UnitType::Assassin
        && attacker.position.distance_to(&target.position) == 1
    {
        ASSASSIN_ADJACENT_BONUS
    } else {
        0
    };
    let reduction = if attacker.has_effect(EffectKind::IgnoreDamageReduction) {
        0
    } else {
        target_stats.damage_reduction
    };
    (attacker_stats.attack + bonus - reduction).max(0)
}

/// " from <card>" when the effect came from a card
fn source_suffix(effect: &Effect) -> String {
    effect
        .source_card
        .as_ref()
        .map(|title| format!(" from {title}"))
        .unwrap_or_default()
}

impl GameState {
    /// Checks every unit must pass before spending an action
    fn validate_actor(&self, unit: &Unit) -> Result<(), GameError> {
        if self.phase != GamePhase::Play {
            return Err(GameError::InvalidPhase);
        }
        if unit.team != self.current_player {
            return Err(GameError::NotYourUnit);
        }
        self.require_actions()?;
        if unit.actions_used >= UNIT_ACTIONS_PER_TURN {
            return Err(GameError::UnitExhausted);
        }
        Ok(())
    }

    /// Check whether `unit` may move to `to` right now
    pub(crate) fn validate_move(&self, unit: &Unit, to: HexCoord) -> Result<MovePlan, GameError> {
        self.validate_actor(unit)?;
        if unit.has_effect(EffectKind::MovementBlocked) {
            return Err(GameError::MovementBlocked);
        }
        if unit.has_moved {
            return Err(GameError::AlreadyMoved);
        }
        if !is_on_board(&to) {
            return Err(GameError::OffBoard);
        }
        if to == unit.position {
            return Err(GameError::SameHex);
        }

        let movement = calculate_effective_stats(unit, &self.board, self.turn_number).movement;
        if unit.position.distance_to(&to) > movement {
            return Err(GameError::OutOfRange);
        }

        let swap_with = match self.combat_unit_at(&to) {
            Some(occupant) if occupant.team != unit.team => {
                return Err(GameError::DestinationOccupied)
            }
            Some(occupant) => Some(occupant.id.clone()),
            None => None,
        };

        let reachable = has_path_within_range(unit.position, to, movement, |hex| {
            self.combat_unit_at(hex).is_some()
        });
        if !reachable {
            return Err(GameError::NoPath);
        }

        let climbs = self.board.is_plateau(&to) && !self.board.is_plateau(&unit.position);
        let cost = if climbs { 2 } else { 1 };
        let swapping = swap_with.is_some();

        if unit.actions_used + cost > UNIT_ACTIONS_PER_TURN {
            return Err(if swapping {
                GameError::UnitCannotAffordSwap
            } else {
                GameError::UnitCannotAffordClimb
            });
        }
        if self.actions_remaining < cost {
            return Err(if swapping {
                GameError::PoolCannotAffordSwap
            } else {
                GameError::PoolCannotAffordClimb
            });
        }

        Ok(MovePlan {
            swap_with,
            cost,
            climbs,
        })
    }

    /// Check whether `attacker` may attack `target` right now
    pub(crate) fn validate_attack(&self, attacker: &Unit, target: &Unit) -> Result<(), GameError> {
        self.validate_actor(attacker)?;
        if attacker.has_attacked && !attacker.has_effect(EffectKind::ExtraAttack) {
            return Err(GameError::AlreadyAttacked);
        }
        if attacker.has_effect(EffectKind::AttackBlocked) {
            return Err(GameError::AttackBlocked);
        }
        if target.team == attacker.team || !target.is_combat() {
            return Err(GameError::InvalidTarget);
        }
        if target.has_effect(EffectKind::Invisible) {
            return Err(GameError::TargetInvisible);
        }

        let range = calculate_effective_stats(attacker, &self.board, self.turn_number).range;
        if attacker.position.distance_to(&target.position) > range {
            return Err(GameError::OutOfRange);
        }

        // Assassins need a walkable route; anything but a Flag is in the way
        if attacker.unit_type == UnitType::Assassin {
            let clear = has_path_within_range(attacker.position, target.position, range, |hex| {
                self.units_at(hex).any(|u| u.unit_type != UnitType::Flag)
            });
            if !clear {
                return Err(GameError::NoPath);
            }
        }

        Ok(())
    }

    // ==================== Movement ====================

    pub(crate) fn move_unit(
        &mut self,
        player: Team,
        unit_id: &str,
        to: HexCoord,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_play()?;
        let unit = self.owned_unit(player, unit_id)?.clone();
        let plan = self.validate_move(&unit, to)?;
        let from = unit.position;
        let turn = self.turn_number;

        if let Some(other_id) = &plan.swap_with {
            self.find_unit_mut(other_id)?.position = from;
        }
        let mover = self.find_unit_mut(unit_id)?;
        mover.position = to;
        mover.actions_used += plan.cost;
        mover.has_moved = true;
        mark_effects_as_used(mover, ActionCategory::Movement, turn);

        let mut events = Vec::new();
        match &plan.swap_with {
            Some(other_id) => {
                let other_type = self.find_unit(other_id)?.unit_type;
                let message = if plan.climbs {
                    format!("{} swapped with {} (climbed plateau)", unit.unit_type, other_type)
                } else {
                    format!("{} swapped positions with {}", unit.unit_type, other_type)
                };
                let entry = self
                    .entry(GameLogKind::Move, message)
                    .with_units(unit.unit_type, Some(other_type));
                self.log.push(entry);
                events.push(GameEvent::UnitsSwapped {
                    unit_id: unit.id.clone(),
                    other_id: other_id.clone(),
                });
            }
            None => {
                events.push(GameEvent::UnitMoved {
                    unit_id: unit.id.clone(),
                    from,
                    to,
                    cost: plan.cost,
                });

                let captured = self
                    .units_at(&to)
                    .any(|u| u.unit_type == UnitType::Flag && u.team != player);
                if captured {
                    self.phase = GamePhase::Finished { winner: player };
                    self.record(
                        GameLogKind::Victory,
                        format!("{} captured the flag and won!", player.to_string().to_uppercase()),
                    );
                    info!(winner = ?player, "flag captured");
                    events.push(GameEvent::GameWon { player });
                    return Ok(events);
                }

                let message = if plan.climbs {
                    format!("{} climbed plateau at ({}, {})", unit.unit_type, to.q, to.r)
                } else {
                    format!("{} moved to ({}, {})", unit.unit_type, to.q, to.r)
                };
                let entry = self
                    .entry(GameLogKind::Move, message)
                    .with_units(unit.unit_type, None);
                self.log.push(entry);
            }
        }

        debug!(unit = %unit.id, %from, %to, cost = plan.cost, "unit moved");
        self.consume_actions(plan.cost, &mut events);
        Ok(events)
    }

    // ==================== Attacks ====================

    pub(crate) fn attack(
        &mut self,
        player: Team,
        attacker_id: &str,
        target_id: &str,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_play()?;
        let attacker = self.owned_unit(player, attacker_id)?.clone();
        let target = self.find_unit(target_id)?.clone();
        self.validate_attack(&attacker, &target)?;

        let attacker_stats = calculate_effective_stats(&attacker, &self.board, self.turn_number);
        let target_stats = calculate_effective_stats(&target, &self.board, self.turn_number);
        let damage = compute_damage(&attacker, &attacker_stats, &target, &target_stats);
        let defeated = target.stats.hp - damage <= 0;
        let adjacent_bonus = attacker.unit_type == UnitType::Assassin
            && attacker.position.distance_to(&target.position) == 1;
        let turn = self.turn_number;

        self.find_unit_mut(&target.id)?.take_damage(damage);
        {
            let unit = self.find_unit_mut(&attacker.id)?;
            if defeated && unit.unit_type.advances_on_kill() {
                unit.position = target.position;
            }
            unit.actions_used += 1;
            if unit.has_attacked {
                // The second attack spends the extra attack
                if let Some(effect_id) = unit.find_effect(EffectKind::ExtraAttack).map(|e| e.id.clone()) {
                    unit.remove_effect(&effect_id);
                }
            }
            unit.has_attacked = true;
        }

        let bonus_note = if adjacent_bonus {
            format!(" (Adjacent +{ASSASSIN_ADJACENT_BONUS})")
        } else {
            String::new()
        };
        let entry = self
            .entry(
                GameLogKind::Attack,
                format!(
                    "{} attacked {} for {} damage{}",
                    attacker.unit_type, target.unit_type, damage, bonus_note
                ),
            )
            .with_units(attacker.unit_type, Some(target.unit_type))
            .with_damage(damage);
        self.log.push(entry);

        let mut events = vec![GameEvent::UnitAttacked {
            attacker_id: attacker.id.clone(),
            target_id: target.id.clone(),
            damage,
            defeated,
        }];

        self.apply_area_damage(&attacker, &target)?;
        if !defeated {
            self.apply_push(&attacker, &target, &mut events)?;
        }
        mark_effects_as_used(self.find_unit_mut(&attacker.id)?, ActionCategory::Attack, turn);
        if defeated {
            self.apply_kill_rewards(&attacker)?;
        }

        for message in crate::rules::process_dying_units(&mut self.units) {
            self.record(GameLogKind::Effect, message);
        }
        self.remove_defeated(&mut events);

        debug!(attacker = %attacker.id, target = %target.id, damage, defeated, "attack resolved");
        self.consume_actions(1, &mut events);
        Ok(events)
    }

    /// Splash the target's team around the target
    fn apply_area_damage(&mut self, attacker: &Unit, target: &Unit) -> Result<(), GameError> {
        let Some(splash) = attacker.find_effect(EffectKind::AreaDamage) else {
            return Ok(());
        };
        let victims: Vec<(String, UnitType)> = self
            .units
            .iter()
            .filter(|u| {
                u.team == target.team
                    && u.id != target.id
                    && u.is_combat()
                    && u.position.distance_to(&target.position) <= AREA_DAMAGE_RADIUS
            })
            .map(|u| (u.id.clone(), u.unit_type))
            .collect();

        for (id, unit_type) in victims {
            self.find_unit_mut(&id)?.take_damage(splash.value);
            let entry = self
                .entry(
                    GameLogKind::Effect,
                    format!(
                        "{} took {} area damage{}",
                        unit_type,
                        splash.value,
                        source_suffix(splash)
                    ),
                )
                .with_units(unit_type, None);
            self.log.push(entry);
        }
        Ok(())
    }

    /// A surviving target with a pending push knocks the attacker back
    fn apply_push(
        &mut self,
        attacker: &Unit,
        target: &Unit,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let Some(push) = target
            .effects
            .iter()
            .find(|e| e.kind == EffectKind::Push && e.duration == EffectDuration::UntilTriggered)
        else {
            return Ok(());
        };

        let origin = self.find_unit(&attacker.id)?.position;
        let landing = origin
            .neighbors()
            .into_iter()
            .find(|hex| is_on_board(hex) && self.units_at(hex).next().is_none());
        let Some(landing) = landing else {
            return Ok(());
        };

        self.find_unit_mut(&attacker.id)?.position = landing;
        self.find_unit_mut(&target.id)?.remove_effect(&push.id);

        let entry = self
            .entry(
                GameLogKind::Effect,
                format!("{} was pushed back by {}", attacker.unit_type, target.unit_type),
            )
            .with_units(attacker.unit_type, Some(target.unit_type));
        self.log.push(entry);
        events.push(GameEvent::AttackerPushed {
            unit_id: attacker.id.clone(),
            to: landing,
        });
        Ok(())
    }

    /// Heal-on-kill, and movement-on-kill for Assassins
    fn apply_kill_rewards(&mut self, attacker: &Unit) -> Result<(), GameError> {
        let turn = self.turn_number;

        let heal = attacker
            .effects
            .iter()
            .find(|e| e.kind == EffectKind::HealOnKill && e.duration == EffectDuration::UntilTriggered);
        if let Some(heal) = heal {
            let unit = self.find_unit_mut(&attacker.id)?;
            unit.heal(heal.value);
            unit.remove_effect(&heal.id);
            let entry = self
                .entry(
                    GameLogKind::Effect,
                    format!("{} healed {} HP{}", attacker.unit_type, heal.value, source_suffix(heal)),
                )
                .with_units(attacker.unit_type, None);
            self.log.push(entry);
        }

        if attacker.unit_type != UnitType::Assassin {
            return Ok(());
        }
        let bonus = attacker
            .effects
            .iter()
            .find(|e| e.kind == EffectKind::MovementOnKill && e.duration == EffectDuration::ThisTurn);
        if let Some(bonus) = bonus {
            let mut buff = Effect::new(
                self.effect_ids.next_id(),
                EffectKind::MovementBuff,
                EffectDuration::ThisTurn,
                bonus.value,
            )
            .applied_on(turn);
            if let Some(title) = &bonus.source_card {
                buff = buff.from_card(title);
            }

            let unit = self.find_unit_mut(&attacker.id)?;
            unit.remove_effect(&bonus.id);
            unit.effects.push(buff);
            let entry = self
                .entry(
                    GameLogKind::Effect,
                    format!(
                        "{} gained +{} movement{}",
                        attacker.unit_type,
                        bonus.value,
                        source_suffix(bonus)
                    ),
                )
                .with_units(attacker.unit_type, None);
            self.log.push(entry);
        }
        Ok(())
    }
}
