//! Card rules: legality checks and effect application.
//!
//! Every card with mechanics has an entry in [`CARD_RULES`], keyed by its
//! normalized title. An entry pairs a legality predicate with the effect
//! the card has once cast. Titles without an entry can still be cast; they
//! resolve to nothing but still use up the caster's cast for the turn.

use crate::board::Board;
use crate::cards::{normalize_title, Card, CardType};
use crate::effects::{Effect, EffectDuration, EffectIds, EffectKind};
use crate::hex::HexCoord;
use crate::units::{Team, Unit, UnitType};
use std::collections::HashSet;

/// Radius searched for a landing hex when a unit is flung off a plateau
pub const FALL_SEARCH_RADIUS: i32 = 8;

/// Damage taken on landing after being flung
pub const FALL_DAMAGE: i32 = 1;

/// Result of a legality check; the error is shown to the player
pub type CastVerdict = Result<(), &'static str>;

/// Everything a legality predicate can look at
#[derive(Debug, Clone, Copy)]
pub struct CastContext<'a> {
    pub card: &'a Card,
    pub caster: &'a Unit,
    pub target: Option<&'a Unit>,
    pub units: &'a [Unit],
    pub board: &'a Board,
}

impl<'a> CastContext<'a> {
    fn require_target(&self, reason: &'static str) -> Result<&'a Unit, &'static str> {
        self.target.ok_or(reason)
    }

    fn own_warlord(&self) -> Option<&'a Unit> {
        self.units
            .iter()
            .find(|u| u.unit_type == UnitType::Warlord && u.team == self.caster.team)
    }
}

/// Working state while a card resolves
pub struct CastResolution<'a> {
    pub card: &'a Card,
    /// Caster as it was before the cast
    pub caster: &'a Unit,
    /// Target as it was before the cast
    pub target: Option<&'a Unit>,
    pub units: Vec<Unit>,
    pub board: &'a Board,
    pub current_turn: u32,
    pub ids: &'a mut EffectIds,
    pub plateaus_to_remove: Vec<HexCoord>,
}

impl CastResolution<'_> {
    fn unit_mut(&mut self, id: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    fn make_effect(&mut self, kind: EffectKind, duration: EffectDuration, value: i32) -> Effect {
        Effect::new(self.ids.next_id(), kind, duration, value)
            .from_card(&self.card.title)
            .applied_on(self.current_turn)
    }

    /// Attach a card effect to a unit
    fn attach(&mut self, unit_id: &str, kind: EffectKind, duration: EffectDuration, value: i32) {
        let effect = self.make_effect(kind, duration, value);
        if let Some(unit) = self.unit_mut(unit_id) {
            unit.effects.push(effect);
        }
    }

    fn own_warlord_id(&self) -> Option<String> {
        self.units
            .iter()
            .find(|u| u.unit_type == UnitType::Warlord && u.team == self.caster.team)
            .map(|u| u.id.clone())
    }
}

/// What a card does once cast
#[derive(Clone, Copy)]
pub enum CardAction {
    /// Attach one effect to the target
    Attach {
        kind: EffectKind,
        duration: EffectDuration,
        value: i32,
    },
    /// Anything more involved
    Custom(fn(&mut CastResolution<'_>)),
}

/// Registry entry for one card
#[derive(Clone, Copy)]
pub struct CardRule {
    pub validate: fn(&CastContext<'_>) -> CastVerdict,
    pub apply: CardAction,
}

const fn attach(
    validate: fn(&CastContext<'_>) -> CastVerdict,
    kind: EffectKind,
    duration: EffectDuration,
    value: i32,
) -> CardRule {
    CardRule {
        validate,
        apply: CardAction::Attach {
            kind,
            duration,
            value,
        },
    }
}

const fn custom(
    validate: fn(&CastContext<'_>) -> CastVerdict,
    apply: fn(&mut CastResolution<'_>),
) -> CardRule {
    CardRule {
        validate,
        apply: CardAction::Custom(apply),
    }
}

use EffectDuration::{NextTurn, ThisTurn, UntilTriggered};
use EffectKind as K;

/// Card rules keyed by normalized title
pub static CARD_RULES: &[(&str, CardRule)] = &[
    // Buffs
    ("transfusion", custom(any_target, transfusion)),
    ("phantasmic shield", attach(any_target, K::DamageReduction, NextTurn, 2)),
    ("axehound", attach(brute_target, K::AttackBuff, NextTurn, 1)),
    ("poison arrow", attach(archer_target, K::AttackBuff, NextTurn, 1)),
    ("shadow's edge", attach(assassin_target, K::AttackBuff, NextTurn, 1)),
    ("king of the hill", attach(archer_on_plateau, K::AttackBuff, NextTurn, 2)),
    ("farsight", attach(archer_only, K::RangeBuff, ThisTurn, 1)),
    ("swift foot", attach(any_target, K::MovementBuff, ThisTurn, 1)),
    ("spectral shift", attach(mage_target, K::MovementBuff, NextTurn, 4)),
    ("in & out murder", attach(assassin_target, K::MovementOnKill, ThisTurn, 1)),
    ("shield bash", attach(any_target, K::Push, UntilTriggered, 1)),
    ("gravity's lash", custom(target_on_plateau, gravitys_lash)),
    ("shroud of turino", attach(assassin_target, K::Invisible, NextTurn, 1)),
    ("raging pulse", attach(brute_target, K::AttackBuff, NextTurn, 3)),
    ("echo strike", attach(brute_target, K::ExtraAttack, ThisTurn, 1)),
    ("spinal ripcord", custom(target_and_own_warlord, spinal_ripcord)),
    ("soul siphon", custom(target_and_own_warlord, soul_siphon)),
    ("rampage", custom(own_warlord_on_board, rampage)),
    ("super smash", custom(target_and_own_warlord, super_smash)),
    // Nerfs
    ("overwound strings", attach(archer_only, K::AttackNerf, NextTurn, 1)),
    ("toe rot", attach(any_target, K::MovementBlocked, NextTurn, 1)),
    ("blinding dust", attach(ranged_target, K::RangeNerf, NextTurn, 1)),
    ("brittle blade", attach(brute_target, K::AttackNerf, NextTurn, 2)),
    ("coward's mark", attach(any_target, K::AttackBlocked, NextTurn, 1)),
    ("grave debt", custom(any_target, grave_debt)),
    ("vertigo", attach(target_on_plateau, K::PlateauDebuff, NextTurn, 1)),
    ("tarnished crown", attach(warlord_target, K::BuffBlocked, NextTurn, 1)),
    ("claws of crabs", custom(flanked_enemy, claws_of_crabs)),
    ("weight of command", custom(warlord_target, weight_of_command)),
    ("traitor's toll", custom(enemy_beside_warlord, traitors_toll)),
    ("shatter terra", custom(plateau_hex_target, shatter_terra)),
];

/// Look up the rule for a card title
pub fn rule_for(title: &str) -> Option<&'static CardRule> {
    let key = normalize_title(title);
    CARD_RULES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, rule)| rule)
}

/// Buff cards that may still be aimed at enemies
const BUFFS_ALLOWED_ON_ENEMIES: &[&str] = &["gravity's lash"];

/// Check whether a card may be cast by `caster` on `target`.
///
/// Range is not checked here; callers only offer targets within the
/// caster's effective range.
pub fn can_cast_card(
    card: &Card,
    caster: Option<&Unit>,
    target: Option<&Unit>,
    units: &[Unit],
    board: &Board,
) -> CastVerdict {
    let caster = caster.ok_or("No caster selected")?;

    if caster.unit_type != UnitType::Mage {
        return Err("Only Mages can cast cards");
    }
    if caster.has_cast {
        return Err("This unit has already cast a card this turn");
    }

    let title = card.normalized_title();
    if let Some(target) = target.filter(|t| t.is_combat()) {
        match card.card_type {
            CardType::Buff => {
                if target.team != caster.team && !BUFFS_ALLOWED_ON_ENEMIES.contains(&title.as_str())
                {
                    return Err("Can only buff friendly units");
                }
                if target.has_effect(EffectKind::BuffBlocked) {
                    return Err("Target cannot receive buffs");
                }
            }
            CardType::Nerf => {
                if target.team == caster.team {
                    return Err("Can only nerf enemy units");
                }
                if target.has_effect(EffectKind::Invisible) {
                    return Err("Target is invisible");
                }
            }
        }
    }

    let ctx = CastContext {
        card,
        caster,
        target,
        units,
        board,
    };
    match rule_for(&card.title) {
        Some(rule) => (rule.validate)(&ctx),
        None => Ok(()),
    }
}

/// Units and terrain changes produced by a cast
#[derive(Debug, Clone)]
pub struct CastOutcome {
    pub units: Vec<Unit>,
    /// Plateau hexes destroyed by the card
    pub plateaus_to_remove: Vec<HexCoord>,
}

/// Resolve a card that already passed [`can_cast_card`].
///
/// The caster's pending self-damage (an until-triggered `CardDamage`
/// effect) is paid first. The caster's cast is always spent, even for
/// cards with no registered rule.
pub fn apply_card_effect(
    card: &Card,
    caster: &Unit,
    target: Option<&Unit>,
    units: &[Unit],
    board: &Board,
    current_turn: u32,
    ids: &mut EffectIds,
) -> CastOutcome {
    let mut resolution = CastResolution {
        card,
        caster,
        target,
        units: units.to_vec(),
        board,
        current_turn,
        ids,
        plateaus_to_remove: Vec::new(),
    };

    if let Some(unit) = resolution.unit_mut(&caster.id) {
        let self_damage = unit
            .effects
            .iter()
            .find(|e| e.kind == EffectKind::CardDamage && e.duration == UntilTriggered)
            .map(|e| (e.id.clone(), e.value));
        if let Some((effect_id, value)) = self_damage {
            unit.take_damage(value);
            unit.remove_effect(&effect_id);
        }
    }

    match rule_for(&card.title).map(|rule| rule.apply) {
        Some(CardAction::Attach {
            kind,
            duration,
            value,
        }) => {
            if let Some(target) = target {
                resolution.attach(&target.id, kind, duration, value);
            }
        }
        Some(CardAction::Custom(apply)) => apply(&mut resolution),
        None => {}
    }

    if let Some(unit) = resolution.unit_mut(&caster.id) {
        unit.has_cast = true;
    }

    CastOutcome {
        units: resolution.units,
        plateaus_to_remove: resolution.plateaus_to_remove,
    }
}

/// Fire death triggers for every dying unit.
///
/// Sweeps repeat until no new unit is dying, so a Mage killed by a death
/// trigger gets its own triggers fired too. Each effect fires at most once.
/// Returns a message per fired trigger.
pub fn process_dying_units(units: &mut [Unit]) -> Vec<String> {
    let mut processed: HashSet<String> = HashSet::new();
    let mut triggered: HashSet<String> = HashSet::new();
    let mut messages = Vec::new();

    loop {
        let dying: Vec<usize> = units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.is_dying() && !processed.contains(&u.id))
            .map(|(i, _)| i)
            .collect();
        if dying.is_empty() {
            break;
        }

        for index in dying {
            processed.insert(units[index].id.clone());

            let triggers: Vec<Effect> = units[index]
                .effects
                .iter()
                .filter(|e| {
                    e.kind.is_death_trigger()
                        && e.duration == UntilTriggered
                        && !triggered.contains(&e.id)
                })
                .cloned()
                .collect();

            for effect in triggers {
                triggered.insert(effect.id.clone());

                if effect.kind == EffectKind::OnDeathMageDamage {
                    let dead = &units[index];
                    let victim_team = effect.caster_team.unwrap_or(dead.team).opponent();
                    if let Some(mage) = nearest_living_mage(units, dead.position, victim_team) {
                        let unit_type = units[index].unit_type;
                        units[mage].take_damage(effect.value);
                        messages.push(format!(
                            "{} from the fallen {} deals {} damage to {}'s Mage",
                            effect.source_card.as_deref().unwrap_or("Death curse"),
                            unit_type,
                            effect.value,
                            victim_team
                        ));
                    }
                }

                units[index].remove_effect(&effect.id);
            }
        }
    }

    messages
}

/// Index of the closest living Mage of a team; ties go to the first found
fn nearest_living_mage(units: &[Unit], origin: HexCoord, team: Team) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (index, unit) in units.iter().enumerate() {
        if unit.unit_type != UnitType::Mage || unit.team != team || unit.stats.hp <= 0 {
            continue;
        }
        let distance = origin.distance_to(&unit.position);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

// ==================== Legality predicates ====================

fn any_target(ctx: &CastContext<'_>) -> CastVerdict {
    ctx.require_target("This card requires a target").map(|_| ())
}

fn target_of_type(ctx: &CastContext<'_>, unit_type: UnitType, reason: &'static str) -> CastVerdict {
    match ctx.target {
        Some(t) if t.unit_type == unit_type => Ok(()),
        _ => Err(reason),
    }
}

fn brute_target(ctx: &CastContext<'_>) -> CastVerdict {
    target_of_type(ctx, UnitType::Brute, "This card requires a Brute target")
}

fn archer_target(ctx: &CastContext<'_>) -> CastVerdict {
    target_of_type(ctx, UnitType::Archer, "This card requires an Archer target")
}

fn archer_only(ctx: &CastContext<'_>) -> CastVerdict {
    ctx.require_target("Requires an Archer target")?;
    target_of_type(ctx, UnitType::Archer, "Can only target Archers")
}

fn assassin_target(ctx: &CastContext<'_>) -> CastVerdict {
    target_of_type(ctx, UnitType::Assassin, "This card requires an Assassin target")
}

fn mage_target(ctx: &CastContext<'_>) -> CastVerdict {
    target_of_type(ctx, UnitType::Mage, "This card requires a Mage target")
}

fn warlord_target(ctx: &CastContext<'_>) -> CastVerdict {
    target_of_type(ctx, UnitType::Warlord, "This card requires a Warlord target")
}

fn archer_on_plateau(ctx: &CastContext<'_>) -> CastVerdict {
    target_of_type(ctx, UnitType::Archer, "Requires an Archer on a Plateau")?;
    match ctx.target {
        Some(t) if ctx.board.is_plateau(&t.position) => Ok(()),
        _ => Err("Archer must be on a Plateau"),
    }
}

fn ranged_target(ctx: &CastContext<'_>) -> CastVerdict {
    let target = ctx.require_target("Requires a target")?;
    match target.unit_type {
        UnitType::Archer | UnitType::Mage | UnitType::Assassin => Ok(()),
        _ => Err("Can only target Archer, Mage, or Assassin"),
    }
}

fn target_on_plateau(ctx: &CastContext<'_>) -> CastVerdict {
    let target = ctx.require_target("Requires a target")?;
    if ctx.board.is_plateau(&target.position) {
        Ok(())
    } else {
        Err("Target must be on a Plateau")
    }
}

fn plateau_hex_target(ctx: &CastContext<'_>) -> CastVerdict {
    let target = ctx.require_target("Requires a target hex with a plateau")?;
    if ctx.board.is_plateau(&target.position) {
        Ok(())
    } else {
        Err("Target must be on a plateau")
    }
}

fn flanked_enemy(ctx: &CastContext<'_>) -> CastVerdict {
    let target = ctx.require_target("Requires a target")?;
    if target.team == ctx.caster.team {
        return Err("Can only target enemy units");
    }
    if adjacent_combat_units(ctx.units, target.position, ctx.caster.team).count() < 2 {
        return Err("Target must have at least 2 friendly units adjacent");
    }
    Ok(())
}

fn enemy_beside_warlord(ctx: &CastContext<'_>) -> CastVerdict {
    let target = ctx.require_target("Requires a target")?;
    if target.team == ctx.caster.team {
        return Err("Can only target enemy units");
    }
    if adjacent_warlord(ctx.units, target).is_none() {
        return Err("Target must be adjacent to their own Warlord");
    }
    Ok(())
}

fn own_warlord_on_board(ctx: &CastContext<'_>) -> CastVerdict {
    ctx.own_warlord()
        .map(|_| ())
        .ok_or("Warlord must be on the board")
}

fn target_and_own_warlord(ctx: &CastContext<'_>) -> CastVerdict {
    ctx.require_target("This card requires a target")?;
    own_warlord_on_board(ctx)
}

fn adjacent_combat_units<'u>(
    units: &'u [Unit],
    center: HexCoord,
    team: Team,
) -> impl Iterator<Item = &'u Unit> {
    let ring = center.neighbors();
    units
        .iter()
        .filter(move |u| u.team == team && u.is_combat() && ring.contains(&u.position))
}

fn adjacent_warlord<'u>(units: &'u [Unit], target: &Unit) -> Option<&'u Unit> {
    let ring = target.position.neighbors();
    units.iter().find(|u| {
        u.unit_type == UnitType::Warlord && u.team == target.team && ring.contains(&u.position)
    })
}

// ==================== Card effects ====================

fn transfusion(res: &mut CastResolution<'_>) {
    if let Some(target) = res.target {
        let id = target.id.clone();
        if let Some(unit) = res.unit_mut(&id) {
            unit.heal(2);
        }
    }
}

fn grave_debt(res: &mut CastResolution<'_>) {
    let Some(target) = res.target else { return };
    let effect = res
        .make_effect(K::OnDeathMageDamage, UntilTriggered, 2)
        .cast_by(res.caster.team);
    if let Some(unit) = res.unit_mut(&target.id) {
        unit.effects.push(effect);
    }
}

fn gravitys_lash(res: &mut CastResolution<'_>) {
    let Some(target) = res.target else { return };
    let origin = target.position;

    let mut landing: Option<(HexCoord, i32)> = None;
    for hex in origin.hexes_in_range(FALL_SEARCH_RADIUS) {
        if hex == origin || !res.board.contains(&hex) {
            continue;
        }
        let occupied = res
            .units
            .iter()
            .any(|u| u.position == hex && u.id != target.id);
        if occupied {
            continue;
        }
        let distance = origin.distance_to(&hex);
        if landing.map_or(true, |(_, best)| distance < best) {
            landing = Some((hex, distance));
        }
    }

    if let Some((hex, _)) = landing {
        if let Some(unit) = res.unit_mut(&target.id) {
            unit.position = hex;
            unit.take_damage(FALL_DAMAGE);
        }
    }
}

fn claws_of_crabs(res: &mut CastResolution<'_>) {
    let Some(target) = res.target else { return };
    let flankers: Vec<String> = adjacent_combat_units(&res.units, target.position, res.caster.team)
        .map(|u| u.id.clone())
        .collect();
    for id in flankers {
        res.attach(&id, K::AttackBuff, NextTurn, 1);
    }
}

fn weight_of_command(res: &mut CastResolution<'_>) {
    let Some(target) = res.target else { return };
    let allies = adjacent_combat_units(&res.units, target.position, target.team).count();
    res.attach(&target.id, K::AttackNerf, NextTurn, allies as i32);
}

fn traitors_toll(res: &mut CastResolution<'_>) {
    let Some(target) = res.target else { return };
    let Some(warlord) = adjacent_warlord(&res.units, target).map(|u| u.id.clone()) else {
        return;
    };
    if let Some(unit) = res.unit_mut(&warlord) {
        unit.take_damage(2);
    }
}

fn rampage(res: &mut CastResolution<'_>) {
    if let Some(warlord) = res.own_warlord_id() {
        res.attach(&warlord, K::ExtraAttack, ThisTurn, 1);
    }
}

fn soul_siphon(res: &mut CastResolution<'_>) {
    if let Some(warlord) = res.own_warlord_id().filter(|_| res.target.is_some()) {
        res.attach(&warlord, K::AttackBuff, ThisTurn, 2);
        res.attach(&warlord, K::HealOnKill, UntilTriggered, 1);
    }
}

fn spinal_ripcord(res: &mut CastResolution<'_>) {
    if let Some(warlord) = res.own_warlord_id().filter(|_| res.target.is_some()) {
        res.attach(&warlord, K::AttackBuff, ThisTurn, 2);
        res.attach(&warlord, K::IgnoreDamageReduction, ThisTurn, 1);
    }
}

fn super_smash(res: &mut CastResolution<'_>) {
    if let Some(warlord) = res.own_warlord_id().filter(|_| res.target.is_some()) {
        res.attach(&warlord, K::AreaDamage, ThisTurn, 1);
    }
}

fn shatter_terra(res: &mut CastResolution<'_>) {
    let Some(target) = res.target else { return };
    let hex = target.position;
    if !res.board.is_plateau(&hex) {
        return;
    }
    for unit in res.units.iter_mut().filter(|u| u.position == hex && u.is_combat()) {
        unit.stats.hp = 0;
    }
    res.plateaus_to_remove.push(hex);
}
