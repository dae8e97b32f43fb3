//! Core game state machine.
//!
//! This module contains the main `GameState` struct, the setup and card
//! rules, and turn management. Movement and combat live in
//! [`crate::combat`]; read-only projections live in [`crate::view`].

use crate::actions::{GameAction, GameEvent};
use crate::board::{in_deployment_zone, is_on_board, Board, MAX_PLATEAUS_PER_PLAYER};
use crate::cards::{Card, Deck, HAND_SIZE};
use crate::effects::{calculate_effective_stats, cleanup_expired_effects, EffectIds};
use crate::hex::HexCoord;
use crate::log::{GameLog, GameLogEntry, GameLogKind};
use crate::rules::{apply_card_effect, can_cast_card, process_dying_units};
use crate::units::{Team, Unit, UnitType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Shared action pool each player gets per turn
pub const ACTIONS_PER_TURN: u8 = 2;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Player 1 deploys units and plateaus
    SetupPlayer1,
    /// Player 2 deploys units and plateaus
    SetupPlayer2,
    /// Alternating turns
    Play,
    /// A flag was captured
    Finished { winner: Team },
}

impl GamePhase {
    pub fn is_setup(self) -> bool {
        matches!(self, GamePhase::SetupPlayer1 | GamePhase::SetupPlayer2)
    }
}

/// Errors that can occur when applying actions.
///
/// The display text is the reason shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("That hex is not on the board")]
    OffBoard,

    #[error("Cannot place units in this zone!")]
    OutsideDeploymentZone,

    #[error("That hex is already occupied")]
    HexOccupied,

    #[error("No more {0} units can be deployed")]
    UnitLimitReached(UnitType),

    #[error("Plateaus are placed as terrain, not as units")]
    CannotDeployPlateau,

    #[error("Archers cannot be placed on plateaus during setup!")]
    ArcherOnPlateau,

    #[error("Each player may only place 2 plateaus")]
    PlateauLimit,

    #[error("There is already a plateau here")]
    PlateauExists,

    #[error("You have no plateau on that hex")]
    NoPlateau,

    #[error("That unit is not yours")]
    NotYourUnit,

    /// An id that does not exist in the snapshot
    #[error("Unit {0} does not exist")]
    UnitNotFound(String),

    #[error("No actions remaining this turn")]
    NoActionsRemaining,

    #[error("This unit has no actions left this turn")]
    UnitExhausted,

    #[error("Unit cannot move - affected by Toe Rot!")]
    MovementBlocked,

    #[error("This unit has already moved this turn")]
    AlreadyMoved,

    #[error("Unit is already on that hex")]
    SameHex,

    #[error("Target is out of range")]
    OutOfRange,

    #[error("No clear path to that hex")]
    NoPath,

    #[error("An enemy unit is standing there")]
    DestinationOccupied,

    #[error("Not enough actions to climb plateau!")]
    UnitCannotAffordClimb,

    #[error("Not enough actions remaining to climb plateau!")]
    PoolCannotAffordClimb,

    #[error("Not enough actions to swap onto plateau!")]
    UnitCannotAffordSwap,

    #[error("Not enough actions remaining to swap onto plateau!")]
    PoolCannotAffordSwap,

    #[error("This unit has already attacked this turn")]
    AlreadyAttacked,

    #[error("This unit cannot attack")]
    AttackBlocked,

    #[error("Invalid target")]
    InvalidTarget,

    #[error("Target is invisible")]
    TargetInvisible,

    #[error("{0}")]
    CannotCast(String),

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Invalid discard")]
    InvalidDiscard,

    #[error("Game is over")]
    GameOver,
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Terrain
    pub board: Board,
    /// Every unit on the board, both teams
    pub units: Vec<Unit>,
    /// Current game phase
    pub phase: GamePhase,
    /// Whose turn it is (or who is deploying)
    pub current_player: Team,
    /// Completed turns, counting each player's turn separately
    pub turn_number: u32,
    /// Actions left in the shared pool this turn
    pub actions_remaining: u8,
    /// Hands, indexed by [`Team::index`]
    pub hands: [Vec<Card>; 2],
    /// The multiset every draw comes from
    pub deck: Deck,
    /// Player-facing audit trail
    pub log: GameLog,
    pub(crate) effect_ids: EffectIds,
    next_unit_seq: u64,
    /// Random number generator seed (for deterministic replays)
    rng_seed: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Create a new game with a random seed
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    /// Create a new game whose card draws are determined by `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::with_deck(Deck::standard(), seed)
    }

    /// Create a new game drawing from a custom deck
    pub fn with_deck(deck: Deck, seed: u64) -> Self {
        Self {
            board: Board::new(),
            units: Vec::new(),
            phase: GamePhase::SetupPlayer1,
            current_player: Team::Player1,
            turn_number: 0,
            actions_remaining: ACTIONS_PER_TURN,
            hands: [Vec::new(), Vec::new()],
            deck,
            log: GameLog::default(),
            effect_ids: EffectIds::default(),
            next_unit_seq: 0,
            rng_seed: seed,
        }
    }

    /// Restore a snapshot
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize a snapshot
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Turn number as players count it: both players' turns share one number
    pub fn match_turn(&self) -> u32 {
        self.turn_number / 2 + 1
    }

    pub fn hand(&self, team: Team) -> &[Card] {
        &self.hands[team.index()]
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Units standing on a hex (a Flag can share a hex with a combat unit)
    pub fn units_at(&self, hex: &HexCoord) -> impl Iterator<Item = &Unit> + '_ {
        let hex = *hex;
        self.units.iter().filter(move |u| u.position == hex)
    }

    /// The combat unit standing on a hex, if any
    pub fn combat_unit_at(&self, hex: &HexCoord) -> Option<&Unit> {
        self.units_at(hex).find(|u| u.is_combat())
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
    }

    /// Get the winner if the game is finished
    pub fn winner(&self) -> Option<Team> {
        match self.phase {
            GamePhase::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    /// Pure reducer: resolve an action against a copy of this state.
    ///
    /// On success returns the next state and the log entries the action
    /// produced. `self` is never modified.
    pub fn reduce(
        &self,
        player: Team,
        action: GameAction,
    ) -> Result<(GameState, Vec<GameLogEntry>), GameError> {
        let mut next = self.clone();
        let logged = next.log.len();
        next.execute(player, action)?;
        let entries = next.log.since(logged).to_vec();
        Ok((next, entries))
    }

    /// Apply an action to the game state.
    ///
    /// A rejected action leaves the state untouched.
    pub fn apply_action(
        &mut self,
        player: Team,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut next = self.clone();
        let events = next.execute(player, action)?;
        *self = next;
        Ok(events)
    }

    fn execute(&mut self, player: Team, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        // Check game not over
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }

        debug!(?player, ?action, "resolving action");

        match action {
            // ==================== Setup Phase ====================
            GameAction::PlaceUnit { unit_type, at } => self.place_unit(player, unit_type, at),
            GameAction::RemoveUnit { unit_id } => self.remove_unit(player, &unit_id),
            GameAction::PlacePlateau { at } => self.place_plateau(player, at),
            GameAction::RemovePlateau { at } => self.remove_plateau(player, at),
            GameAction::Ready => self.ready(player),

            // ==================== Play Phase ====================
            GameAction::Move { unit_id, to } => self.move_unit(player, &unit_id, to),
            GameAction::Attack {
                attacker_id,
                target_id,
            } => self.attack(player, &attacker_id, &target_id),
            GameAction::CastCard {
                card_index,
                caster_id,
                target_id,
            } => self.cast_card(player, card_index, &caster_id, &target_id),
            GameAction::CycleCards { discard } => self.cycle_cards(player, &discard),

            // ==================== Turn Management ====================
            GameAction::EndTurn => {
                self.require_play()?;
                Ok(self.end_turn())
            }
        }
    }

    // ==================== Setup Phase ====================

    fn place_unit(
        &mut self,
        player: Team,
        unit_type: UnitType,
        at: HexCoord,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_setup()?;
        if unit_type == UnitType::Plateau {
            return Err(GameError::CannotDeployPlateau);
        }
        self.validate_deployment_hex(player, &at)?;
        if unit_type == UnitType::Archer && self.board.is_plateau(&at) {
            return Err(GameError::ArcherOnPlateau);
        }
        if self.units_at(&at).next().is_some() {
            return Err(GameError::HexOccupied);
        }
        let deployed = self
            .units
            .iter()
            .filter(|u| u.team == player && u.unit_type == unit_type)
            .count();
        if deployed >= unit_type.deploy_limit() {
            return Err(GameError::UnitLimitReached(unit_type));
        }

        self.next_unit_seq += 1;
        let unit_id = format!("{}-{}-{}", player.slug(), unit_type.slug(), self.next_unit_seq);
        self.units
            .push(Unit::new(unit_id.clone(), unit_type, player, at));

        Ok(vec![GameEvent::UnitPlaced {
            unit_id,
            unit_type,
            team: player,
            at,
        }])
    }

    fn remove_unit(&mut self, player: Team, unit_id: &str) -> Result<Vec<GameEvent>, GameError> {
        self.require_setup()?;
        let index = self
            .units
            .iter()
            .position(|u| u.id == unit_id)
            .ok_or_else(|| GameError::UnitNotFound(unit_id.to_string()))?;
        if self.units[index].team != player {
            return Err(GameError::NotYourUnit);
        }
        self.units.remove(index);

        Ok(vec![GameEvent::UnitRemoved {
            unit_id: unit_id.to_string(),
        }])
    }

    fn place_plateau(&mut self, player: Team, at: HexCoord) -> Result<Vec<GameEvent>, GameError> {
        self.require_setup()?;
        self.validate_deployment_hex(player, &at)?;
        if self.board.is_plateau(&at) {
            return Err(GameError::PlateauExists);
        }
        if self.board.plateau_count(player) >= MAX_PLATEAUS_PER_PLAYER {
            return Err(GameError::PlateauLimit);
        }
        self.board.add_plateau(at, player);

        Ok(vec![GameEvent::PlateauPlaced { team: player, at }])
    }

    fn remove_plateau(&mut self, player: Team, at: HexCoord) -> Result<Vec<GameEvent>, GameError> {
        self.require_setup()?;
        if self.board.plateau_owner(&at) != Some(player) {
            return Err(GameError::NoPlateau);
        }
        self.board.remove_plateau(&at);

        Ok(vec![GameEvent::PlateauRemoved { team: player, at }])
    }

    fn ready(&mut self, player: Team) -> Result<Vec<GameEvent>, GameError> {
        let mut events = vec![GameEvent::PlayerReady { team: player }];
        self.record(GameLogKind::Setup, format!("{player} is ready"));

        match self.phase {
            GamePhase::SetupPlayer1 => {
                self.phase = GamePhase::SetupPlayer2;
                self.current_player = Team::Player2;
            }
            GamePhase::SetupPlayer2 => {
                self.phase = GamePhase::Play;
                self.current_player = Team::Player1;
                self.turn_number = 0;
                self.actions_remaining = ACTIONS_PER_TURN;

                let mut rng = self.next_rng();
                let hands = self.deck.draw_unique_for_both_players(&mut rng);
                self.hands = [hands.player1, hands.player2];

                self.record(GameLogKind::TurnStart, "Player 1's turn begins");
                events.push(GameEvent::BattleStarted);
                info!(units = self.units.len(), "battle started");
            }
            _ => return Err(GameError::InvalidPhase),
        }

        Ok(events)
    }

    fn validate_deployment_hex(&self, player: Team, at: &HexCoord) -> Result<(), GameError> {
        if !is_on_board(at) {
            return Err(GameError::OffBoard);
        }
        if !in_deployment_zone(player, at) {
            return Err(GameError::OutsideDeploymentZone);
        }
        Ok(())
    }

    // ==================== Cards ====================

    /// Check that `caster` may cast `card` on `target` right now
    pub(crate) fn validate_cast(
        &self,
        card: &Card,
        caster: &Unit,
        target: &Unit,
    ) -> Result<(), GameError> {
        self.require_play()?;
        if caster.team != self.current_player {
            return Err(GameError::NotYourUnit);
        }
        let range = calculate_effective_stats(caster, &self.board, self.turn_number).range;
        if caster.position.distance_to(&target.position) > range {
            return Err(GameError::OutOfRange);
        }
        can_cast_card(card, Some(caster), Some(target), &self.units, &self.board)
            .map_err(|reason| GameError::CannotCast(reason.to_string()))
    }

    fn cast_card(
        &mut self,
        player: Team,
        card_index: usize,
        caster_id: &str,
        target_id: &str,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_play()?;
        let card = self.hands[player.index()]
            .get(card_index)
            .cloned()
            .ok_or(GameError::NoSuchCard)?;
        let caster = self.find_unit(caster_id)?.clone();
        let target = self.find_unit(target_id)?.clone();
        self.validate_cast(&card, &caster, &target)?;

        let outcome = apply_card_effect(
            &card,
            &caster,
            Some(&target),
            &self.units,
            &self.board,
            self.turn_number,
            &mut self.effect_ids,
        );
        self.units = outcome.units;
        self.hands[player.index()].remove(card_index);

        let entry = self
            .entry(
                GameLogKind::CardCast,
                format!("Cast \"{}\" on {}", card.title, target.unit_type),
            )
            .with_units(caster.unit_type, Some(target.unit_type));
        self.log.push(entry);

        let mut events = vec![GameEvent::CardCast {
            team: player,
            title: card.title.clone(),
            caster_id: caster.id.clone(),
            target_id: target.id.clone(),
        }];

        for message in process_dying_units(&mut self.units) {
            self.record(GameLogKind::Effect, message);
        }
        self.remove_defeated(&mut events);

        for at in outcome.plateaus_to_remove {
            if self.board.remove_plateau(&at).is_some() {
                events.push(GameEvent::PlateauDestroyed { at });
            }
        }

        debug!(title = %card.title, caster = %caster.id, target = %target.id, "card cast");
        Ok(events)
    }

    fn cycle_cards(&mut self, player: Team, discard: &[usize]) -> Result<Vec<GameEvent>, GameError> {
        self.require_play()?;
        self.require_actions()?;

        let hand = &self.hands[player.index()];
        let unique: HashSet<usize> = discard.iter().copied().collect();
        if unique.len() != discard.len() || discard.iter().any(|&i| i >= hand.len()) {
            return Err(GameError::InvalidDiscard);
        }

        let mut kept: Vec<Card> = hand
            .iter()
            .enumerate()
            .filter(|(i, _)| !unique.contains(i))
            .map(|(_, card)| card.clone())
            .collect();
        let draw_count = HAND_SIZE.saturating_sub(kept.len());

        let mut rng = self.next_rng();
        kept.extend(self.deck.draw_random(&mut rng, draw_count));
        self.hands[player.index()] = kept;

        self.record(
            GameLogKind::Card,
            format!("Cycled {} cards for {} new ones", discard.len(), draw_count),
        );

        let mut events = vec![GameEvent::CardsCycled {
            team: player,
            discarded: discard.len(),
            drawn: draw_count,
        }];
        self.consume_actions(1, &mut events);
        Ok(events)
    }

    // ==================== Turn Management ====================

    /// Spend actions from the pool; an empty pool ends the turn
    pub(crate) fn consume_actions(&mut self, count: u8, events: &mut Vec<GameEvent>) {
        self.actions_remaining = self.actions_remaining.saturating_sub(count);
        if self.actions_remaining == 0 {
            events.extend(self.end_turn());
        }
    }

    fn end_turn(&mut self) -> Vec<GameEvent> {
        let player = self.current_player;
        for unit in &mut self.units {
            unit.reset_turn_flags();
        }
        cleanup_expired_effects(&mut self.units, self.turn_number + 1);
        self.turn_number += 1;

        let next_player = player.opponent();
        self.current_player = next_player;
        self.actions_remaining = ACTIONS_PER_TURN;
        self.record(GameLogKind::TurnStart, format!("{next_player}'s turn begins"));

        debug!(?next_player, turn = self.turn_number, "turn ended");
        vec![GameEvent::TurnEnded {
            player,
            next_player,
        }]
    }

    // ==================== Helper Methods ====================

    fn require_setup(&self) -> Result<(), GameError> {
        if self.phase.is_setup() {
            Ok(())
        } else {
            Err(GameError::InvalidPhase)
        }
    }

    pub(crate) fn require_play(&self) -> Result<(), GameError> {
        if self.phase == GamePhase::Play {
            Ok(())
        } else {
            Err(GameError::InvalidPhase)
        }
    }

    pub(crate) fn require_actions(&self) -> Result<(), GameError> {
        if self.actions_remaining > 0 {
            Ok(())
        } else {
            Err(GameError::NoActionsRemaining)
        }
    }

    pub(crate) fn find_unit(&self, id: &str) -> Result<&Unit, GameError> {
        self.unit(id)
            .ok_or_else(|| GameError::UnitNotFound(id.to_string()))
    }

    pub(crate) fn find_unit_mut(&mut self, id: &str) -> Result<&mut Unit, GameError> {
        self.units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| GameError::UnitNotFound(id.to_string()))
    }

    /// A unit the player controls
    pub(crate) fn owned_unit(&self, player: Team, id: &str) -> Result<&Unit, GameError> {
        let unit = self.find_unit(id)?;
        if unit.team != player {
            return Err(GameError::NotYourUnit);
        }
        Ok(unit)
    }

    /// Log entry stamped with the current player and match turn
    pub(crate) fn entry(&self, kind: GameLogKind, message: impl Into<String>) -> GameLogEntry {
        GameLogEntry::new(kind, self.current_player, self.match_turn(), message)
    }

    pub(crate) fn record(&mut self, kind: GameLogKind, message: impl Into<String>) {
        let entry = self.entry(kind, message);
        self.log.push(entry);
    }

    /// Drop every dead combat unit, logging each one
    pub(crate) fn remove_defeated(&mut self, events: &mut Vec<GameEvent>) {
        let (dead, alive): (Vec<Unit>, Vec<Unit>) = std::mem::take(&mut self.units)
            .into_iter()
            .partition(|u| u.is_dying());
        self.units = alive;

        for unit in dead {
            let entry = self
                .entry(
                    GameLogKind::UnitDefeated,
                    format!("{} was defeated!", unit.unit_type),
                )
                .with_units(unit.unit_type, None);
            self.log.push(entry);
            events.push(GameEvent::UnitDefeated {
                unit_id: unit.id,
                unit_type: unit.unit_type,
                team: unit.team,
            });
        }
    }

    /// Generator for one draw; the stored seed advances so the next draw differs
    fn next_rng(&mut self) -> StdRng {
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        self.rng_seed = rng.gen();
        rng
    }
}
