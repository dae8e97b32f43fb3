//! Read-only projections of the game state for clients.
//!
//! Every query runs the same validation the resolvers use, so a hex or
//! target offered here is exactly one the matching action accepts.

use crate::board::BoardTile;
use crate::effects::{calculate_effective_stats, EffectiveStats};
use crate::game::GameState;
use crate::hex::HexCoord;
use crate::units::{Team, Unit};
use serde::{Deserialize, Serialize};

/// A unit together with its folded stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub unit: Unit,
    pub effective: EffectiveStats,
    pub on_plateau: bool,
}

impl GameState {
    /// Every unit with effective stats and terrain
    pub fn unit_views(&self) -> Vec<UnitView> {
        self.units
            .iter()
            .map(|unit| UnitView {
                unit: unit.clone(),
                effective: calculate_effective_stats(unit, &self.board, self.turn_number),
                on_plateau: self.board.is_plateau(&unit.position),
            })
            .collect()
    }

    /// Units a player may see. Deployment is hidden until both sides are ready.
    pub fn visible_units(&self, viewer: Team) -> Vec<&Unit> {
        let hide_enemy = self.phase.is_setup();
        self.units
            .iter()
            .filter(|u| !hide_enemy || u.team == viewer)
            .collect()
    }

    /// Hexes the unit can move to this turn
    pub fn valid_moves(&self, unit_id: &str) -> Vec<HexCoord> {
        let Some(unit) = self.unit(unit_id) else {
            return Vec::new();
        };
        let movement = calculate_effective_stats(unit, &self.board, self.turn_number).movement;
        unit.position
            .hexes_in_range(movement)
            .into_iter()
            .filter(|hex| self.validate_move(unit, *hex).is_ok())
            .collect()
    }

    /// Ids of units the attacker can attack this turn
    pub fn valid_attack_targets(&self, attacker_id: &str) -> Vec<String> {
        let Some(attacker) = self.unit(attacker_id) else {
            return Vec::new();
        };
        self.units
            .iter()
            .filter(|target| self.validate_attack(attacker, target).is_ok())
            .map(|target| target.id.clone())
            .collect()
    }

    /// Ids of units the card in `card_index` can be cast on by `caster_id`
    pub fn valid_card_targets(&self, card_index: usize, caster_id: &str) -> Vec<String> {
        let Some(caster) = self.unit(caster_id) else {
            return Vec::new();
        };
        let Some(card) = self.hand(caster.team).get(card_index) else {
            return Vec::new();
        };
        self.units
            .iter()
            .filter(|target| self.validate_cast(card, caster, target).is_ok())
            .map(|target| target.id.clone())
            .collect()
    }

    /// Every board hex with plateau ownership
    pub fn board_tiles(&self) -> Vec<BoardTile> {
        self.board.tiles()
    }
}

#[cfg(test)]
mod tests {
    use crate::cards::{Card, CardRarity, CardType};
    use crate::game::{GamePhase, GameState};
    use crate::hex::HexCoord;
    use crate::units::{Team, Unit, UnitType};
    use pretty_assertions::assert_eq;

    fn battle(units: Vec<Unit>) -> GameState {
        let mut game = GameState::with_seed(11);
        game.phase = GamePhase::Play;
        game.units = units;
        game
    }

    fn unit(id: &str, unit_type: UnitType, team: Team, q: i32, r: i32) -> Unit {
        Unit::new(id, unit_type, team, HexCoord::new(q, r))
    }

    #[test]
    fn test_setup_hides_enemy_units() {
        let mut game = battle(vec![
            unit("mine", UnitType::Brute, Team::Player1, 4, 2),
            unit("theirs", UnitType::Brute, Team::Player2, 4, 6),
        ]);
        game.phase = GamePhase::SetupPlayer1;
        let ids: Vec<&str> = game
            .visible_units(Team::Player1)
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(ids, vec!["mine"]);

        game.phase = GamePhase::Play;
        assert_eq!(game.visible_units(Team::Player1).len(), 2);
    }

    #[test]
    fn test_valid_moves_exclude_enemies() {
        let game = battle(vec![
            unit("b", UnitType::Brute, Team::Player1, 4, 4),
            unit("e", UnitType::Brute, Team::Player2, 4, 5),
            unit("m", UnitType::Mage, Team::Player1, 5, 4),
        ]);
        let moves = game.valid_moves("b");

        assert_eq!(moves.len(), 5);
        assert!(!moves.contains(&HexCoord::new(4, 5)));
        // Friendly hex is a swap
        assert!(moves.contains(&HexCoord::new(5, 4)));
        assert!(!moves.contains(&HexCoord::new(4, 4)));
    }

    #[test]
    fn test_no_moves_for_other_player() {
        let game = battle(vec![unit("e", UnitType::Brute, Team::Player2, 4, 5)]);
        assert!(game.valid_moves("e").is_empty());
        assert!(game.valid_moves("missing").is_empty());
    }

    #[test]
    fn test_attack_targets_within_range() {
        let game = battle(vec![
            unit("a", UnitType::Archer, Team::Player1, 4, 4),
            unit("near", UnitType::Brute, Team::Player2, 4, 5),
            unit("flag", UnitType::Flag, Team::Player2, 4, 6),
            unit("far", UnitType::Brute, Team::Player2, 4, 8),
        ]);
        assert_eq!(game.valid_attack_targets("a"), vec!["near".to_string()]);
    }

    #[test]
    fn test_card_targets_follow_card_type() {
        let mut game = battle(vec![
            unit("m", UnitType::Mage, Team::Player1, 4, 3),
            unit("b", UnitType::Brute, Team::Player1, 4, 4),
            unit("e", UnitType::Brute, Team::Player2, 4, 5),
        ]);
        game.hands[0] = vec![Card::new(
            "Transfusion",
            CardType::Buff,
            CardRarity::Common,
            "Heal target unit plus 2 HP",
        )];

        let mut targets = game.valid_card_targets(0, "m");
        targets.sort();
        assert_eq!(targets, vec!["b".to_string(), "m".to_string()]);
        assert!(game.valid_card_targets(3, "m").is_empty());
    }

    #[test]
    fn test_unit_views_fold_plateau_bonus() {
        let mut game = battle(vec![unit("a", UnitType::Archer, Team::Player1, 4, 3)]);
        game.board.add_plateau(HexCoord::new(4, 3), Team::Player1);

        let views = game.unit_views();
        assert!(views[0].on_plateau);
        assert_eq!(views[0].effective.attack, 3);
        assert_eq!(views[0].effective.damage_reduction, 1);
        assert_eq!(game.board_tiles().len(), 61);
    }
}
