//! WebAssembly bindings for the Bannerfall engine.
//!
//! This module exposes the game engine to JavaScript through wasm-bindgen.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::game::GameState;
use crate::units::Team;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn team_from_js(player: u8) -> Result<Team, JsValue> {
    match player {
        1 => Ok(Team::Player1),
        2 => Ok(Team::Player2),
        other => Err(JsValue::from_str(&format!("Unknown player {other}"))),
    }
}

fn to_json<T: serde::Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game with a random seed
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmGame {
        WasmGame {
            state: GameState::new(),
        }
    }

    /// Create a new game with reproducible card draws
    #[wasm_bindgen(js_name = withSeed)]
    pub fn with_seed(seed: u64) -> WasmGame {
        WasmGame {
            state: GameState::with_seed(seed),
        }
    }

    /// Restore a game from a snapshot
    #[wasm_bindgen(js_name = fromSnapshot)]
    pub fn from_snapshot(json: &str) -> Result<WasmGame, JsValue> {
        let state = GameState::from_json(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid snapshot: {}", e)))?;
        Ok(WasmGame { state })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        to_json(&self.state, "{}")
    }

    /// Current player as 1 or 2
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player.index() as u8 + 1
    }

    /// Apply an action from JSON, returns events JSON or the rejection reason
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let team = team_from_js(player)?;
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(team, action) {
            Ok(events) => Ok(to_json(&events, "[]")),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winner (if game is finished) as 1 or 2
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.state.winner().map(|team| team.index() as u8 + 1)
    }

    /// Get the current phase as JSON
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        to_json(&self.state.phase, "\"Unknown\"")
    }

    /// Board tiles with plateau ownership
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> String {
        to_json(&self.state.board_tiles(), "[]")
    }

    /// Units the player may see, with effective stats
    #[wasm_bindgen(js_name = getUnits)]
    pub fn get_units(&self, player: u8) -> Result<String, JsValue> {
        let team = team_from_js(player)?;
        let visible: Vec<_> = self
            .state
            .unit_views()
            .into_iter()
            .filter(|view| self.state.visible_units(team).iter().any(|u| u.id == view.unit.id))
            .collect();
        Ok(to_json(&visible, "[]"))
    }

    /// A player's hand as JSON
    #[wasm_bindgen(js_name = getHand)]
    pub fn get_hand(&self, player: u8) -> Result<String, JsValue> {
        let team = team_from_js(player)?;
        Ok(to_json(&self.state.hand(team), "[]"))
    }

    /// The match log as JSON
    #[wasm_bindgen(js_name = getLog)]
    pub fn get_log(&self) -> String {
        to_json(&self.state.log.entries(), "[]")
    }

    #[wasm_bindgen(js_name = getValidMoves)]
    pub fn get_valid_moves(&self, unit_id: &str) -> String {
        to_json(&self.state.valid_moves(unit_id), "[]")
    }

    #[wasm_bindgen(js_name = getValidAttackTargets)]
    pub fn get_valid_attack_targets(&self, unit_id: &str) -> String {
        to_json(&self.state.valid_attack_targets(unit_id), "[]")
    }

    #[wasm_bindgen(js_name = getValidCardTargets)]
    pub fn get_valid_card_targets(&self, card_index: usize, caster_id: &str) -> String {
        to_json(&self.state.valid_card_targets(card_index, caster_id), "[]")
    }
}
