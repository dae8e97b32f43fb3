//! Bannerfall - a two-player hex tactics game engine
//!
//! This crate provides the core rules for Bannerfall, including:
//! - Hex coordinate system and pathing
//! - Board layout, deployment zones and plateau terrain
//! - Unit definitions, cards and the effect lifecycle
//! - Game state machine with full rule enforcement
//!
//! # Architecture
//!
//! The engine is a pure reducer: [`GameState::reduce`] takes a snapshot and
//! an action and returns the next snapshot. It can be compiled to:
//! - Native Rust for server-side match hosting
//! - WebAssembly for local hot-seat play in the browser
//!
//! # Modules
//!
//! - [`hex`]: Offset hex coordinates, distance and pathing
//! - [`board`]: Board shape, deployment zones and plateaus
//! - [`units`]: Unit types, base stats and per-turn flags
//! - [`cards`]: Card definitions and the deck
//! - [`effects`]: Effects, effective stats and turn-boundary cleanup
//! - [`rules`]: Card legality and resolution
//! - [`combat`]: Movement and attack resolution
//! - [`game`]: Game state machine
//! - [`view`]: Read-only projections for clients

pub mod actions;
pub mod board;
pub mod cards;
pub mod combat;
pub mod effects;
pub mod game;
pub mod hex;
pub mod log;
pub mod rules;
pub mod units;
pub mod view;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{Board, BoardTile, PlateauTile};
pub use cards::{Card, CardRarity, CardRow, CardType, Deck, DeckError};
pub use combat::compute_damage;
pub use effects::{calculate_effective_stats, Effect, EffectDuration, EffectKind, EffectiveStats};
pub use game::{GameError, GamePhase, GameState};
pub use hex::HexCoord;
pub use log::{GameLogEntry, GameLogKind};
pub use units::{Team, Unit, UnitType};
pub use view::UnitView;
