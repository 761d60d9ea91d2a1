//! Deterministic turn-based grid combat between two teams.
//!
//! This crate provides:
//! - Seeded dice and a replayable turn loop
//! - Class, race and level riders for fighters built from loose JSON
//! - Targeting policies with pluggable coach-style biases
//! - An event log that serializes to identical bytes for identical inputs
//!
//! # Quick Start
//!
//! ```ignore
//! use arena_core::{roster_from_json, CombatConfig, CombatSession, Side, Team};
//!
//! fn main() -> Result<(), arena_core::CombatError> {
//!     let roster = roster_from_json(r#"[
//!         {"id": 1, "name": "Brakka", "team": 0, "class": "Barbarian", "level": 3},
//!         {"id": 2, "name": "Ilse", "team": 1, "class": "Wizard", "spell": "Fire Bolt"}
//!     ]"#)?;
//!     let teams = [Team::new("Red", Side::Home), Team::new("Blue", Side::Away)];
//!     let config = CombatConfig::new(12, 8).with_seed(42u64);
//!
//!     let mut session = CombatSession::new(teams, roster, config)?;
//!     while !session.is_finished() {
//!         session.advance();
//!     }
//!     println!("{:?}", session.winner());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod classes;
pub mod combat;
pub mod conditions;
pub mod config;
pub mod dice;
pub mod driver;
pub mod error;
pub mod events;
pub mod fighter;
pub mod grid;
pub mod items;
pub mod opposition;
pub mod targeting;
pub mod testing;
pub mod xp;

// Primary public API
pub use builder::{fighter_from_value, roster_from_json, FighterBuilder};
pub use classes::{CharacterClass, FightingStyle, Race};
pub use combat::spell::SpellEffect;
pub use combat::{CombatId, CombatPhase, CombatSession, FighterResult, Team};
pub use conditions::Condition;
pub use config::{CombatConfig, TurnEconomy};
pub use dice::{DiceExpression, DiceRng, Seed};
pub use driver::{run_to_completion, simulate, simulate_many, Matchup, SimulationReport};
pub use error::CombatError;
pub use events::{CombatEvent, EventKind, EventLog, Winner};
pub use fighter::{Ability, DamageType, Fighter, FighterId, Side, Weapon};
pub use grid::{Grid, Position};
pub use opposition::{Directive, OppositionInstruction};
pub use targeting::{SharedBias, TargetBias, TargetPolicy, TargetRule};
