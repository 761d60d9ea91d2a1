//! Errors raised while setting up a combat.
//!
//! Once a session exists nothing in it fails: bad data falls back to
//! defaults and broken invariants are clamped where they are written.

use crate::fighter::{FighterId, Side};
use thiserror::Error;

/// Errors from building a combat session or its roster.
#[derive(Debug, Error)]
pub enum CombatError {
    #[error("A combat needs at least 2 fighters, got {count}")]
    NotEnoughFighters { count: usize },

    #[error("No fighters on {0}")]
    MissingSide(Side),

    #[error("Duplicate fighter id {0}")]
    DuplicateFighter(FighterId),

    #[error("Grid {width}x{height} is too small for {fighters} fighters")]
    GridTooSmall {
        width: u32,
        height: u32,
        fighters: usize,
    },

    #[error("Fighter descriptor error: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("Roster must be a JSON array of fighter objects: {0}")]
    RosterShape(String),
}
