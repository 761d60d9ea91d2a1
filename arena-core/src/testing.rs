//! Fixtures for tests and benchmarks.
//!
//! - [`fighter`] for a plain level-1 combatant
//! - [`duel`] for a two-fighter session with a scripted turn order
//! - [`run_to_end`] to drive a session until it finishes

use crate::combat::{CombatSession, Team};
use crate::config::CombatConfig;
use crate::driver::{run_to_completion, DEFAULT_STEP_BUDGET};
use crate::events::Winner;
use crate::fighter::{DamageType, Fighter, FighterId, Side, Weapon};

/// A level-1 fighter with 10 in every ability, 10 HP, AC 10 and fists.
pub fn fighter(id: u32, name: &str, side: Side) -> Fighter {
    Fighter::new(FighterId(id), name, side)
}

/// A weapon that always deals exactly 1 damage before modifiers.
pub fn stick() -> Weapon {
    Weapon::melee("Stick", "1d1", DamageType::Bludgeoning)
}

/// Red (home) and Blue (away).
pub fn teams() -> [Team; 2] {
    [Team::new("Red", Side::Home), Team::new("Blue", Side::Away)]
}

/// Start a one-on-one on a board just wide enough for both, with `home`
/// acting first every round.
///
/// Panics if either fighter is on the wrong side.
pub fn duel(home: Fighter, away: Fighter, width: u32) -> CombatSession {
    assert_eq!(home.side, Side::Home, "home fighter must be on the home side");
    assert_eq!(away.side, Side::Away, "away fighter must be on the away side");
    let order = vec![home.id, away.id];
    let config = CombatConfig::new(width.max(2), 1).with_initiative_order(order);
    match CombatSession::new(teams(), vec![home, away], config) {
        Ok(session) => session,
        Err(err) => panic!("duel setup failed: {err}"),
    }
}

/// Drive `session` to the end and return the winner.
///
/// Panics if the combat outlasts the default step budget.
pub fn run_to_end(session: &mut CombatSession) -> Winner {
    run_to_completion(session, DEFAULT_STEP_BUDGET);
    match session.winner() {
        Some(winner) => winner,
        None => panic!(
            "combat still running after {DEFAULT_STEP_BUDGET} steps (round {})",
            session.round()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duel_runs_to_a_winner() {
        let mut hero = fighter(1, "Hero", Side::Home);
        hero.equipment.main_hand = stick();
        hero.set_max_hp(100);
        hero.set_hp(100);
        let mut mook = fighter(2, "Mook", Side::Away);
        mook.set_hp(1);
        let mut session = duel(hero, mook, 2);
        assert_eq!(session.initiative_order(), vec![FighterId(1), FighterId(2)]);
        assert_eq!(run_to_end(&mut session), Winner::Side(Side::Home));
    }
}
