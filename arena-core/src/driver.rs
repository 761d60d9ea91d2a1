//! Running sessions to the end.
//!
//! [`run_to_completion`] drives one session under a step budget;
//! [`simulate_many`] runs independent matchups side by side, one scoped
//! thread per matchup. Sessions share nothing, so the batch result is the
//! same as running each matchup alone.

use crate::combat::{CombatSession, FighterResult, Team};
use crate::config::CombatConfig;
use crate::error::CombatError;
use crate::events::{EventLog, Winner};
use crate::fighter::Fighter;
use serde::{Deserialize, Serialize};

/// Steps allowed when a caller has no better budget in mind.
pub const DEFAULT_STEP_BUDGET: usize = 10_000;

/// Everything needed to start one combat.
#[derive(Debug, Clone)]
pub struct Matchup {
    pub teams: [Team; 2],
    pub fighters: Vec<Fighter>,
    pub config: CombatConfig,
}

impl Matchup {
    pub fn new(teams: [Team; 2], fighters: Vec<Fighter>, config: CombatConfig) -> Self {
        Self {
            teams,
            fighters,
            config,
        }
    }
}

/// Summary of a driven session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub winner: Option<Winner>,
    /// False when the step budget ran out first.
    pub finished: bool,
    pub rounds: u32,
    pub steps: usize,
    pub results: Vec<FighterResult>,
    pub events: EventLog,
}

/// Call `advance()` until the session finishes or `max_steps` calls have
/// been made. Returns the number of calls.
pub fn run_to_completion(session: &mut CombatSession, max_steps: usize) -> usize {
    let mut steps = 0;
    while !session.is_finished() && steps < max_steps {
        session.advance();
        steps += 1;
    }
    if !session.is_finished() {
        tracing::warn!(
            combat = %session.id(),
            steps,
            round = session.round(),
            "step budget exhausted before the combat ended"
        );
    }
    steps
}

/// Build and drive one matchup.
pub fn simulate(matchup: Matchup, max_steps: usize) -> Result<SimulationReport, CombatError> {
    let Matchup {
        teams,
        fighters,
        config,
    } = matchup;
    let mut session = CombatSession::new(teams, fighters, config)?;
    let steps = run_to_completion(&mut session, max_steps);
    Ok(SimulationReport {
        winner: session.winner(),
        finished: session.is_finished(),
        rounds: session.round(),
        steps,
        results: session.results(),
        events: session.events().clone(),
    })
}

/// Drive every matchup on its own scoped thread. Reports come back in input
/// order; a matchup that fails validation yields its error without
/// affecting the others.
pub fn simulate_many(
    matchups: Vec<Matchup>,
    max_steps: usize,
) -> Vec<Result<SimulationReport, CombatError>> {
    tracing::info!(count = matchups.len(), max_steps, "simulating batch");
    std::thread::scope(|scope| {
        let handles: Vec<_> = matchups
            .into_iter()
            .map(|matchup| scope.spawn(move || simulate(matchup, max_steps)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(report) => report,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::{FighterId, Side};

    fn matchup(seed: u64) -> Matchup {
        let mut a = Fighter::new(FighterId(1), "A", Side::Home);
        a.set_max_hp(20);
        a.set_hp(20);
        let mut b = Fighter::new(FighterId(2), "B", Side::Away);
        b.set_max_hp(20);
        b.set_hp(20);
        Matchup::new(
            [Team::new("Red", Side::Home), Team::new("Blue", Side::Away)],
            vec![a, b],
            CombatConfig::new(6, 3).with_seed(seed),
        )
    }

    #[test]
    fn test_run_to_completion_respects_budget() {
        let Matchup {
            teams,
            fighters,
            config,
        } = matchup(7);
        let mut session = CombatSession::new(teams, fighters, config).unwrap();
        assert_eq!(run_to_completion(&mut session, 1), 1);
        assert!(!session.is_finished());
        let more = run_to_completion(&mut session, DEFAULT_STEP_BUDGET);
        assert!(more < DEFAULT_STEP_BUDGET);
        assert!(session.is_finished());
        assert_eq!(run_to_completion(&mut session, 5), 0);
    }

    #[test]
    fn test_batch_matches_single_runs() {
        let batch = simulate_many(vec![matchup(1), matchup(2), matchup(1)], DEFAULT_STEP_BUDGET);
        let single = simulate(matchup(2), DEFAULT_STEP_BUDGET).unwrap();

        assert_eq!(batch.len(), 3);
        let reports: Vec<_> = batch.into_iter().map(Result::unwrap).collect();
        assert!(reports.iter().all(|r| r.finished && r.winner.is_some()));
        assert_eq!(reports[1], single);
        assert_eq!(reports[0].events, reports[2].events);
    }

    #[test]
    fn test_batch_keeps_errors_in_place() {
        let mut bad = matchup(1);
        bad.fighters.pop();
        let batch = simulate_many(vec![matchup(3), bad], 100);
        assert!(batch[0].is_ok());
        assert!(matches!(
            batch[1],
            Err(CombatError::NotEnoughFighters { count: 1 })
        ));
    }
}
