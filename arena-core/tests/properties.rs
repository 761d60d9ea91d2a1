//! Property tests over whole combats and the pure rule tables.

use arena_core::fighter::proficiency_for_level;
use arena_core::testing::teams;
use arena_core::xp::{scaled_share, split_award};
use arena_core::{
    CharacterClass, CombatConfig, CombatSession, Fighter, FighterBuilder, Side, Winner,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const CLASSES: [CharacterClass; 6] = [
    CharacterClass::Barbarian,
    CharacterClass::Fighter,
    CharacterClass::Monk,
    CharacterClass::Paladin,
    CharacterClass::Rogue,
    CharacterClass::Wizard,
];

fn arb_fighter(id: u32, side: Side) -> impl Strategy<Value = Fighter> {
    (0..CLASSES.len(), 1u8..=12, 3u32..=7).prop_map(move |(class, level, speed)| {
        FighterBuilder::new(id, format!("F{id}"), side)
            .class(CLASSES[class])
            .level(level)
            .speed(speed)
            .build()
    })
}

fn arb_inputs() -> impl Strategy<Value = (Vec<Fighter>, CombatConfig)> {
    (
        arb_fighter(1, Side::Home),
        arb_fighter(2, Side::Home),
        arb_fighter(3, Side::Away),
        arb_fighter(4, Side::Away),
        any::<u64>(),
        6u32..=12,
        2u32..=6,
    )
        .prop_map(|(a, b, c, d, seed, width, height)| {
            (vec![a, b, c, d], CombatConfig::new(width, height).with_seed(seed))
        })
}

fn start((fighters, config): (Vec<Fighter>, CombatConfig)) -> CombatSession {
    CombatSession::new(teams(), fighters, config).expect("roster is always valid")
}

fn check_board(session: &CombatSession) -> Result<(), TestCaseError> {
    let mut tiles = BTreeSet::new();
    for f in session.fighters() {
        prop_assert!(f.hp() >= 0 && f.hp() <= f.max_hp(), "{} hp {}/{}", f.name, f.hp(), f.max_hp());
        prop_assert_eq!(f.is_alive(), f.hp() > 0);
        if f.is_alive() {
            prop_assert!(session.grid().in_bounds(f.position));
            prop_assert!(tiles.insert(f.position), "two fighters on {:?}", f.position);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_board_invariants_hold_every_step(inputs in arb_inputs()) {
        let mut session = start(inputs);
        check_board(&session)?;
        let mut winner: Option<Winner> = None;
        for _ in 0..2_000 {
            if session.is_finished() {
                break;
            }
            session.advance();
            check_board(&session)?;
            if let Some(w) = winner {
                prop_assert_eq!(session.winner(), Some(w));
            }
            winner = session.winner();
        }
        if let Some(w) = winner {
            prop_assert!(session.advance().is_empty());
            prop_assert_eq!(session.winner(), Some(w));
        }
    }

    #[test]
    fn prop_replay_is_identical(inputs in arb_inputs()) {
        let mut a = start(inputs.clone());
        let mut b = start(inputs);
        for _ in 0..300 {
            a.advance();
            b.advance();
        }
        prop_assert_eq!(a.events().to_json().unwrap(), b.events().to_json().unwrap());
        prop_assert_eq!(a.results(), b.results());
    }

    #[test]
    fn prop_split_award_conserves_xp(value in 50u32..100_000, contributors in 1usize..8) {
        let share = split_award(value, contributors);
        let total = share as u64 * contributors as u64;
        prop_assert!(total <= value as u64);
        prop_assert!(value as u64 - total < contributors as u64);
    }

    #[test]
    fn prop_single_contributor_gets_everything(value in 1u32..100_000) {
        prop_assert_eq!(split_award(value, 1), value);
    }

    #[test]
    fn prop_share_scales_with_multiplier(share in 0u32..10_000, age in 18u32..45) {
        let mut f = Fighter::new(arena_core::FighterId(1), "F", Side::Home);
        f.age = age;
        let scaled = scaled_share(share, &f);
        let percent = arena_core::xp::xp_multiplier_percent(age, f.dev_trait);
        let expected = (share as u64 * percent / 100).max(share.min(1) as u64);
        prop_assert_eq!(scaled as u64, expected);
        prop_assert!(share == 0 || scaled >= 1);
    }
}

#[test]
fn test_proficiency_is_monotonic_and_bounded() {
    let mut last = 0;
    for level in 1..=20u8 {
        let p = proficiency_for_level(level);
        assert!((2..=6).contains(&p), "level {level}: {p}");
        assert!(p >= last);
        last = p;
    }
}
