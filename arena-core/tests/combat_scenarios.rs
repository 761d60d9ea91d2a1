//! End-to-end combat scenarios driven through the public API.
//!
//! Run with: `cargo test -p arena-core --test combat_scenarios`

use arena_core::combat::Team;
use arena_core::conditions::ImmunityReason;
use arena_core::testing::{duel, fighter, run_to_end, stick, teams};
use arena_core::xp::{challenge_value, scaled_share, split_award, DevTrait};
use arena_core::{
    roster_from_json, Ability, CombatConfig, CombatEvent, CombatSession, Condition, DamageType,
    EventKind, FighterBuilder, FighterId, Position, Race, Side, SpellEffect, Weapon, Winner,
};

fn attacks_by<'a>(events: &'a [CombatEvent], name: &'a str) -> impl Iterator<Item = &'a CombatEvent> {
    events
        .iter()
        .filter(move |e| matches!(e, CombatEvent::Attack { attacker, .. } if attacker == name))
}

// =============================================================================
// Knockout
// =============================================================================

#[test]
fn test_single_attacker_knockout() {
    let mut hero = fighter(1, "Hero", Side::Home);
    hero.equipment.main_hand = stick();
    let mut mook = fighter(2, "Mook", Side::Away);
    mook.set_hp(1);
    mook.ac = 1;
    let mut session = duel(hero, mook, 2);

    let events = session.advance().to_vec();
    let attack = events
        .iter()
        .position(|e| matches!(e, CombatEvent::Attack { hit: true, .. }))
        .expect("attack should land");
    assert!(matches!(
        events[attack + 1],
        CombatEvent::Damage { amount: 1, hp_after: 0, .. }
    ));
    assert!(matches!(events[attack + 2], CombatEvent::Down { .. }));

    let mook = session.fighter(FighterId(2)).unwrap();
    assert!(!mook.is_alive());
    assert_eq!(mook.hp(), 0);
    assert_eq!(session.winner(), Some(Winner::Side(Side::Home)));
}

// =============================================================================
// Turn order
// =============================================================================

#[test]
fn test_round_two_starts_after_everyone_acts() {
    let roster = vec![fighter(1, "A", Side::Home), fighter(2, "B", Side::Away)];
    let config = CombatConfig::new(12, 3).with_seed(11u64);
    let mut session = CombatSession::new(teams(), roster, config).unwrap();

    session.advance();
    assert_eq!(session.events().count(EventKind::RoundStart), 1);
    let second = session.advance().to_vec();
    assert!(second
        .iter()
        .any(|e| matches!(e, CombatEvent::RoundStart { round: 2, .. })));
    assert_eq!(session.round(), 2);
}

#[test]
fn test_movement_closes_distance_in_two_turns() {
    let mut runner = fighter(1, "Runner", Side::Home);
    runner.speed = 4;
    runner.spawn = Some(Position::new(0, 0));
    let mut post = fighter(2, "Post", Side::Away);
    post.speed = 0;
    post.spawn = Some(Position::new(5, 0));
    post.set_max_hp(50);
    post.set_hp(50);
    let mut session = duel(runner, post, 6);

    let first = session.advance().to_vec();
    assert_eq!(first.iter().filter(|e| e.kind() == EventKind::Move).count(), 4);
    assert_eq!(attacks_by(&first, "Runner").count(), 0);
    assert_eq!(
        session.fighter(FighterId(1)).unwrap().position,
        Position::new(4, 0)
    );

    // Post swings back from its tile.
    session.advance();

    let second = session.advance().to_vec();
    assert!(!second.iter().any(|e| e.kind() == EventKind::Move));
    assert_eq!(attacks_by(&second, "Runner").count(), 1);
}

#[test]
fn test_boxed_in_fighter_is_blocked() {
    let mut runner = fighter(1, "Runner", Side::Home);
    runner.spawn = Some(Position::new(0, 0));
    let mut wall = fighter(2, "Wall", Side::Home);
    wall.spawn = Some(Position::new(1, 0));
    let mut foe = fighter(3, "Foe", Side::Away);
    foe.spawn = Some(Position::new(4, 0));
    let config = CombatConfig::new(5, 1)
        .with_initiative_order(vec![FighterId(1), FighterId(2), FighterId(3)]);
    let mut session = CombatSession::new(teams(), vec![runner, wall, foe], config).unwrap();

    let events = session.advance().to_vec();
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::Blocked { actor, to, by }
            if actor == "Runner" && *to == Position::new(1, 0) && by == "Wall"
    )));
    assert!(!events.iter().any(|e| e.kind() == EventKind::Move));
    assert_eq!(
        session.fighter(FighterId(1)).unwrap().position,
        Position::new(0, 0)
    );
}

// =============================================================================
// Spells
// =============================================================================

#[test]
fn test_area_spell_spares_caster_but_not_allies() {
    let thunderwave = SpellEffect::named("Thunderwave").unwrap();
    let sage = FighterBuilder::new(1, "Sage", Side::Home)
        .spell(thunderwave)
        .spawn(0, 0)
        .build();
    let squire = FighterBuilder::new(2, "Squire", Side::Home)
        .hp(100)
        .spawn(1, 1)
        .build();
    let ogre = FighterBuilder::new(3, "Ogre", Side::Away)
        .hp(100)
        .spawn(1, 0)
        .build();
    let config = CombatConfig::new(4, 2)
        .with_seed(3u64)
        .with_initiative_order(vec![FighterId(1), FighterId(2), FighterId(3)]);
    let mut session = CombatSession::new(teams(), vec![sage, squire, ogre], config).unwrap();

    let events = session.advance().to_vec();
    assert_eq!(events.iter().filter(|e| e.kind() == EventKind::SpellCast).count(), 1);
    let damaged: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::Damage { target, .. } => Some(target.as_str()),
            _ => None,
        })
        .collect();
    assert!(!damaged.contains(&"Sage"));
    assert!(damaged.contains(&"Ogre"));
    assert!(damaged.contains(&"Squire"));

    let sage = session.fighter(FighterId(1)).unwrap();
    assert_eq!(sage.hp(), sage.max_hp());
}

// =============================================================================
// Conditions
// =============================================================================

#[test]
fn test_sleep_immune_fighter_ignores_sleep() {
    let slumber = SpellEffect::save("Slumber", "0", DamageType::Psychic, 12, Ability::Wisdom)
        .no_half()
        .with_condition(Condition::Asleep, 2);
    let caster = FighterBuilder::new(1, "Mesmer", Side::Home)
        .level(20)
        .ability(Ability::Intelligence, 30)
        .spell(slumber)
        .spawn(0, 0)
        .build();
    let elf = FighterBuilder::new(2, "Lirael", Side::Away)
        .race(Race::HighElf)
        .ability(Ability::Wisdom, 1)
        .spawn(3, 0)
        .build();
    let mut session = duel(caster, elf, 6);

    let events = session.advance().to_vec();
    assert!(events
        .iter()
        .any(|e| matches!(e, CombatEvent::Save { success: false, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::ConditionIgnored {
            condition: Condition::Asleep,
            reason: ImmunityReason::Immune,
            ..
        }
    )));
    assert!(session.fighter(FighterId(2)).unwrap().conditions.is_empty());
}

// =============================================================================
// Damage
// =============================================================================

#[test]
fn test_no_proficiency_on_damage() {
    let veteran = FighterBuilder::new(1, "Veteran", Side::Home)
        .level(9)
        .hp(100)
        .weapon(stick())
        .build();
    assert_eq!(veteran.proficiency_bonus(), 4);
    let dummy = FighterBuilder::new(2, "Dummy", Side::Away)
        .ac(0)
        .hp(40)
        .build();
    let mut session = duel(veteran, dummy, 2);

    for _ in 0..6 {
        session.advance();
    }
    let mut seen = 0;
    for event in session.events().iter() {
        if let CombatEvent::Damage {
            attacker,
            amount,
            critical,
            ..
        } = event
        {
            if attacker == "Veteran" {
                assert_eq!(*amount, if *critical { 2 } else { 1 });
                seen += 1;
            }
        }
    }
    assert!(seen >= 3);
}

#[test]
fn test_raging_barbarian_halves_physical_damage() {
    let brute = FighterBuilder::new(1, "Brute", Side::Home)
        .weapon(Weapon::melee("Maul", "1d1+5", DamageType::Bludgeoning))
        .build();
    let barbarian = FighterBuilder::new(2, "Grom", Side::Away)
        .class(arena_core::CharacterClass::Barbarian)
        .ac(0)
        .build();
    assert!(barbarian.traits.raging);
    let mut session = duel(brute, barbarian, 2);

    let events = session.advance().to_vec();
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::Damage { target, amount: 3, .. } if target == "Grom"
    )));
}

// =============================================================================
// Experience
// =============================================================================

#[test]
fn test_shared_kill_splits_xp_by_multiplier() {
    let mut prodigy = fighter(1, "Prodigy", Side::Home);
    prodigy.equipment.main_hand = stick();
    prodigy.spawn = Some(Position::new(0, 0));
    prodigy.age = 20;
    prodigy.dev_trait = DevTrait::Star;
    let mut veteran = fighter(2, "Veteran", Side::Home);
    veteran.equipment.main_hand = stick();
    veteran.spawn = Some(Position::new(2, 0));
    veteran.age = 40;
    veteran.dev_trait = DevTrait::Slow;
    let mut victim = fighter(3, "Victim", Side::Away);
    victim.spawn = Some(Position::new(1, 0));
    victim.set_max_hp(3);
    victim.set_hp(3);
    victim.ac = 0;
    victim.rating = 60;
    let config = CombatConfig::new(3, 1)
        .with_initiative_order(vec![FighterId(1), FighterId(2), FighterId(3)]);
    let mut session = CombatSession::new(teams(), vec![prodigy, veteran, victim], config).unwrap();

    assert_eq!(run_to_end(&mut session), Winner::Side(Side::Home));

    let share = split_award(challenge_value(60), 2);
    assert_eq!(share, 100);
    let mut paid = Vec::new();
    for event in session.events().iter() {
        if let CombatEvent::XpGained { fighter, amount, from } = event {
            assert_eq!(from, "Victim");
            paid.push((fighter.clone(), *amount));
        }
    }
    paid.sort();
    let expected = |id: u32| scaled_share(share, session.fighter(FighterId(id)).unwrap());
    assert_eq!(
        paid,
        vec![
            ("Prodigy".to_string(), expected(1)),
            ("Veteran".to_string(), expected(2)),
        ]
    );
    assert_eq!(expected(1), 187);
    assert_eq!(expected(2), 56);
}

// =============================================================================
// Determinism
// =============================================================================

const ROSTER: &str = r#"[
    {"id": 1, "name": "Brakka", "team": 0, "class": "Barbarian", "level": 4},
    {"id": 2, "name": "Sable", "team": 0, "class": "Rogue", "level": 5, "DEX": 17},
    {"id": 3, "name": "Ilse", "team": 1, "class": "Wizard", "level": 5, "spell": "Fire Bolt"},
    {"id": 4, "name": "Tomas", "team": 1, "class": "Paladin", "level": 6, "tactic": "lowest_hp"}
]"#;

fn seeded_session(seed: u64) -> CombatSession {
    let teams = [
        Team::new("Red", Side::Home),
        Team::new("Blue", Side::Away).with_color(20, 20, 220),
    ];
    let config = CombatConfig::new(10, 6).with_seed(seed);
    CombatSession::new(teams, roster_from_json(ROSTER).unwrap(), config).unwrap()
}

#[test]
fn test_same_seed_same_log() {
    let mut a = seeded_session(2024);
    let mut b = seeded_session(2024);
    let winner_a = run_to_end(&mut a);
    let winner_b = run_to_end(&mut b);

    assert_eq!(winner_a, winner_b);
    assert_eq!(a.events().to_json().unwrap(), b.events().to_json().unwrap());
    assert_eq!(a.results(), b.results());
}

#[test]
fn test_text_seeds_are_stable() {
    let config = || CombatConfig::new(10, 6).with_seed("grand final");
    let run = |config: CombatConfig| {
        let mut session =
            CombatSession::new(teams(), roster_from_json(ROSTER).unwrap(), config).unwrap();
        run_to_end(&mut session);
        session.events().to_json().unwrap()
    };
    assert_eq!(run(config()), run(config()));
}

#[test]
fn test_finished_session_is_frozen() {
    let mut session = seeded_session(5);
    let winner = run_to_end(&mut session);
    let len = session.events().len();
    for _ in 0..3 {
        assert!(session.advance().is_empty());
    }
    assert_eq!(session.events().len(), len);
    assert_eq!(session.winner(), Some(winner));
    assert!(matches!(
        session.events().last(),
        Some(CombatEvent::End { .. })
    ));
}
