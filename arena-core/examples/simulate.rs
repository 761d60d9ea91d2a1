//! Run a seeded 3v3 arena match and print the play-by-play.
//!
//! Usage: `RUST_LOG=arena_core=debug cargo run -p arena-core --example simulate -- [seed]`

use arena_core::opposition::{Directive, OppositionInstruction, OppositionTarget};
use arena_core::{
    roster_from_json, CombatConfig, CombatEvent, CombatSession, Side, Team, TurnEconomy,
};
use std::sync::Arc;

const ROSTER: &str = r#"[
    {"id": 1, "name": "Brakka", "team": 0, "class": "Barbarian", "race": "Dwarf", "level": 5, "role": "Tank"},
    {"id": 2, "name": "Sable", "team": 0, "class": "Rogue", "level": 5, "DEX": 17, "age": 21},
    {"id": 3, "name": "Orin", "team": 0, "class": "Cleric", "level": 4, "spell": "Guiding Bolt", "role": "Healer"},
    {"id": 4, "name": "Ilse", "team": 1, "class": "Wizard", "level": 6, "spell": "Fireball", "role": "Caster"},
    {"id": 5, "name": "Tomas", "team": 1, "class": "Paladin", "level": 6, "weapon": "Longsword", "shield_bonus": 2},
    {"id": 6, "name": "Kesh", "team": 1, "class": "Monk", "race": "Lizardkin", "level": 5, "tactic": "lowest_hp"}
]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 7,
    };

    let focus_healer = OppositionInstruction::new(
        OppositionTarget::Role("Healer".into()),
        vec![Directive::FocusFire],
        2,
    );
    let config = CombatConfig::new(12, 8)
        .with_seed(seed)
        .with_turn_economy(TurnEconomy::MoveThenAttack)
        .with_bias(Side::Away, Arc::new(focus_healer));
    let teams = [
        Team::new("Iron Wolves", Side::Home),
        Team::new("Storm Crows", Side::Away),
    ];

    let mut session = CombatSession::new(teams, roster_from_json(ROSTER)?, config)?;
    println!("=== {} vs {} (seed {seed}) ===\n", session.teams()[0].name, session.teams()[1].name);

    let mut steps = 0;
    while !session.is_finished() && steps < arena_core::driver::DEFAULT_STEP_BUDGET {
        for event in session.advance() {
            print_event(event);
        }
        steps += 1;
    }

    println!("\n=== Results ===");
    for r in session.results() {
        println!(
            "{:<8} {:<5} hp {:>3}/{:<3} lvl {:>2} (+{}) xp +{:<4} kills {} dmg {}",
            r.name,
            if r.alive { "up" } else { "down" },
            r.hp,
            r.max_hp,
            r.level,
            r.levels_gained,
            r.xp_gained,
            r.kills,
            r.damage_dealt,
        );
    }
    Ok(())
}

fn print_event(event: &CombatEvent) {
    match event {
        CombatEvent::RoundStart { round, order } => {
            println!("-- Round {round}: {}", order.join(", "));
        }
        CombatEvent::Move { .. } | CombatEvent::Init { .. } | CombatEvent::RoundEnd { .. } => {}
        CombatEvent::Attack {
            attacker,
            defender,
            natural,
            total,
            target_ac,
            hit,
            critical,
            ..
        } => {
            let verdict = match (hit, critical) {
                (true, true) => "CRITS",
                (true, false) => "hits",
                _ => "misses",
            };
            println!("   {attacker} {verdict} {defender} ({natural} -> {total} vs AC {target_ac})");
        }
        CombatEvent::Damage {
            target,
            amount,
            damage_type,
            hp_after,
            ..
        } => println!("      {amount} {damage_type} to {target} ({hp_after} left)"),
        CombatEvent::Down { fighter, by, .. } => println!("   ** {fighter} is down ({by})"),
        CombatEvent::End { winner, round, .. } => println!("\nFinished in round {round}: {winner:?}"),
        other => println!("   {other:?}"),
    }
}
