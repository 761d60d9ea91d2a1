//! Experience awards and level-up cascades.
//!
//! This is the one place where a match feeds back into character
//! progression: a defeated fighter's challenge value is split between
//! everyone who damaged it, scaled per recipient, and may push recipients
//! across one or more level thresholds.

use crate::classes::{self, ASI_LEVELS};
use crate::fighter::{Ability, Fighter};
use serde::{Deserialize, Serialize};

/// Cumulative XP needed to reach each level (index 0 = level 1).
pub const XP_THRESHOLDS: [u32; 20] = [
    0, 300, 900, 2700, 6500, 14000, 23000, 34000, 48000, 64000, 85000, 100000, 120000, 140000,
    165000, 195000, 225000, 265000, 305000, 355000,
];

/// Most level-ups a single grant may resolve.
pub const MAX_LEVEL_UPS_PER_GRANT: u8 = 10;

/// How quickly a fighter develops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DevTrait {
    Slow,
    #[default]
    Normal,
    Quick,
    Star,
}

impl DevTrait {
    pub fn parse(name: &str) -> Option<DevTrait> {
        match name.trim().to_ascii_lowercase().as_str() {
            "slow" => Some(DevTrait::Slow),
            "normal" | "average" => Some(DevTrait::Normal),
            "quick" | "fast" => Some(DevTrait::Quick),
            "star" | "superstar" => Some(DevTrait::Star),
            _ => None,
        }
    }

    /// Multiplier in percent.
    pub fn percent(&self) -> u64 {
        match self {
            DevTrait::Slow => 75,
            DevTrait::Normal => 100,
            DevTrait::Quick => 125,
            DevTrait::Star => 150,
        }
    }
}

/// Age multiplier in percent; younger fighters learn faster.
pub fn age_percent(age: u32) -> u64 {
    match age {
        0..=21 => 125,
        22..=24 => 110,
        25..=28 => 100,
        29..=32 => 90,
        _ => 75,
    }
}

/// Combined age and development multiplier in percent.
pub fn xp_multiplier_percent(age: u32, dev_trait: DevTrait) -> u64 {
    age_percent(age) * dev_trait.percent() / 100
}

/// XP value of defeating a fighter with the given overall rating.
pub fn challenge_value(rating: u32) -> u32 {
    match rating {
        0..=34 => 50,
        35..=44 => 100,
        45..=54 => 150,
        55..=64 => 200,
        65..=74 => 300,
        75..=84 => 450,
        _ => 600,
    }
}

/// Even share of `value` among `contributors` (floor, at least 1).
pub fn split_award(value: u32, contributors: usize) -> u32 {
    if contributors == 0 {
        return 0;
    }
    (value / contributors as u32).max(1)
}

/// Apply a recipient's multiplier to a raw share. A non-zero share never
/// scales down to nothing.
pub fn scaled_share(share: u32, fighter: &Fighter) -> u32 {
    let scaled = share as u64 * xp_multiplier_percent(fighter.age, fighter.dev_trait) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX).max(share.min(1))
}

/// Level implied by an XP total.
pub fn level_for_xp(xp: u32) -> u8 {
    XP_THRESHOLDS.iter().take_while(|&&t| xp >= t).count() as u8
}

/// What changed on one level-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub level: u8,
    pub hp_gain: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub improved: Vec<Ability>,
}

/// Raise a fighter one level and re-derive everything that depends on it.
pub fn level_up(fighter: &mut Fighter) -> Option<LevelUp> {
    if fighter.level() >= 20 {
        return None;
    }
    let old_uses = fighter
        .class
        .map(|c| c.spell_uses(fighter.level()))
        .unwrap_or(0);

    fighter.bump_level();
    let level = fighter.level();

    let improved = if ASI_LEVELS.contains(&level) {
        classes::apply_ability_improvement(fighter)
    } else {
        Vec::new()
    };

    let con_mod = fighter.modifier(Ability::Constitution);
    let hp_gain = classes::hp_gain_on_level(fighter.class, fighter.race, con_mod);
    fighter.grow(hp_gain);

    classes::refresh_traits(fighter);
    fighter.ac = fighter.ac.max(classes::derive_ac(fighter));

    if let (Some(class), Some(spell)) = (fighter.class, fighter.spell.as_mut()) {
        spell.uses += class.spell_uses(level).saturating_sub(old_uses);
    }

    Some(LevelUp {
        level,
        hp_gain,
        max_hp: fighter.max_hp(),
        ac: fighter.ac,
        improved,
    })
}

/// Add XP and resolve every threshold crossed, up to `max_level_ups`.
pub fn grant_xp(fighter: &mut Fighter, amount: u32, max_level_ups: u8) -> Vec<LevelUp> {
    let cap = XP_THRESHOLDS[XP_THRESHOLDS.len() - 1];
    fighter.xp = fighter.xp.saturating_add(amount).min(cap);

    let mut ups = Vec::new();
    while ups.len() < max_level_ups as usize && fighter.level() < 20 {
        let next = XP_THRESHOLDS[fighter.level() as usize];
        if fighter.xp < next {
            break;
        }
        match level_up(fighter) {
            Some(up) => ups.push(up),
            None => break,
        }
    }
    ups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::CharacterClass;
    use crate::fighter::{FighterId, Side};

    fn recruit() -> Fighter {
        let mut f = Fighter::new(FighterId(1), "Recruit", Side::Home);
        f.class = Some(CharacterClass::Fighter);
        f.abilities.constitution = 14;
        f
    }

    #[test]
    fn test_thresholds_are_increasing() {
        assert!(XP_THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(299), 1);
        assert_eq!(level_for_xp(300), 2);
        assert_eq!(level_for_xp(355000), 20);
    }

    #[test]
    fn test_challenge_value_monotonic() {
        let values: Vec<u32> = (0..=100).map(challenge_value).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_split_floor_min_one() {
        assert_eq!(split_award(150, 1), 150);
        assert_eq!(split_award(150, 4), 37);
        assert_eq!(split_award(2, 5), 1);
        assert_eq!(split_award(100, 0), 0);
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(xp_multiplier_percent(26, DevTrait::Normal), 100);
        assert_eq!(xp_multiplier_percent(20, DevTrait::Star), 187);
        assert_eq!(xp_multiplier_percent(35, DevTrait::Slow), 56);
    }

    #[test]
    fn test_small_share_keeps_floor() {
        let mut f = recruit();
        f.age = 40;
        f.dev_trait = DevTrait::Slow;
        assert_eq!(scaled_share(1, &f), 1);
        assert_eq!(scaled_share(0, &f), 0);
        assert_eq!(scaled_share(100, &f), 56);
    }

    #[test]
    fn test_single_level_up() {
        let mut f = recruit();
        let ups = grant_xp(&mut f, 300, MAX_LEVEL_UPS_PER_GRANT);
        assert_eq!(ups.len(), 1);
        assert_eq!(f.level(), 2);
        // 6 per level + CON 2
        assert_eq!(ups[0].hp_gain, 8);
        assert_eq!(f.max_hp(), 18);
    }

    #[test]
    fn test_cascade_through_several_levels() {
        let mut f = recruit();
        let ups = grant_xp(&mut f, 6500, MAX_LEVEL_UPS_PER_GRANT);
        assert_eq!(ups.iter().map(|u| u.level).collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(f.traits.extra_attacks, 1);
        // level 4 ASI
        assert_eq!(ups[2].improved.len(), 2);
    }

    #[test]
    fn test_level_up_cap_per_grant() {
        let mut f = recruit();
        let ups = grant_xp(&mut f, 1_000_000, MAX_LEVEL_UPS_PER_GRANT);
        assert_eq!(ups.len(), 10);
        assert_eq!(f.level(), 11);
        assert_eq!(f.xp, 355000);
        // the next grant keeps going
        let ups = grant_xp(&mut f, 0, MAX_LEVEL_UPS_PER_GRANT);
        assert_eq!(ups.len(), 9);
        assert_eq!(f.level(), 20);
    }

    #[test]
    fn test_level_up_never_lowers_ac() {
        let mut f = recruit();
        f.ac = 19;
        grant_xp(&mut f, 300, MAX_LEVEL_UPS_PER_GRANT);
        assert_eq!(f.ac, 19);
    }
}
