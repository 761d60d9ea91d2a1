//! Class and race tables consumed by the combat core.
//!
//! The full rulebook lives elsewhere; this module only carries what the
//! engine needs to derive a fighter's passive riders, hit points and armor
//! class at a given level.

use crate::conditions::{Condition, SaveTag};
use crate::dice::DiceExpression;
use crate::fighter::{Ability, DamageType, Fighter, FighterTraits};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    /// Parse a class name. Fighter style names (`Archer`, `Defender`,
    /// `Enforcer`, `Duelist`) resolve to [`CharacterClass::Fighter`] plus the
    /// style; `Crusader` is a paladin.
    pub fn parse(name: &str) -> Option<(CharacterClass, Option<FightingStyle>)> {
        let class = match name.trim().to_ascii_lowercase().as_str() {
            "barbarian" => CharacterClass::Barbarian,
            "bard" => CharacterClass::Bard,
            "cleric" => CharacterClass::Cleric,
            "druid" => CharacterClass::Druid,
            "fighter" => CharacterClass::Fighter,
            "monk" => CharacterClass::Monk,
            "paladin" | "crusader" => CharacterClass::Paladin,
            "ranger" => CharacterClass::Ranger,
            "rogue" => CharacterClass::Rogue,
            "sorcerer" => CharacterClass::Sorcerer,
            "warlock" => CharacterClass::Warlock,
            "wizard" => CharacterClass::Wizard,
            other => {
                let style = FightingStyle::from_class_name(other)?;
                return Some((CharacterClass::Fighter, Some(style)));
            }
        };
        Some((class, None))
    }

    /// Level-1 hit points (before CON) and the fixed per-level increment.
    pub fn hp_table(&self) -> (i32, i32) {
        match self {
            CharacterClass::Barbarian => (12, 7),
            CharacterClass::Fighter | CharacterClass::Paladin | CharacterClass::Ranger => (10, 6),
            CharacterClass::Bard
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Monk
            | CharacterClass::Rogue
            | CharacterClass::Warlock => (8, 5),
            CharacterClass::Sorcerer | CharacterClass::Wizard => (6, 4),
        }
    }

    /// Ability favored by the class; gets ability score improvements first.
    pub fn primary_ability(&self) -> Ability {
        match self {
            CharacterClass::Barbarian | CharacterClass::Fighter | CharacterClass::Paladin => {
                Ability::Strength
            }
            CharacterClass::Monk | CharacterClass::Ranger | CharacterClass::Rogue => {
                Ability::Dexterity
            }
            CharacterClass::Cleric | CharacterClass::Druid => Ability::Wisdom,
            CharacterClass::Wizard => Ability::Intelligence,
            CharacterClass::Bard | CharacterClass::Sorcerer | CharacterClass::Warlock => {
                Ability::Charisma
            }
        }
    }

    /// Second choice for improvements once the primary is capped.
    pub fn secondary_ability(&self) -> Ability {
        match self {
            CharacterClass::Monk | CharacterClass::Cleric | CharacterClass::Druid => {
                Ability::Dexterity
            }
            CharacterClass::Ranger => Ability::Wisdom,
            CharacterClass::Wizard | CharacterClass::Sorcerer | CharacterClass::Warlock => {
                Ability::Constitution
            }
            CharacterClass::Rogue | CharacterClass::Bard => Ability::Dexterity,
            CharacterClass::Barbarian | CharacterClass::Fighter | CharacterClass::Paladin => {
                Ability::Constitution
            }
        }
    }

    /// Abilities that default higher when a descriptor leaves them out.
    pub fn favored_abilities(&self) -> [Ability; 2] {
        [self.primary_ability(), self.secondary_ability()]
    }

    /// Returns the spellcasting ability for this class, if any.
    pub fn spellcasting_ability(&self) -> Option<Ability> {
        match self {
            CharacterClass::Bard | CharacterClass::Sorcerer | CharacterClass::Warlock => {
                Some(Ability::Charisma)
            }
            CharacterClass::Cleric | CharacterClass::Druid | CharacterClass::Ranger => {
                Some(Ability::Wisdom)
            }
            CharacterClass::Wizard => Some(Ability::Intelligence),
            CharacterClass::Paladin => Some(Ability::Charisma),
            _ => None,
        }
    }

    /// Signature-spell uses per combat at `level`.
    pub fn spell_uses(&self, level: u8) -> u32 {
        let level = level as u32;
        match self {
            CharacterClass::Bard
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Sorcerer
            | CharacterClass::Wizard => 1 + level / 3,
            CharacterClass::Warlock => 1 + level / 5,
            CharacterClass::Paladin | CharacterClass::Ranger if level >= 2 => level / 4 + 1,
            _ => 0,
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fighter archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FightingStyle {
    /// "Archer": +2 to hit with ranged weapons.
    Archery,
    /// "Defender": +1 AC while wearing armor.
    Defense,
    /// "Enforcer": reroll 1s and 2s on two-handed damage dice.
    GreatWeapon,
    /// "Duelist": ability modifier on off-hand damage.
    TwoWeapon,
}

impl FightingStyle {
    pub fn from_class_name(name: &str) -> Option<FightingStyle> {
        match name.trim().to_ascii_lowercase().as_str() {
            "archer" | "archery" => Some(FightingStyle::Archery),
            "defender" | "defense" => Some(FightingStyle::Defense),
            "enforcer" | "great_weapon" => Some(FightingStyle::GreatWeapon),
            "duelist" | "two_weapon" => Some(FightingStyle::TwoWeapon),
            _ => None,
        }
    }
}

/// Playable races with combat-relevant perks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Dwarf,
    HighElf,
    Gnome,
    Halfling,
    Lizardkin,
    Golem,
}

impl Race {
    pub fn parse(name: &str) -> Option<Race> {
        let key: String = name
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "human" => Some(Race::Human),
            "dwarf" | "hilldwarf" | "mountaindwarf" => Some(Race::Dwarf),
            "highelf" | "elf" => Some(Race::HighElf),
            "gnome" => Some(Race::Gnome),
            "halfling" => Some(Race::Halfling),
            "lizardkin" | "lizardfolk" => Some(Race::Lizardkin),
            "golem" => Some(Race::Golem),
            _ => None,
        }
    }

    /// Bonus HP per level.
    pub fn hp_per_level(&self) -> i32 {
        match self {
            Race::Dwarf => 1,
            _ => 0,
        }
    }
}

/// Max HP for a class at `level`: base + per-level increments + CON.
pub fn class_max_hp(class: CharacterClass, race: Option<Race>, level: u8, con_mod: i32) -> i32 {
    let (base, per) = class.hp_table();
    let level = level.clamp(1, 20) as i32;
    let race_bonus = race.map(|r| r.hp_per_level()).unwrap_or(0) * level;
    (base + (level - 1) * per + con_mod + race_bonus).max(1)
}

/// HP gained on reaching a new level: class increment + CON (at least 1).
pub fn hp_gain_on_level(class: Option<CharacterClass>, race: Option<Race>, con_mod: i32) -> i32 {
    let per = class.map(|c| c.hp_table().1).unwrap_or(5);
    let race_bonus = race.map(|r| r.hp_per_level()).unwrap_or(0);
    (per + con_mod + race_bonus).max(1)
}

/// Levels that grant an ability score improvement.
pub const ASI_LEVELS: [u8; 5] = [4, 8, 12, 16, 19];

/// Spend +2 ability points: primary first (capped at 20), then secondary.
pub fn apply_ability_improvement(fighter: &mut Fighter) -> Vec<Ability> {
    let (primary, secondary) = match fighter.class {
        Some(class) => (class.primary_ability(), class.secondary_ability()),
        None => (Ability::Strength, Ability::Constitution),
    };
    let mut raised = Vec::new();
    for _ in 0..2 {
        let target = [primary, secondary]
            .into_iter()
            .map(|a| fighter.abilities.effective(a))
            .find(|a| fighter.abilities.get(*a) < 20);
        let Some(ability) = target else { break };
        let score = fighter.abilities.get(ability);
        fighter.abilities.set(ability, score + 1);
        raised.push(ability);
    }
    raised
}

/// Armor class from worn gear, class and race.
///
/// Everyone: 10 + DEX + armor + shield. Unarmored barbarians use CON in
/// place of armor, unarmored monks without a shield use WIS. Lizardkin
/// natural armor is 13 + DEX (plus shield) and golems get +1 on top of
/// whichever formula applied.
pub fn derive_ac(fighter: &Fighter) -> i32 {
    let dex = fighter.modifier(Ability::Dexterity);
    let eq = &fighter.equipment;
    let mut ac = 10 + dex + eq.armor_bonus + eq.shield_bonus;

    match fighter.class {
        Some(CharacterClass::Barbarian) if !eq.wears_armor() => {
            ac = ac.max(10 + dex + fighter.modifier(Ability::Constitution) + eq.shield_bonus);
        }
        Some(CharacterClass::Monk) if !eq.wears_armor() && !eq.has_shield() => {
            ac = ac.max(10 + dex + fighter.modifier(Ability::Wisdom));
        }
        _ => {}
    }

    if fighter.fighting_style == Some(FightingStyle::Defense) && eq.wears_armor() {
        ac += 1;
    }

    match fighter.race {
        Some(Race::Lizardkin) => ac = 13 + dex + eq.shield_bonus,
        Some(Race::Golem) => ac += 1,
        _ => {}
    }
    ac
}

fn monk_die(level: u8) -> &'static str {
    match level {
        0..=4 => "1d4",
        5..=10 => "1d6",
        11..=16 => "1d8",
        _ => "1d10",
    }
}

fn larger_die(a: Option<DiceExpression>, b: DiceExpression) -> DiceExpression {
    match a {
        Some(a) if a.max_value() >= b.max_value() => a,
        _ => b,
    }
}

/// Passive riders for a class/race at `level`.
pub fn derive_traits(
    class: Option<CharacterClass>,
    style: Option<FightingStyle>,
    race: Option<Race>,
    level: u8,
) -> FighterTraits {
    let mut t = FighterTraits::default();

    match race {
        Some(Race::Dwarf) => {
            t.resistances.insert(DamageType::Poison);
            t.save_advantage.insert(SaveTag::Poison);
        }
        Some(Race::HighElf) => {
            t.condition_immunities.insert(Condition::Asleep);
            t.save_advantage.insert(SaveTag::Charm);
        }
        Some(Race::Gnome) => {
            t.save_advantage.insert(SaveTag::Mental);
        }
        Some(Race::Halfling) => {
            t.save_advantage.insert(SaveTag::Fear);
        }
        Some(Race::Lizardkin) => {
            t.unarmed_die = Some(DiceExpression::dice(1, 6));
        }
        Some(Race::Human) | Some(Race::Golem) | None => {}
    }

    let Some(class) = class else { return t };
    match class {
        CharacterClass::Barbarian => {
            t.raging = true;
            t.rage_damage = match level {
                0..=8 => 2,
                9..=15 => 3,
                _ => 4,
            };
            if level >= 5 {
                t.extra_attacks = 1;
            }
        }
        CharacterClass::Fighter => {
            t.extra_attacks = match level {
                0..=4 => 0,
                5..=10 => 1,
                11..=19 => 2,
                _ => 3,
            };
            match style {
                Some(FightingStyle::Archery) => t.archery = true,
                Some(FightingStyle::TwoWeapon) => t.offhand_proficiency = true,
                _ => {}
            }
        }
        CharacterClass::Monk => {
            let die = DiceExpression::parse_or_default(monk_die(level));
            t.unarmed_die = Some(larger_die(t.unarmed_die.take(), die));
            t.extra_attacks = match level {
                0..=4 => 0,
                5..=19 => 1,
                _ => 2,
            };
            t.speed_bonus = match level {
                0..=4 => 0,
                5 => 2,
                6..=9 => 3,
                _ => 4,
            };
            t.deflect_missiles = level >= 3;
            t.evasion = level >= 7;
            if level >= 10 {
                t.immunities.insert(DamageType::Poison);
                t.condition_immunities.insert(Condition::Poisoned);
            }
            t.save_advantage_all = level >= 14;
        }
        CharacterClass::Paladin => {
            t.smite_chance = match level {
                0..=1 => 0,
                2..=10 => 25,
                _ => 50,
            };
            if level >= 2 {
                t.smite_dice = Some(DiceExpression::dice(2, 8));
            }
            if level >= 3 {
                t.immunities.insert(DamageType::Poison);
                t.condition_immunities.insert(Condition::Poisoned);
            }
            if level >= 5 {
                t.extra_attacks = 1;
            }
            if level >= 10 {
                t.fear_aura = 2;
                t.condition_immunities.insert(Condition::Frightened);
            }
        }
        CharacterClass::Ranger => {
            t.archery = true;
            if level >= 5 {
                t.extra_attacks = 1;
            }
        }
        CharacterClass::Rogue => {
            let dice = (level as u32).div_ceil(2).max(1);
            t.sneak_attack = Some(DiceExpression::dice(dice, 6));
            t.offhand_proficiency = true;
            t.cunning_action = level >= 2;
            t.uncanny_dodge = level >= 5;
            t.evasion = level >= 7;
            if level >= 15 {
                t.save_advantage.insert(SaveTag::Mental);
                t.save_advantage.insert(SaveTag::Charm);
            }
            t.elusive = level >= 18;
            t.never_miss = level >= 20;
        }
        CharacterClass::Wizard => {
            t.spell_sculpting = level >= 6;
        }
        CharacterClass::Bard
        | CharacterClass::Cleric
        | CharacterClass::Druid
        | CharacterClass::Sorcerer
        | CharacterClass::Warlock => {}
    }
    t
}

/// Re-derive a fighter's riders from class, race and level, keeping the
/// descriptor-supplied `innate` flags on top.
pub fn refresh_traits(fighter: &mut Fighter) {
    let mut traits = derive_traits(
        fighter.class,
        fighter.fighting_style,
        fighter.race,
        fighter.level(),
    );
    traits.merge(&fighter.innate);
    fighter.traits = traits;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::{FighterId, Side, Weapon};

    fn classed(class: CharacterClass, level: u8) -> Fighter {
        let mut f = Fighter::new(FighterId(1), "F", Side::Home);
        f.class = Some(class);
        f.set_level(level);
        refresh_traits(&mut f);
        f
    }

    #[test]
    fn test_parse_style_names() {
        assert_eq!(
            CharacterClass::parse("Archer"),
            Some((CharacterClass::Fighter, Some(FightingStyle::Archery)))
        );
        assert_eq!(
            CharacterClass::parse("Crusader"),
            Some((CharacterClass::Paladin, None))
        );
        assert_eq!(CharacterClass::parse("Chef"), None);
    }

    #[test]
    fn test_class_hp_formula() {
        // rogue level 4, CON 12: 8 + 3*5 + 1
        assert_eq!(class_max_hp(CharacterClass::Rogue, None, 4, 1), 24);
        assert_eq!(class_max_hp(CharacterClass::Barbarian, None, 1, 2), 14);
        assert_eq!(class_max_hp(CharacterClass::Fighter, Some(Race::Dwarf), 2, 0), 18);
    }

    #[test]
    fn test_barbarian_unarmored_defense() {
        let mut f = classed(CharacterClass::Barbarian, 1);
        f.abilities.dexterity = 14;
        f.abilities.constitution = 18;
        assert_eq!(derive_ac(&f), 16);
    }

    #[test]
    fn test_monk_ac_uses_wisdom() {
        let mut f = classed(CharacterClass::Monk, 1);
        f.abilities.dexterity = 14;
        f.abilities.wisdom = Some(14);
        assert_eq!(derive_ac(&f), 14);
        f.equipment.shield_bonus = 2;
        assert_eq!(derive_ac(&f), 14);
    }

    #[test]
    fn test_lizardkin_and_golem_ac() {
        let mut f = Fighter::new(FighterId(1), "L", Side::Home);
        f.abilities.dexterity = 14;
        f.equipment.armor_bonus = 5;
        f.race = Some(Race::Lizardkin);
        assert_eq!(derive_ac(&f), 15);
        f.race = Some(Race::Golem);
        assert_eq!(derive_ac(&f), 18);
    }

    #[test]
    fn test_monk_progression() {
        let monk = classed(CharacterClass::Monk, 1);
        assert_eq!(monk.traits.unarmed_die.as_ref().map(|d| d.max_value()), Some(4));
        assert_eq!(monk.traits.speed_bonus, 0);

        let monk = classed(CharacterClass::Monk, 5);
        assert_eq!(monk.traits.speed_bonus, 2);
        assert_eq!(monk.traits.extra_attacks, 1);
        assert_eq!(classed(CharacterClass::Monk, 6).traits.speed_bonus, 3);
        assert_eq!(classed(CharacterClass::Monk, 10).traits.speed_bonus, 4);

        let monk = classed(CharacterClass::Monk, 11);
        assert_eq!(monk.traits.unarmed_die.as_ref().map(|d| d.max_value()), Some(8));
        let monk = classed(CharacterClass::Monk, 17);
        assert_eq!(monk.traits.unarmed_die.as_ref().map(|d| d.max_value()), Some(10));
        assert_eq!(classed(CharacterClass::Monk, 20).traits.extra_attacks, 2);
    }

    #[test]
    fn test_lizardkin_monk_keeps_larger_die() {
        let mut f = Fighter::new(FighterId(1), "M", Side::Home);
        f.class = Some(CharacterClass::Monk);
        f.race = Some(Race::Lizardkin);
        refresh_traits(&mut f);
        assert_eq!(f.traits.unarmed_die.as_ref().map(|d| d.max_value()), Some(6));
        f.set_level(11);
        refresh_traits(&mut f);
        assert_eq!(f.traits.unarmed_die.as_ref().map(|d| d.max_value()), Some(8));
    }

    #[test]
    fn test_rogue_sneak_attack_scaling() {
        let rogue = classed(CharacterClass::Rogue, 6);
        assert_eq!(rogue.traits.sneak_attack.as_ref().map(|d| d.dice_count()), Some(3));
        assert_eq!(
            classed(CharacterClass::Rogue, 1).traits.sneak_attack.map(|d| d.dice_count()),
            Some(1)
        );
        assert!(classed(CharacterClass::Rogue, 20).traits.never_miss);
        assert!(!classed(CharacterClass::Rogue, 17).traits.elusive);
    }

    #[test]
    fn test_paladin_smite_and_immunity() {
        assert_eq!(classed(CharacterClass::Paladin, 1).traits.smite_chance, 0);
        assert_eq!(classed(CharacterClass::Paladin, 11).traits.smite_chance, 50);
        let crusader = classed(CharacterClass::Paladin, 3);
        assert!(crusader.traits.condition_immunities.contains(&Condition::Poisoned));
    }

    #[test]
    fn test_innate_flags_survive_refresh() {
        let mut f = classed(CharacterClass::Fighter, 1);
        f.innate.resist_all = true;
        f.set_level(5);
        refresh_traits(&mut f);
        assert!(f.traits.resist_all);
        assert_eq!(f.traits.extra_attacks, 1);
    }

    #[test]
    fn test_ability_improvement_spills_to_secondary() {
        let mut f = classed(CharacterClass::Fighter, 4);
        f.abilities.strength = 19;
        f.abilities.constitution = 12;
        let raised = apply_ability_improvement(&mut f);
        assert_eq!(raised, vec![Ability::Strength, Ability::Constitution]);
        assert_eq!(f.abilities.strength, 20);
        assert_eq!(f.abilities.constitution, 13);
    }

    #[test]
    fn test_unarmed_monk_uses_best_of_str_dex() {
        let mut f = classed(CharacterClass::Monk, 1);
        f.abilities.strength = 8;
        f.abilities.dexterity = 16;
        assert_eq!(f.weapon_ability_modifier(&Weapon::fists()), 3);
    }
}
