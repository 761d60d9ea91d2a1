//! Standard weapon catalog and class starting kits.
//!
//! Descriptors may name a weapon instead of spelling it out; the name is
//! looked up here case-insensitively. Ranges are in tiles (5 ft each).

use crate::classes::{CharacterClass, FightingStyle};
use crate::fighter::{DamageType, Equipment, Weapon};

/// Get a standard weapon by name.
pub fn get_weapon(name: &str) -> Option<Weapon> {
    let name_lower = name.trim().to_lowercase();
    let compact: String = name_lower.chars().filter(|c| !c.is_whitespace()).collect();
    WEAPONS
        .iter()
        .find(|w| {
            let candidate = w.name.to_lowercase();
            candidate == name_lower
                || candidate.chars().filter(|c| !c.is_whitespace()).collect::<String>() == compact
        })
        .cloned()
}

lazy_static::lazy_static! {
    /// Standard weapons.
    pub static ref WEAPONS: Vec<Weapon> = vec![
        // Simple melee
        Weapon::melee("Club", "1d4", DamageType::Bludgeoning).with_light(),
        Weapon::melee("Dagger", "1d4", DamageType::Piercing).with_finesse().with_light(),
        Weapon::melee("Greatclub", "1d8", DamageType::Bludgeoning).with_two_handed(),
        Weapon::melee("Hand Axe", "1d6", DamageType::Slashing).with_light(),
        Weapon::melee("Mace", "1d6", DamageType::Bludgeoning),
        Weapon::melee("Quarterstaff", "1d6", DamageType::Bludgeoning).with_versatile("1d8"),
        Weapon::melee("Spear", "1d6", DamageType::Piercing).with_versatile("1d8"),

        // Martial melee
        Weapon::melee("Battleaxe", "1d8", DamageType::Slashing).with_versatile("1d10"),
        Weapon::melee("Glaive", "1d10", DamageType::Slashing).with_two_handed().with_reach(2),
        Weapon::melee("Greataxe", "1d12", DamageType::Slashing).with_two_handed(),
        Weapon::melee("Greatsword", "2d6", DamageType::Slashing).with_two_handed(),
        Weapon::melee("Halberd", "1d12", DamageType::Slashing).with_two_handed().with_reach(2),
        Weapon::melee("Longsword", "1d8", DamageType::Slashing).with_versatile("1d10"),
        Weapon::melee("Maul", "2d6", DamageType::Bludgeoning).with_two_handed(),
        Weapon::melee("Rapier", "1d8", DamageType::Piercing).with_finesse(),
        Weapon::melee("Scimitar", "1d6", DamageType::Slashing).with_finesse().with_light(),
        Weapon::melee("Shortsword", "1d6", DamageType::Piercing).with_finesse().with_light(),
        Weapon::melee("Warhammer", "1d8", DamageType::Bludgeoning).with_versatile("1d10"),

        // Ranged
        Weapon::ranged("Shortbow", "1d6", DamageType::Piercing, 16, 64).with_two_handed(),
        Weapon::ranged("Longbow", "1d8", DamageType::Piercing, 30, 120).with_two_handed(),
        Weapon::ranged("Light Crossbow", "1d8", DamageType::Piercing, 16, 64).with_two_handed(),
        Weapon::ranged("Hand Crossbow", "1d6", DamageType::Piercing, 6, 24).with_light(),
        Weapon::ranged("Sling", "1d4", DamageType::Bludgeoning, 6, 24),

        Weapon::fists(),
    ];
}

fn catalog(name: &str) -> Weapon {
    get_weapon(name).unwrap_or_default()
}

/// Body armor AC bonus for the kits below.
fn kit_armor(class: CharacterClass, style: Option<FightingStyle>) -> (i32, i32) {
    match (class, style) {
        (CharacterClass::Fighter, Some(FightingStyle::Archery)) => (3, 0),
        (CharacterClass::Fighter, Some(FightingStyle::GreatWeapon)) => (4, 0),
        (CharacterClass::Fighter, Some(FightingStyle::TwoWeapon)) => (4, 0),
        (CharacterClass::Fighter, _) => (5, 2),
        (CharacterClass::Paladin, _) => (5, 2),
        (CharacterClass::Cleric, _) => (2, 2),
        (CharacterClass::Druid, _) => (1, 2),
        (CharacterClass::Ranger, _) => (4, 0),
        (CharacterClass::Bard, _) | (CharacterClass::Rogue, _) | (CharacterClass::Warlock, _) => {
            (1, 0)
        }
        (CharacterClass::Barbarian, _)
        | (CharacterClass::Monk, _)
        | (CharacterClass::Sorcerer, _)
        | (CharacterClass::Wizard, _) => (0, 0),
    }
}

/// Equipment a class walks in with when the descriptor names none.
///
/// Two-handed main weapons leave the off hand and shield empty.
pub fn starting_kit(class: CharacterClass, style: Option<FightingStyle>) -> Equipment {
    let (main, off) = match (class, style) {
        (CharacterClass::Barbarian, _) => (catalog("Greataxe"), None),
        (CharacterClass::Bard, _) => (catalog("Rapier"), None),
        (CharacterClass::Cleric, _) => (catalog("Mace"), None),
        (CharacterClass::Druid, _) => (catalog("Scimitar"), None),
        (CharacterClass::Fighter, Some(FightingStyle::Archery)) => (catalog("Longbow"), None),
        (CharacterClass::Fighter, Some(FightingStyle::GreatWeapon)) => (catalog("Halberd"), None),
        (CharacterClass::Fighter, Some(FightingStyle::TwoWeapon)) => {
            (catalog("Shortsword"), Some(catalog("Shortsword")))
        }
        (CharacterClass::Fighter, _) | (CharacterClass::Paladin, _) => {
            (catalog("Longsword"), None)
        }
        (CharacterClass::Monk, _) => (Weapon::fists(), None),
        (CharacterClass::Ranger, _) => (catalog("Longbow"), None),
        (CharacterClass::Rogue, _) => (catalog("Rapier"), Some(catalog("Dagger"))),
        (CharacterClass::Sorcerer, _)
        | (CharacterClass::Warlock, _)
        | (CharacterClass::Wizard, _) => (catalog("Quarterstaff"), None),
    };
    let (armor_bonus, shield_bonus) = kit_armor(class, style);
    let two_handed = main.two_handed;
    Equipment {
        main_hand: main,
        off_hand: if two_handed { None } else { off },
        armor_bonus,
        shield_bonus: if two_handed { 0 } else { shield_bonus },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dagger = get_weapon("DAGGER").unwrap();
        assert!(dagger.finesse);
        assert_eq!(get_weapon("handaxe").unwrap().name, "Hand Axe");
        assert!(get_weapon("Vorpal Spoon").is_none());
    }

    #[test]
    fn test_halberd_has_reach() {
        assert_eq!(get_weapon("Halberd").unwrap().reach, 2);
    }

    #[test]
    fn test_two_handed_kit_clears_off_hand() {
        let kit = starting_kit(CharacterClass::Barbarian, None);
        assert_eq!(kit.main_hand.name, "Greataxe");
        assert!(kit.off_hand.is_none());
        assert_eq!(kit.shield_bonus, 0);

        let kit = starting_kit(CharacterClass::Fighter, Some(FightingStyle::Archery));
        assert!(kit.main_hand.is_ranged());
    }

    #[test]
    fn test_duelist_dual_wields() {
        let kit = starting_kit(CharacterClass::Fighter, Some(FightingStyle::TwoWeapon));
        assert_eq!(kit.off_hand.map(|w| w.name), Some("Shortsword".to_string()));
    }

    #[test]
    fn test_defender_carries_shield() {
        let kit = starting_kit(CharacterClass::Fighter, Some(FightingStyle::Defense));
        assert_eq!(kit.armor_bonus, 5);
        assert_eq!(kit.shield_bonus, 2);
        assert!(!kit.uses_both_hands());
    }
}
