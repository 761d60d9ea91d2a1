//! Combat-runtime fighter state.
//!
//! A [`Fighter`] is built once per combat from external character data (see
//! [`crate::builder`]) and owns everything the engine mutates during a match:
//! position, hit points, conditions, resources and class/race riders.

use crate::classes::{CharacterClass, FightingStyle, Race};
use crate::combat::spell::SpellEffect;
use crate::conditions::{Condition, ConditionBag, SaveTag};
use crate::dice::DiceExpression;
use crate::grid::Position;
use crate::targeting::TargetPolicy;
use crate::xp::DevTrait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// ID Types
// ============================================================================

/// Roster-wide fighter identifier. Also the tie-breaker for targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FighterId(pub u32);

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two sides of a combat. Serialized as team id 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::Home => 0,
            Side::Away => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Side> {
        match index {
            0 => Some(Side::Home),
            1 => Some(Side::Away),
            _ => None,
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn both() -> [Side; 2] {
        [Side::Home, Side::Away]
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side.index() as u8
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Side::from_index(value).ok_or_else(|| format!("team id must be 0 or 1, got {value}"))
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.index())
    }
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Parse `STR`, `str` or `strength` style names.
    pub fn parse(name: &str) -> Option<Ability> {
        match name.trim().to_ascii_lowercase().as_str() {
            "str" | "strength" => Some(Ability::Strength),
            "dex" | "dexterity" => Some(Ability::Dexterity),
            "con" | "constitution" => Some(Ability::Constitution),
            "int" | "intelligence" => Some(Ability::Intelligence),
            "wis" | "wisdom" => Some(Ability::Wisdom),
            "cha" | "charisma" => Some(Ability::Charisma),
            _ => None,
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Which abilities a record carries.
///
/// Several classes in this ruleset drop WIS entirely and lean on INT for
/// perception and willpower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AbilitySet {
    #[default]
    Standard,
    NoWisdom,
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(rename = "str")]
    pub strength: u8,
    #[serde(rename = "dex")]
    pub dexterity: u8,
    #[serde(rename = "con")]
    pub constitution: u8,
    #[serde(rename = "int")]
    pub intelligence: u8,
    /// `None` for the [`AbilitySet::NoWisdom`] variant.
    #[serde(rename = "wis", default, skip_serializing_if = "Option::is_none")]
    pub wisdom: Option<u8>,
    #[serde(rename = "cha")]
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: Some(wis),
            charisma: cha,
        }
    }

    /// Five-score record without WIS.
    pub fn without_wisdom(str: u8, dex: u8, con: u8, int: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: None,
            charisma: cha,
        }
    }

    pub fn set_kind(&self) -> AbilitySet {
        if self.wisdom.is_some() {
            AbilitySet::Standard
        } else {
            AbilitySet::NoWisdom
        }
    }

    /// Drop WIS, turning this into a [`AbilitySet::NoWisdom`] record.
    pub fn drop_wisdom(&mut self) {
        self.wisdom = None;
    }

    /// The ability actually consulted for `ability` (WIS reads INT when absent).
    pub fn effective(&self, ability: Ability) -> Ability {
        match (ability, self.wisdom) {
            (Ability::Wisdom, None) => Ability::Intelligence,
            _ => ability,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match self.effective(ability) {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom.unwrap_or(self.intelligence),
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: u8) {
        match self.effective(ability) {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = Some(value),
            Ability::Charisma => self.charisma = value,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// Score 8-9 = -1, 10-11 = 0, 12-13 = +1, ...
pub fn ability_modifier(score: u8) -> i32 {
    (score as i32 - 10).div_euclid(2)
}

/// Proficiency bonus by character level.
pub fn proficiency_for_level(level: u8) -> i32 {
    match level {
        0..=4 => 2,
        5..=8 => 3,
        9..=12 => 4,
        13..=16 => 5,
        _ => 6,
    }
}

// ============================================================================
// Weapons and Equipment
// ============================================================================

/// Damage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Thunder => "thunder",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Force => "force",
            DamageType::Psychic => "psychic",
        }
    }

    pub fn parse(name: &str) -> Option<DamageType> {
        let name = name.trim().to_ascii_lowercase();
        [
            DamageType::Slashing,
            DamageType::Piercing,
            DamageType::Bludgeoning,
            DamageType::Fire,
            DamageType::Cold,
            DamageType::Lightning,
            DamageType::Thunder,
            DamageType::Acid,
            DamageType::Poison,
            DamageType::Necrotic,
            DamageType::Radiant,
            DamageType::Force,
            DamageType::Psychic,
        ]
        .into_iter()
        .find(|t| t.name() == name)
    }

    /// Slashing, piercing and bludgeoning.
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            DamageType::Slashing | DamageType::Piercing | DamageType::Bludgeoning
        )
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a weapon reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    #[default]
    Melee,
    Ranged,
}

/// An equipped weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub damage: DiceExpression,
    /// Die used when a versatile weapon is swung with both hands.
    pub versatile: Option<DiceExpression>,
    pub damage_type: DamageType,
    pub kind: WeaponKind,
    /// Melee reach in tiles.
    pub reach: u32,
    /// Normal and long range in tiles (ranged weapons only).
    pub range: Option<(u32, u32)>,
    pub finesse: bool,
    pub light: bool,
    pub two_handed: bool,
    pub unarmed: bool,
    /// Flat magic bonus to attack rolls.
    pub to_hit_bonus: i32,
}

impl Weapon {
    /// A melee weapon with reach 1.
    pub fn melee(name: impl Into<String>, damage: &str, damage_type: DamageType) -> Self {
        Self {
            name: name.into(),
            damage: DiceExpression::parse_or_default(damage),
            versatile: None,
            damage_type,
            kind: WeaponKind::Melee,
            reach: 1,
            range: None,
            finesse: false,
            light: false,
            two_handed: false,
            unarmed: false,
            to_hit_bonus: 0,
        }
    }

    /// A ranged weapon; ranges are in tiles.
    pub fn ranged(
        name: impl Into<String>,
        damage: &str,
        damage_type: DamageType,
        normal: u32,
        long: u32,
    ) -> Self {
        Self {
            kind: WeaponKind::Ranged,
            range: Some((normal.max(1), long.max(normal.max(1)))),
            ..Self::melee(name, damage, damage_type)
        }
    }

    /// Bare fists.
    pub fn fists() -> Self {
        Self {
            unarmed: true,
            ..Self::melee("Fists", "1d4", DamageType::Bludgeoning)
        }
    }

    pub fn with_finesse(mut self) -> Self {
        self.finesse = true;
        self
    }

    pub fn with_light(mut self) -> Self {
        self.light = true;
        self
    }

    pub fn with_two_handed(mut self) -> Self {
        self.two_handed = true;
        self
    }

    pub fn with_versatile(mut self, damage: &str) -> Self {
        self.versatile = Some(DiceExpression::parse_or_default(damage));
        self
    }

    pub fn with_reach(mut self, reach: u32) -> Self {
        self.reach = reach.max(1);
        self
    }

    pub fn with_to_hit(mut self, bonus: i32) -> Self {
        self.to_hit_bonus = bonus;
        self
    }

    pub fn is_ranged(&self) -> bool {
        self.kind == WeaponKind::Ranged
    }

    /// Distance the wielder tries to close to before attacking.
    pub fn preferred_reach(&self) -> u32 {
        match (self.kind, self.range) {
            (WeaponKind::Ranged, Some((normal, _))) => normal,
            _ => self.reach.max(1),
        }
    }

    /// Farthest distance an attack can be made at all.
    pub fn max_reach(&self) -> u32 {
        match (self.kind, self.range) {
            (WeaponKind::Ranged, Some((_, long))) => long,
            _ => self.reach.max(1),
        }
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Self::fists()
    }
}

/// Weapons and armor a fighter brings into the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Equipment {
    pub main_hand: Weapon,
    pub off_hand: Option<Weapon>,
    /// AC granted by body armor, on top of 10 + DEX.
    pub armor_bonus: i32,
    pub shield_bonus: i32,
}

impl Equipment {
    pub fn wears_armor(&self) -> bool {
        self.armor_bonus > 0
    }

    pub fn has_shield(&self) -> bool {
        self.shield_bonus > 0
    }

    /// Main hand swung with both hands: a two-handed weapon, or a versatile
    /// one with nothing in the other hand.
    pub fn uses_both_hands(&self) -> bool {
        self.main_hand.two_handed
            || (self.main_hand.versatile.is_some() && self.off_hand.is_none() && !self.has_shield())
    }
}

// ============================================================================
// Class and race riders
// ============================================================================

/// Class/race-derived flags consumed by the resolver.
///
/// Everything here is derived from class, race and level by
/// [`crate::classes::derive_traits`], then optionally overridden by
/// descriptor flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FighterTraits {
    /// Additional main-hand attacks per turn.
    pub extra_attacks: u8,
    /// +2 to hit with ranged weapons.
    pub archery: bool,
    /// +2 damage with a one-handed melee weapon and nothing in the off hand.
    pub dueling: bool,
    pub resistances: BTreeSet<DamageType>,
    pub immunities: BTreeSet<DamageType>,
    /// Halve all incoming damage.
    pub resist_all: bool,
    /// Raging: bonus melee damage and physical resistance.
    pub raging: bool,
    pub rage_damage: i32,
    /// Percent chance that a melee hit carries a smite.
    pub smite_chance: u32,
    pub smite_dice: Option<DiceExpression>,
    pub sneak_attack: Option<DiceExpression>,
    pub uncanny_dodge: bool,
    pub evasion: bool,
    pub deflect_missiles: bool,
    /// Advantage on every saving throw.
    pub save_advantage_all: bool,
    /// Advantage on saves carrying any of these tags.
    pub save_advantage: BTreeSet<SaveTag>,
    pub condition_immunities: BTreeSet<Condition>,
    /// Allies within this many tiles cannot be frightened.
    pub fear_aura: u32,
    /// A missed attack becomes a hit.
    pub never_miss: bool,
    /// Attackers never gain advantage against this fighter.
    pub elusive: bool,
    pub offhand_proficiency: bool,
    /// Proficiency bonus also applies to weapon damage.
    pub damage_proficiency: bool,
    pub initiative_bonus: i32,
    pub initiative_advantage: bool,
    /// Area spells skip the caster's allies.
    pub spell_sculpting: bool,
    /// Martial-arts die; replaces a smaller unarmed die.
    pub unarmed_die: Option<DiceExpression>,
    /// Free hide at the end of a turn.
    pub cunning_action: bool,
    /// Tiles added to base speed.
    pub speed_bonus: u32,
}

impl FighterTraits {
    pub fn resists(&self, damage_type: DamageType) -> bool {
        self.resist_all
            || self.resistances.contains(&damage_type)
            || (self.raging && damage_type.is_physical())
    }

    pub fn is_immune_to(&self, damage_type: DamageType) -> bool {
        self.immunities.contains(&damage_type)
    }

    /// Layer `other` on top: flags OR together, numbers take the larger
    /// value, sets union, optional dice prefer the bigger die.
    pub fn merge(&mut self, other: &FighterTraits) {
        self.extra_attacks = self.extra_attacks.max(other.extra_attacks);
        self.archery |= other.archery;
        self.dueling |= other.dueling;
        self.resistances.extend(other.resistances.iter().copied());
        self.immunities.extend(other.immunities.iter().copied());
        self.resist_all |= other.resist_all;
        self.raging |= other.raging;
        self.rage_damage = self.rage_damage.max(other.rage_damage);
        self.smite_chance = self.smite_chance.max(other.smite_chance);
        self.smite_dice = bigger(self.smite_dice.take(), other.smite_dice.clone());
        self.sneak_attack = bigger(self.sneak_attack.take(), other.sneak_attack.clone());
        self.uncanny_dodge |= other.uncanny_dodge;
        self.evasion |= other.evasion;
        self.deflect_missiles |= other.deflect_missiles;
        self.save_advantage_all |= other.save_advantage_all;
        self.save_advantage.extend(other.save_advantage.iter().copied());
        self.condition_immunities
            .extend(other.condition_immunities.iter().copied());
        self.fear_aura = self.fear_aura.max(other.fear_aura);
        self.never_miss |= other.never_miss;
        self.elusive |= other.elusive;
        self.offhand_proficiency |= other.offhand_proficiency;
        self.damage_proficiency |= other.damage_proficiency;
        self.initiative_bonus = self.initiative_bonus.max(other.initiative_bonus);
        self.initiative_advantage |= other.initiative_advantage;
        self.spell_sculpting |= other.spell_sculpting;
        self.unarmed_die = bigger(self.unarmed_die.take(), other.unarmed_die.clone());
        self.cunning_action |= other.cunning_action;
        self.speed_bonus = self.speed_bonus.max(other.speed_bonus);
    }
}

fn bigger(a: Option<DiceExpression>, b: Option<DiceExpression>) -> Option<DiceExpression> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.max_value() > a.max_value() { b } else { a }),
        (a, b) => a.or(b),
    }
}

// ============================================================================
// Fighter
// ============================================================================

/// One combatant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fighter {
    pub id: FighterId,
    pub name: String,
    pub side: Side,
    pub position: Position,
    /// Tile requested by the descriptor; clamped onto the board at layout.
    pub spawn: Option<Position>,
    hp: i32,
    max_hp: i32,
    pub ac: i32,
    /// AC given explicitly by the descriptor; re-derivation never drops below it.
    pub base_ac: Option<i32>,
    pub abilities: AbilityScores,
    /// Base tiles per turn, before class bonuses and conditions.
    pub speed: u32,
    level: u8,
    pub xp: u32,
    alive: bool,
    pub class: Option<CharacterClass>,
    pub fighting_style: Option<FightingStyle>,
    pub race: Option<Race>,
    pub age: u32,
    pub dev_trait: DevTrait,
    /// Overall rating used for the challenge value.
    pub rating: u32,
    pub role: Option<String>,
    pub traits: FighterTraits,
    /// Descriptor-supplied flags, re-applied whenever `traits` is re-derived.
    pub innate: FighterTraits,
    pub equipment: Equipment,
    pub conditions: ConditionBag,
    pub spell: Option<SpellEffect>,
    pub tactics: Option<TargetPolicy>,
    /// Hidden fighters attack with advantage and are hard to hit.
    pub hidden: bool,
    /// Reaction still available this round.
    pub reaction_ready: bool,
}

impl Fighter {
    /// A level-1 fighter with average stats and bare fists.
    pub fn new(id: FighterId, name: impl Into<String>, side: Side) -> Self {
        Self {
            id,
            name: name.into(),
            side,
            position: Position::new(0, 0),
            spawn: None,
            hp: 10,
            max_hp: 10,
            ac: 10,
            base_ac: None,
            abilities: AbilityScores::default(),
            speed: 6,
            level: 1,
            xp: 0,
            alive: true,
            class: None,
            fighting_style: None,
            race: None,
            age: 25,
            dev_trait: DevTrait::Normal,
            rating: 50,
            role: None,
            traits: FighterTraits::default(),
            innate: FighterTraits::default(),
            equipment: Equipment::default(),
            conditions: ConditionBag::default(),
            spell: None,
            tactics: None,
            hidden: false,
            reaction_ready: true,
        }
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Set current HP, clamped to `[0, max_hp]`. Keeps `alive` in sync.
    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.clamp(0, self.max_hp);
        self.alive = self.hp > 0;
    }

    /// Set maximum HP (at least 1). Current HP is clamped to the new maximum.
    pub fn set_max_hp(&mut self, max_hp: i32) {
        self.max_hp = max_hp.max(1);
        self.set_hp(self.hp);
    }

    pub fn set_level(&mut self, level: u8) {
        self.level = level.clamp(1, 20);
    }

    /// Subtract damage, clamped at 0. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.set_hp(self.hp - amount.max(0));
        before - self.hp
    }

    /// Restore HP up to the maximum. Returns the HP actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.alive {
            return 0;
        }
        let before = self.hp;
        self.set_hp(self.hp + amount.max(0));
        self.hp - before
    }

    /// Current HP as per-mille of maximum.
    pub fn hp_permille(&self) -> i64 {
        (self.hp as i64 * 1000) / self.max_hp.max(1) as i64
    }

    pub fn proficiency_bonus(&self) -> i32 {
        proficiency_for_level(self.level)
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.has(condition)
    }

    /// Stunned, paralyzed or asleep: the turn is lost.
    pub fn is_incapacitated(&self) -> bool {
        self.conditions.incapacitating().is_some()
    }

    /// Tiles of movement this turn, after conditions.
    pub fn movement(&self) -> u32 {
        let speed = self.speed + self.traits.speed_bonus;
        if self.has_condition(Condition::Restrained) {
            0
        } else if self.has_condition(Condition::Prone) {
            speed / 2
        } else {
            speed
        }
    }

    /// Ability modifier an attack with `weapon` uses.
    pub fn weapon_ability_modifier(&self, weapon: &Weapon) -> i32 {
        let str_mod = self.modifier(Ability::Strength);
        let dex_mod = self.modifier(Ability::Dexterity);
        let martial_arts = weapon.unarmed && self.traits.unarmed_die.is_some();
        if weapon.is_ranged() {
            dex_mod
        } else if weapon.finesse || martial_arts {
            str_mod.max(dex_mod)
        } else {
            str_mod
        }
    }

    /// Proxy for how dangerous this fighter is.
    pub fn threat_score(&self) -> i64 {
        let best = self
            .modifier(Ability::Strength)
            .max(self.modifier(Ability::Dexterity))
            .max(self.modifier(Ability::Intelligence));
        self.rating as i64 + 3 * best as i64
    }

    /// Passive perception (reads INT when WIS is dropped).
    pub fn passive_perception(&self) -> i32 {
        10 + self.modifier(Ability::Wisdom)
    }

    /// Raise max HP; a living fighter gains the same amount of current HP.
    pub(crate) fn grow(&mut self, hp_gain: i32) {
        self.max_hp += hp_gain.max(0);
        if self.alive {
            self.hp = (self.hp + hp_gain.max(0)).clamp(1, self.max_hp);
        }
    }

    pub(crate) fn bump_level(&mut self) {
        self.level = (self.level + 1).min(20);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(12), 1);
        assert_eq!(ability_modifier(20), 5);
    }

    #[test]
    fn test_proficiency_bands() {
        assert_eq!(proficiency_for_level(1), 2);
        assert_eq!(proficiency_for_level(4), 2);
        assert_eq!(proficiency_for_level(5), 3);
        assert_eq!(proficiency_for_level(9), 4);
        assert_eq!(proficiency_for_level(13), 5);
        assert_eq!(proficiency_for_level(17), 6);
        assert_eq!(proficiency_for_level(20), 6);
    }

    #[test]
    fn test_hp_clamps_and_alive_tracks() {
        let mut f = Fighter::new(FighterId(1), "Kara", Side::Home);
        assert_eq!(f.take_damage(4), 4);
        assert_eq!(f.hp(), 6);
        assert_eq!(f.heal(100), 4);
        assert_eq!(f.hp(), 10);
        assert_eq!(f.take_damage(25), 10);
        assert_eq!(f.hp(), 0);
        assert!(!f.is_alive());
        assert_eq!(f.heal(5), 0);
        f.set_hp(-3);
        assert_eq!(f.hp(), 0);
    }

    #[test]
    fn test_wisdom_falls_back_to_intelligence() {
        let scores = AbilityScores::without_wisdom(10, 10, 10, 16, 10);
        assert_eq!(scores.set_kind(), AbilitySet::NoWisdom);
        assert_eq!(scores.modifier(Ability::Wisdom), 3);

        let mut f = Fighter::new(FighterId(2), "Ilse", Side::Away);
        f.abilities = scores;
        assert_eq!(f.passive_perception(), 13);

        let json = serde_json::to_value(&f.abilities).unwrap();
        assert!(json.get("wis").is_none());
        assert_eq!(json["int"], 16);
    }

    #[test]
    fn test_side_serializes_as_team_id() {
        assert_eq!(serde_json::to_string(&Side::Away).unwrap(), "1");
        let side: Side = serde_json::from_str("0").unwrap();
        assert_eq!(side, Side::Home);
        assert!(serde_json::from_str::<Side>("2").is_err());
    }

    #[test]
    fn test_weapon_reach() {
        let bow = Weapon::ranged("Longbow", "1d8", DamageType::Piercing, 30, 120);
        assert_eq!(bow.preferred_reach(), 30);
        assert_eq!(bow.max_reach(), 120);
        let sword = Weapon::melee("Longsword", "1d8", DamageType::Slashing);
        assert_eq!(sword.max_reach(), 1);
    }

    #[test]
    fn test_versatile_two_hands() {
        let mut eq = Equipment {
            main_hand: Weapon::melee("Longsword", "1d8", DamageType::Slashing).with_versatile("1d10"),
            ..Default::default()
        };
        assert!(eq.uses_both_hands());
        eq.shield_bonus = 2;
        assert!(!eq.uses_both_hands());
    }
}
