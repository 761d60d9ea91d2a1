//! Fighter construction from typed setters or loose JSON descriptors.
//!
//! Descriptors come from several upstream tools that never agreed on field
//! names, so every field accepts a handful of aliases (first match wins) and
//! anything missing or malformed falls back to a default.

use crate::classes::{class_max_hp, derive_ac, refresh_traits, CharacterClass, FightingStyle, Race};
use crate::combat::spell::{SpellDelivery, SpellEffect};
use crate::conditions::{Condition, SaveTag};
use crate::dice::DiceExpression;
use crate::error::CombatError;
use crate::fighter::{
    Ability, AbilityScores, DamageType, Fighter, FighterId, FighterTraits, Side, Weapon,
};
use crate::grid::Position;
use crate::items::{get_weapon, starting_kit};
use crate::targeting::TargetPolicy;
use crate::xp::DevTrait;
use serde_json::Value;

/// Score given to a class's favored abilities when a descriptor omits them.
pub const FAVORED_ABILITY_DEFAULT: u8 = 14;

/// Builder for combat-ready fighters.
///
/// Anything left unset is derived from class, race and level: hit points
/// from the class table, AC from the armor formula, and weapons from the
/// class starting kit.
#[derive(Debug, Clone)]
pub struct FighterBuilder {
    id: FighterId,
    name: String,
    side: Side,
    class: Option<CharacterClass>,
    style: Option<FightingStyle>,
    race: Option<Race>,
    level: u8,
    abilities: Option<AbilityScores>,
    no_wisdom: bool,
    hp: Option<i32>,
    max_hp: Option<i32>,
    ac: Option<i32>,
    speed: u32,
    xp: u32,
    rating: u32,
    age: u32,
    dev_trait: DevTrait,
    role: Option<String>,
    main_hand: Option<Weapon>,
    off_hand: Option<Weapon>,
    armor_bonus: Option<i32>,
    shield_bonus: Option<i32>,
    spawn: Option<Position>,
    tactics: Option<TargetPolicy>,
    spell: Option<SpellEffect>,
    /// Spell uses given explicitly; otherwise the class table decides.
    spell_uses: Option<u32>,
    innate: FighterTraits,
}

impl FighterBuilder {
    pub fn new(id: u32, name: impl Into<String>, side: Side) -> Self {
        Self {
            id: FighterId(id),
            name: name.into(),
            side,
            class: None,
            style: None,
            race: None,
            level: 1,
            abilities: None,
            no_wisdom: false,
            hp: None,
            max_hp: None,
            ac: None,
            speed: 6,
            xp: 0,
            rating: 50,
            age: 25,
            dev_trait: DevTrait::Normal,
            role: None,
            main_hand: None,
            off_hand: None,
            armor_bonus: None,
            shield_bonus: None,
            spawn: None,
            tactics: None,
            spell: None,
            spell_uses: None,
            innate: FighterTraits::default(),
        }
    }

    pub fn class(mut self, class: CharacterClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn fighting_style(mut self, style: FightingStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn race(mut self, race: Race) -> Self {
        self.race = Some(race);
        self
    }

    pub fn level(mut self, level: u8) -> Self {
        self.level = level.clamp(1, 20);
        self
    }

    pub fn abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = Some(abilities);
        self
    }

    /// Set one score, starting from the class defaults for the rest.
    pub fn ability(mut self, ability: Ability, score: u8) -> Self {
        let class = self.class;
        self.abilities
            .get_or_insert_with(|| default_abilities(class))
            .set(ability, score);
        self
    }

    /// Use the five-score record with no WIS.
    pub fn without_wisdom(mut self) -> Self {
        self.no_wisdom = true;
        self
    }

    pub fn hp(mut self, hp: i32) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn max_hp(mut self, max_hp: i32) -> Self {
        self.max_hp = Some(max_hp);
        self
    }

    pub fn ac(mut self, ac: i32) -> Self {
        self.ac = Some(ac);
        self
    }

    /// Base speed in tiles.
    pub fn speed(mut self, tiles: u32) -> Self {
        self.speed = tiles;
        self
    }

    pub fn xp(mut self, xp: u32) -> Self {
        self.xp = xp;
        self
    }

    pub fn rating(mut self, rating: u32) -> Self {
        self.rating = rating;
        self
    }

    pub fn age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn dev_trait(mut self, dev_trait: DevTrait) -> Self {
        self.dev_trait = dev_trait;
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn weapon(mut self, weapon: Weapon) -> Self {
        self.main_hand = Some(weapon);
        self
    }

    pub fn off_hand(mut self, weapon: Weapon) -> Self {
        self.off_hand = Some(weapon);
        self
    }

    pub fn armor_bonus(mut self, bonus: i32) -> Self {
        self.armor_bonus = Some(bonus);
        self
    }

    pub fn shield_bonus(mut self, bonus: i32) -> Self {
        self.shield_bonus = Some(bonus);
        self
    }

    pub fn spawn(mut self, x: i32, y: i32) -> Self {
        self.spawn = Some(Position::new(x, y));
        self
    }

    pub fn tactics(mut self, policy: impl Into<TargetPolicy>) -> Self {
        self.tactics = Some(policy.into());
        self
    }

    /// Signature spell. Unless [`spell_uses`](Self::spell_uses) is set, its
    /// uses come from the class table (at least one).
    pub fn spell(mut self, spell: SpellEffect) -> Self {
        self.spell = Some(spell);
        self
    }

    pub fn spell_uses(mut self, uses: u32) -> Self {
        self.spell_uses = Some(uses);
        self
    }

    /// Extra riders layered over the class/race-derived ones.
    pub fn innate(mut self, traits: FighterTraits) -> Self {
        self.innate = traits;
        self
    }

    pub fn resist(mut self, damage_type: DamageType) -> Self {
        self.innate.resistances.insert(damage_type);
        self
    }

    pub fn immune_to(mut self, damage_type: DamageType) -> Self {
        self.innate.immunities.insert(damage_type);
        self
    }

    pub fn immune_to_condition(mut self, condition: Condition) -> Self {
        self.innate.condition_immunities.insert(condition);
        self
    }

    /// Assemble the fighter, deriving whatever was left unset.
    pub fn build(self) -> Fighter {
        let mut f = Fighter::new(self.id, self.name, self.side);
        f.class = self.class;
        f.fighting_style = self.style;
        f.race = self.race;
        f.set_level(self.level);
        f.abilities = self
            .abilities
            .unwrap_or_else(|| default_abilities(self.class));
        if self.no_wisdom {
            f.abilities.drop_wisdom();
        }
        f.speed = self.speed;
        f.xp = self.xp;
        f.rating = self.rating;
        f.age = self.age;
        f.dev_trait = self.dev_trait;
        f.role = self.role;
        f.spawn = self.spawn;
        f.tactics = self.tactics;
        f.innate = self.innate;
        refresh_traits(&mut f);

        let mut equipment = self
            .class
            .map(|class| starting_kit(class, self.style))
            .unwrap_or_default();
        if let Some(weapon) = self.main_hand {
            if weapon.two_handed {
                equipment.off_hand = None;
                equipment.shield_bonus = 0;
            }
            equipment.main_hand = weapon;
        }
        if let Some(weapon) = self.off_hand {
            equipment.off_hand = Some(weapon);
        }
        if let Some(bonus) = self.armor_bonus {
            equipment.armor_bonus = bonus.max(0);
        }
        if let Some(bonus) = self.shield_bonus {
            equipment.shield_bonus = bonus.max(0);
        }
        f.equipment = equipment;

        let derived_max = match self.class {
            Some(class) => class_max_hp(
                class,
                self.race,
                f.level(),
                f.modifier(Ability::Constitution),
            ),
            None => 10,
        };
        let max_hp = self.max_hp.or(self.hp).unwrap_or(derived_max);
        f.set_max_hp(max_hp);
        f.set_hp(self.hp.unwrap_or(max_hp));

        f.base_ac = self.ac;
        f.ac = self.ac.unwrap_or_else(|| derive_ac(&f));

        if let Some(mut spell) = self.spell {
            spell.uses = self.spell_uses.unwrap_or_else(|| {
                self.class
                    .map(|c| c.spell_uses(f.level()))
                    .unwrap_or(0)
                    .max(1)
            });
            f.spell = Some(spell);
        }
        f
    }
}

/// Ability scores for a descriptor that gives none: 10 across the board,
/// 14 in the class's primary and secondary abilities.
pub fn default_abilities(class: Option<CharacterClass>) -> AbilityScores {
    let mut scores = AbilityScores::default();
    if let Some(class) = class {
        for ability in class.favored_abilities() {
            scores.set(ability, FAVORED_ABILITY_DEFAULT);
        }
    }
    scores
}

// ============================================================================
// JSON descriptors
// ============================================================================

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| value.get(*k))
        .filter(|v| !v.is_null())
}

fn int(value: &Value, keys: &[&str]) -> Option<i64> {
    field(value, keys).and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn text<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(value, keys).and_then(Value::as_str)
}

fn flag(value: &Value, keys: &[&str]) -> bool {
    field(value, keys).and_then(Value::as_bool).unwrap_or(false)
}

fn names<'a>(value: &'a Value, keys: &[&str]) -> impl Iterator<Item = &'a str> {
    field(value, keys)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn side_from(value: &Value) -> Option<Side> {
    match field(value, &["team_id", "team", "side"])? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Side::from_index),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "home" | "a" => Some(Side::Home),
            "1" | "away" | "b" => Some(Side::Away),
            _ => None,
        },
        _ => None,
    }
}

const ABILITY_KEYS: [(Ability, [&str; 3]); 6] = [
    (Ability::Strength, ["STR", "str", "strength"]),
    (Ability::Dexterity, ["DEX", "dex", "dexterity"]),
    (Ability::Constitution, ["CON", "con", "constitution"]),
    (Ability::Intelligence, ["INT", "int", "intelligence"]),
    (Ability::Wisdom, ["WIS", "wis", "wisdom"]),
    (Ability::Charisma, ["CHA", "cha", "charisma"]),
];

/// Parse a weapon from a catalog name or an inline object.
pub fn weapon_from_value(value: &Value) -> Weapon {
    match value {
        Value::String(name) => get_weapon(name).unwrap_or_else(|| {
            tracing::warn!(weapon = %name, "unknown weapon, using fists");
            Weapon::fists()
        }),
        Value::Object(_) => {
            let name = text(value, &["name"]).unwrap_or("Weapon");
            let dice = text(value, &["damage", "dice", "dmg"]);
            let Some(dice) = dice else {
                return get_weapon(name).unwrap_or_else(|| {
                    tracing::warn!(weapon = %name, "weapon has no damage dice, using fists");
                    Weapon::fists()
                });
            };
            let damage_type = text(value, &["damage_type", "type"])
                .and_then(DamageType::parse)
                .unwrap_or(DamageType::Bludgeoning);
            let ranged = text(value, &["kind"]).is_some_and(|k| k.eq_ignore_ascii_case("ranged"))
                || field(value, &["range", "normal_range"]).is_some();
            let mut weapon = if ranged {
                let (normal, long) = match field(value, &["range"]).and_then(Value::as_array) {
                    Some(pair) if pair.len() == 2 => (
                        pair[0].as_u64().unwrap_or(1) as u32,
                        pair[1].as_u64().unwrap_or(1) as u32,
                    ),
                    _ => {
                        let normal = int(value, &["normal_range", "range"]).unwrap_or(6).max(1) as u32;
                        let long = int(value, &["long_range"]).map_or(normal * 4, |l| l.max(1) as u32);
                        (normal, long)
                    }
                };
                Weapon::ranged(name, dice, damage_type, normal, long)
            } else {
                Weapon::melee(name, dice, damage_type)
                    .with_reach(int(value, &["reach"]).unwrap_or(1).max(1) as u32)
            };
            weapon.finesse = flag(value, &["finesse"]);
            weapon.light = flag(value, &["light"]);
            weapon.two_handed = flag(value, &["two_handed", "twohanded"]);
            weapon.unarmed = flag(value, &["unarmed"]);
            weapon.to_hit_bonus = int(value, &["to_hit", "bonus", "magic"]).unwrap_or(0) as i32;
            if let Some(versatile) = text(value, &["versatile"]) {
                weapon = weapon.with_versatile(versatile);
            }
            weapon
        }
        other => {
            tracing::warn!(weapon = %other, "unrecognized weapon shape, using fists");
            Weapon::fists()
        }
    }
}

/// Parse a spell from a catalog name or an inline object.
pub fn spell_from_value(value: &Value) -> Option<SpellEffect> {
    match value {
        Value::String(name) => {
            let spell = SpellEffect::named(name);
            if spell.is_none() {
                tracing::warn!(spell = %name, "unknown spell, ignoring");
            }
            spell
        }
        Value::Object(_) => {
            let name = text(value, &["name"]).unwrap_or("Spell");
            let dice = text(value, &["dice", "damage"]).unwrap_or("0");
            let damage_type = text(value, &["damage_type"])
                .and_then(DamageType::parse)
                .unwrap_or(DamageType::Force);
            let save = text(value, &["save"]).and_then(Ability::parse);
            let range = int(value, &["range", "normal_range"]).unwrap_or(12).max(0) as u32;
            let mut spell = match (text(value, &["delivery", "type"]), save) {
                (Some(kind), Some(save)) if kind.eq_ignore_ascii_case("area") => {
                    let radius = int(value, &["radius"]).unwrap_or(1).max(0) as u32;
                    SpellEffect::area(name, dice, damage_type, range, radius, save)
                }
                (_, Some(save)) => SpellEffect::save(name, dice, damage_type, range, save),
                (_, None) => {
                    let long = int(value, &["long_range"]).map_or(range, |l| l.max(0) as u32);
                    SpellEffect::attack(name, dice, damage_type, range, long)
                }
            };
            if matches!(spell.delivery, SpellDelivery::Save { .. } | SpellDelivery::Area { .. })
                && field(value, &["half", "half_on_success"]).and_then(Value::as_bool) == Some(false)
            {
                spell = spell.no_half();
            }
            if let Some(ability) = text(value, &["ability"]).and_then(Ability::parse) {
                spell = spell.with_ability(ability);
            }
            for tag in names(value, &["tags"]).filter_map(SaveTag::parse) {
                spell = spell.with_tag(tag);
            }
            if let Some(condition) = text(value, &["condition"]).and_then(Condition::parse) {
                let duration = int(value, &["duration"]).unwrap_or(1).max(1) as u32;
                spell = spell.with_condition(condition, duration);
            }
            if spell.dice == DiceExpression::flat(0) && spell.on_fail.is_none() {
                tracing::warn!(spell = %name, "spell has neither damage nor a condition");
            }
            Some(spell)
        }
        _ => None,
    }
}

/// Build a fighter from a loose JSON descriptor.
///
/// `index` is the descriptor's position in its roster; it becomes the id
/// (plus one) when the descriptor has none.
pub fn fighter_from_value(value: &Value, index: usize) -> Result<Fighter, CombatError> {
    if !value.is_object() {
        return Err(CombatError::RosterShape(format!(
            "entry {index} is not an object"
        )));
    }
    let id = int(value, &["id", "pid", "fighter_id"])
        .and_then(|id| u32::try_from(id).ok())
        .unwrap_or(index as u32 + 1);
    let name = text(value, &["name"])
        .map(str::to_string)
        .unwrap_or_else(|| format!("Fighter {id}"));
    let side = side_from(value).unwrap_or_else(|| {
        tracing::warn!(fighter = %name, "descriptor has no usable team, defaulting to team 0");
        Side::Home
    });

    let mut builder = FighterBuilder::new(id, name, side);

    if let Some(class_name) = text(value, &["class", "cls"]) {
        match CharacterClass::parse(class_name) {
            Some((class, style)) => {
                builder = builder.class(class);
                if let Some(style) = style {
                    builder = builder.fighting_style(style);
                }
            }
            None => tracing::warn!(class = class_name, "unknown class, treating as classless"),
        }
    }
    if let Some(style) = text(value, &["style", "fighting_style"]).and_then(FightingStyle::from_class_name) {
        builder = builder.fighting_style(style);
    }
    if let Some(race) = text(value, &["race"]).and_then(Race::parse) {
        builder = builder.race(race);
    }
    if let Some(level) = int(value, &["level", "lvl"]) {
        builder = builder.level(level.clamp(1, 20) as u8);
    }

    for (ability, keys) in ABILITY_KEYS {
        if let Some(score) = int(value, &keys) {
            builder = builder.ability(ability, score.clamp(1, 30) as u8);
        }
    }
    let no_wisdom = text(value, &["ability_set"])
        .map(|s| s.replace(['-', ' '], "_").eq_ignore_ascii_case("no_wisdom"))
        .unwrap_or(false);
    if no_wisdom {
        builder = builder.without_wisdom();
    }

    if let Some(hp) = int(value, &["hp", "HP", "current_hp"]) {
        builder = builder.hp(hp as i32);
    }
    if let Some(max) = int(value, &["max_hp", "maxHP", "hp_max"]) {
        builder = builder.max_hp(max as i32);
    }
    if let Some(ac) = int(value, &["ac", "AC", "armor_class"]) {
        builder = builder.ac(ac as i32);
    }
    if let Some(tiles) = int(value, &["speed", "spd"]) {
        builder = builder.speed(tiles.max(0) as u32);
    } else if let Some(feet) = int(value, &["speed_ft"]) {
        builder = builder.speed((feet.max(0) / 5) as u32);
    }
    if let Some(xp) = int(value, &["xp", "XP", "xp_total"]) {
        builder = builder.xp(xp.max(0) as u32);
    }
    if let Some(rating) = int(value, &["ovr", "OVR", "rating"]) {
        builder = builder.rating(rating.max(0) as u32);
    }
    if let Some(age) = int(value, &["age"]) {
        builder = builder.age(age.max(0) as u32);
    }
    if let Some(dev) = text(value, &["dev_trait", "development"]).and_then(DevTrait::parse) {
        builder = builder.dev_trait(dev);
    }
    if let Some(role) = text(value, &["role"]) {
        builder = builder.role(role);
    }

    if let Some(weapon) = field(value, &["weapon", "main_hand"]) {
        builder = builder.weapon(weapon_from_value(weapon));
    }
    if let Some(weapon) = field(value, &["off_hand", "offhand"]) {
        builder = builder.off_hand(weapon_from_value(weapon));
    }
    if let Some(bonus) = int(value, &["armor_bonus"]) {
        builder = builder.armor_bonus(bonus as i32);
    }
    if let Some(bonus) = int(value, &["shield_bonus"]) {
        builder = builder.shield_bonus(bonus as i32);
    }

    let x = int(value, &["x", "tx"]);
    let y = int(value, &["y", "ty"]);
    if x.is_some() || y.is_some() {
        builder = builder.spawn(x.unwrap_or(0) as i32, y.unwrap_or(0) as i32);
    }

    if let Some(tactic) = text(value, &["tactic", "tactics"]) {
        match TargetPolicy::parse(tactic) {
            Some(policy) => builder = builder.tactics(policy),
            None => tracing::warn!(tactic, "no usable targeting rule, using the team policy"),
        }
    }

    if let Some(spell) = field(value, &["spell"]).and_then(spell_from_value) {
        let uses = int(value, &["spell_uses"])
            .or_else(|| field(value, &["spell"]).and_then(|s| int(s, &["uses"])));
        builder = builder.spell(spell);
        if let Some(uses) = uses {
            builder = builder.spell_uses(uses.max(0) as u32);
        }
    }

    for name in names(value, &["resistances", "resist"]) {
        match DamageType::parse(name) {
            Some(t) => builder = builder.resist(t),
            None => tracing::warn!(damage_type = name, "unknown damage type"),
        }
    }
    for name in names(value, &["immunities"]) {
        if let Some(t) = DamageType::parse(name) {
            builder = builder.immune_to(t);
        }
    }
    for name in names(value, &["condition_immunities"]) {
        if let Some(c) = Condition::parse(name) {
            builder = builder.immune_to_condition(c);
        }
    }

    Ok(builder.build())
}

/// Build a roster from a JSON array of descriptors.
pub fn roster_from_json(json: &str) -> Result<Vec<Fighter>, CombatError> {
    let value: Value = serde_json::from_str(json)?;
    let entries = value
        .as_array()
        .ok_or_else(|| CombatError::RosterShape("top-level value is not an array".into()))?;
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| fighter_from_value(entry, index))
        .collect()
}
