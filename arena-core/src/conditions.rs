//! Timed status effects and saving throws.
//!
//! Conditions live in a [`ConditionBag`] keyed by condition, each with a
//! remaining-turns counter. Counters tick down once at the start of the
//! holder's own turn.

use crate::dice::{Advantage, DiceRng};
use crate::fighter::{Ability, Fighter, FighterId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status effects tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Stunned,
    Paralyzed,
    Asleep,
    Charmed,
    Frightened,
    Blinded,
    Prone,
    Restrained,
    Poisoned,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Stunned => "stunned",
            Condition::Paralyzed => "paralyzed",
            Condition::Asleep => "asleep",
            Condition::Charmed => "charmed",
            Condition::Frightened => "frightened",
            Condition::Blinded => "blinded",
            Condition::Prone => "prone",
            Condition::Restrained => "restrained",
            Condition::Poisoned => "poisoned",
        }
    }

    pub fn parse(name: &str) -> Option<Condition> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stunned" | "stun" => Some(Condition::Stunned),
            "paralyzed" | "paralysis" => Some(Condition::Paralyzed),
            "asleep" | "sleep" => Some(Condition::Asleep),
            "charmed" | "charm" => Some(Condition::Charmed),
            "frightened" | "fear" => Some(Condition::Frightened),
            "blinded" | "blind" => Some(Condition::Blinded),
            "prone" => Some(Condition::Prone),
            "restrained" => Some(Condition::Restrained),
            "poisoned" | "poison" => Some(Condition::Poisoned),
            _ => None,
        }
    }

    /// The holder loses its whole action.
    pub fn is_incapacitating(&self) -> bool {
        matches!(
            self,
            Condition::Stunned | Condition::Paralyzed | Condition::Asleep
        )
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tags carried by a saving throw; race and class perks key off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTag {
    Poison,
    Charm,
    Magic,
    Sleep,
    Fear,
    Mental,
}

impl SaveTag {
    pub fn parse(name: &str) -> Option<SaveTag> {
        match name.trim().to_ascii_lowercase().as_str() {
            "poison" => Some(SaveTag::Poison),
            "charm" => Some(SaveTag::Charm),
            "magic" => Some(SaveTag::Magic),
            "sleep" => Some(SaveTag::Sleep),
            "fear" => Some(SaveTag::Fear),
            "mental" => Some(SaveTag::Mental),
            _ => None,
        }
    }

    /// The tag a condition's save naturally carries.
    pub fn for_condition(condition: Condition) -> Option<SaveTag> {
        match condition {
            Condition::Poisoned => Some(SaveTag::Poison),
            Condition::Charmed => Some(SaveTag::Charm),
            Condition::Asleep => Some(SaveTag::Sleep),
            Condition::Frightened => Some(SaveTag::Fear),
            _ => None,
        }
    }
}

/// A condition applied to a fighter with tracking info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCondition {
    pub remaining: u32,
    /// Who applied it; a charmed fighter will not attack its charmer.
    pub source: Option<FighterId>,
}

/// Condition -> remaining turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConditionBag {
    active: BTreeMap<Condition, ActiveCondition>,
}

impl ConditionBag {
    pub fn has(&self, condition: Condition) -> bool {
        self.active
            .get(&condition)
            .map(|c| c.remaining > 0)
            .unwrap_or(false)
    }

    pub fn remaining(&self, condition: Condition) -> u32 {
        self.active.get(&condition).map(|c| c.remaining).unwrap_or(0)
    }

    pub fn source(&self, condition: Condition) -> Option<FighterId> {
        self.active.get(&condition).and_then(|c| c.source)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Condition, &ActiveCondition)> {
        self.active.iter().map(|(c, a)| (*c, a))
    }

    /// First incapacitating condition held, if any.
    pub fn incapacitating(&self) -> Option<Condition> {
        self.active
            .keys()
            .copied()
            .find(|c| c.is_incapacitating() && self.has(*c))
    }

    /// Set or extend a counter. Returns true if the condition was already active.
    ///
    /// A zero duration is a no-op.
    pub fn apply(&mut self, condition: Condition, duration: u32, source: Option<FighterId>) -> bool {
        if duration == 0 {
            return self.has(condition);
        }
        match self.active.get_mut(&condition) {
            Some(existing) => {
                existing.remaining += duration;
                if source.is_some() {
                    existing.source = source;
                }
                true
            }
            None => {
                self.active.insert(
                    condition,
                    ActiveCondition {
                        remaining: duration,
                        source,
                    },
                );
                false
            }
        }
    }

    pub fn clear(&mut self, condition: Condition) -> bool {
        self.active.remove(&condition).is_some()
    }

    /// Tick every counter down by one; returns the conditions that ended.
    pub fn decrement_all(&mut self) -> Vec<Condition> {
        let mut ended = Vec::new();
        self.active.retain(|condition, active| {
            active.remaining = active.remaining.saturating_sub(1);
            if active.remaining == 0 {
                ended.push(*condition);
                false
            } else {
                true
            }
        });
        ended
    }
}

/// Why a condition did not stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmunityReason {
    /// Class/race immunity to the condition itself.
    Immune,
    /// An ally's aura (e.g. courage) protects the target.
    Aura,
    Dead,
}

/// Result of [`apply_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Applied,
    Extended,
    Ignored(ImmunityReason),
}

/// Apply a condition, checking immunities first.
///
/// `aura_protected` is true when an ally's aura currently covers the target;
/// it only matters for [`Condition::Frightened`]. On an immune target the bag
/// is left untouched.
pub fn apply_condition(
    fighter: &mut Fighter,
    condition: Condition,
    duration: u32,
    source: Option<FighterId>,
    aura_protected: bool,
) -> ConditionOutcome {
    if !fighter.is_alive() {
        return ConditionOutcome::Ignored(ImmunityReason::Dead);
    }
    if fighter.traits.condition_immunities.contains(&condition) {
        return ConditionOutcome::Ignored(ImmunityReason::Immune);
    }
    if condition == Condition::Frightened && aura_protected {
        return ConditionOutcome::Ignored(ImmunityReason::Aura);
    }
    if fighter.conditions.apply(condition, duration, source) {
        ConditionOutcome::Extended
    } else {
        ConditionOutcome::Applied
    }
}

/// Result of a saving throw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub ability: Ability,
    pub dc: i32,
    pub natural: u32,
    pub total: i32,
    pub advantage: Advantage,
    pub success: bool,
}

/// Roll a saving throw: d20 + ability modifier vs `dc`.
///
/// Any single matching advantage source upgrades the roll; sources never
/// stack. Stunned, paralyzed and sleeping fighters fail STR and DEX saves.
pub fn saving_throw(
    fighter: &Fighter,
    ability: Ability,
    dc: i32,
    tags: &[SaveTag],
    rng: &mut DiceRng,
) -> SaveOutcome {
    let physical = matches!(ability, Ability::Strength | Ability::Dexterity);
    if physical && fighter.is_incapacitated() {
        return SaveOutcome {
            ability,
            dc,
            natural: 0,
            total: 0,
            advantage: Advantage::Normal,
            success: false,
        };
    }

    let traits = &fighter.traits;
    let any_advantage = traits.save_advantage_all
        || tags.iter().any(|tag| traits.save_advantage.contains(tag));
    let any_disadvantage = (ability == Ability::Dexterity
        && fighter.has_condition(Condition::Restrained))
        || (fighter.has_condition(Condition::Poisoned) && tags.contains(&SaveTag::Poison));
    let advantage = Advantage::from_sources(any_advantage, any_disadvantage);

    let roll = rng.d20(advantage);
    let total = roll.natural as i32 + fighter.modifier(ability);
    SaveOutcome {
        ability: fighter.abilities.effective(ability),
        dc,
        natural: roll.natural,
        total,
        advantage,
        success: total >= dc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::Side;

    fn target() -> Fighter {
        Fighter::new(FighterId(7), "Target", Side::Away)
    }

    #[test]
    fn test_apply_extends_counter() {
        let mut bag = ConditionBag::default();
        assert!(!bag.apply(Condition::Stunned, 2, None));
        assert!(bag.apply(Condition::Stunned, 1, None));
        assert_eq!(bag.remaining(Condition::Stunned), 3);
    }

    #[test]
    fn test_decrement_removes_at_zero() {
        let mut bag = ConditionBag::default();
        bag.apply(Condition::Prone, 1, None);
        bag.apply(Condition::Blinded, 2, None);
        assert_eq!(bag.decrement_all(), vec![Condition::Prone]);
        assert!(!bag.has(Condition::Prone));
        assert_eq!(bag.remaining(Condition::Blinded), 1);
        assert_eq!(bag.decrement_all(), vec![Condition::Blinded]);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_zero_duration_is_noop() {
        let mut bag = ConditionBag::default();
        bag.apply(Condition::Charmed, 0, None);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_immune_target_is_untouched() {
        let mut f = target();
        f.traits.condition_immunities.insert(Condition::Asleep);
        let before = f.conditions.clone();
        let outcome = apply_condition(&mut f, Condition::Asleep, 3, None, false);
        assert_eq!(outcome, ConditionOutcome::Ignored(ImmunityReason::Immune));
        assert_eq!(f.conditions, before);
    }

    #[test]
    fn test_fear_aura_blocks_frightened_only() {
        let mut f = target();
        assert_eq!(
            apply_condition(&mut f, Condition::Frightened, 2, None, true),
            ConditionOutcome::Ignored(ImmunityReason::Aura)
        );
        assert_eq!(
            apply_condition(&mut f, Condition::Blinded, 2, None, true),
            ConditionOutcome::Applied
        );
    }

    #[test]
    fn test_charm_source_recorded() {
        let mut f = target();
        apply_condition(&mut f, Condition::Charmed, 2, Some(FighterId(3)), false);
        assert_eq!(f.conditions.source(Condition::Charmed), Some(FighterId(3)));
    }

    #[test]
    fn test_save_advantage_from_tag() {
        let mut f = target();
        f.traits.save_advantage.insert(SaveTag::Poison);
        let mut rng = DiceRng::from_u64(5);
        let save = saving_throw(&f, Ability::Constitution, 12, &[SaveTag::Poison], &mut rng);
        assert_eq!(save.advantage, Advantage::Advantage);

        let save = saving_throw(&f, Ability::Constitution, 12, &[SaveTag::Charm], &mut rng);
        assert_eq!(save.advantage, Advantage::Normal);
    }

    #[test]
    fn test_multiple_sources_still_single_advantage() {
        let mut f = target();
        f.traits.save_advantage_all = true;
        f.traits.save_advantage.insert(SaveTag::Charm);
        f.traits.save_advantage.insert(SaveTag::Magic);
        let mut rng = DiceRng::from_u64(9);
        let save = saving_throw(
            &f,
            Ability::Wisdom,
            15,
            &[SaveTag::Charm, SaveTag::Magic],
            &mut rng,
        );
        assert_eq!(save.advantage, Advantage::Advantage);
    }

    #[test]
    fn test_stunned_fails_dex_save() {
        let mut f = target();
        f.conditions.apply(Condition::Stunned, 1, None);
        let mut rng = DiceRng::from_u64(1);
        let save = saving_throw(&f, Ability::Dexterity, 1, &[], &mut rng);
        assert!(!save.success);
    }

    #[test]
    fn test_save_uses_int_without_wisdom() {
        let mut f = target();
        f.abilities.drop_wisdom();
        let mut rng = DiceRng::from_u64(1);
        let save = saving_throw(&f, Ability::Wisdom, 10, &[], &mut rng);
        assert_eq!(save.ability, Ability::Intelligence);
    }
}
