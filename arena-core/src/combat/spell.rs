//! Signature spells.
//!
//! Spells arrive as effect descriptors: a delivery (attack roll, single-target
//! save or area save), damage dice and an optional condition rider. The
//! session resolves them with the same dice stream and mitigation path as
//! weapon attacks.

use super::attack::DamageSource;
use super::CombatSession;
use crate::conditions::{saving_throw, Condition, SaveTag};
use crate::dice::DiceExpression;
use crate::events::{AttackHand, CombatEvent, MissReason};
use crate::fighter::{Ability, DamageType, Fighter};
use crate::grid::distance;
use serde::{Deserialize, Serialize};

/// How a spell reaches its target. Ranges and radii are in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpellDelivery {
    /// Spell attack roll against AC.
    Attack { normal_range: u32, long_range: u32 },
    /// One target rolls a save.
    Save {
        range: u32,
        save: Ability,
        half_on_success: bool,
    },
    /// Everyone within `radius` of the target rolls a save.
    Area {
        range: u32,
        radius: u32,
        save: Ability,
        half_on_success: bool,
    },
}

impl SpellDelivery {
    /// Farthest target the spell can be aimed at.
    pub fn range(&self) -> u32 {
        match *self {
            SpellDelivery::Attack { long_range, .. } => long_range,
            SpellDelivery::Save { range, .. } | SpellDelivery::Area { range, .. } => range,
        }
    }
}

/// Condition laid on a failed save or a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRider {
    pub condition: Condition,
    pub duration: u32,
}

/// A castable spell with a per-combat use count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEffect {
    pub name: String,
    pub delivery: SpellDelivery,
    pub dice: DiceExpression,
    /// Casting ability; falls back to the class spellcasting ability, then INT.
    pub ability: Option<Ability>,
    pub damage_type: DamageType,
    pub tags: Vec<SaveTag>,
    pub on_fail: Option<ConditionRider>,
    pub uses: u32,
}

impl SpellEffect {
    pub fn attack(
        name: impl Into<String>,
        dice: &str,
        damage_type: DamageType,
        normal_range: u32,
        long_range: u32,
    ) -> Self {
        Self::with_delivery(
            name,
            SpellDelivery::Attack {
                normal_range,
                long_range: long_range.max(normal_range),
            },
            dice,
            damage_type,
        )
    }

    pub fn save(
        name: impl Into<String>,
        dice: &str,
        damage_type: DamageType,
        range: u32,
        save: Ability,
    ) -> Self {
        Self::with_delivery(
            name,
            SpellDelivery::Save {
                range,
                save,
                half_on_success: true,
            },
            dice,
            damage_type,
        )
    }

    pub fn area(
        name: impl Into<String>,
        dice: &str,
        damage_type: DamageType,
        range: u32,
        radius: u32,
        save: Ability,
    ) -> Self {
        Self::with_delivery(
            name,
            SpellDelivery::Area {
                range,
                radius,
                save,
                half_on_success: true,
            },
            dice,
            damage_type,
        )
    }

    fn with_delivery(
        name: impl Into<String>,
        delivery: SpellDelivery,
        dice: &str,
        damage_type: DamageType,
    ) -> Self {
        Self {
            name: name.into(),
            delivery,
            dice: DiceExpression::parse_or_default(dice),
            ability: None,
            damage_type,
            tags: Vec::new(),
            on_fail: None,
            uses: 1,
        }
    }

    pub fn with_uses(mut self, uses: u32) -> Self {
        self.uses = uses;
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.ability = Some(ability);
        self
    }

    pub fn with_tag(mut self, tag: SaveTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn with_condition(mut self, condition: Condition, duration: u32) -> Self {
        self.on_fail = Some(ConditionRider {
            condition,
            duration,
        });
        self
    }

    /// Successful saves take nothing instead of half.
    pub fn no_half(mut self) -> Self {
        match &mut self.delivery {
            SpellDelivery::Save {
                half_on_success, ..
            }
            | SpellDelivery::Area {
                half_on_success, ..
            } => *half_on_success = false,
            SpellDelivery::Attack { .. } => {}
        }
        self
    }

    pub fn range(&self) -> u32 {
        self.delivery.range()
    }

    pub fn is_ready(&self) -> bool {
        self.uses > 0
    }

    /// Look up a catalog spell by name (case-insensitive, spaces or underscores).
    pub fn named(name: &str) -> Option<SpellEffect> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        SPELLS
            .iter()
            .find(|s| s.name.to_ascii_lowercase().replace(' ', "_") == key)
            .cloned()
    }
}

lazy_static::lazy_static! {
    /// Signature spells descriptors may refer to by name.
    pub static ref SPELLS: Vec<SpellEffect> = vec![
        SpellEffect::attack("Fire Bolt", "1d10", DamageType::Fire, 24, 24),
        SpellEffect::attack("Eldritch Blast", "1d10", DamageType::Force, 24, 24),
        SpellEffect::attack("Ray of Frost", "1d8", DamageType::Cold, 12, 12),
        SpellEffect::attack("Guiding Bolt", "4d6", DamageType::Radiant, 24, 24),
        SpellEffect::save("Sacred Flame", "1d8", DamageType::Radiant, 12, Ability::Dexterity)
            .no_half(),
        SpellEffect::save("Vicious Mockery", "1d4", DamageType::Psychic, 12, Ability::Wisdom)
            .no_half()
            .with_tag(SaveTag::Mental),
        SpellEffect::save("Hold Person", "0", DamageType::Psychic, 12, Ability::Wisdom)
            .no_half()
            .with_condition(Condition::Paralyzed, 2),
        SpellEffect::save("Cause Fear", "0", DamageType::Psychic, 12, Ability::Wisdom)
            .no_half()
            .with_condition(Condition::Frightened, 2),
        SpellEffect::save("Poison Spray", "1d12", DamageType::Poison, 2, Ability::Constitution)
            .no_half()
            .with_tag(SaveTag::Poison),
        SpellEffect::save("Charm Person", "0", DamageType::Psychic, 6, Ability::Wisdom)
            .no_half()
            .with_condition(Condition::Charmed, 3),
        SpellEffect::area("Fireball", "8d6", DamageType::Fire, 30, 4, Ability::Dexterity),
        SpellEffect::area("Thunderwave", "2d8", DamageType::Thunder, 1, 1, Ability::Constitution),
        SpellEffect::area("Sleep Cloud", "0", DamageType::Psychic, 18, 2, Ability::Wisdom)
            .no_half()
            .with_condition(Condition::Asleep, 2),
        SpellEffect::area("Entangle", "0", DamageType::Bludgeoning, 18, 2, Ability::Strength)
            .no_half()
            .with_condition(Condition::Restrained, 2),
    ];
}

/// Casting ability modifier for `caster` and `spell`.
pub fn casting_modifier(caster: &Fighter, spell: &SpellEffect) -> i32 {
    let ability = spell
        .ability
        .or_else(|| caster.class.and_then(|c| c.spellcasting_ability()))
        .unwrap_or(Ability::Intelligence);
    caster.modifier(ability)
}

/// Save DC: 8 + proficiency + casting modifier.
pub fn spell_save_dc(caster: &Fighter, spell: &SpellEffect) -> i32 {
    8 + caster.proficiency_bonus() + casting_modifier(caster, spell)
}

/// Damage on a save: evasion on DEX saves turns success into nothing and
/// failure into half.
fn save_damage(full: i32, success: bool, half_on_success: bool, evasion: bool) -> i32 {
    match (success, evasion) {
        (true, true) => 0,
        (false, true) => full / 2,
        (true, false) if half_on_success => full / 2,
        (true, false) => 0,
        (false, false) => full,
    }
}

impl CombatSession {
    /// `caster`'s signature spell is ready and `target` is within its range.
    pub(crate) fn can_cast_at(&self, caster: usize, target: usize) -> bool {
        let c = &self.fighters[caster];
        c.spell.as_ref().is_some_and(|spell| {
            spell.is_ready()
                && distance(c.position, self.fighters[target].position) <= spell.range()
        })
    }

    /// Cast `caster`'s signature spell at `target`, spending one use.
    pub(crate) fn cast_spell(&mut self, caster: usize, target: usize) {
        let Some(spell) = self.fighters[caster].spell.as_mut().and_then(|spell| {
            if spell.uses == 0 {
                return None;
            }
            spell.uses -= 1;
            Some(spell.clone())
        }) else {
            return;
        };

        self.log.push(CombatEvent::SpellCast {
            caster: self.fighters[caster].name.clone(),
            spell: spell.name.clone(),
            target: self.fighters[target].name.clone(),
        });
        self.fighters[caster].hidden = false;
        tracing::debug!(
            caster = %self.fighters[caster].name,
            spell = %spell.name,
            target = %self.fighters[target].name,
            "spell cast"
        );

        match spell.delivery {
            SpellDelivery::Attack {
                normal_range,
                long_range,
            } => self.spell_attack(caster, target, &spell, normal_range, long_range),
            SpellDelivery::Save {
                save,
                half_on_success,
                ..
            } => {
                let full = self.roll_spell_damage(&spell);
                self.spell_save(caster, target, &spell, save, half_on_success, full);
            }
            SpellDelivery::Area {
                radius,
                save,
                half_on_success,
                ..
            } => {
                let centre = self.fighters[target].position;
                let sculpting = self.fighters[caster].traits.spell_sculpting;
                let side = self.fighters[caster].side;
                let caught: Vec<usize> = self
                    .fighters
                    .iter()
                    .enumerate()
                    .filter(|(i, f)| {
                        *i != caster && f.is_alive() && distance(f.position, centre) <= radius
                    })
                    .filter(|(_, f)| !(sculpting && f.side == side))
                    .map(|(i, _)| i)
                    .collect();
                let full = self.roll_spell_damage(&spell);
                for index in caught {
                    self.spell_save(caster, index, &spell, save, half_on_success, full);
                }
            }
        }
    }

    fn roll_spell_damage(&mut self, spell: &SpellEffect) -> i32 {
        if spell.dice.max_value() <= 0 {
            return 0;
        }
        self.rng.roll(&spell.dice).max(0)
    }

    fn spell_attack(
        &mut self,
        caster: usize,
        target: usize,
        spell: &SpellEffect,
        normal_range: u32,
        long_range: u32,
    ) {
        let caster_name = self.fighters[caster].name.clone();
        let target_name = self.fighters[target].name.clone();
        let dist = distance(
            self.fighters[caster].position,
            self.fighters[target].position,
        );
        if dist > long_range {
            self.log.push(CombatEvent::Miss {
                attacker: caster_name,
                defender: target_name,
                reason: MissReason::OutOfRange,
            });
            return;
        }

        let enemy_adjacent = self.enemy_adjacent(caster);
        let c = &self.fighters[caster];
        let t = &self.fighters[target];
        let advantage = super::attack::attack_advantage(
            c,
            t,
            true,
            dist > normal_range,
            enemy_adjacent,
        );
        let modifier = casting_modifier(c, spell);
        let proficiency = c.proficiency_bonus();
        let target_ac = t.ac;

        let roll = self.rng.d20(advantage);
        let total = roll.natural as i32 + modifier + proficiency;
        let critical = roll.is_critical();
        let hit = critical || total >= target_ac;

        self.log.push(CombatEvent::Attack {
            attacker: caster_name.clone(),
            defender: target_name.clone(),
            hand: AttackHand::Spell,
            natural: roll.natural,
            total,
            target_ac,
            hit,
            critical,
            advantage,
            proficiency,
        });
        if !hit {
            self.log.push(CombatEvent::Miss {
                attacker: caster_name,
                defender: target_name,
                reason: MissReason::Roll,
            });
            return;
        }

        if spell.dice.max_value() > 0 {
            let amount = (self.rng.roll_damage(&spell.dice, critical) + modifier).max(1);
            self.apply_damage(
                caster,
                target,
                amount,
                spell.damage_type,
                DamageSource::Spell,
                critical,
            );
        }
        if let Some(rider) = spell.on_fail {
            if self.fighters[target].is_alive() {
                self.inflict_condition(Some(caster), target, rider.condition, rider.duration);
            }
        }
    }

    fn spell_save(
        &mut self,
        caster: usize,
        target: usize,
        spell: &SpellEffect,
        ability: Ability,
        half_on_success: bool,
        full: i32,
    ) {
        if !self.fighters[target].is_alive() {
            return;
        }
        let dc = spell_save_dc(&self.fighters[caster], spell);
        let mut tags = Self::condition_tags(spell.on_fail.map(|r| r.condition), &spell.tags);
        if !tags.contains(&SaveTag::Magic) {
            tags.push(SaveTag::Magic);
        }
        let outcome = saving_throw(&self.fighters[target], ability, dc, &tags, &mut self.rng);
        self.log.push(CombatEvent::Save {
            target: self.fighters[target].name.clone(),
            ability: outcome.ability,
            dc,
            natural: outcome.natural,
            total: outcome.total,
            advantage: outcome.advantage,
            success: outcome.success,
        });

        let evasion = ability == Ability::Dexterity && self.fighters[target].traits.evasion;
        let amount = save_damage(full, outcome.success, half_on_success, evasion);
        if amount > 0 {
            self.apply_damage(
                caster,
                target,
                amount,
                spell.damage_type,
                DamageSource::Spell,
                false,
            );
        }
        if !outcome.success && self.fighters[target].is_alive() {
            if let Some(rider) = spell.on_fail {
                self.inflict_condition(Some(caster), target, rider.condition, rider.duration);
            }
        }
    }
}
