//! Weapon attacks and damage mitigation.
//!
//! The pure helpers here compute attack bonuses, advantage and damage dice
//! from fighter state alone; [`CombatSession::resolve_attack`] rolls them
//! and writes the results back.

use super::CombatSession;
use crate::conditions::{apply_condition, Condition, ConditionOutcome, SaveTag};
use crate::dice::{Advantage, DiceExpression};
use crate::events::{AttackHand, CombatEvent, MissReason};
use crate::fighter::{Ability, DamageType, Fighter, FighterId, Weapon};
use crate::grid::distance;

/// Where damage came from; mitigation riders care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    Weapon { ranged: bool },
    Spell,
}

/// What one attack did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttackOutcome {
    pub hit: bool,
    pub critical: bool,
    /// HP actually removed from the defender.
    pub damage: i32,
    pub downed: bool,
}

/// Per-turn rider bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TurnState {
    pub sneak_used: bool,
    /// The actor's charmer, who may not be attacked this turn.
    pub exclude: Option<FighterId>,
}

/// The weapon used for an attack in `hand`, if the fighter has one there.
pub fn weapon_for(attacker: &Fighter, hand: AttackHand) -> Option<Weapon> {
    match hand {
        AttackHand::Main | AttackHand::Opportunity => Some(attacker.equipment.main_hand.clone()),
        AttackHand::OffHand => attacker.equipment.off_hand.clone(),
        AttackHand::Bonus => Some(Weapon::fists()),
        AttackHand::Spell => None,
    }
}

/// Proficiency added to an attack roll in `hand`.
pub fn attack_proficiency(attacker: &Fighter, hand: AttackHand) -> i32 {
    if hand == AttackHand::OffHand && !attacker.traits.offhand_proficiency {
        0
    } else {
        attacker.proficiency_bonus()
    }
}

/// Ability + proficiency + archery + magic bonus.
pub fn attack_bonus(attacker: &Fighter, weapon: &Weapon, hand: AttackHand) -> i32 {
    let archery = if weapon.is_ranged() && attacker.traits.archery {
        2
    } else {
        0
    };
    attacker.weapon_ability_modifier(weapon)
        + attack_proficiency(attacker, hand)
        + archery
        + weapon.to_hit_bonus
}

/// Collapse every advantage and disadvantage source for one attack roll.
///
/// `enemy_adjacent` is whether a living enemy stands next to the attacker;
/// it only matters for ranged attacks.
pub fn attack_advantage(
    attacker: &Fighter,
    defender: &Fighter,
    ranged: bool,
    long_range: bool,
    enemy_adjacent: bool,
) -> Advantage {
    let adjacent = distance(attacker.position, defender.position) <= 1;
    let defender_prone = defender.has_condition(Condition::Prone);

    let any_advantage = !defender.traits.elusive
        && (attacker.hidden
            || [
                Condition::Blinded,
                Condition::Stunned,
                Condition::Paralyzed,
                Condition::Restrained,
                Condition::Asleep,
            ]
            .into_iter()
            .any(|c| defender.has_condition(c))
            || (defender_prone && adjacent));

    let any_disadvantage = [
        Condition::Blinded,
        Condition::Frightened,
        Condition::Poisoned,
        Condition::Restrained,
    ]
    .into_iter()
    .any(|c| attacker.has_condition(c))
        || (defender_prone && !adjacent)
        || (ranged && long_range)
        || (ranged && enemy_adjacent)
        || defender.hidden;

    Advantage::from_sources(any_advantage, any_disadvantage)
}

/// Damage dice for a hit with `weapon`.
///
/// Versatile weapons swing their bigger die with both hands; unarmed
/// strikes use the martial-arts die when it is larger.
pub fn damage_dice(attacker: &Fighter, weapon: &Weapon, hand: AttackHand) -> DiceExpression {
    if weapon.unarmed {
        if let Some(die) = &attacker.traits.unarmed_die {
            if die.max_value() > weapon.damage.max_value() {
                return die.clone();
            }
        }
        return weapon.damage.clone();
    }
    let main = matches!(hand, AttackHand::Main | AttackHand::Opportunity);
    match &weapon.versatile {
        Some(two_handed) if main && attacker.equipment.uses_both_hands() => two_handed.clone(),
        _ => weapon.damage.clone(),
    }
}

/// Flat damage added to the dice: ability modifier (only a penalty in the
/// off hand), rage, dueling and an explicit damage-proficiency rider.
pub fn damage_bonus(attacker: &Fighter, weapon: &Weapon, hand: AttackHand) -> i32 {
    let ability = attacker.weapon_ability_modifier(weapon);
    let mut bonus = if hand == AttackHand::OffHand {
        ability.min(0)
    } else {
        ability
    };

    let strength_melee =
        !weapon.is_ranged() && ability == attacker.modifier(Ability::Strength);
    if attacker.traits.raging && strength_melee {
        bonus += attacker.traits.rage_damage;
    }
    let one_handed = !weapon.is_ranged()
        && !weapon.two_handed
        && attacker.equipment.off_hand.is_none()
        && hand != AttackHand::OffHand;
    if attacker.traits.dueling && one_handed {
        bonus += 2;
    }
    if attacker.traits.damage_proficiency {
        bonus += attacker.proficiency_bonus();
    }
    bonus
}

/// Whether sneak attack may trigger on this hit.
fn sneak_eligible(weapon: &Weapon, advantage: Advantage, ally_adjacent: bool) -> bool {
    (weapon.finesse || weapon.is_ranged())
        && advantage != Advantage::Disadvantage
        && (advantage == Advantage::Advantage || ally_adjacent)
}

impl CombatSession {
    pub(crate) fn enemy_adjacent(&self, index: usize) -> bool {
        let me = &self.fighters[index];
        self.fighters
            .iter()
            .any(|f| f.is_alive() && f.side != me.side && distance(f.position, me.position) <= 1)
    }

    /// A living ally of `attacker` (other than itself) stands next to `defender`.
    fn ally_adjacent_to(&self, attacker: usize, defender: usize) -> bool {
        let side = self.fighters[attacker].side;
        let target = self.fighters[defender].position;
        self.fighters.iter().enumerate().any(|(i, f)| {
            i != attacker && f.is_alive() && f.side == side && distance(f.position, target) <= 1
        })
    }

    /// Resolve one weapon attack from `attacker` against `defender`.
    pub(crate) fn resolve_attack(
        &mut self,
        attacker: usize,
        defender: usize,
        hand: AttackHand,
        turn: &mut TurnState,
    ) -> AttackOutcome {
        let Some(weapon) = weapon_for(&self.fighters[attacker], hand) else {
            return AttackOutcome::default();
        };
        let attacker_name = self.fighters[attacker].name.clone();
        let defender_name = self.fighters[defender].name.clone();

        let dist = distance(
            self.fighters[attacker].position,
            self.fighters[defender].position,
        );
        if dist > weapon.max_reach() {
            self.log.push(CombatEvent::Miss {
                attacker: attacker_name,
                defender: defender_name,
                reason: MissReason::OutOfRange,
            });
            return AttackOutcome::default();
        }

        let ranged = weapon.is_ranged();
        let long_range = matches!(weapon.range, Some((normal, _)) if ranged && dist > normal);
        let enemy_adjacent = ranged && self.enemy_adjacent(attacker);
        let ally_adjacent = self.ally_adjacent_to(attacker, defender);

        let a = &self.fighters[attacker];
        let d = &self.fighters[defender];
        let advantage = attack_advantage(a, d, ranged, long_range, enemy_adjacent);
        let bonus = attack_bonus(a, &weapon, hand);
        let proficiency = attack_proficiency(a, hand);
        let never_miss = a.traits.never_miss;
        let target_ac = d.ac;

        let roll = self.rng.d20(advantage);
        let total = roll.natural as i32 + bonus;
        let critical = roll.is_critical();
        let hit = critical || total >= target_ac || never_miss;
        self.fighters[attacker].hidden = false;

        tracing::debug!(
            attacker = %attacker_name,
            defender = %defender_name,
            natural = roll.natural,
            total,
            target_ac,
            hit,
            "weapon attack"
        );
        self.log.push(CombatEvent::Attack {
            attacker: attacker_name.clone(),
            defender: defender_name.clone(),
            hand,
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
                attacker: attacker_name,
                defender: defender_name,
                reason: MissReason::Roll,
            });
            return AttackOutcome::default();
        }

        let a = &self.fighters[attacker];
        let dice = damage_dice(a, &weapon, hand);
        let flat = damage_bonus(a, &weapon, hand);
        let sneak = a
            .traits
            .sneak_attack
            .clone()
            .filter(|_| !turn.sneak_used && sneak_eligible(&weapon, advantage, ally_adjacent));
        let smite = a
            .traits
            .smite_dice
            .clone()
            .filter(|_| !ranged && a.traits.smite_chance > 0);
        let smite_chance = a.traits.smite_chance;

        let mut amount = (self.rng.roll_damage(&dice, critical) + flat).max(1);

        if let Some(sneak_dice) = sneak {
            turn.sneak_used = true;
            let extra = self.rng.roll_damage(&sneak_dice, critical).max(0);
            amount += extra;
            self.log.push(CombatEvent::SneakAttack {
                actor: attacker_name.clone(),
                target: defender_name.clone(),
                dice: sneak_dice.to_string(),
                amount: extra,
            });
        }

        let smite_amount = match smite {
            Some(smite_dice) if self.rng.percent(smite_chance) => {
                Some(self.rng.roll_damage(&smite_dice, critical).max(0))
            }
            _ => None,
        };

        let dealt = self.apply_damage(
            attacker,
            defender,
            amount,
            weapon.damage_type,
            DamageSource::Weapon { ranged },
            critical,
        );
        let mut outcome = AttackOutcome {
            hit: true,
            critical,
            damage: dealt,
            downed: !self.fighters[defender].is_alive(),
        };

        if let Some(smite_amount) = smite_amount {
            if self.fighters[defender].is_alive() {
                self.log.push(CombatEvent::Smite {
                    actor: attacker_name,
                    target: defender_name,
                    amount: smite_amount,
                });
                outcome.damage += self.apply_damage(
                    attacker,
                    defender,
                    smite_amount,
                    DamageType::Radiant,
                    DamageSource::Spell,
                    critical,
                );
                outcome.downed = !self.fighters[defender].is_alive();
            }
        }
        outcome
    }

    /// Mitigate and apply damage, then handle a resulting knockout.
    ///
    /// Immunity zeroes the hit; resistance halves it. Deflect missiles and
    /// uncanny dodge spend the defender's reaction. Returns HP removed.
    pub(crate) fn apply_damage(
        &mut self,
        attacker: usize,
        target: usize,
        raw: i32,
        damage_type: DamageType,
        source: DamageSource,
        critical: bool,
    ) -> i32 {
        if !self.fighters[target].is_alive() {
            return 0;
        }
        let mut amount = raw.max(0);
        let t = &self.fighters[target];
        if t.traits.is_immune_to(damage_type) {
            amount = 0;
        } else {
            if t.traits.resists(damage_type) {
                amount /= 2;
            }
            if let DamageSource::Weapon { ranged } = source {
                if ranged && t.traits.deflect_missiles && t.reaction_ready {
                    let reduction = self.rng.die(10) as i32
                        + t.modifier(Ability::Dexterity)
                        + t.level() as i32;
                    amount = (amount - reduction.max(0)).max(0);
                    self.fighters[target].reaction_ready = false;
                } else if t.traits.uncanny_dodge && t.reaction_ready && amount > 0 {
                    amount /= 2;
                    self.fighters[target].reaction_ready = false;
                }
            }
        }

        let lost = self.fighters[target].take_damage(amount);
        let same_side = self.fighters[attacker].side == self.fighters[target].side;
        if amount > 0 && !same_side {
            self.contributors.entry(target).or_default().insert(attacker);
            self.tally[attacker].damage_dealt += lost;
        }

        let target_name = self.fighters[target].name.clone();
        self.log.push(CombatEvent::Damage {
            attacker: self.fighters[attacker].name.clone(),
            target: target_name.clone(),
            amount,
            damage_type,
            critical,
            hp_after: self.fighters[target].hp(),
        });

        if !self.fighters[target].is_alive() {
            self.on_down(target, attacker);
        } else if amount > 0 && self.fighters[target].conditions.clear(Condition::Asleep) {
            self.log.push(CombatEvent::ConditionEnded {
                target: target_name,
                condition: Condition::Asleep,
            });
        }
        amount
    }

    /// Apply a condition and log the outcome.
    pub(crate) fn inflict_condition(
        &mut self,
        source: Option<usize>,
        target: usize,
        condition: Condition,
        duration: u32,
    ) -> ConditionOutcome {
        let aura = condition == Condition::Frightened && self.fear_aura_covers(target);
        let source_id = source.map(|s| self.fighters[s].id);
        let outcome = apply_condition(
            &mut self.fighters[target],
            condition,
            duration,
            source_id,
            aura,
        );
        let target_name = self.fighters[target].name.clone();
        match outcome {
            ConditionOutcome::Ignored(reason) => self.log.push(CombatEvent::ConditionIgnored {
                target: target_name,
                condition,
                reason,
            }),
            ConditionOutcome::Applied | ConditionOutcome::Extended => {
                self.log.push(CombatEvent::ConditionApplied {
                    target: target_name,
                    condition,
                    duration,
                    source: source.map(|s| self.fighters[s].name.clone()),
                })
            }
        }
        outcome
    }

    /// A living ally with a fear aura stands within its radius of `target`.
    fn fear_aura_covers(&self, target: usize) -> bool {
        let t = &self.fighters[target];
        self.fighters.iter().any(|f| {
            f.is_alive()
                && f.side == t.side
                && f.traits.fear_aura > 0
                && distance(f.position, t.position) <= f.traits.fear_aura
        })
    }

    /// Save tags for a condition-carrying effect.
    pub(crate) fn condition_tags(condition: Option<Condition>, extra: &[SaveTag]) -> Vec<SaveTag> {
        let mut tags: Vec<SaveTag> = extra.to_vec();
        if let Some(tag) = condition.and_then(SaveTag::for_condition) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}
