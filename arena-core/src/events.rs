//! The combat event log.
//!
//! Events are the only observable trace of a match. They are appended in
//! order, never mutated, and serialize to JSON tagged by `kind`.

use crate::conditions::{Condition, ImmunityReason};
use crate::dice::Advantage;
use crate::fighter::{Ability, DamageType, Side};
use crate::grid::Position;
use serde::{Deserialize, Serialize};

/// Outcome of a finished combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Side(Side),
    /// Both sides went down in the same step.
    Draw,
}

/// Which attack in a turn this was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackHand {
    Main,
    OffHand,
    /// Martial-arts bonus strike.
    Bonus,
    /// Reaction against a fighter leaving reach.
    Opportunity,
    Spell,
}

/// Why an attack failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    Roll,
    OutOfRange,
}

/// Why a turn produced no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitReason {
    NoTarget,
    Charmed,
    OutOfReach,
}

/// Why the combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Elimination,
    DoubleElimination,
}

/// One entry in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEvent {
    /// Initiative roll, one per fighter.
    Init {
        fighter: String,
        side: Side,
        roll: u32,
        total: i32,
    },
    /// Living fighters in turn order.
    RoundStart {
        round: u32,
        order: Vec<String>,
    },
    RoundEnd {
        round: u32,
    },
    TurnStart {
        actor: String,
        round: u32,
    },
    /// The actor lost its turn to an incapacitating condition.
    TurnSkipped {
        actor: String,
        condition: Condition,
    },
    Wait {
        actor: String,
        reason: WaitReason,
    },
    Move {
        actor: String,
        from: Position,
        to: Position,
    },
    Blocked {
        actor: String,
        to: Position,
        by: String,
    },
    /// A spawn tile was taken; the fighter was moved to the nearest free one.
    SpawnAdjusted {
        fighter: String,
        from: Position,
        to: Position,
    },
    Attack {
        attacker: String,
        defender: String,
        hand: AttackHand,
        natural: u32,
        total: i32,
        target_ac: i32,
        hit: bool,
        critical: bool,
        advantage: Advantage,
        proficiency: i32,
    },
    Miss {
        attacker: String,
        defender: String,
        reason: MissReason,
    },
    Damage {
        attacker: String,
        target: String,
        amount: i32,
        damage_type: DamageType,
        critical: bool,
        hp_after: i32,
    },
    SneakAttack {
        actor: String,
        target: String,
        dice: String,
        amount: i32,
    },
    Smite {
        actor: String,
        target: String,
        amount: i32,
    },
    SpellCast {
        caster: String,
        spell: String,
        target: String,
    },
    Save {
        target: String,
        ability: Ability,
        dc: i32,
        natural: u32,
        total: i32,
        advantage: Advantage,
        success: bool,
    },
    Down {
        fighter: String,
        side: Side,
        by: String,
    },
    ConditionApplied {
        target: String,
        condition: Condition,
        duration: u32,
        source: Option<String>,
    },
    ConditionIgnored {
        target: String,
        condition: Condition,
        reason: ImmunityReason,
    },
    ConditionEnded {
        target: String,
        condition: Condition,
    },
    XpGained {
        fighter: String,
        amount: u32,
        from: String,
    },
    LevelUp {
        fighter: String,
        level: u8,
        max_hp: i32,
        ac: i32,
    },
    End {
        winner: Winner,
        reason: EndReason,
        round: u32,
    },
}

/// Discriminant of [`CombatEvent`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Init,
    RoundStart,
    RoundEnd,
    TurnStart,
    TurnSkipped,
    Wait,
    Move,
    Blocked,
    SpawnAdjusted,
    Attack,
    Miss,
    Damage,
    SneakAttack,
    Smite,
    SpellCast,
    Save,
    Down,
    ConditionApplied,
    ConditionIgnored,
    ConditionEnded,
    XpGained,
    LevelUp,
    End,
}

impl CombatEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CombatEvent::Init { .. } => EventKind::Init,
            CombatEvent::RoundStart { .. } => EventKind::RoundStart,
            CombatEvent::RoundEnd { .. } => EventKind::RoundEnd,
            CombatEvent::TurnStart { .. } => EventKind::TurnStart,
            CombatEvent::TurnSkipped { .. } => EventKind::TurnSkipped,
            CombatEvent::Wait { .. } => EventKind::Wait,
            CombatEvent::Move { .. } => EventKind::Move,
            CombatEvent::Blocked { .. } => EventKind::Blocked,
            CombatEvent::SpawnAdjusted { .. } => EventKind::SpawnAdjusted,
            CombatEvent::Attack { .. } => EventKind::Attack,
            CombatEvent::Miss { .. } => EventKind::Miss,
            CombatEvent::Damage { .. } => EventKind::Damage,
            CombatEvent::SneakAttack { .. } => EventKind::SneakAttack,
            CombatEvent::Smite { .. } => EventKind::Smite,
            CombatEvent::SpellCast { .. } => EventKind::SpellCast,
            CombatEvent::Save { .. } => EventKind::Save,
            CombatEvent::Down { .. } => EventKind::Down,
            CombatEvent::ConditionApplied { .. } => EventKind::ConditionApplied,
            CombatEvent::ConditionIgnored { .. } => EventKind::ConditionIgnored,
            CombatEvent::ConditionEnded { .. } => EventKind::ConditionEnded,
            CombatEvent::XpGained { .. } => EventKind::XpGained,
            CombatEvent::LevelUp { .. } => EventKind::LevelUp,
            CombatEvent::End { .. } => EventKind::End,
        }
    }
}

/// Append-only ordered event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<CombatEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Events appended at or after position `start`.
    pub fn since(&self, start: usize) -> &[CombatEvent] {
        &self.events[start.min(self.events.len())..]
    }

    pub fn last(&self) -> Option<&CombatEvent> {
        self.events.last()
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Fighters downed on each side: `[team 0 losses, team 1 losses]`.
    ///
    /// Team 0's kills-for is `losses[1]`, kills-against is `losses[0]`.
    pub fn losses_by_side(&self) -> [usize; 2] {
        let mut losses = [0; 2];
        for event in &self.events {
            if let CombatEvent::Down { side, .. } = event {
                losses[side.index()] += 1;
            }
        }
        losses
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.events)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a CombatEvent;
    type IntoIter = std::slice::Iter<'a, CombatEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_is_snake_case() {
        let event = CombatEvent::RoundStart {
            round: 2,
            order: vec!["A".into(), "B".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "round_start");
        assert_eq!(json["round"], 2);

        let event = CombatEvent::ConditionIgnored {
            target: "Elf".into(),
            condition: Condition::Asleep,
            reason: ImmunityReason::Immune,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "condition_ignored");
        assert_eq!(json["condition"], "asleep");
    }

    #[test]
    fn test_positions_are_pairs() {
        let event = CombatEvent::Move {
            actor: "A".into(),
            from: Position::new(1, 2),
            to: Position::new(2, 2),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["to"], serde_json::json!([2, 2]));
    }

    #[test]
    fn test_filters_and_losses() {
        let mut log = EventLog::new();
        log.push(CombatEvent::RoundStart {
            round: 1,
            order: Vec::new(),
        });
        log.push(CombatEvent::Down {
            fighter: "A".into(),
            side: Side::Home,
            by: "B".into(),
        });
        log.push(CombatEvent::Down {
            fighter: "C".into(),
            side: Side::Away,
            by: "D".into(),
        });
        log.push(CombatEvent::Down {
            fighter: "E".into(),
            side: Side::Away,
            by: "D".into(),
        });
        assert_eq!(log.count(EventKind::Down), 3);
        assert_eq!(log.losses_by_side(), [1, 2]);
        assert_eq!(log.since(3).len(), 1);
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn test_log_round_trips_through_json() {
        let mut log = EventLog::new();
        log.push(CombatEvent::End {
            winner: Winner::Draw,
            reason: EndReason::DoubleElimination,
            round: 4,
        });
        let json = log.to_json().unwrap();
        let back: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
