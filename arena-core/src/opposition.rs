//! Opposition instructions: coach-style targeting biases.
//!
//! An instruction names a set of enemies (by role, by id, or by an attribute
//! query like `DEX>=14 AND role=Healer`) and what to do about them. It plugs
//! into targeting as a [`TargetBias`], so it only ever shifts costs.

use crate::fighter::{Ability, Fighter, FighterId};
use crate::targeting::TargetBias;
use serde::{Deserialize, Serialize};

/// Cost removed per priority point for focus-fire targets.
pub const FOCUS_FIRE_WEIGHT: i64 = 10_000;
/// Cost added per priority point for avoided targets.
pub const AVOID_WEIGHT: i64 = 5_000;

/// How an instruction selects its enemies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OppositionTarget {
    Role(String),
    FighterId(FighterId),
    AttributeQuery(AttributeQuery),
}

/// What to do with matching enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    FocusFire,
    Avoid,
    /// Among matching enemies, prefer the most wounded.
    FocusLowHp,
}

/// One instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInstruction", into = "RawInstruction")]
pub struct OppositionInstruction {
    pub target: OppositionTarget,
    pub directives: Vec<Directive>,
    /// 1..=3; higher is a stronger pull.
    pub priority: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TargetKind {
    Role,
    #[serde(alias = "player_id")]
    FighterId,
    AttributeQuery,
}

/// Wire shape: `{"target_kind", "target_value", "directives", "priority"}`.
#[derive(Serialize, Deserialize)]
struct RawInstruction {
    target_kind: TargetKind,
    target_value: String,
    #[serde(default)]
    directives: Vec<Directive>,
    #[serde(default = "default_priority")]
    priority: u8,
}

fn default_priority() -> u8 {
    1
}

impl TryFrom<RawInstruction> for OppositionInstruction {
    type Error = String;

    fn try_from(raw: RawInstruction) -> Result<Self, Self::Error> {
        let target = match raw.target_kind {
            TargetKind::Role => OppositionTarget::Role(raw.target_value),
            TargetKind::FighterId => {
                let value = raw.target_value.trim();
                let digits = value.strip_prefix("pid:").unwrap_or(value);
                let id = digits
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad fighter id in opposition instruction: {value}"))?;
                OppositionTarget::FighterId(FighterId(id))
            }
            TargetKind::AttributeQuery => {
                OppositionTarget::AttributeQuery(AttributeQuery::parse(&raw.target_value))
            }
        };
        Ok(OppositionInstruction::new(target, raw.directives, raw.priority))
    }
}

impl From<OppositionInstruction> for RawInstruction {
    fn from(oi: OppositionInstruction) -> Self {
        let (target_kind, target_value) = match oi.target {
            OppositionTarget::Role(role) => (TargetKind::Role, role),
            OppositionTarget::FighterId(id) => (TargetKind::FighterId, id.0.to_string()),
            OppositionTarget::AttributeQuery(q) => (TargetKind::AttributeQuery, q.source),
        };
        RawInstruction {
            target_kind,
            target_value,
            directives: oi.directives,
            priority: oi.priority,
        }
    }
}

impl OppositionInstruction {
    pub fn new(target: OppositionTarget, directives: Vec<Directive>, priority: u8) -> Self {
        Self {
            target,
            directives,
            priority: priority.clamp(1, 3),
        }
    }

    pub fn focus_fire(target: OppositionTarget, priority: u8) -> Self {
        Self::new(target, vec![Directive::FocusFire], priority)
    }

    pub fn avoid(target: OppositionTarget, priority: u8) -> Self {
        Self::new(target, vec![Directive::Avoid], priority)
    }

    pub fn applies_to(&self, fighter: &Fighter) -> bool {
        match &self.target {
            OppositionTarget::Role(role) => fighter
                .role
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(role)),
            OppositionTarget::FighterId(id) => fighter.id == *id,
            OppositionTarget::AttributeQuery(query) => query.matches(fighter),
        }
    }
}

impl TargetBias for OppositionInstruction {
    fn adjust(&self, _actor: &Fighter, candidate: &Fighter) -> i64 {
        if !self.applies_to(candidate) {
            return 0;
        }
        let priority = self.priority.clamp(1, 3) as i64;
        self.directives
            .iter()
            .map(|directive| match directive {
                Directive::FocusFire => -FOCUS_FIRE_WEIGHT * priority,
                Directive::Avoid => AVOID_WEIGHT * priority,
                Directive::FocusLowHp => candidate.hp_permille() * priority,
            })
            .sum()
    }
}

// ============================================================================
// Attribute queries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl Comparator {
    fn symbol(&self) -> &'static str {
        match self {
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
        }
    }

    fn compare<T: PartialOrd>(&self, left: T, right: T) -> bool {
        match self {
            Comparator::Ge => left >= right,
            Comparator::Le => left <= right,
            Comparator::Gt => left > right,
            Comparator::Lt => left < right,
            Comparator::Eq => left == right,
            Comparator::Ne => left != right,
        }
    }
}

/// A fighter attribute a query can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Ability(Ability),
    Level,
    Hp,
    Ac,
    Rating,
    Role,
    Class,
    Race,
}

impl QueryField {
    fn parse(name: &str) -> Option<QueryField> {
        if let Some(ability) = Ability::parse(name) {
            return Some(QueryField::Ability(ability));
        }
        match name.to_ascii_lowercase().as_str() {
            "level" | "lvl" => Some(QueryField::Level),
            "hp" => Some(QueryField::Hp),
            "ac" => Some(QueryField::Ac),
            "rating" | "ovr" => Some(QueryField::Rating),
            "role" => Some(QueryField::Role),
            "class" => Some(QueryField::Class),
            "race" => Some(QueryField::Race),
            _ => None,
        }
    }

    fn numeric(&self, fighter: &Fighter) -> Option<i64> {
        match self {
            QueryField::Ability(a) => Some(fighter.abilities.get(*a) as i64),
            QueryField::Level => Some(fighter.level() as i64),
            QueryField::Hp => Some(fighter.hp() as i64),
            QueryField::Ac => Some(fighter.ac as i64),
            QueryField::Rating => Some(fighter.rating as i64),
            QueryField::Role | QueryField::Class | QueryField::Race => None,
        }
    }

    fn text(&self, fighter: &Fighter) -> Option<String> {
        match self {
            QueryField::Role => fighter.role.clone(),
            QueryField::Class => fighter.class.map(|c| c.name().to_string()),
            QueryField::Race => fighter.race.map(|r| format!("{r:?}")),
            _ => self.numeric(fighter).map(|n| n.to_string()),
        }
    }
}

/// One `field op value` test. An unparsable clause is kept as `Invalid`
/// and never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Test {
        field: QueryField,
        op: Comparator,
        value: String,
    },
    Invalid(String),
}

impl Clause {
    fn parse(text: &str) -> Clause {
        let text = text.trim();
        for (symbol, op) in [
            (">=", Comparator::Ge),
            ("<=", Comparator::Le),
            ("!=", Comparator::Ne),
            ("==", Comparator::Eq),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
            ("=", Comparator::Eq),
        ] {
            if let Some((field, value)) = text.split_once(symbol) {
                let value = value.trim();
                let valid_value =
                    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                return match QueryField::parse(field.trim()) {
                    Some(field) if valid_value => Clause::Test {
                        field,
                        op,
                        value: value.to_string(),
                    },
                    _ => Clause::Invalid(text.to_string()),
                };
            }
        }
        Clause::Invalid(text.to_string())
    }

    fn matches(&self, fighter: &Fighter) -> bool {
        let Clause::Test { field, op, value } = self else {
            return false;
        };
        match (field.numeric(fighter), value.parse::<i64>()) {
            (Some(actual), Ok(wanted)) => op.compare(actual, wanted),
            _ => match op {
                Comparator::Eq | Comparator::Ne => {
                    let actual = field.text(fighter).unwrap_or_default();
                    let equal = actual.eq_ignore_ascii_case(value);
                    if *op == Comparator::Eq {
                        equal
                    } else {
                        !equal
                    }
                }
                _ => false,
            },
        }
    }
}

/// Conjunction of clauses parsed from `A AND B AND ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeQuery {
    pub source: String,
    pub clauses: Vec<Clause>,
}

impl AttributeQuery {
    pub fn parse(text: &str) -> AttributeQuery {
        let clauses: Vec<Clause> = split_and(text).into_iter().map(Clause::parse).collect();
        for clause in &clauses {
            if let Clause::Invalid(raw) = clause {
                tracing::warn!(query = text, clause = raw.as_str(), "unparsable query clause");
            }
        }
        AttributeQuery {
            source: text.to_string(),
            clauses,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self
            .clauses
            .iter()
            .any(|c| matches!(c, Clause::Invalid(_)))
    }

    pub fn matches(&self, fighter: &Fighter) -> bool {
        !self.clauses.is_empty() && self.clauses.iter().all(|c| c.matches(fighter))
    }

    /// Canonical rendering of the parsed clauses.
    pub fn describe(&self) -> String {
        self.clauses
            .iter()
            .map(|c| match c {
                Clause::Test { field, op, value } => format!("{field:?}{}{value}", op.symbol()),
                Clause::Invalid(raw) => format!("<invalid {raw}>"),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Split on the word `AND`, case-insensitively.
fn split_and(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i + 3 <= bytes.len() {
        let boundary_before = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        let boundary_after = i + 3 == bytes.len() || !bytes[i + 3].is_ascii_alphanumeric();
        if &bytes[i..i + 3] == b"and" && boundary_before && boundary_after {
            parts.push(&text[start..i]);
            start = i + 3;
            i += 3;
        } else {
            i += 1;
        }
    }
    parts.push(&text[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::Side;
    use crate::grid::Position;
    use crate::targeting::{select_target, SharedBias, TargetPolicy};
    use std::sync::Arc;

    fn enemy(id: u32, dex: u8, role: &str) -> Fighter {
        let mut f = Fighter::new(FighterId(id), format!("E{id}"), Side::Away);
        f.abilities.dexterity = dex;
        f.role = Some(role.to_string());
        f
    }

    #[test]
    fn test_query_parsing() {
        let q = AttributeQuery::parse("DEX>=14 AND role=Healer");
        assert!(q.is_valid());
        assert_eq!(q.clauses.len(), 2);
        assert!(q.matches(&enemy(1, 15, "healer")));
        assert!(!q.matches(&enemy(2, 12, "Healer")));
        assert!(!q.matches(&enemy(3, 16, "Striker")));
    }

    #[test]
    fn test_bad_clause_matches_nothing() {
        let q = AttributeQuery::parse("DEX>=14 and wingspan>3");
        assert!(!q.is_valid());
        assert!(!q.matches(&enemy(1, 18, "Healer")));
        let q = AttributeQuery::parse("level >= ten");
        assert!(!q.matches(&enemy(1, 18, "Healer")));
    }

    #[test]
    fn test_split_only_on_whole_word() {
        assert_eq!(split_and("role=Band AND hp<5").len(), 2);
        assert_eq!(split_and("role=Standard").len(), 1);
    }

    #[test]
    fn test_focus_fire_overrides_distance() {
        let mut actor = Fighter::new(FighterId(1), "A", Side::Home);
        actor.position = Position::new(0, 0);
        let mut near = enemy(2, 10, "Tank");
        near.position = Position::new(1, 0);
        let mut far = enemy(3, 10, "Healer");
        far.position = Position::new(9, 9);
        let roster = vec![actor, near, far];

        let focus: SharedBias = Arc::new(OppositionInstruction::focus_fire(
            OppositionTarget::Role("Healer".into()),
            1,
        ));
        let pick = select_target(&roster[0], &TargetPolicy::default(), &roster, &[focus], None);
        assert_eq!(pick, Some(2));

        let avoid: SharedBias = Arc::new(OppositionInstruction::avoid(
            OppositionTarget::FighterId(FighterId(2)),
            3,
        ));
        let pick = select_target(&roster[0], &TargetPolicy::default(), &roster, &[avoid], None);
        assert_eq!(pick, Some(2));
    }

    #[test]
    fn test_priority_clamped() {
        let oi = OppositionInstruction::new(OppositionTarget::Role("X".into()), vec![], 9);
        assert_eq!(oi.priority, 3);
    }

    #[test]
    fn test_instruction_from_json() {
        let oi: OppositionInstruction = serde_json::from_str(
            r#"{"target_kind":"role","target_value":"Striker","directives":["focus_fire"],"priority":2}"#,
        )
        .unwrap();
        assert_eq!(oi.target, OppositionTarget::Role("Striker".into()));
        assert_eq!(oi.directives, vec![Directive::FocusFire]);
        assert_eq!(oi.priority, 2);

        let oi: OppositionInstruction = serde_json::from_str(
            r#"{"target_kind":"player_id","target_value":"pid:12","directives":["avoid"]}"#,
        )
        .unwrap();
        assert_eq!(oi.target, OppositionTarget::FighterId(FighterId(12)));
        assert_eq!(oi.priority, 1);

        let bad = serde_json::from_str::<OppositionInstruction>(
            r#"{"target_kind":"fighter_id","target_value":"abc"}"#,
        );
        assert!(bad.is_err());
    }
}
