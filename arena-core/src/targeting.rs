//! Enemy selection.
//!
//! Every rule scores candidates with an integer cost (lower is better).
//! Biases add to that cost before the argmin, so they compose with any
//! rule. Ties go to the lowest fighter id.

use crate::fighter::{Fighter, FighterId};
use crate::grid::distance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One targeting rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    /// Closest by Manhattan distance.
    Nearest,
    /// Lowest current/max HP ratio.
    LowestHpFraction,
    /// Most dangerous by [`Fighter::threat_score`].
    HighestThreat,
    /// Only enemies with this role (case-insensitive), nearest first.
    Role(String),
    /// Only this enemy.
    Fighter(FighterId),
}

impl TargetRule {
    /// Parse `nearest`, `lowest_hp`, `highest_threat`, `role:Healer` or `fighter:3`.
    pub fn parse(text: &str) -> Option<TargetRule> {
        let text = text.trim();
        if let Some((key, value)) = text.split_once(':') {
            let value = value.trim();
            return match key.trim().to_ascii_lowercase().as_str() {
                "role" if !value.is_empty() => Some(TargetRule::Role(value.to_string())),
                "fighter" | "id" | "pid" => value.parse().ok().map(|id| TargetRule::Fighter(FighterId(id))),
                _ => None,
            };
        }
        match text.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "nearest" | "closest" => Some(TargetRule::Nearest),
            "lowest_hp" | "lowest_hp_fraction" | "weakest" => Some(TargetRule::LowestHpFraction),
            "highest_threat" | "threat" | "strongest" => Some(TargetRule::HighestThreat),
            _ => None,
        }
    }

    /// Cost of `candidate` under this rule, or `None` if the rule rejects it.
    pub fn cost(&self, actor: &Fighter, candidate: &Fighter) -> Option<i64> {
        match self {
            TargetRule::Nearest => Some(distance(actor.position, candidate.position) as i64),
            TargetRule::LowestHpFraction => Some(candidate.hp_permille()),
            TargetRule::HighestThreat => Some(-candidate.threat_score()),
            TargetRule::Role(role) => candidate
                .role
                .as_deref()
                .filter(|r| r.eq_ignore_ascii_case(role))
                .map(|_| distance(actor.position, candidate.position) as i64),
            TargetRule::Fighter(id) => (candidate.id == *id).then_some(0),
        }
    }
}

impl fmt::Display for TargetRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRule::Nearest => write!(f, "nearest"),
            TargetRule::LowestHpFraction => write!(f, "lowest_hp"),
            TargetRule::HighestThreat => write!(f, "highest_threat"),
            TargetRule::Role(role) => write!(f, "role:{role}"),
            TargetRule::Fighter(id) => write!(f, "fighter:{}", id.0),
        }
    }
}

/// A single rule or an ordered fallback list.
///
/// A priority list uses the first rule that accepts any candidate. When no
/// rule does, the first living enemy by id is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetPolicy {
    Rule(TargetRule),
    Priority(Vec<TargetRule>),
}

impl TargetPolicy {
    pub fn rules(&self) -> &[TargetRule] {
        match self {
            TargetPolicy::Rule(rule) => std::slice::from_ref(rule),
            TargetPolicy::Priority(rules) => rules,
        }
    }

    /// Parse a comma- or `>`-separated list of rules; unknown entries are skipped.
    pub fn parse(text: &str) -> Option<TargetPolicy> {
        let rules: Vec<TargetRule> = text
            .split([',', '>'])
            .filter_map(|part| {
                let rule = TargetRule::parse(part);
                if rule.is_none() && !part.trim().is_empty() {
                    tracing::warn!(rule = part.trim(), "unknown targeting rule, skipping");
                }
                rule
            })
            .collect();
        match rules.len() {
            0 => None,
            1 => rules.into_iter().next().map(TargetPolicy::Rule),
            _ => Some(TargetPolicy::Priority(rules)),
        }
    }
}

impl Default for TargetPolicy {
    fn default() -> Self {
        TargetPolicy::Rule(TargetRule::Nearest)
    }
}

impl From<TargetRule> for TargetPolicy {
    fn from(rule: TargetRule) -> Self {
        TargetPolicy::Rule(rule)
    }
}

/// External score adjustment applied to every candidate before the argmin.
///
/// Implementations must be pure: the same actor and candidate always give
/// the same adjustment. Negative values make a candidate more attractive.
pub trait TargetBias {
    fn adjust(&self, actor: &Fighter, candidate: &Fighter) -> i64;
}

/// Bias handle stored in configuration.
pub type SharedBias = Arc<dyn TargetBias + Send + Sync>;

impl<F> TargetBias for F
where
    F: Fn(&Fighter, &Fighter) -> i64,
{
    fn adjust(&self, actor: &Fighter, candidate: &Fighter) -> i64 {
        self(actor, candidate)
    }
}

fn total_bias(biases: &[SharedBias], actor: &Fighter, candidate: &Fighter) -> i64 {
    biases
        .iter()
        .map(|b| b.adjust(actor, candidate))
        .fold(0i64, i64::saturating_add)
}

/// Pick the roster index of `actor`'s target.
///
/// Candidates are living enemies other than `exclude`. Returns `None` when
/// there are none.
pub fn select_target(
    actor: &Fighter,
    policy: &TargetPolicy,
    roster: &[Fighter],
    biases: &[SharedBias],
    exclude: Option<FighterId>,
) -> Option<usize> {
    let candidates: Vec<usize> = roster
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_alive() && f.side != actor.side && Some(f.id) != exclude)
        .map(|(i, _)| i)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    for rule in policy.rules() {
        if let Some(index) = cheapest(&candidates, actor, roster, biases, |c| rule.cost(actor, c)) {
            return Some(index);
        }
    }
    cheapest(&candidates, actor, roster, biases, |_| Some(0))
}

fn cheapest<F>(
    candidates: &[usize],
    actor: &Fighter,
    roster: &[Fighter],
    biases: &[SharedBias],
    cost: F,
) -> Option<usize>
where
    F: Fn(&Fighter) -> Option<i64>,
{
    candidates
        .iter()
        .filter_map(|&i| {
            let candidate = &roster[i];
            cost(candidate).map(|c| {
                let adjusted = c.saturating_add(total_bias(biases, actor, candidate));
                (adjusted, candidate.id, i)
            })
        })
        .min()
        .map(|(_, _, i)| i)
}
