//! Per-session configuration.
//!
//! Everything a session needs beyond the roster lives here, so that two
//! sessions in the same process never share state.

use crate::dice::Seed;
use crate::fighter::{FighterId, Side};
use crate::grid::Grid;
use crate::targeting::{SharedBias, TargetPolicy};
use crate::xp::MAX_LEVEL_UPS_PER_GRANT;
use std::collections::BTreeMap;
use std::fmt;

/// What a fighter may do with one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnEconomy {
    /// Move toward the target or attack it, not both.
    #[default]
    MoveOrAttack,
    /// Move, then attack if the target is now in reach.
    MoveThenAttack,
}

/// Targeting policies and biases.
#[derive(Clone, Default)]
pub struct TacticsConfig {
    /// Per-side policy; sides without one use [`TargetPolicy::default`].
    pub team_policies: BTreeMap<Side, TargetPolicy>,
    /// Per-fighter overrides, checked before the fighter's own `tactics`.
    pub fighter_policies: BTreeMap<FighterId, TargetPolicy>,
    /// Biases applied to every targeting decision made by a side.
    pub biases: BTreeMap<Side, Vec<SharedBias>>,
}

impl TacticsConfig {
    /// Policy for a fighter: explicit override, then the fighter's own
    /// descriptor tactic, then its side's policy.
    pub fn policy_for(
        &self,
        id: FighterId,
        side: Side,
        own: Option<&TargetPolicy>,
    ) -> TargetPolicy {
        self.fighter_policies
            .get(&id)
            .or(own)
            .or_else(|| self.team_policies.get(&side))
            .cloned()
            .unwrap_or_default()
    }

    pub fn biases_for(&self, side: Side) -> &[SharedBias] {
        self.biases.get(&side).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Debug for TacticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bias_counts: BTreeMap<Side, usize> =
            self.biases.iter().map(|(side, b)| (*side, b.len())).collect();
        f.debug_struct("TacticsConfig")
            .field("team_policies", &self.team_policies)
            .field("fighter_policies", &self.fighter_policies)
            .field("biases", &bias_counts)
            .finish()
    }
}

/// Configuration for creating a combat session.
#[derive(Debug, Clone)]
pub struct CombatConfig {
    pub grid: Grid,
    pub seed: Seed,
    pub turn_economy: TurnEconomy,
    pub tactics: TacticsConfig,
    /// Most level-ups one XP grant may resolve.
    pub max_level_ups: u8,
    /// Fixed turn order by fighter id; skips the initiative roll.
    ///
    /// Fighters not listed follow in roster order.
    pub initiative_order: Option<Vec<FighterId>>,
}

impl CombatConfig {
    /// A `width` x `height` arena with seed 0.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: Grid::new(width, height),
            seed: Seed::default(),
            turn_economy: TurnEconomy::default(),
            tactics: TacticsConfig::default(),
            max_level_ups: MAX_LEVEL_UPS_PER_GRANT,
            initiative_order: None,
        }
    }

    pub fn with_seed(mut self, seed: impl Into<Seed>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn with_turn_economy(mut self, economy: TurnEconomy) -> Self {
        self.turn_economy = economy;
        self
    }

    pub fn with_team_policy(mut self, side: Side, policy: impl Into<TargetPolicy>) -> Self {
        self.tactics.team_policies.insert(side, policy.into());
        self
    }

    pub fn with_fighter_policy(mut self, id: FighterId, policy: impl Into<TargetPolicy>) -> Self {
        self.tactics.fighter_policies.insert(id, policy.into());
        self
    }

    pub fn with_bias(mut self, side: Side, bias: SharedBias) -> Self {
        self.tactics.biases.entry(side).or_default().push(bias);
        self
    }

    pub fn with_max_level_ups(mut self, max: u8) -> Self {
        self.max_level_ups = max;
        self
    }

    pub fn with_initiative_order(mut self, order: Vec<FighterId>) -> Self {
        self.initiative_order = Some(order);
        self
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new(12, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targeting::TargetRule;

    #[test]
    fn test_policy_precedence() {
        let config = CombatConfig::new(10, 10)
            .with_team_policy(Side::Home, TargetRule::HighestThreat)
            .with_fighter_policy(FighterId(2), TargetRule::LowestHpFraction);
        let tactics = &config.tactics;

        let own = TargetPolicy::Rule(TargetRule::Role("Healer".into()));
        assert_eq!(
            tactics.policy_for(FighterId(2), Side::Home, Some(&own)),
            TargetPolicy::Rule(TargetRule::LowestHpFraction)
        );
        assert_eq!(tactics.policy_for(FighterId(3), Side::Home, Some(&own)), own);
        assert_eq!(
            tactics.policy_for(FighterId(3), Side::Home, None),
            TargetPolicy::Rule(TargetRule::HighestThreat)
        );
        assert_eq!(
            tactics.policy_for(FighterId(3), Side::Away, None),
            TargetPolicy::default()
        );
    }

    #[test]
    fn test_debug_hides_bias_objects() {
        let bias: SharedBias = std::sync::Arc::new(|_: &crate::fighter::Fighter, _: &crate::fighter::Fighter| 0);
        let config = CombatConfig::default().with_bias(Side::Away, bias);
        let text = format!("{:?}", config.tactics);
        assert!(text.contains("biases"));
        assert_eq!(config.tactics.biases_for(Side::Away).len(), 1);
        assert!(config.tactics.biases_for(Side::Home).is_empty());
    }
}
