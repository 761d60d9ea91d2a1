//! Seeded dice rolling.
//!
//! Supports the compact notation used by weapon and spell tables
//! (`XdY+Z`, `dY`, flat values), advantage/disadvantage on d20 rolls, and
//! critical damage. Every roll in a combat goes through one [`DiceRng`], so a
//! fixed seed reproduces the whole event log.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Dice expression out of range: {0}")]
    OutOfRange(String),
}

/// Most dice a single component may roll.
pub const MAX_DICE: u32 = 100;
/// Largest die a component may use.
pub const MAX_SIDES: u32 = 1000;
/// Largest flat modifier an expression may carry.
pub const MAX_MODIFIER: i32 = 10_000;

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }

    /// Collapse any number of sources into one state.
    ///
    /// One qualifying source is enough; extra sources of the same kind do
    /// nothing, and having both kinds cancels out.
    pub fn from_sources(any_advantage: bool, any_disadvantage: bool) -> Advantage {
        let adv = if any_advantage {
            Advantage::Advantage
        } else {
            Advantage::Normal
        };
        let dis = if any_disadvantage {
            Advantage::Disadvantage
        } else {
            Advantage::Normal
        };
        adv.combine(dis)
    }
}

/// A single die component of a dice expression (e.g. the `2d6` in `2d6+3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceComponent {
    pub count: u32,
    pub sides: u32,
}

/// A complete dice expression (e.g., 2d6+3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub components: Vec<DiceComponent>,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut components = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut sign: i32 = 1;
        let mut saw_term = false;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_component(&current, sign, &mut components, &mut modifier)?;
                        current.clear();
                        saw_term = true;
                    } else if saw_term {
                        // "2d6+-3" and friends
                        return Err(DiceError::InvalidNotation(notation.clone()));
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if current.is_empty() {
            return Err(DiceError::InvalidNotation(notation));
        }
        Self::parse_component(&current, sign, &mut components, &mut modifier)?;

        Ok(DiceExpression {
            components,
            modifier,
            original: notation,
        })
    }

    /// Parse, falling back to a flat `1` for anything malformed.
    ///
    /// Dice strings come from hand-edited class and spell tables, so a typo
    /// must never take a running match down.
    pub fn parse_or_default(notation: &str) -> Self {
        match Self::parse(notation) {
            Ok(expr) => expr,
            Err(err) => {
                tracing::warn!(notation, %err, "malformed dice expression, using 1");
                Self::flat(1)
            }
        }
    }

    /// A dice-free expression with a fixed value.
    pub fn flat(value: i32) -> Self {
        Self {
            components: Vec::new(),
            modifier: value,
            original: value.to_string(),
        }
    }

    /// `count` dice with `sides` faces and no modifier.
    pub fn dice(count: u32, sides: u32) -> Self {
        Self {
            components: vec![DiceComponent {
                count: count.min(MAX_DICE),
                sides: sides.clamp(1, MAX_SIDES),
            }],
            modifier: 0,
            original: format!("{count}d{sides}"),
        }
    }

    fn parse_component(
        s: &str,
        sign: i32,
        components: &mut Vec<DiceComponent>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        if let Some(d_pos) = s.find('d') {
            if sign < 0 {
                return Err(DiceError::InvalidNotation(s.to_string()));
            }
            let count_str = &s[..d_pos];
            let sides_str = &s[d_pos + 1..];

            let count: u32 = if count_str.is_empty() {
                1
            } else {
                count_str
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
            };

            let sides: u32 = sides_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            if sides == 0 {
                return Err(DiceError::InvalidDieSize(sides));
            }
            if count > MAX_DICE || sides > MAX_SIDES {
                return Err(DiceError::OutOfRange(s.to_string()));
            }

            components.push(DiceComponent { count, sides });
        } else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            *modifier = modifier
                .checked_add(sign * value)
                .filter(|m| m.abs() <= MAX_MODIFIER)
                .ok_or_else(|| DiceError::OutOfRange(s.to_string()))?;
        }

        Ok(())
    }

    /// Number of dice across every component.
    pub fn dice_count(&self) -> u32 {
        self.components
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.count))
    }

    /// Largest result the expression can produce.
    pub fn max_value(&self) -> i32 {
        let dice = self
            .components
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.count as u64 * c.sides as u64));
        saturate(dice).saturating_add(self.modifier)
    }

    /// Average result, rounded down.
    pub fn average(&self) -> i32 {
        let doubled = self.components.iter().fold(0u64, |acc, c| {
            acc.saturating_add(c.count as u64 * (c.sides as u64 + 1))
        });
        saturate(doubled / 2).saturating_add(self.modifier)
    }
}

fn saturate(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Result of a d20 roll, with both dice kept when advantage applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// The die that counts.
    pub natural: u32,
    /// Both dice on advantage/disadvantage, otherwise `natural` twice.
    pub rolls: [u32; 2],
    pub advantage: Advantage,
}

impl D20Roll {
    pub fn is_critical(&self) -> bool {
        self.natural == 20
    }

    pub fn is_fumble(&self) -> bool {
        self.natural == 1
    }
}

/// Seed for a combat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Number(u64),
    Text(String),
}

impl Seed {
    /// The numeric seed fed to the RNG. Text seeds hash to a stable value.
    pub fn value(&self) -> u64 {
        match self {
            Seed::Number(n) => *n,
            Seed::Text(text) => {
                let digest = Sha256::digest(text.as_bytes());
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                u64::from_le_bytes(bytes)
            }
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Number(0)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Seed::Number(value)
    }
}

impl From<&str> for Seed {
    fn from(value: &str) -> Self {
        Seed::Text(value.to_string())
    }
}

impl From<String> for Seed {
    fn from(value: String) -> Self {
        Seed::Text(value)
    }
}

/// The single random stream owned by a combat session.
#[derive(Debug, Clone)]
pub struct DiceRng {
    rng: ChaCha8Rng,
}

impl DiceRng {
    pub fn new(seed: &Seed) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed.value()),
        }
    }

    pub fn from_u64(seed: u64) -> Self {
        Self::new(&Seed::Number(seed))
    }

    /// Roll one die with `sides` faces. A zero-sided die counts as one side.
    pub fn die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }

    /// Roll a d20, twice when advantage or disadvantage applies.
    pub fn d20(&mut self, advantage: Advantage) -> D20Roll {
        let first = self.die(20);
        match advantage {
            Advantage::Normal => D20Roll {
                natural: first,
                rolls: [first, first],
                advantage,
            },
            Advantage::Advantage | Advantage::Disadvantage => {
                let second = self.die(20);
                let natural = if advantage == Advantage::Advantage {
                    first.max(second)
                } else {
                    first.min(second)
                };
                D20Roll {
                    natural,
                    rolls: [first, second],
                    advantage,
                }
            }
        }
    }

    /// Roll an expression.
    pub fn roll(&mut self, expr: &DiceExpression) -> i32 {
        self.roll_damage(expr, false)
    }

    /// Roll an expression, doubling every dice count on a critical.
    pub fn roll_damage(&mut self, expr: &DiceExpression, critical: bool) -> i32 {
        let multiplier = if critical { 2 } else { 1 };
        let mut total = expr.modifier;
        for component in &expr.components {
            let count = component.count.min(MAX_DICE).saturating_mul(multiplier);
            for _ in 0..count {
                total = total.saturating_add(self.die(component.sides) as i32);
            }
        }
        total
    }

    /// True with `chance` percent probability.
    pub fn percent(&mut self, chance: u32) -> bool {
        if chance == 0 {
            return false;
        }
        self.die(100) <= chance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.components.len(), 1);
        assert_eq!(expr.components[0].count, 1);
        assert_eq!(expr.components[0].sides, 20);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_with_modifier() {
        let expr = DiceExpression::parse("2d6+3").unwrap();
        assert_eq!(expr.components[0].count, 2);
        assert_eq!(expr.components[0].sides, 6);
        assert_eq!(expr.modifier, 3);

        let expr = DiceExpression::parse("1d8-1").unwrap();
        assert_eq!(expr.modifier, -1);
    }

    #[test]
    fn test_parse_flat_and_implicit_count() {
        let expr = DiceExpression::parse("5").unwrap();
        assert!(expr.components.is_empty());
        assert_eq!(expr.modifier, 5);

        let expr = DiceExpression::parse("d6").unwrap();
        assert_eq!(expr.components[0].count, 1);
    }

    #[test]
    fn test_parse_odd_sides_allowed() {
        let expr = DiceExpression::parse("1d1").unwrap();
        assert_eq!(expr.max_value(), 1);
        assert!(DiceExpression::parse("3d7").is_ok());
    }

    #[test]
    fn test_parse_multiple_components() {
        let expr = DiceExpression::parse("2d6 + 1d4 + 2").unwrap();
        assert_eq!(expr.components.len(), 2);
        assert_eq!(expr.dice_count(), 3);
        assert_eq!(expr.modifier, 2);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DiceExpression::parse(""), Err(DiceError::NoDice));
        assert!(DiceExpression::parse("abc").is_err());
        assert!(DiceExpression::parse("2d").is_err());
        assert!(DiceExpression::parse("1d0").is_err());
        assert!(DiceExpression::parse("2d6+").is_err());
    }

    #[test]
    fn test_parse_or_default_fails_soft() {
        let expr = DiceExpression::parse_or_default("banana");
        assert_eq!(expr, DiceExpression::flat(1));
        let mut rng = DiceRng::from_u64(1);
        assert_eq!(rng.roll(&expr), 1);
    }

    #[test]
    fn test_roll_range() {
        let expr = DiceExpression::parse("2d6+3").unwrap();
        let mut rng = DiceRng::from_u64(7);
        for _ in 0..200 {
            let total = rng.roll(&expr);
            assert!((5..=15).contains(&total), "roll out of range: {total}");
        }
    }

    #[test]
    fn test_critical_doubles_dice_not_modifier() {
        let expr = DiceExpression::parse("1d1+3").unwrap();
        let mut rng = DiceRng::from_u64(3);
        assert_eq!(rng.roll_damage(&expr, false), 4);
        assert_eq!(rng.roll_damage(&expr, true), 5);
    }

    #[test]
    fn test_advantage_keeps_higher() {
        let mut rng = DiceRng::from_u64(11);
        for _ in 0..100 {
            let roll = rng.d20(Advantage::Advantage);
            assert_eq!(roll.natural, roll.rolls[0].max(roll.rolls[1]));
            let roll = rng.d20(Advantage::Disadvantage);
            assert_eq!(roll.natural, roll.rolls[0].min(roll.rolls[1]));
        }
    }

    #[test]
    fn test_advantage_sources_do_not_stack() {
        assert_eq!(Advantage::from_sources(true, false), Advantage::Advantage);
        assert_eq!(Advantage::from_sources(false, true), Advantage::Disadvantage);
        assert_eq!(Advantage::from_sources(true, true), Advantage::Normal);
        assert_eq!(Advantage::from_sources(false, false), Advantage::Normal);
        assert_eq!(
            Advantage::Advantage.combine(Advantage::Advantage),
            Advantage::Advantage
        );
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = DiceRng::new(&Seed::from("week-3"));
        let mut b = DiceRng::new(&Seed::from("week-3"));
        let xs: Vec<u32> = (0..32).map(|_| a.die(20)).collect();
        let ys: Vec<u32> = (0..32).map(|_| b.die(20)).collect();
        assert_eq!(xs, ys);
        assert_ne!(Seed::from("week-3").value(), Seed::from("week-4").value());
    }

    #[test]
    fn test_huge_notation_is_rejected() {
        assert!(matches!(
            DiceExpression::parse("70000d70000"),
            Err(DiceError::OutOfRange(_))
        ));
        assert!(DiceExpression::parse("1d2000").is_err());
        assert!(DiceExpression::parse("2000000000+2000000000").is_err());

        let expr = DiceExpression::parse_or_default("70000d70000");
        assert_eq!(expr, DiceExpression::flat(1));
        assert_eq!(expr.max_value(), 1);
        assert_eq!(expr.average(), 1);
    }

    #[test]
    fn test_hand_built_expression_saturates() {
        let expr = DiceExpression {
            components: vec![DiceComponent {
                count: u32::MAX,
                sides: u32::MAX,
            }],
            modifier: 5,
            original: "wide".into(),
        };
        assert_eq!(expr.max_value(), i32::MAX);
        assert_eq!(expr.average(), i32::MAX);
        let mut rng = DiceRng::from_u64(9);
        assert!(rng.roll_damage(&expr, true) > 0);

        let capped = DiceExpression::dice(5_000, 50_000);
        assert_eq!(capped.components[0].count, MAX_DICE);
        assert_eq!(capped.components[0].sides, MAX_SIDES);
    }

    #[test]
    fn test_average() {
        assert_eq!(DiceExpression::parse("1d8").unwrap().average(), 4);
        assert_eq!(DiceExpression::parse("2d6+1").unwrap().average(), 8);
    }
}
