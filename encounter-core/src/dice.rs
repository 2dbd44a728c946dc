//! Additive dice notation.
//!
//! Expressions are one or more terms joined by `+`, where each term is a flat
//! integer or `<count>d<faces>` (`d8` means `1d8`). Monster hit points may carry
//! a precomputed average in front of the dice, as in `"12:3d6+2"`.
//!
//! Parsing is lenient: every character other than digits, `d`, `+` and `:` is
//! dropped before the notation is read, so `"3d6 + 2"` and `"3D6+2hp"` both
//! read as `3d6+2`. The pre-clean never rejects input on its own; only a
//! notation that still fails to parse afterwards is an error.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("Invalid average value in: {0}")]
    InvalidAverage(String),
    #[error("No dice specified")]
    NoDice,
    #[error("Too many dice in one term: {0}")]
    TooManyDice(u32),
}

/// Largest die count a single parsed term may ask for.
pub const MAX_DICE_COUNT: u32 = 1_000;

/// A single term of a dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiceTerm {
    /// `count` independent rolls of a die with `faces` sides.
    Dice { count: u32, faces: u32 },
    /// A flat value. Parsed notation only yields non-negative values, but
    /// expressions built in code may carry negative modifiers.
    Flat(i32),
}

impl DiceTerm {
    /// Expected value of the term.
    fn expected(&self) -> f64 {
        match *self {
            DiceTerm::Dice { count, faces } => count as f64 * (faces as f64 / 2.0 + 0.5),
            DiceTerm::Flat(value) => value as f64,
        }
    }
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceTerm::Dice { count, faces } => write!(f, "{count}d{faces}"),
            DiceTerm::Flat(value) => write!(f, "{value}"),
        }
    }
}

/// Strip everything the notation does not understand.
pub fn sanitize(notation: &str) -> String {
    notation
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, 'd' | '+' | ':'))
        .collect()
}

/// A complete dice expression (e.g., `12:3d6+2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceExpression {
    /// Stored average, present when the notation carried an `<avg>:` prefix.
    pub average: Option<i32>,
    pub terms: Vec<DiceTerm>,
}

impl DiceExpression {
    /// Build an expression directly from terms.
    pub fn from_terms(terms: Vec<DiceTerm>) -> Self {
        Self {
            average: None,
            terms,
        }
    }

    /// A single d20.
    pub fn d20() -> Self {
        Self::from_terms(vec![DiceTerm::Dice {
            count: 1,
            faces: 20,
        }])
    }

    /// Append a flat modifier term.
    pub fn plus(mut self, modifier: i32) -> Self {
        self.terms.push(DiceTerm::Flat(modifier));
        self
    }

    /// Parse a dice notation string.
    ///
    /// When `has_average` is set, everything before the first `:` is read as
    /// the stored average and the rest as the dice. A notation without a `:`
    /// is then treated as bare dice with no stored average.
    pub fn parse(notation: &str, has_average: bool) -> Result<Self, DiceError> {
        let cleaned = sanitize(notation);
        if cleaned.is_empty() {
            return Err(DiceError::NoDice);
        }

        let (average, dice) = match cleaned.split_once(':') {
            Some((avg, rest)) if has_average => (Some(parse_average(avg, &cleaned)?), rest),
            _ => (None, cleaned.as_str()),
        };

        let terms = dice
            .split('+')
            .map(|term| Self::parse_term(term, &cleaned))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DiceExpression { average, terms })
    }

    fn parse_term(term: &str, notation: &str) -> Result<DiceTerm, DiceError> {
        let invalid = || DiceError::InvalidNotation(notation.to_string());

        if term.is_empty() {
            return Err(invalid());
        }

        if let Some((count_str, faces_str)) = term.split_once('d') {
            let count: u32 = if count_str.is_empty() {
                1
            } else {
                count_str.parse().map_err(|_| invalid())?
            };
            let faces: u32 = faces_str.parse().map_err(|_| invalid())?;
            if faces == 0 {
                return Err(DiceError::InvalidDieSize(faces));
            }
            if count > MAX_DICE_COUNT {
                return Err(DiceError::TooManyDice(count));
            }
            Ok(DiceTerm::Dice { count, faces })
        } else {
            term.parse().map(DiceTerm::Flat).map_err(|_| invalid())
        }
    }

    /// The stored average, or the truncated expected value of the terms.
    pub fn average(&self) -> i32 {
        self.average.unwrap_or_else(|| {
            let expected: f64 = self.terms.iter().map(DiceTerm::expected).sum();
            expected.trunc() as i32
        })
    }

    /// Notation of the dice portion only, without any average prefix.
    pub fn dice_notation(&self) -> String {
        let mut out = String::new();
        for (i, term) in self.terms.iter().enumerate() {
            match term {
                DiceTerm::Flat(value) if i > 0 && *value < 0 => {
                    out.push_str(&format!("-{}", value.unsigned_abs()));
                }
                _ => {
                    if i > 0 {
                        out.push('+');
                    }
                    out.push_str(&term.to_string());
                }
            }
        }
        out
    }

    /// Render as `<avg>:<dice>`, computing the average if none is stored.
    pub fn encode_with_average(&self) -> String {
        format!("{}:{}", self.average(), self.dice_notation())
    }

    /// Roll the dice expression and return the result.
    pub fn roll(&self) -> RollResult {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific RNG (useful for testing).
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> RollResult {
        let mut component_results = Vec::new();
        let mut modifier: i32 = 0;

        for term in &self.terms {
            match *term {
                DiceTerm::Dice { count, faces } => {
                    let rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=faces)).collect();
                    let subtotal = rolls.iter().fold(0u32, |acc, r| acc.saturating_add(*r));
                    component_results.push(ComponentResult {
                        count,
                        faces,
                        rolls,
                        subtotal,
                    });
                }
                DiceTerm::Flat(value) => modifier = modifier.saturating_add(value),
            }
        }

        let dice_total = component_results.iter().fold(0i32, |acc, c| {
            acc.saturating_add(i32::try_from(c.subtotal).unwrap_or(i32::MAX))
        });
        let total = dice_total.saturating_add(modifier);

        // Natural 20/1 only means something for a lone d20
        let d20_roll = match component_results.as_slice() {
            [single] if single.faces == 20 && single.count == 1 => single.rolls.first().copied(),
            _ => None,
        };

        RollResult {
            notation: self.dice_notation(),
            component_results,
            modifier,
            total,
            natural_20: d20_roll == Some(20),
            natural_1: d20_roll == Some(1),
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s, s.contains(':'))
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.average {
            Some(avg) => write!(f, "{avg}:{}", self.dice_notation()),
            None => write!(f, "{}", self.dice_notation()),
        }
    }
}

fn parse_average(avg: &str, notation: &str) -> Result<i32, DiceError> {
    avg.parse()
        .map_err(|_| DiceError::InvalidAverage(notation.to_string()))
}

/// Result of rolling a single dice component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentResult {
    pub count: u32,
    pub faces: u32,
    pub rolls: Vec<u32>,
    pub subtotal: u32,
}

/// Complete result of a dice roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResult {
    pub notation: String,
    pub component_results: Vec<ComponentResult>,
    pub modifier: i32,
    pub total: i32,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl RollResult {
    /// Format the individual dice results for display.
    pub fn dice_display(&self) -> String {
        let dice_str = self
            .component_results
            .iter()
            .map(|c| {
                format!(
                    "[{}]",
                    c.rolls
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join(" + ");

        match self.modifier {
            0 => dice_str,
            m if dice_str.is_empty() => m.to_string(),
            m if m > 0 => format!("{dice_str} + {m}"),
            m => format!("{dice_str} - {}", m.unsigned_abs()),
        }
    }

    /// Check if the roll meets or exceeds a DC.
    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total >= dc
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

/// Evaluate a notation string to a single integer.
///
/// With `has_average` and `use_average` both set, the stored average is
/// returned without reading the dice portion or drawing any random numbers.
pub fn evaluate(notation: &str, has_average: bool, use_average: bool) -> Result<i32, DiceError> {
    evaluate_with_rng(notation, has_average, use_average, &mut rand::thread_rng())
}

/// [`evaluate`] with a specific RNG.
pub fn evaluate_with_rng<R: Rng>(
    notation: &str,
    has_average: bool,
    use_average: bool,
    rng: &mut R,
) -> Result<i32, DiceError> {
    if has_average && use_average {
        let cleaned = sanitize(notation);
        if let Some((avg, _)) = cleaned.split_once(':') {
            return parse_average(avg, &cleaned);
        }
    }

    let expr = DiceExpression::parse(notation, has_average)?;
    if has_average && use_average {
        Ok(expr.average())
    } else {
        Ok(expr.roll_with_rng(rng).total)
    }
}

/// Convenience function to roll dice from a notation string.
pub fn roll(notation: &str) -> Result<RollResult, DiceError> {
    let expr = DiceExpression::parse(notation, false)?;
    Ok(expr.roll())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::UnreachableRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20", false).unwrap();
        assert_eq!(
            expr.terms,
            vec![DiceTerm::Dice {
                count: 1,
                faces: 20
            }]
        );
        assert_eq!(expr.average, None);
    }

    #[test]
    fn test_parse_implicit_count() {
        let expr = DiceExpression::parse("d8+d6", false).unwrap();
        assert_eq!(
            expr.terms,
            vec![
                DiceTerm::Dice { count: 1, faces: 8 },
                DiceTerm::Dice { count: 1, faces: 6 }
            ]
        );
    }

    #[test]
    fn test_parse_with_average() {
        let expr = DiceExpression::parse("12:3d6+2", true).unwrap();
        assert_eq!(expr.average, Some(12));
        assert_eq!(expr.terms.len(), 2);
        assert_eq!(expr.to_string(), "12:3d6+2");
    }

    #[test]
    fn test_lenient_cleaning() {
        let expr = DiceExpression::parse(" 3D6 + 2 hp", false).unwrap();
        assert_eq!(expr.dice_notation(), "3d6+2");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DiceExpression::parse("", false), Err(DiceError::NoDice));
        assert_eq!(DiceExpression::parse("xyz", false), Err(DiceError::NoDice));
        assert!(matches!(
            DiceExpression::parse("2d6++3", false),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceExpression::parse("2d", false),
            Err(DiceError::InvalidNotation(_))
        ));
        assert_eq!(
            DiceExpression::parse("2d0", false),
            Err(DiceError::InvalidDieSize(0))
        );
        // Without the average flag the colon is not understood
        assert!(matches!(
            DiceExpression::parse("12:3d6", false),
            Err(DiceError::InvalidNotation(_))
        ));
    }

    #[test]
    fn test_die_count_cap() {
        assert!(DiceExpression::parse("1000d6", false).is_ok());
        assert_eq!(
            DiceExpression::parse("1001d6", false),
            Err(DiceError::TooManyDice(1001))
        );
        assert_eq!(
            evaluate_with_rng("4000000000d6", false, false, &mut UnreachableRng),
            Err(DiceError::TooManyDice(4_000_000_000))
        );
    }

    #[test]
    fn test_flat_terms_are_deterministic() {
        assert_eq!(evaluate("5+3", false, false), Ok(8));
        assert_eq!(evaluate("7", false, false), Ok(7));
    }

    #[test]
    fn test_average_mode_skips_rng() {
        let mut rng = UnreachableRng;
        assert_eq!(evaluate_with_rng("12:3d6+2", true, true, &mut rng), Ok(12));
        // The dice portion is never read in average mode
        assert_eq!(evaluate_with_rng("9:garbage", true, true, &mut rng), Ok(9));
    }

    #[test]
    fn test_average_mode_without_stored_average() {
        let mut rng = UnreachableRng;
        assert_eq!(evaluate_with_rng("3d6+2", true, true, &mut rng), Ok(12));
        assert_eq!(evaluate_with_rng("2d8", true, true, &mut rng), Ok(9));
    }

    #[test]
    fn test_rolled_mode_ignores_average() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let value = evaluate_with_rng("12:3d6+2", true, false, &mut rng).unwrap();
            assert!((5..=20).contains(&value));
        }
    }

    #[test]
    fn test_roll_range_and_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let expr = DiceExpression::parse("4d6", false).unwrap();
        let trials = 5000;
        let mut sum = 0i64;
        for _ in 0..trials {
            let total = expr.roll_with_rng(&mut rng).total;
            assert!((4..=24).contains(&total));
            sum += total as i64;
        }
        let mean = sum as f64 / trials as f64;
        assert!((mean - 14.0).abs() < 0.5, "mean was {mean}");
    }

    #[test]
    fn test_computed_average() {
        let expr = DiceExpression::parse("3d6+2", false).unwrap();
        assert_eq!(expr.average(), 12);
        assert_eq!(expr.encode_with_average(), "12:3d6+2");

        let expr = DiceExpression::parse("2d10+4", false).unwrap();
        assert_eq!(expr.average(), 15);
    }

    #[test]
    fn test_negative_modifier_built_in_code() {
        let expr = DiceExpression::d20().plus(-1);
        assert_eq!(expr.dice_notation(), "1d20-1");
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let result = expr.roll_with_rng(&mut rng);
            assert!((0..=19).contains(&result.total));
        }
    }

    #[test]
    fn test_natural_flags_only_for_single_d20() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let result = DiceExpression::parse("2d20", false)
                .unwrap()
                .roll_with_rng(&mut rng);
            assert!(!result.natural_20 && !result.natural_1);
        }
    }

    #[test]
    fn test_dice_display() {
        let result = RollResult {
            notation: "2d6+3".to_string(),
            component_results: vec![ComponentResult {
                count: 2,
                faces: 6,
                rolls: vec![4, 2],
                subtotal: 6,
            }],
            modifier: 3,
            total: 9,
            natural_20: false,
            natural_1: false,
        };
        assert_eq!(result.to_string(), "[4, 2] + 3 = 9");
        assert!(result.meets_dc(9));
        assert!(!result.meets_dc(10));
    }
}
