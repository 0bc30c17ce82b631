//! Life-like totalistic rules written as `B<digits>/S<digits>`.
//!
//! A dead cell is born when its live Moore-neighbor count is in the birth
//! set; a live cell survives when the count is in the survival set. Cells
//! are `u8` with `0` dead and anything else alive; the rule always writes
//! `0` or `1`.

use std::fmt;
use std::str::FromStr;

use tessera_grid::Neighborhood;

use crate::error::RuleError;
use crate::local::{CellContext, LocalRule, RuleShape};

/// Conway's Game of Life.
pub const CONWAY: &str = "B3/S23";
/// `HighLife`, which adds birth on 6 and supports the replicator.
pub const HIGHLIFE: &str = "B36/S23";
/// Seeds: every live cell dies, births on exactly 2.
pub const SEEDS: &str = "B2/S";
/// Day & Night.
pub const DAY_AND_NIGHT: &str = "B3678/S34678";

/// Parsed Life-like rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeRule {
    birth: [bool; 9],
    survive: [bool; 9],
    neighborhood: Neighborhood,
}

impl LifeRule {
    /// Parse a rulestring such as `B3/S23` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidConfig`] when the string is not of the
    /// form `B<digits>/S<digits>` or a digit exceeds 8.
    pub fn parse(rulestring: &str) -> Result<Self, RuleError> {
        let trimmed = rulestring.trim();
        let (birth_part, survive_part) = trimmed
            .split_once('/')
            .ok_or_else(|| RuleError::invalid(format!("rulestring '{trimmed}' has no '/'")))?;

        let birth_digits = strip_prefix_ci(birth_part, 'b').ok_or_else(|| {
            RuleError::invalid(format!("rulestring '{trimmed}' must start with 'B'"))
        })?;
        let survive_digits = strip_prefix_ci(survive_part, 's').ok_or_else(|| {
            RuleError::invalid(format!("rulestring '{trimmed}' needs an 'S' section"))
        })?;

        Ok(Self {
            birth: parse_counts(birth_digits, trimmed)?,
            survive: parse_counts(survive_digits, trimmed)?,
            neighborhood: Neighborhood::Moore,
        })
    }

    /// Conway's B3/S23.
    pub const fn conway() -> Self {
        Self {
            birth: [false, false, false, true, false, false, false, false, false],
            survive: [false, false, true, true, false, false, false, false, false],
            neighborhood: Neighborhood::Moore,
        }
    }

    /// Whether a dead cell with `count` live neighbors is born.
    pub fn births_on(&self, count: usize) -> bool {
        self.birth.get(count).copied().unwrap_or(false)
    }

    /// Whether a live cell with `count` live neighbors survives.
    pub fn survives_on(&self, count: usize) -> bool {
        self.survive.get(count).copied().unwrap_or(false)
    }
}

fn strip_prefix_ci(part: &str, prefix: char) -> Option<&str> {
    part.strip_prefix(prefix)
        .or_else(|| part.strip_prefix(prefix.to_ascii_uppercase()))
}

fn parse_counts(digits: &str, rulestring: &str) -> Result<[bool; 9], RuleError> {
    let mut set = [false; 9];
    for ch in digits.chars() {
        let count = ch
            .to_digit(10)
            .and_then(|d| usize::try_from(d).ok())
            .filter(|&d| d <= 8)
            .ok_or_else(|| {
                RuleError::invalid(format!("rulestring '{rulestring}': bad neighbor count '{ch}'"))
            })?;
        if let Some(slot) = set.get_mut(count) {
            *slot = true;
        }
    }
    Ok(set)
}

impl FromStr for LifeRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LifeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = |set: &[bool; 9]| -> String {
            set.iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .map(|(n, _)| char::from_digit(u32::try_from(n).unwrap_or(0), 10).unwrap_or('?'))
                .collect()
        };
        write!(f, "B{}/S{}", digits(&self.birth), digits(&self.survive))
    }
}

impl LocalRule for LifeRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        RuleShape::Deterministic
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: u8, neighbors: &[u8], _ctx: &CellContext) -> u8 {
        let live = neighbors.iter().filter(|&&n| n != 0).count();
        let next = if cell == 0 {
            self.births_on(live)
        } else {
            self.survives_on(live)
        };
        u8::from(next)
    }
}
