//! Small multi-state automata: Wireworld, Brian's Brain, and cyclic CA.

use tessera_grid::Neighborhood;

use crate::error::RuleError;
use crate::local::{CellContext, LocalRule, RuleShape};

// ---------------------------------------------------------------------------
// Wireworld
// ---------------------------------------------------------------------------

/// Wireworld cell states.
pub mod wire {
    /// Nothing; never changes.
    pub const EMPTY: u8 = 0;
    /// Electron head.
    pub const HEAD: u8 = 1;
    /// Electron tail.
    pub const TAIL: u8 = 2;
    /// Conductor (copper).
    pub const CONDUCTOR: u8 = 3;
}

/// Wireworld over the Moore neighborhood.
///
/// Head becomes tail, tail becomes conductor, and a conductor becomes a
/// head when exactly one or two neighbors are heads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireworldRule {
    neighborhood: Neighborhood,
}

impl WireworldRule {
    /// Create the rule.
    pub const fn new() -> Self {
        Self {
            neighborhood: Neighborhood::Moore,
        }
    }
}

impl Default for WireworldRule {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRule for WireworldRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        RuleShape::Deterministic
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: u8, neighbors: &[u8], _ctx: &CellContext) -> u8 {
        match cell {
            wire::HEAD => wire::TAIL,
            wire::TAIL => wire::CONDUCTOR,
            wire::CONDUCTOR => {
                let heads = neighbors.iter().filter(|&&n| n == wire::HEAD).count();
                if heads == 1 || heads == 2 {
                    wire::HEAD
                } else {
                    wire::CONDUCTOR
                }
            }
            _ => wire::EMPTY,
        }
    }
}

// ---------------------------------------------------------------------------
// Brian's Brain
// ---------------------------------------------------------------------------

/// Brian's Brain cell states.
pub mod brain {
    /// Ready to fire.
    pub const OFF: u8 = 0;
    /// Firing.
    pub const FIRING: u8 = 1;
    /// Refractory.
    pub const DYING: u8 = 2;
}

/// Brian's Brain over the Moore neighborhood.
///
/// Firing cells become dying, dying cells become off, and an off cell fires
/// when exactly two neighbors are firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriansBrainRule {
    neighborhood: Neighborhood,
}

impl BriansBrainRule {
    /// Create the rule.
    pub const fn new() -> Self {
        Self {
            neighborhood: Neighborhood::Moore,
        }
    }
}

impl Default for BriansBrainRule {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRule for BriansBrainRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        RuleShape::Deterministic
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: u8, neighbors: &[u8], _ctx: &CellContext) -> u8 {
        match cell {
            brain::FIRING => brain::DYING,
            brain::DYING => brain::OFF,
            _ => {
                let firing = neighbors.iter().filter(|&&n| n == brain::FIRING).count();
                if firing == 2 { brain::FIRING } else { brain::OFF }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cyclic cellular automaton
// ---------------------------------------------------------------------------

/// Cyclic CA: a cell in state `s` advances to `(s + 1) mod states` when at
/// least `threshold` neighbors already hold the successor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicRule {
    states: u8,
    threshold: usize,
    neighborhood: Neighborhood,
}

impl CyclicRule {
    /// Create a cyclic rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidConfig`] if `states < 2`, if `threshold`
    /// is zero, or if `threshold` exceeds the neighborhood size.
    pub fn new(states: u8, threshold: usize, neighborhood: Neighborhood) -> Result<Self, RuleError> {
        if states < 2 {
            return Err(RuleError::invalid(format!(
                "cyclic rule needs at least 2 states, got {states}"
            )));
        }
        if threshold == 0 || threshold > neighborhood.len() {
            return Err(RuleError::invalid(format!(
                "cyclic threshold {threshold} must be in 1..={}",
                neighborhood.len()
            )));
        }
        Ok(Self {
            states,
            threshold,
            neighborhood,
        })
    }

    /// Number of states in the cycle.
    pub const fn states(&self) -> u8 {
        self.states
    }

    /// Successor of `state` in the cycle.
    pub fn successor(&self, state: u8) -> u8 {
        state.saturating_add(1).checked_rem(self.states).unwrap_or(0)
    }
}

impl LocalRule for CyclicRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        RuleShape::Deterministic
    }

    fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    fn apply(&self, cell: u8, neighbors: &[u8], _ctx: &CellContext) -> u8 {
        let next = self.successor(cell);
        let hits = neighbors.iter().filter(|&&n| n == next).count();
        if hits >= self.threshold { next } else { cell }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::random::CellRandom;

    fn ctx() -> CellContext {
        CellContext {
            x: 0,
            y: 0,
            index: 0,
            width: 3,
            height: 3,
            generation: 0,
            random: CellRandom::new(0),
        }
    }

    #[test]
    fn wireworld_cycle() {
        let rule = WireworldRule::new();
        let quiet = [wire::EMPTY; 8];
        assert_eq!(rule.apply(wire::HEAD, &quiet, &ctx()), wire::TAIL);
        assert_eq!(rule.apply(wire::TAIL, &quiet, &ctx()), wire::CONDUCTOR);
        assert_eq!(rule.apply(wire::CONDUCTOR, &quiet, &ctx()), wire::CONDUCTOR);
        assert_eq!(rule.apply(wire::EMPTY, &[wire::HEAD; 8], &ctx()), wire::EMPTY);
    }

    #[test]
    fn wireworld_conductor_fires_on_one_or_two_heads() {
        let rule = WireworldRule::new();
        let mut hood = [wire::CONDUCTOR; 8];
        hood[0] = wire::HEAD;
        assert_eq!(rule.apply(wire::CONDUCTOR, &hood, &ctx()), wire::HEAD);
        hood[1] = wire::HEAD;
        assert_eq!(rule.apply(wire::CONDUCTOR, &hood, &ctx()), wire::HEAD);
        hood[2] = wire::HEAD;
        assert_eq!(rule.apply(wire::CONDUCTOR, &hood, &ctx()), wire::CONDUCTOR);
    }

    #[test]
    fn brain_fires_on_exactly_two() {
        let rule = BriansBrainRule::new();
        let mut hood = [brain::OFF; 8];
        hood[3] = brain::FIRING;
        assert_eq!(rule.apply(brain::OFF, &hood, &ctx()), brain::OFF);
        hood[5] = brain::FIRING;
        assert_eq!(rule.apply(brain::OFF, &hood, &ctx()), brain::FIRING);
        hood[6] = brain::FIRING;
        assert_eq!(rule.apply(brain::OFF, &hood, &ctx()), brain::OFF);
        assert_eq!(rule.apply(brain::FIRING, &hood, &ctx()), brain::DYING);
        assert_eq!(rule.apply(brain::DYING, &hood, &ctx()), brain::OFF);
    }

    #[test]
    fn cyclic_rejects_degenerate_parameters() {
        assert!(CyclicRule::new(1, 1, Neighborhood::VonNeumann).is_err());
        assert!(CyclicRule::new(16, 0, Neighborhood::VonNeumann).is_err());
        assert!(CyclicRule::new(16, 5, Neighborhood::VonNeumann).is_err());
    }

    #[test]
    fn cyclic_advances_and_wraps() {
        let rule = CyclicRule::new(4, 1, Neighborhood::VonNeumann).unwrap();
        assert_eq!(rule.successor(3), 0);
        assert_eq!(rule.apply(3, &[0, 2, 2, 2], &ctx()), 0);
        assert_eq!(rule.apply(1, &[0, 0, 3, 1], &ctx()), 1);
    }

    #[test]
    fn cyclic_threshold_requires_enough_successors() {
        let rule = CyclicRule::new(16, 2, Neighborhood::VonNeumann).unwrap();
        assert_eq!(rule.apply(5, &[6, 0, 0, 0], &ctx()), 5);
        assert_eq!(rule.apply(5, &[6, 6, 0, 0], &ctx()), 6);
    }
}
