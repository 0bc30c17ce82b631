//! The small-state (`u8`) rule family behind one tagged type.

use tessera_grid::{Boundary, Neighborhood};

use crate::elementary::ElementaryRule;
use crate::ising::IsingRule;
use crate::life::LifeRule;
use crate::local::{CellContext, LocalRule, RuleShape};
use crate::multistate::{BriansBrainRule, CyclicRule, WireworldRule};

/// Any rule whose cells are small unsigned state tags.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscreteRule {
    /// `B../S..` totalistic rule.
    LifeLike(LifeRule),
    /// Wireworld circuits.
    Wireworld(WireworldRule),
    /// Brian's Brain.
    BriansBrain(BriansBrainRule),
    /// Cyclic cellular automaton.
    Cyclic(CyclicRule),
    /// Elementary 1D rule with scrolling history.
    Elementary(ElementaryRule),
    /// Ising spins with Metropolis acceptance.
    Ising(IsingRule),
}

impl DiscreteRule {
    /// Short name for logs and status lines.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LifeLike(_) => "life_like",
            Self::Wireworld(_) => "wireworld",
            Self::BriansBrain(_) => "brians_brain",
            Self::Cyclic(_) => "cyclic",
            Self::Elementary(_) => "elementary",
            Self::Ising(_) => "ising",
        }
    }
}

impl LocalRule for DiscreteRule {
    type Cell = u8;

    fn shape(&self) -> RuleShape {
        match self {
            Self::LifeLike(r) => r.shape(),
            Self::Wireworld(r) => r.shape(),
            Self::BriansBrain(r) => r.shape(),
            Self::Cyclic(r) => r.shape(),
            Self::Elementary(r) => r.shape(),
            Self::Ising(r) => r.shape(),
        }
    }

    fn neighborhood(&self) -> &Neighborhood {
        match self {
            Self::LifeLike(r) => r.neighborhood(),
            Self::Wireworld(r) => r.neighborhood(),
            Self::BriansBrain(r) => r.neighborhood(),
            Self::Cyclic(r) => r.neighborhood(),
            Self::Elementary(r) => r.neighborhood(),
            Self::Ising(r) => r.neighborhood(),
        }
    }

    fn boundary(&self) -> Option<Boundary> {
        match self {
            Self::Elementary(r) => r.boundary(),
            Self::LifeLike(_) | Self::Wireworld(_) | Self::BriansBrain(_) | Self::Cyclic(_) | Self::Ising(_) => None,
        }
    }

    fn apply(&self, cell: u8, neighbors: &[u8], ctx: &CellContext) -> u8 {
        match self {
            Self::LifeLike(r) => r.apply(cell, neighbors, ctx),
            Self::Wireworld(r) => r.apply(cell, neighbors, ctx),
            Self::BriansBrain(r) => r.apply(cell, neighbors, ctx),
            Self::Cyclic(r) => r.apply(cell, neighbors, ctx),
            Self::Elementary(r) => r.apply(cell, neighbors, ctx),
            Self::Ising(r) => r.apply(cell, neighbors, ctx),
        }
    }
}
