//! Turning validated configuration into rules and lattices.

use tessera_grid::Grid;
use tessera_rules::gray_scott::Chemicals;
use tessera_rules::percolation::BLOCKED;
use tessera_rules::{
    AvalancheStats, BriansBrainRule, CyclicRule, DiffusionRule, DiscreteRule, DoubleBuffer, ElementaryRule,
    GrayScottParams, GrayScottRule, IsingRule, Lattice, LifeRule, PercolationSearch, RuleError, SandpileRule,
    WireworldRule,
};

use crate::config::{GridConfig, RuleConfig};
use crate::error::SimulationError;

/// A constructed rule, grouped by the storage it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleFamily {
    /// `u8` per-cell rules.
    Discrete(DiscreteRule),
    /// Scalar diffusion.
    Scalar(DiffusionRule),
    /// Gray-Scott.
    Chemical(GrayScottRule),
    /// Sandpile.
    Pile(SandpileRule),
    /// Percolation search (no rule object).
    Percolation,
}

/// Construct the rule a [`RuleConfig`] describes.
///
/// # Errors
///
/// Returns [`RuleError::InvalidConfig`] for out-of-range parameters.
pub fn build_rule(config: &RuleConfig) -> Result<RuleFamily, RuleError> {
    let family = match config {
        RuleConfig::LifeLike { rulestring } => RuleFamily::Discrete(DiscreteRule::LifeLike(LifeRule::parse(rulestring)?)),
        RuleConfig::Wireworld => RuleFamily::Discrete(DiscreteRule::Wireworld(WireworldRule::new())),
        RuleConfig::BriansBrain => RuleFamily::Discrete(DiscreteRule::BriansBrain(BriansBrainRule::new())),
        RuleConfig::Cyclic {
            states,
            threshold,
            neighborhood,
        } => RuleFamily::Discrete(DiscreteRule::Cyclic(CyclicRule::new(
            *states,
            *threshold,
            neighborhood.clone(),
        )?)),
        RuleConfig::Elementary { number } => RuleFamily::Discrete(DiscreteRule::Elementary(ElementaryRule::new(*number))),
        RuleConfig::Ising {
            temperature,
            checkerboard,
        } => RuleFamily::Discrete(DiscreteRule::Ising(IsingRule::new(*temperature, *checkerboard)?)),
        RuleConfig::Diffusion { coefficient, dt } => RuleFamily::Scalar(DiffusionRule::new(*coefficient, *dt)?),
        RuleConfig::GrayScott {
            preset,
            feed,
            kill,
            diffusion_u,
            diffusion_v,
            dt,
        } => {
            let (preset_feed, preset_kill) = preset.feed_kill();
            RuleFamily::Chemical(GrayScottRule::new(GrayScottParams {
                feed: feed.unwrap_or(preset_feed),
                kill: kill.unwrap_or(preset_kill),
                diffusion_u: *diffusion_u,
                diffusion_v: *diffusion_v,
                dt: *dt,
            })?)
        }
        RuleConfig::Sandpile {
            capacity,
            grains,
            site,
        } => RuleFamily::Pile(SandpileRule::new(*capacity, *grains, *site)?),
        RuleConfig::Percolation => RuleFamily::Percolation,
    };
    Ok(family)
}

/// A fresh, unseeded lattice for `family`.
///
/// # Errors
///
/// Returns [`SimulationError::Grid`] for invalid dimensions, or
/// [`SimulationError::InvalidConfig`] if an explicit sandpile drop site
/// lies outside the grid.
pub fn build_lattice(grid: &GridConfig, family: &RuleFamily) -> Result<Lattice, SimulationError> {
    let GridConfig {
        width,
        height,
        boundary,
    } = *grid;
    let lattice = match family {
        RuleFamily::Discrete(rule) => Lattice::Discrete {
            buffers: DoubleBuffer::new(Grid::new(width, height, boundary, 0)?),
            rule: rule.clone(),
        },
        RuleFamily::Scalar(rule) => Lattice::Scalar {
            buffers: DoubleBuffer::new(Grid::new(width, height, boundary, 0.0)?),
            rule: rule.clone(),
        },
        RuleFamily::Chemical(rule) => Lattice::Chemical {
            buffers: DoubleBuffer::new(Grid::new(width, height, boundary, Chemicals::RESTING)?),
            rule: rule.clone(),
        },
        RuleFamily::Pile(rule) => {
            let (x, y) = rule.site().resolve(width, height);
            if x >= width || y >= height {
                return Err(SimulationError::invalid(format!(
                    "sandpile drop site ({x}, {y}) is outside the {width}x{height} grid"
                )));
            }
            Lattice::Pile {
                grid: Grid::new(width, height, boundary, 0)?,
                rule: rule.clone(),
                stats: AvalancheStats::default(),
            }
        }
        RuleFamily::Percolation => Lattice::Percolation {
            grid: Grid::new(width, height, boundary, BLOCKED)?,
            search: PercolationSearch::new(),
        },
    };
    Ok(lattice)
}

/// Swap the rule inside `lattice` for `family`, keeping every cell.
///
/// # Errors
///
/// Returns [`SimulationError::InvariantViolation`] if `family` needs a
/// different kind of storage than `lattice` has.
pub fn replace_rule(lattice: &mut Lattice, family: RuleFamily) -> Result<(), SimulationError> {
    match (lattice, family) {
        (Lattice::Discrete { rule, .. }, RuleFamily::Discrete(new)) => *rule = new,
        (Lattice::Scalar { rule, .. }, RuleFamily::Scalar(new)) => *rule = new,
        (Lattice::Chemical { rule, .. }, RuleFamily::Chemical(new)) => *rule = new,
        (Lattice::Pile { rule, .. }, RuleFamily::Pile(new)) => *rule = new,
        (Lattice::Percolation { .. }, RuleFamily::Percolation) => {}
        (lattice, _) => {
            return Err(SimulationError::invariant(format!(
                "cannot swap a different rule family into a {} lattice",
                lattice.kind()
            )));
        }
    }
    Ok(())
}
