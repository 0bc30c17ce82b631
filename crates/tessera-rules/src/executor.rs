//! Step executor: one generation at a time, whatever the rule's shape.
//!
//! The [`Lattice`] pairs a rule with the storage it operates on. The
//! executor dispatches on its tag:
//!
//! 1. **Per-cell rules** (discrete, scalar, chemical) -- evaluate every cell
//!    against the pre-step grid into a scratch buffer, then swap.
//! 2. **Relaxation** (sandpile) -- drop grains and relax in place until
//!    stable.
//! 3. **Frontier search** (percolation) -- expand the BFS by one layer.
//!
//! Every call to [`StepExecutor::run_generation`] increments the generation
//! counter exactly once. All randomness comes from the executor's seeded
//! [`SmallRng`]: each generation draws one `u64` from it, and stochastic
//! rules derive per-cell samples from that value, so results are a pure
//! function of the seed and do not depend on batching or traversal order.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tessera_grid::{Boundary, Grid};
use tracing::trace;

use crate::diffusion::{DiffusionRule, total_mass};
use crate::discrete::DiscreteRule;
use crate::error::RuleError;
use crate::gray_scott::{Chemicals, GrayScottRule, mean_v};
use crate::ising::magnetization;
use crate::local::{DoubleBuffer, Traversal};
use crate::percolation::{PercolationSearch, REACHED};
use crate::random::CellRandom;
use crate::sandpile::{AvalancheStats, RelaxationRule, SandpileRule};
use crate::summary::{StepSummary, SummaryDetail};

/// A rule together with the grid(s) it evolves.
#[derive(Debug, Clone, PartialEq)]
pub enum Lattice {
    /// Small-state per-cell rules.
    Discrete {
        /// Current and scratch grids.
        buffers: DoubleBuffer<u8>,
        /// The active rule.
        rule: DiscreteRule,
    },
    /// Heat diffusion over `f32` values.
    Scalar {
        /// Current and scratch grids.
        buffers: DoubleBuffer<f32>,
        /// The active rule.
        rule: DiffusionRule,
    },
    /// Gray-Scott reaction-diffusion.
    Chemical {
        /// Current and scratch grids.
        buffers: DoubleBuffer<Chemicals>,
        /// The active rule.
        rule: GrayScottRule,
    },
    /// Sandpile relaxed in place.
    Pile {
        /// Grain counts.
        grid: Grid<u32>,
        /// The active rule.
        rule: SandpileRule,
        /// Running avalanche totals.
        stats: AvalancheStats,
    },
    /// Site percolation with an incremental BFS.
    Percolation {
        /// Blocked / open / reached sites.
        grid: Grid<u8>,
        /// Search progress.
        search: PercolationSearch,
    },
}

impl Lattice {
    /// Short name of the variant for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Discrete { rule, .. } => rule.name(),
            Self::Scalar { .. } => "diffusion",
            Self::Chemical { .. } => "gray_scott",
            Self::Pile { .. } => "sandpile",
            Self::Percolation { .. } => "percolation",
        }
    }

    /// Grid width.
    pub const fn width(&self) -> usize {
        match self {
            Self::Discrete { buffers, .. } => buffers.current().width(),
            Self::Scalar { buffers, .. } => buffers.current().width(),
            Self::Chemical { buffers, .. } => buffers.current().width(),
            Self::Pile { grid, .. } => grid.width(),
            Self::Percolation { grid, .. } => grid.width(),
        }
    }

    /// Grid height.
    pub const fn height(&self) -> usize {
        match self {
            Self::Discrete { buffers, .. } => buffers.current().height(),
            Self::Scalar { buffers, .. } => buffers.current().height(),
            Self::Chemical { buffers, .. } => buffers.current().height(),
            Self::Pile { grid, .. } => grid.height(),
            Self::Percolation { grid, .. } => grid.height(),
        }
    }

    /// Number of cells.
    pub const fn len(&self) -> usize {
        self.width().saturating_mul(self.height())
    }

    /// Always `false`: grids have at least one cell.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Boundary policy of the current grid.
    pub const fn boundary(&self) -> Boundary {
        match self {
            Self::Discrete { buffers, .. } => buffers.current().boundary(),
            Self::Scalar { buffers, .. } => buffers.current().boundary(),
            Self::Chemical { buffers, .. } => buffers.current().boundary(),
            Self::Pile { grid, .. } => grid.boundary(),
            Self::Percolation { grid, .. } => grid.boundary(),
        }
    }

    /// `true` for a percolation lattice whose search has finished.
    pub const fn search_done(&self) -> bool {
        match self {
            Self::Percolation { search, .. } => search.state().bfs_done,
            _ => false,
        }
    }

    /// Reset per-seed bookkeeping (avalanche totals, search progress).
    ///
    /// Called after the grid has been reseeded.
    pub fn reset_progress(&mut self) {
        match self {
            Self::Pile { stats, .. } => *stats = AvalancheStats::default(),
            Self::Percolation { search, .. } => *search = PercolationSearch::new(),
            Self::Discrete { .. } | Self::Scalar { .. } | Self::Chemical { .. } => {}
        }
    }

    /// Cells in a non-background state.
    pub fn population(&self) -> usize {
        match self {
            Self::Discrete { buffers, .. } => buffers.current().count(|v| v != 0),
            Self::Scalar { buffers, .. } => buffers.current().count(|v| v > 0.0),
            Self::Chemical { buffers, .. } => buffers.current().count(|c| c.v > 0.0),
            Self::Pile { grid, .. } => grid.count(|v| v != 0),
            Self::Percolation { grid, .. } => grid.count(|v| v == REACHED),
        }
    }

    /// Variant-specific measurements of the current state.
    pub fn detail(&self, last_avalanche: u64) -> SummaryDetail {
        match self {
            Self::Discrete {
                buffers,
                rule: DiscreteRule::Ising(_),
            } => SummaryDetail::Ising {
                magnetization: magnetization(buffers.current().cells()),
            },
            Self::Discrete { .. } => SummaryDetail::None,
            Self::Scalar { buffers, .. } => SummaryDetail::Field {
                mass: total_mass(buffers.current().cells()),
            },
            Self::Chemical { buffers, .. } => SummaryDetail::Chemical {
                mean_v: mean_v(buffers.current().cells()),
            },
            Self::Pile { stats, .. } => SummaryDetail::Avalanche {
                size: last_avalanche,
                grains_dropped: stats.grains_dropped,
                largest: stats.largest,
                grains_lost: stats.grains_lost,
            },
            Self::Percolation { search, .. } => {
                let state = search.state();
                SummaryDetail::Percolation {
                    bfs_done: state.bfs_done,
                    percolates: state.percolates,
                    cluster_size: state.cluster_size,
                }
            }
        }
    }
}

/// Cells touched since the renderer last asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dirty {
    /// Nothing changed.
    Clean,
    /// These linear indices changed (ascending, no duplicates).
    Cells(Vec<usize>),
    /// Too many changes to track individually; redraw everything.
    All,
}

/// Drives a [`Lattice`] one generation at a time.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    lattice: Lattice,
    generation: u64,
    rng: SmallRng,
    traversal: Traversal,
    dirty: Vec<usize>,
    dirty_overflow: bool,
    last_avalanche: u64,
}

impl StepExecutor {
    /// Create an executor whose random source is seeded with `seed`.
    pub fn new(lattice: Lattice, seed: u64) -> Self {
        Self {
            lattice,
            generation: 0,
            rng: SmallRng::seed_from_u64(seed),
            traversal: Traversal::RowMajor,
            dirty: Vec::new(),
            dirty_overflow: false,
            last_avalanche: 0,
        }
    }

    /// Use a different cell visiting order.
    #[must_use]
    pub const fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Generations completed.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The lattice being evolved.
    pub const fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Mutable access for seeding and rule replacement.
    ///
    /// Marks the whole lattice dirty.
    pub const fn lattice_mut(&mut self) -> &mut Lattice {
        self.dirty_overflow = true;
        &mut self.lattice
    }

    /// The seeded random source, shared with seeding so one seed
    /// reproduces a whole run.
    pub const fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Split borrow of the lattice and the random source for seeding.
    pub const fn seeding_parts(&mut self) -> (&mut Lattice, &mut SmallRng) {
        self.dirty_overflow = true;
        (&mut self.lattice, &mut self.rng)
    }

    /// Summary of the current state without stepping.
    pub fn snapshot(&self) -> StepSummary {
        StepSummary {
            generation: self.generation,
            changed_cells: 0,
            population: self.lattice.population(),
            detail: self.lattice.detail(self.last_avalanche),
        }
    }

    /// Drain the set of cells changed since the previous call.
    pub fn take_dirty(&mut self) -> Dirty {
        if std::mem::take(&mut self.dirty_overflow) {
            self.dirty.clear();
            return Dirty::All;
        }
        if self.dirty.is_empty() {
            return Dirty::Clean;
        }
        let mut cells = std::mem::take(&mut self.dirty);
        cells.sort_unstable();
        cells.dedup();
        Dirty::Cells(cells)
    }

    /// Run one generation.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvariantViolation`] if a grid contract is
    /// broken; the lattice is then in an unspecified (but memory-safe)
    /// state and the caller should stop stepping.
    pub fn run_generation(&mut self) -> Result<StepSummary, RuleError> {
        let random = CellRandom::new(self.rng.random::<u64>());
        let generation = self.generation;
        let traversal = self.traversal;

        let changed = match &mut self.lattice {
            Lattice::Discrete { buffers, rule } => buffers.step(rule, generation, random, traversal)?,
            Lattice::Scalar { buffers, rule } => buffers.step(rule, generation, random, traversal)?,
            Lattice::Chemical { buffers, rule } => buffers.step(rule, generation, random, traversal)?,
            Lattice::Pile { grid, rule, stats } => {
                let before = grid.cells().to_vec();
                rule.perturb(grid)?;
                let relaxation = rule.relax(grid)?;
                stats.record(rule.grains(), relaxation);
                self.last_avalanche = relaxation.topplings;
                trace!(
                    generation,
                    topplings = relaxation.topplings,
                    grains_lost = relaxation.grains_lost,
                    "sandpile relaxed"
                );
                changed_indices(&before, grid.cells())
            }
            Lattice::Percolation { grid, search } => search.step(grid)?,
        };

        self.generation = self
            .generation
            .checked_add(1)
            .ok_or_else(|| RuleError::invariant("generation counter overflow"))?;
        self.mark_dirty(&changed);

        Ok(StepSummary {
            generation: self.generation,
            changed_cells: changed.len(),
            population: self.lattice.population(),
            detail: self.lattice.detail(self.last_avalanche),
        })
    }

    /// Zero the generation counter and reseed the random source.
    ///
    /// The lattice itself is left alone; callers reseed it afterwards.
    pub fn reset(&mut self, seed: u64) {
        self.generation = 0;
        self.rng = SmallRng::seed_from_u64(seed);
        self.last_avalanche = 0;
        self.dirty.clear();
        self.dirty_overflow = true;
        self.lattice.reset_progress();
    }

    fn mark_dirty(&mut self, changed: &[usize]) {
        if self.dirty_overflow {
            return;
        }
        if self.dirty.len().saturating_add(changed.len()) >= self.lattice.len() {
            self.dirty.clear();
            self.dirty_overflow = true;
            return;
        }
        self.dirty.extend_from_slice(changed);
    }
}

fn changed_indices<T: PartialEq>(before: &[T], after: &[T]) -> Vec<usize> {
    before
        .iter()
        .zip(after)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect()
}
