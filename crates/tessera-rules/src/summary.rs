//! Per-generation summaries reported to the scheduler and the host.

use serde::{Deserialize, Serialize};

/// What one call to
/// [`StepExecutor::run_generation`](crate::executor::StepExecutor::run_generation)
/// observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Generation counter after the step.
    pub generation: u64,
    /// Cells whose value changed during the step.
    pub changed_cells: usize,
    /// Cells in a non-background state after the step.
    pub population: usize,
    /// Variant-specific measurements.
    pub detail: SummaryDetail,
}

impl StepSummary {
    /// Return `true` if the step changed nothing.
    pub const fn is_quiescent(&self) -> bool {
        self.changed_cells == 0
    }
}

/// Variant-specific part of a [`StepSummary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryDetail {
    /// Nothing beyond the common fields.
    #[default]
    None,
    /// Ising lattice.
    Ising {
        /// `|sum s| / N`.
        magnetization: f64,
    },
    /// Scalar diffusion field.
    Field {
        /// Sum of all cell values.
        mass: f64,
    },
    /// Gray-Scott system.
    Chemical {
        /// Mean activator concentration.
        mean_v: f64,
    },
    /// Sandpile.
    Avalanche {
        /// Topplings caused by this step's drop.
        size: u64,
        /// Grains dropped since the last reseed.
        grains_dropped: u64,
        /// Largest avalanche since the last reseed.
        largest: u64,
        /// Grains lost over the border since the last reseed.
        grains_lost: u64,
    },
    /// Percolation search.
    Percolation {
        /// The search frontier is exhausted.
        bfs_done: bool,
        /// A top-to-bottom path exists.
        percolates: bool,
        /// Cells connected to the top row.
        cluster_size: usize,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_a_kind_tag() {
        let summary = StepSummary {
            generation: 3,
            changed_cells: 0,
            population: 12,
            detail: SummaryDetail::Percolation {
                bfs_done: true,
                percolates: false,
                cluster_size: 12,
            },
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["detail"]["kind"], "percolation");
        assert_eq!(json["detail"]["percolates"], false);
        assert!(summary.is_quiescent());
    }
}
