//! Structured per-frame status delivered to the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_rules::{StepSummary, SummaryDetail};
use uuid::Uuid;

use crate::stage::{Phase, StageOutcome};

/// Identifies one simulation handle in logs and statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub Uuid);

impl HandleId {
    /// A new time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the host sees after each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Which simulation this is.
    pub handle: HandleId,
    /// Generations since the last restart, across all stages.
    pub generation: u64,
    /// Position in the stage list.
    pub stage_index: usize,
    /// Stage label.
    pub stage_label: String,
    /// Generations in the current stage.
    pub stage_generation: u64,
    /// Phase after this frame.
    pub phase: Phase,
    /// Why the current stage stopped running, once it has.
    pub outcome: Option<StageOutcome>,
    /// Latest measurements.
    pub summary: StepSummary,
}

impl Status {
    /// One human-readable line.
    pub fn describe(&self) -> String {
        let label = &self.stage_label;
        let generation = self.generation;
        let mut line = match self.summary.detail {
            SummaryDetail::None => format!(
                "{label} · gen {generation} · {} live",
                self.summary.population
            ),
            SummaryDetail::Ising { magnetization } => {
                format!("{label} · sweep {generation} · |M| = {magnetization:.3}")
            }
            SummaryDetail::Field { mass } => format!("{label} · t={generation} · heat {mass:.2}"),
            SummaryDetail::Chemical { mean_v } => {
                format!("{label} · step {generation} · mean V {mean_v:.4}")
            }
            SummaryDetail::Avalanche {
                size,
                grains_dropped,
                largest,
                ..
            } => format!("grains: {grains_dropped} · avalanche: {size} · largest: {largest}"),
            SummaryDetail::Percolation {
                bfs_done,
                percolates,
                cluster_size,
            } => {
                let verdict = match (bfs_done, percolates) {
                    (false, _) => "searching",
                    (true, true) => "PERCOLATES",
                    (true, false) => "does not percolate",
                };
                format!("{label} · {verdict} · cluster {cluster_size}")
            }
        };
        match (self.phase, self.outcome) {
            (Phase::Complete, _) => line.push_str(" · done"),
            (_, Some(StageOutcome::Stalled)) => line.push_str(" · stalled"),
            _ => {}
        }
        line
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
