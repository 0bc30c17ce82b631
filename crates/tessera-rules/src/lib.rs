//! Update rules and the step executor for the Tessera simulation engine.
//!
//! Rules come in three computational shapes, each with its own contract:
//!
//! - [`LocalRule`] -- pure per-cell functions (deterministic tables,
//!   stochastic acceptance, continuous stencils), evaluated with double
//!   buffering so traversal order never matters.
//! - [`RelaxationRule`] -- whole-grid perturb-and-relax (sandpile).
//! - [`PercolationSearch`] -- an incremental BFS over a fixed site lattice.
//!
//! [`StepExecutor`] owns a [`Lattice`] and dispatches on its tag.
//!
//! # Modules
//!
//! - [`local`] -- `LocalRule`, `DoubleBuffer`, traversal order.
//! - [`random`] -- Traversal-independent per-cell randomness.
//! - [`life`], [`multistate`], [`elementary`], [`ising`] -- `u8` rules.
//! - [`diffusion`], [`gray_scott`] -- Continuous fields.
//! - [`sandpile`] -- Avalanche relaxation.
//! - [`percolation`] -- Connectivity search.
//! - [`discrete`] -- The `u8` rule family as one enum.
//! - [`executor`] -- `StepExecutor` and `Lattice`.
//! - [`summary`] -- Per-generation `StepSummary`.

pub mod diffusion;
pub mod discrete;
pub mod elementary;
pub mod error;
pub mod executor;
pub mod gray_scott;
pub mod ising;
pub mod life;
pub mod local;
pub mod multistate;
pub mod percolation;
pub mod random;
pub mod sandpile;
pub mod summary;

pub use diffusion::DiffusionRule;
pub use discrete::DiscreteRule;
pub use elementary::ElementaryRule;
pub use error::RuleError;
pub use executor::{Dirty, Lattice, StepExecutor};
pub use gray_scott::{Chemicals, GrayScottParams, GrayScottPreset, GrayScottRule};
pub use ising::IsingRule;
pub use life::LifeRule;
pub use local::{CellContext, DoubleBuffer, LocalRule, RuleShape, Traversal, next_generation};
pub use multistate::{BriansBrainRule, CyclicRule, WireworldRule};
pub use percolation::{PercolationSearch, SearchState};
pub use random::CellRandom;
pub use sandpile::{AvalancheStats, DropSite, Relaxation, RelaxationRule, SandpileRule};
pub use summary::{StepSummary, SummaryDetail};
