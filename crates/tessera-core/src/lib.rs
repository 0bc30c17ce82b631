//! Configuration, seeding, stage scheduling, and the simulation handle for
//! the Tessera engine.
//!
//! A host builds a [`SimulationHandle`] from a [`SimulationConfig`], then
//! calls [`SimulationHandle::advance`] once per frame. Each frame the
//! handle steps a batch of generations, checks termination, and redraws
//! the changed cells into its pixel surface. Hosts without a frame loop
//! can hand the handle to [`runner::run_simulation`].
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `tessera-config.yaml` into
//!   strongly-typed structs.
//! - [`seeding`] -- Initial-state strategies.
//! - [`patterns`] -- Named pattern library and stamping.
//! - [`factory`] -- Rules and lattices from configuration.
//! - [`stage`] -- Stage overrides and the phase machine bookkeeping.
//! - [`cadence`] -- Frame interval and generations per frame.
//! - [`handle`] -- [`SimulationHandle`]: create, restart, cancel, advance.
//! - [`status`] -- Per-frame [`Status`].
//! - [`control`] -- Pause, resume, and stop for the async runner.
//! - [`runner`] -- Tokio frame loop.
//! - [`error`] -- [`SimulationError`].

pub mod cadence;
pub mod config;
pub mod control;
pub mod error;
pub mod factory;
pub mod handle;
pub mod patterns;
pub mod runner;
pub mod seeding;
pub mod stage;
pub mod status;

pub use config::{ConfigError, SimulationConfig};
pub use control::{RunControl, RunEndReason};
pub use error::SimulationError;
pub use handle::{Canceller, SimulationHandle};
pub use stage::{Phase, StageOutcome};
pub use status::{HandleId, Status};
