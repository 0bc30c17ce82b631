//! The simulation handle: one grid, one seeded random source, one stage
//! machine, one pixel surface.
//!
//! The host drives a handle by calling [`SimulationHandle::advance`] once
//! per frame with its own monotonic clock. Each call performs at most one
//! frame of work:
//!
//! | phase           | work per frame                                          |
//! |-----------------|---------------------------------------------------------|
//! | `Seeding`       | full redraw, then `Running`                             |
//! | `Running`       | if due: a batch of generations, termination checks, redraw |
//! | `Pausing`       | hold the frame until `pause_ms` has passed              |
//! | `Transitioning` | fade toward the background, then enter the next stage   |
//! | `Complete`      | nothing                                                 |
//!
//! Renders only ever happen between generations, so the surface always
//! shows a whole number of completed generations. Handles share no state:
//! each owns its grid, random source, and stage.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tessera_grid::Grid;
use tessera_render::{CellShade, ColorMapper, RenderError, Renderer, RgbaSurface, Surface};
use tessera_rules::gray_scott::Chemicals;
use tessera_rules::{Dirty, Lattice, StepExecutor, StepSummary};
use tracing::{debug, error, info, warn};

use crate::config::{Determinism, RuleConfig, SimulationConfig};
use crate::error::SimulationError;
use crate::factory;
use crate::stage::{AfterPause, Phase, Stage, StageConfig, StageOutcome};
use crate::status::{HandleId, Status};

/// Callback registered with [`SimulationHandle::on_status`].
pub type StatusObserver = Box<dyn FnMut(&Status) + Send>;

/// Cancels a handle from another task or thread.
///
/// Cancelling is idempotent and never touches the grid; the handle's next
/// frame sees the flag and does nothing.
#[derive(Debug, Clone)]
pub struct Canceller {
    id: HandleId,
    live: Arc<AtomicBool>,
}

impl Canceller {
    /// Stop frame scheduling.
    pub fn cancel(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            info!(handle = %self.id, "Simulation cancelled");
        }
    }

    /// Return `true` until the handle is cancelled.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

/// Per-stage settings resolved on stage entry.
#[derive(Debug, Clone, PartialEq)]
struct StagePlan {
    label: String,
    budget: Option<u64>,
    duration: Option<Duration>,
    rule: RuleConfig,
}

/// A running simulation instance.
pub struct SimulationHandle {
    id: HandleId,
    config: SimulationConfig,
    seed: u64,
    executor: StepExecutor,
    stage: Stage,
    plan: StagePlan,
    renderer: Renderer,
    mapper: ColorMapper,
    surface: RgbaSurface,
    fade_from: Option<Vec<u8>>,
    full_redraw: bool,
    last_step: Option<Duration>,
    summary: StepSummary,
    live: Arc<AtomicBool>,
    observers: Vec<StatusObserver>,
}

impl fmt::Debug for SimulationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationHandle")
            .field("id", &self.id)
            .field("seed", &self.seed)
            .field("generation", &self.executor.generation())
            .field("stage", &self.stage)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl SimulationHandle {
    /// Validate `config`, build the grid, and seed it.
    ///
    /// The returned handle is in [`Phase::Seeding`]; its first frame
    /// draws the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] if the configuration is
    /// out of range or contradictory. Nothing is built in that case.
    pub fn create(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let seed = resolve_seed(&config)?;

        let renderer = Renderer::new(config.render.settings())?;
        let mapper = config
            .render
            .colors
            .clone()
            .unwrap_or_else(|| config.rule.default_scheme())
            .build()?;
        let (width, height) = renderer.surface_size(config.grid.width, config.grid.height);
        let surface = RgbaSurface::new(width, height)?;

        let first = stage_config(&config, 0);
        let plan = plan_for(&config, &first, 0)?;
        let lattice = factory::build_lattice(&config.grid, &factory::build_rule(&plan.rule)?)?;
        let executor = StepExecutor::new(lattice, seed).with_traversal(config.simulation.traversal);
        let summary = executor.snapshot();

        let id = HandleId::new();
        let mut handle = Self {
            id,
            config,
            seed,
            executor,
            stage: Stage::new(0),
            plan,
            renderer,
            mapper,
            surface,
            fade_from: None,
            full_redraw: true,
            last_step: None,
            summary,
            live: Arc::new(AtomicBool::new(true)),
            observers: Vec::new(),
        };
        handle.populate(&first)?;

        info!(
            handle = %id,
            name = %handle.config.simulation.name,
            rule = handle.config.rule.kind(),
            width = handle.config.grid.width,
            height = handle.config.grid.height,
            boundary = ?handle.config.grid.boundary,
            stages = handle.config.stage_count(),
            seed,
            "Simulation created"
        );
        Ok(handle)
    }

    /// Reset to the first stage with generation 0 and a freshly seeded
    /// grid. Callable from any phase; revives a cancelled handle.
    ///
    /// After a restart the grid is identical to that of a newly created
    /// handle with the same configuration and seed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the grid cannot be rebuilt, which a
    /// validated configuration rules out.
    pub fn restart(&mut self) -> Result<(), SimulationError> {
        self.executor.reset(self.seed);
        self.stage = Stage::new(0);
        self.fade_from = None;
        self.last_step = None;
        let first = stage_config(&self.config, 0);
        self.plan = plan_for(&self.config, &first, 0)?;
        self.rebuild()?;
        self.populate(&first)?;
        self.live.store(true, Ordering::Release);
        info!(handle = %self.id, seed = self.seed, "Simulation restarted");
        Ok(())
    }

    /// Stop frame scheduling. Idempotent; the grid is left as it is.
    pub fn cancel(&self) {
        self.canceller().cancel();
    }

    /// A cloneable cancel switch for other tasks.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            id: self.id,
            live: Arc::clone(&self.live),
        }
    }

    /// Register a callback that receives every frame's status.
    pub fn on_status(&mut self, observer: impl FnMut(&Status) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Run one frame at host time `now`.
    ///
    /// Returns `Ok(None)` when the handle is cancelled or complete, or
    /// when a running frame arrives before the cadence allows another
    /// step. Otherwise returns the frame's status after passing it to
    /// every registered observer.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvariantViolation`] if a grid, rule, or
    /// surface contract breaks. The handle then moves to
    /// [`Phase::Complete`] and performs no further work.
    pub fn advance(&mut self, now: Duration) -> Result<Option<Status>, SimulationError> {
        if !self.is_live() || self.stage.phase() == Phase::Complete {
            return Ok(None);
        }
        match self.frame(now) {
            Ok(false) => Ok(None),
            Ok(true) => {
                let status = self.status();
                debug!(
                    handle = %self.id,
                    generation = status.generation,
                    stage = status.stage_index,
                    phase = %status.phase,
                    changed = status.summary.changed_cells,
                    population = status.summary.population,
                    "Frame"
                );
                for observer in &mut self.observers {
                    observer(&status);
                }
                Ok(Some(status))
            }
            Err(err) => {
                error!(handle = %self.id, error = %err, "Simulation halted");
                self.stage.enter(Phase::Complete, now);
                Err(err)
            }
        }
    }

    /// The status as of the last frame.
    pub fn status(&self) -> Status {
        Status {
            handle: self.id,
            generation: self.executor.generation(),
            stage_index: self.stage.index(),
            stage_label: self.plan.label.clone(),
            stage_generation: self.stage.generation(),
            phase: self.stage.phase(),
            outcome: self.stage.outcome(),
            summary: self.summary,
        }
    }

    /// Handle id.
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// The seed every random draw derives from.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Generations since the last restart.
    pub const fn generation(&self) -> u64 {
        self.executor.generation()
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.stage.phase()
    }

    /// Current stage bookkeeping.
    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The validated configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The grid and the rule evolving it.
    pub const fn lattice(&self) -> &Lattice {
        self.executor.lattice()
    }

    /// Return `true` until [`cancel`](Self::cancel) is called.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// The most recently rendered frame.
    pub const fn surface(&self) -> &RgbaSurface {
        &self.surface
    }

    /// Copy the most recent frame into a host surface of the same size.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvariantViolation`] if `target` has a
    /// different size.
    pub fn blit<S: Surface + ?Sized>(&self, target: &mut S) -> Result<(), SimulationError> {
        if (target.width(), target.height()) != (self.surface.width(), self.surface.height())
            || target.pixels().len() != self.surface.pixels().len()
        {
            return Err(SimulationError::invariant(format!(
                "host surface is {}x{}, frames are {}x{}",
                target.width(),
                target.height(),
                self.surface.width(),
                self.surface.height()
            )));
        }
        target.pixels_mut().copy_from_slice(self.surface.pixels());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frame work
    // ------------------------------------------------------------------

    /// Returns `Ok(false)` for a skipped frame.
    fn frame(&mut self, now: Duration) -> Result<bool, SimulationError> {
        match self.stage.phase() {
            Phase::Seeding => {
                self.full_redraw = true;
                self.redraw()?;
                self.stage.enter(Phase::Running, now);
                self.last_step = Some(now);
            }
            Phase::Running => {
                if !self.config.cadence.is_due(self.last_step, now) {
                    return Ok(false);
                }
                self.last_step = Some(now);
                self.run_batch(now)?;
                self.redraw()?;
            }
            Phase::Pausing => {
                let pause = Duration::from_millis(self.config.termination.pause_ms);
                if self.stage.phase_elapsed(now) >= pause {
                    self.end_pause(now);
                }
            }
            Phase::Transitioning => self.transition(now)?,
            Phase::Complete => return Ok(false),
        }
        Ok(true)
    }

    fn run_batch(&mut self, now: Duration) -> Result<(), SimulationError> {
        if let Some(limit) = self.plan.duration {
            if self.stage.running_elapsed(now) >= limit {
                self.finish_stage(StageOutcome::DurationElapsed, now);
                return Ok(());
            }
        }
        let batch = self.config.cadence.batch(self.stage.generation());
        for _ in 0..batch {
            self.summary = self.executor.run_generation()?;
            self.stage.record_generation();
            if let Some(outcome) = self.termination() {
                self.finish_stage(outcome, now);
                break;
            }
        }
        Ok(())
    }

    /// The first termination predicate that holds, if any.
    fn termination(&self) -> Option<StageOutcome> {
        let termination = &self.config.termination;
        let generation = self.stage.generation();
        if termination.stop_when_search_done && self.executor.lattice().search_done() {
            return Some(StageOutcome::SearchDone);
        }
        if termination.quiescence && self.summary.is_quiescent() {
            return Some(StageOutcome::Quiescent);
        }
        if self.plan.budget.is_some_and(|budget| generation >= budget) {
            return Some(StageOutcome::BudgetReached);
        }
        if termination.stall_cap.is_some_and(|cap| generation >= cap) {
            return Some(StageOutcome::Stalled);
        }
        None
    }

    fn finish_stage(&mut self, outcome: StageOutcome, now: Duration) {
        self.stage.finish(outcome, now);
        if outcome == StageOutcome::Stalled {
            warn!(
                handle = %self.id,
                stage = %self.plan.label,
                generations = self.stage.generation(),
                "Stage stalled before any termination predicate held"
            );
        } else {
            info!(
                handle = %self.id,
                stage = %self.plan.label,
                outcome = ?outcome,
                generations = self.stage.generation(),
                "Stage finished"
            );
        }
    }

    fn end_pause(&mut self, now: Duration) {
        let last = self.stage.index().saturating_add(1) >= self.config.stage_count();
        if last && self.config.termination.after_pause == AfterPause::Complete {
            self.stage.enter(Phase::Complete, now);
            info!(
                handle = %self.id,
                generation = self.executor.generation(),
                "Simulation complete"
            );
            return;
        }
        self.fade_from = Some(self.surface.pixels().to_vec());
        self.stage.enter(Phase::Transitioning, now);
    }

    fn transition(&mut self, now: Duration) -> Result<(), SimulationError> {
        let fade = Duration::from_millis(self.config.termination.fade_ms);
        let elapsed = self.stage.phase_elapsed(now);
        if elapsed < fade {
            if let Some(base) = &self.fade_from {
                let t = elapsed.as_secs_f32() / fade.as_secs_f32();
                self.renderer.fade(base, t, &mut self.surface)?;
            }
            return Ok(());
        }
        self.fade_from = None;
        self.enter_next_stage()
    }

    fn enter_next_stage(&mut self) -> Result<(), SimulationError> {
        let count = self.config.stage_count();
        let index = self.stage.index().saturating_add(1).checked_rem(count).unwrap_or(0);
        let next = stage_config(&self.config, index);
        self.plan = plan_for(&self.config, &next, index)?;
        self.stage = Stage::new(index);
        if next.reseed {
            self.rebuild()?;
            self.populate(&next)?;
        } else {
            factory::replace_rule(self.executor.lattice_mut(), factory::build_rule(&self.plan.rule)?)?;
            self.full_redraw = true;
        }
        info!(
            handle = %self.id,
            stage = index,
            label = %self.plan.label,
            reseed = next.reseed,
            "Stage started"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Grid setup
    // ------------------------------------------------------------------

    /// Replace the lattice with a fresh, empty one for the current plan.
    fn rebuild(&mut self) -> Result<(), SimulationError> {
        let family = factory::build_rule(&self.plan.rule)?;
        *self.executor.lattice_mut() = factory::build_lattice(&self.config.grid, &family)?;
        Ok(())
    }

    /// Seed the lattice for `stage` from the executor's random source.
    fn populate(&mut self, stage: &StageConfig) -> Result<(), SimulationError> {
        let seeding = stage.effective_seeding(&self.config.seeding, &self.plan.rule);
        let (lattice, rng) = self.executor.seeding_parts();
        seeding.apply(&self.plan.rule, lattice, rng)?;
        self.summary = self.executor.snapshot();
        self.full_redraw = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn redraw(&mut self) -> Result<(), SimulationError> {
        let dirty = self.executor.take_dirty();
        let full = std::mem::take(&mut self.full_redraw) || !self.config.render.incremental;
        let cells = match (&dirty, full) {
            (Dirty::Clean, false) => return Ok(()),
            (Dirty::Cells(cells), false) => Some(cells.as_slice()),
            (Dirty::All, _) | (_, true) => None,
        };
        draw_lattice(
            &self.renderer,
            &self.mapper,
            self.executor.lattice(),
            cells,
            &mut self.surface,
        )?;
        Ok(())
    }
}

fn draw_lattice<S: Surface + ?Sized>(
    renderer: &Renderer,
    mapper: &ColorMapper,
    lattice: &Lattice,
    cells: Option<&[usize]>,
    surface: &mut S,
) -> Result<(), RenderError> {
    match lattice {
        Lattice::Discrete { buffers, .. } => draw(renderer, mapper, buffers.current(), index_shade, cells, surface),
        Lattice::Scalar { buffers, .. } => draw(renderer, mapper, buffers.current(), CellShade::Scalar, cells, surface),
        Lattice::Chemical { buffers, .. } => {
            draw(renderer, mapper, buffers.current(), |c: Chemicals| CellShade::Scalar(c.v), cells, surface)
        }
        Lattice::Pile { grid, .. } => draw(renderer, mapper, grid, CellShade::Index, cells, surface),
        Lattice::Percolation { grid, .. } => draw(renderer, mapper, grid, index_shade, cells, surface),
    }
}

fn draw<T, S, F>(
    renderer: &Renderer,
    mapper: &ColorMapper,
    grid: &Grid<T>,
    project: F,
    cells: Option<&[usize]>,
    surface: &mut S,
) -> Result<(), RenderError>
where
    T: Copy,
    S: Surface + ?Sized,
    F: Fn(T) -> CellShade,
{
    match cells {
        Some(cells) => renderer.render_cells(grid, mapper, project, cells, surface),
        None => renderer.render_full(grid, mapper, project, surface),
    }
}

fn index_shade(value: u8) -> CellShade {
    CellShade::Index(u32::from(value))
}

/// The stage list entry at `index`, or the implicit single stage.
fn stage_config(config: &SimulationConfig, index: usize) -> StageConfig {
    config.stages.get(index).cloned().unwrap_or_else(|| StageConfig {
        label: Some(config.simulation.name.clone()),
        ..StageConfig::default()
    })
}

fn plan_for(config: &SimulationConfig, stage: &StageConfig, index: usize) -> Result<StagePlan, SimulationError> {
    Ok(StagePlan {
        label: stage.label_for(index),
        budget: stage.generations.or(config.termination.max_generations),
        duration: stage.duration_ms.map(Duration::from_millis),
        rule: stage.effective_rule(&config.rule)?,
    })
}

fn resolve_seed(config: &SimulationConfig) -> Result<u64, SimulationError> {
    match (config.simulation.seed, config.simulation.determinism) {
        (Some(seed), _) => Ok(seed),
        (None, Determinism::Strict) => Err(SimulationError::invalid(
            "simulation.determinism is strict but no seed was given",
        )),
        (None, Determinism::Relaxed) => {
            let seed = rand::rng().random::<u64>();
            info!(seed, "No seed configured, drew one from the OS");
            Ok(seed)
        }
    }
}
