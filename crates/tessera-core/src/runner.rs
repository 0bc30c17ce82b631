//! Async frame loop for hosts that do not have their own.
//!
//! [`run_simulation`] wraps [`SimulationHandle::advance`] in a tokio
//! interval and adds the control plane around it:
//!
//! - **Pause/resume**: paused time is excluded from the handle's clock
//! - **Frame limit**: stop after a fixed number of delivered frames
//! - **Operator stop**: clean stop via [`RunControl::request_stop`]
//! - **Cancellation**: stop once the handle's liveness flag drops
//!
//! Hosts with a native frame callback call `advance` themselves and never
//! need this module.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::control::{RunControl, RunEndReason};
use crate::error::SimulationError;
use crate::handle::SimulationHandle;
use crate::stage::Phase;
use crate::status::Status;

/// Smallest interval the loop will tick at.
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Errors that end a run early.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The handle failed to advance.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

/// Result of a run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// The last status delivered, if any frame did work.
    pub final_status: Option<Status>,
    /// Frames delivered to the callback.
    pub frames: u64,
}

/// Receives every status the loop produces.
pub trait StatusCallback: Send {
    /// Called after each frame that did work.
    fn on_status(&mut self, status: &Status);
}

/// A callback that ignores every status.
pub struct NoOpCallback;

impl StatusCallback for NoOpCallback {
    fn on_status(&mut self, _status: &Status) {}
}

/// Drive `handle` until it completes, is cancelled, or `control` stops it.
///
/// The handle's clock starts at zero when this is called and only
/// advances while the run is not paused.
///
/// # Errors
///
/// Returns [`RunnerError`] if the handle hits an invariant violation.
pub async fn run_simulation(
    handle: &mut SimulationHandle,
    control: &Arc<RunControl>,
    callback: &mut dyn StatusCallback,
) -> Result<RunOutcome, RunnerError> {
    let frame_interval = handle.config().cadence.frame_interval().max(MIN_FRAME_INTERVAL);
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let start = Instant::now();
    let mut paused_for = Duration::ZERO;
    let mut final_status: Option<Status> = None;
    let mut frames: u64 = 0;

    info!(
        handle = %handle.id(),
        frame_interval_ms = u64::try_from(frame_interval.as_millis()).unwrap_or(u64::MAX),
        max_frames = control.max_frames(),
        "Simulation starting"
    );

    let end_reason = loop {
        let deadline = ticker.tick().await;

        // --- Check pause ---
        if control.is_paused() {
            info!("Simulation paused, waiting for resume...");
            let paused_at = deadline;
            control.wait_if_paused().await;
            ticker.reset();
            let resumed = ticker.tick().await;
            paused_for = paused_for.saturating_add(
                resumed
                    .saturating_duration_since(paused_at)
                    .saturating_sub(frame_interval),
            );
            info!("Simulation resumed");
        }

        // --- Check stop request ---
        if control.is_stop_requested() {
            info!("Operator stop requested");
            break RunEndReason::OperatorStop;
        }

        // --- Check cancellation ---
        if !handle.is_live() {
            break RunEndReason::Cancelled;
        }

        // --- Check frame limit ---
        if control.frame_limit_reached(frames) {
            info!(frames, "Frame limit reached");
            break RunEndReason::FrameLimit;
        }

        // --- Advance one frame ---
        let now = Instant::now()
            .saturating_duration_since(start)
            .saturating_sub(paused_for);
        if let Some(status) = handle.advance(now)? {
            frames = frames.saturating_add(1);
            callback.on_status(&status);
            final_status = Some(status);
        }

        // --- Check completion ---
        if handle.phase() == Phase::Complete {
            break RunEndReason::Completed;
        }
    };

    control.set_end_reason(end_reason).await;
    Ok(RunOutcome {
        end_reason,
        final_status,
        frames,
    })
}

/// Log the end of a run.
pub fn log_run_end(outcome: &RunOutcome) {
    info!(
        reason = ?outcome.end_reason,
        frames = outcome.frames,
        final_generation = outcome.final_status.as_ref().map(|s| s.generation),
        final_stage = outcome.final_status.as_ref().map(|s| s.stage_index),
        "Simulation ended"
    );

    if let Some(ref status) = outcome.final_status {
        info!(
            generation = status.generation,
            stage = %status.stage_label,
            phase = %status.phase,
            population = status.summary.population,
            "Final status: {}",
            status.describe()
        );
    } else {
        warn!("Simulation ended with no frames delivered");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::handle::Canceller;

    fn handle(yaml: &str) -> SimulationHandle {
        SimulationHandle::create(SimulationConfig::parse(yaml).unwrap()).unwrap()
    }

    const BOUNDED: &str = "\
simulation:
  seed: 11
grid:
  width: 20
  height: 20
termination:
  max_generations: 4
  pause_ms: 30
  after_pause: complete
cadence:
  kind: fixed
  frame_interval_ms: 10
";

    const ENDLESS: &str = "\
simulation:
  seed: 11
grid:
  width: 20
  height: 20
cadence:
  kind: fixed
  frame_interval_ms: 10
";

    struct Collect(Vec<u64>);

    impl StatusCallback for Collect {
        fn on_status(&mut self, status: &Status) {
            self.0.push(status.generation);
        }
    }

    struct CancelAfter {
        remaining: usize,
        canceller: Canceller,
    }

    impl StatusCallback for CancelAfter {
        fn on_status(&mut self, _status: &Status) {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.canceller.cancel();
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion() {
        let mut handle = handle(BOUNDED);
        let control = Arc::new(RunControl::default());
        let mut collect = Collect(Vec::new());

        let outcome = run_simulation(&mut handle, &control, &mut collect).await.unwrap();

        assert_eq!(outcome.end_reason, RunEndReason::Completed);
        assert_eq!(outcome.final_status.unwrap().phase, Phase::Complete);
        assert_eq!(collect.0.first(), Some(&0));
        assert!(collect.0.contains(&4));
        assert_eq!(handle.generation(), 4);
        assert_eq!(control.end_reason().await, Some(RunEndReason::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn operator_stop() {
        let mut handle = handle(ENDLESS);
        let control = Arc::new(RunControl::default());
        control.request_stop();

        let outcome = run_simulation(&mut handle, &control, &mut NoOpCallback).await.unwrap();

        assert_eq!(outcome.end_reason, RunEndReason::OperatorStop);
        assert_eq!(outcome.frames, 0);
        assert!(outcome.final_status.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_by_frame_limit() {
        let mut handle = handle(ENDLESS);
        let control = Arc::new(RunControl::new(5));

        let outcome = run_simulation(&mut handle, &control, &mut NoOpCallback).await.unwrap();

        assert_eq!(outcome.end_reason, RunEndReason::FrameLimit);
        assert_eq!(outcome.frames, 5);
        // The first frame draws the seeded grid; the other four step.
        assert_eq!(handle.generation(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_from_callback_ends_the_run() {
        let mut handle = handle(ENDLESS);
        let control = Arc::new(RunControl::default());
        let mut callback = CancelAfter {
            remaining: 3,
            canceller: handle.canceller(),
        };

        let outcome = run_simulation(&mut handle, &control, &mut callback).await.unwrap();

        assert_eq!(outcome.end_reason, RunEndReason::Cancelled);
        assert_eq!(outcome.frames, 3);
        assert!(!handle.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_time_is_not_simulated() {
        let mut handle = handle(ENDLESS);
        let control = Arc::new(RunControl::default());

        let driver = {
            let control = Arc::clone(&control);
            async move {
                tokio::time::sleep(Duration::from_millis(35)).await;
                control.pause();
                tokio::time::sleep(Duration::from_secs(60)).await;
                control.resume();
                tokio::time::sleep(Duration::from_millis(40)).await;
                control.request_stop();
            }
        };

        let mut callback = NoOpCallback;
        let (outcome, ()) = tokio::join!(run_simulation(&mut handle, &control, &mut callback), driver);
        let outcome = outcome.unwrap();

        assert_eq!(outcome.end_reason, RunEndReason::OperatorStop);
        // Roughly 75 ms of unpaused time at 10 ms per frame.
        assert!(handle.generation() < 20, "generation {}", handle.generation());
        assert!(handle.generation() > 0);
    }
}
