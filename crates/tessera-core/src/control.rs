//! Host-side run control shared between the frame loop and whoever drives
//! it (a signal handler, a UI thread, a test).
//!
//! All fields are atomics or tokio primitives so the control can sit in an
//! [`Arc`](std::sync::Arc) and be poked from any task without blocking the
//! frame loop.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

/// Why [`run_simulation`](crate::runner::run_simulation) returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    /// The handle reached [`Phase::Complete`](crate::stage::Phase::Complete).
    Completed,
    /// The handle was cancelled.
    Cancelled,
    /// [`RunControl::request_stop`] was called.
    OperatorStop,
    /// The configured frame limit was reached.
    FrameLimit,
}

/// Shared control state for one run.
#[derive(Debug)]
pub struct RunControl {
    /// Whether frame delivery is suspended.
    paused: AtomicBool,

    /// Wakes the loop on resume.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Maximum frames to deliver (0 = unlimited).
    max_frames: u64,

    /// Reason the run ended, once it has.
    end_reason: Mutex<Option<RunEndReason>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RunControl {
    /// Control for a run that delivers at most `max_frames` frames
    /// (0 = unlimited).
    pub fn new(max_frames: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            max_frames,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the run is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Suspend frame delivery. Paused time does not count toward stage
    /// durations, pauses, or fades.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume frame delivery and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the run is resumed or a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop before the next frame.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: RunEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// The reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<RunEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    /// Returns `true` if `max_frames > 0` and `frames >= max_frames`.
    pub const fn frame_limit_reached(&self, frames: u64) -> bool {
        self.max_frames > 0 && frames >= self.max_frames
    }

    /// The configured frame limit (0 = unlimited).
    pub const fn max_frames(&self) -> u64 {
        self.max_frames
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_frame_limit_is_unlimited() {
        let control = RunControl::default();
        assert!(!control.frame_limit_reached(u64::MAX));

        let bounded = RunControl::new(3);
        assert!(!bounded.frame_limit_reached(2));
        assert!(bounded.frame_limit_reached(3));
    }

    #[tokio::test]
    async fn resume_wakes_a_paused_waiter() {
        let control = Arc::new(RunControl::default());
        control.pause();
        assert!(control.is_paused());

        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move { control.wait_if_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());

        control.resume();
        assert!(tokio::time::timeout(Duration::from_secs(1), waiter).await.is_ok());
    }

    #[tokio::test]
    async fn end_reason_is_recorded() {
        let control = RunControl::default();
        assert_eq!(control.end_reason().await, None);
        control.set_end_reason(RunEndReason::FrameLimit).await;
        assert_eq!(control.end_reason().await, Some(RunEndReason::FrameLimit));
    }
}
