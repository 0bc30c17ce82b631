//! Status callback that reports frames through tracing or as JSON lines.

use tessera_core::runner::StatusCallback;
use tessera_core::{Phase, Status};
use tracing::{debug, info, warn};

/// Logs phase changes at `info`, every other frame at `debug`.
///
/// With `json` set, every status is also written to stdout as one JSON
/// object per line.
pub struct LogCallback {
    json: bool,
    last: Option<(usize, Phase)>,
}

impl LogCallback {
    /// Create a callback.
    pub const fn new(json: bool) -> Self {
        Self { json, last: None }
    }

    /// Whether `status` starts a new stage or phase.
    fn is_transition(&self, status: &Status) -> bool {
        self.last != Some((status.stage_index, status.phase))
    }
}

impl StatusCallback for LogCallback {
    fn on_status(&mut self, status: &Status) {
        if self.json {
            match serde_json::to_string(status) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to serialize status"),
            }
        }

        if self.is_transition(status) {
            info!(
                stage = status.stage_index,
                phase = %status.phase,
                generation = status.generation,
                "{}",
                status.describe()
            );
        } else {
            debug!(generation = status.generation, "{}", status.describe());
        }
        self.last = Some((status.stage_index, status.phase));
    }
}
