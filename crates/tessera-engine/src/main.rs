//! Headless runner for the Tessera simulation engine.
//!
//! Loads a configuration, creates one simulation handle, and drives it
//! through the async frame loop until it completes, the frame limit is
//! reached, or Ctrl-C is pressed. Nothing is drawn to a window; statuses
//! go to the log (and to stdout as JSON with `--json`).
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load configuration (argv, `TESSERA_CONFIG`, `tessera-config.yaml`)
//! 3. Initialize structured logging (tracing)
//! 4. Create the simulation handle
//! 5. Install the Ctrl-C handler
//! 6. Run the frame loop
//! 7. Log the result

mod cli;
mod error;
mod status_log;

use std::sync::Arc;

use tessera_core::config::{LoggingConfig, SimulationConfig};
use tessera_core::runner;
use tessera_core::{RunControl, SimulationHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::error::EngineError;
use crate::status_log::LogCallback;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the arguments, configuration, or the run fail.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse arguments.
    let args = Args::parse(std::env::args().skip(1))?;

    // 2. Load configuration.
    let config = load_config(&args)?;

    // 3. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!(
        name = %config.simulation.name,
        rule = config.rule.kind(),
        width = config.grid.width,
        height = config.grid.height,
        stages = config.stage_count(),
        seed = ?config.simulation.seed,
        "tessera-engine starting"
    );

    // 4. Create the simulation.
    let mut handle = SimulationHandle::create(config).map_err(EngineError::from)?;

    // 5. Stop cleanly on Ctrl-C.
    let control = Arc::new(RunControl::new(args.max_frames));
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 6. Run.
    let mut callback = LogCallback::new(args.json);
    let outcome = runner::run_simulation(&mut handle, &control, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 7. Log results.
    runner::log_run_end(&outcome);
    info!(
        end_reason = ?outcome.end_reason,
        frames = outcome.frames,
        generation = handle.generation(),
        "tessera-engine shutdown complete"
    );

    Ok(())
}

/// Load the configuration named by `args`, or the built-in defaults.
fn load_config(args: &Args) -> Result<SimulationConfig, EngineError> {
    match args.config_path()? {
        Some(path) => Ok(SimulationConfig::from_file(&path)?),
        None => {
            let mut config = SimulationConfig::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log level {:?}: {e}", logging.level),
        })?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
