// src/observability.rs
//! Tracing setup and metric names
//!
//! Logs go to stderr so the controller's stdout stays free for the run
//! report. `RUST_LOG` wins over the configured level when set. Metrics are
//! emitted through the `metrics` facade; without an installed recorder they
//! cost nothing.

use crate::utils::config::{LogFormat, LoggingConfig};
use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const METRIC_JOINS: &str = "maze_runner_joins_total";
pub const METRIC_STEPS: &str = "maze_runner_steps_total";
pub const METRIC_BLOCKED: &str = "maze_runner_blocked_moves_total";
pub const METRIC_OUTCOMES: &str = "maze_runner_outcomes_total";

/// Install the global subscriber
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("invalid log level {:?}: {}", config.level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Compact => registry
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

/// Count one finished runner by outcome label
pub fn record_outcome(outcome: &'static str) {
    metrics::counter!(METRIC_OUTCOMES, "outcome" => outcome).increment(1);
}
