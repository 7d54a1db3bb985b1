//! Tracing subscriber initialisation.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// Outputs structured JSON logs to stdout, filtered by `RUST_LOG` when set and
/// by `log_level` otherwise.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_telemetry(log_level: &str) -> Result<()> {
    let env_filter = build_filter(log_level);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}
