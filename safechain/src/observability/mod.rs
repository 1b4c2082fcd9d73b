//! Tracing subscriber setup.
//!
//! Runs are traced under a `stage.run` span carrying the stage name and run
//! id. These helpers install a global `fmt` subscriber for hosts that do not
//! bring their own. `RUST_LOG` overrides the default filter.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

fn env_filter(default_filter: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("Invalid log filter '{default_filter}'")),
    }
}

/// Installs a human-readable subscriber.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter)?)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to set logging subscriber")
}

/// Installs a JSON subscriber, one object per line.
pub fn init_json_tracing(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_filter)?)
        .with_current_span(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to set logging subscriber")
}
