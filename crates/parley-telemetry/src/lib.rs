//! Logging for Parley
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a text or
//! JSON formatter.

use parley_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured filter when it is set.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = build_filter(&config.log_filter)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            registry.with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_target(true);

            registry.with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}

fn build_filter(configured: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(configured).map_err(|e| anyhow::anyhow!("invalid log filter {configured:?}: {e}"))
}
