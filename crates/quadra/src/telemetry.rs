//! Process-wide logging setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::TelemetryError;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. `log` records from the persistence layer are bridged
/// into tracing.
///
/// Fails if a subscriber or logger is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &config.level)?;

    let json = config.json.then(|| fmt::layer().json().flatten_event(true));
    let text = (!config.json).then(|| fmt::layer().with_target(true));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text);

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialised");
    Ok(())
}

/// An unset or invalid `RUST_LOG` falls back to `level`.
fn build_filter(env: Option<&str>, level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Some(directive) = env.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directive) {
            return Ok(filter);
        }
    }

    EnvFilter::try_new(level).map_err(|source| TelemetryError::Filter {
        directive: level.to_string(),
        source,
    })
}
