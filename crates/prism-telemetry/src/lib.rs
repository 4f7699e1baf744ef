//! Logging for Prism
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a plain
//! or JSON formatting layer.

use prism_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when nothing else is configured
pub const DEFAULT_FILTER: &str = "info";

/// Initialize logging from configuration
///
/// Filter precedence: the explicit `level` override, then `RUST_LOG`, then
/// `[telemetry] filter`, then [`DEFAULT_FILTER`].
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed
pub fn init(config: &TelemetryConfig, level: Option<&str>) -> anyhow::Result<()> {
    let directive = resolve_filter(level, std::env::var("RUST_LOG").ok().as_deref(), config.filter.as_deref());

    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow::anyhow!("invalid log filter '{directive}': {e}"))?;

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Plain => {
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

fn resolve_filter(level: Option<&str>, rust_log: Option<&str>, configured: Option<&str>) -> String {
    [level, rust_log, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}
