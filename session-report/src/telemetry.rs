use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("log filter {directives:?} from {origin} is not valid")]
    Filter {
        origin: &'static str,
        directives: String,
        source: ParseError,
    },
    #[error("a tracing subscriber is already installed: {0}")]
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

/// Pick the report's log filter. A non-empty `RUST_LOG` replaces `RANKING_LOG_LEVEL` entirely.
fn report_filter(
    rust_log: Option<&str>,
    config: &TelemetryConfig,
) -> Result<EnvFilter, TelemetryError> {
    let (origin, directives) = match rust_log.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => ("RUST_LOG", value),
        None => ("RANKING_LOG_LEVEL", config.log_level.trim()),
    };
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::Filter {
        origin,
        directives: directives.to_string(),
        source,
    })
}

/// Route engine and report events to stderr; stdout carries only JSON or CSV.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = report_filter(rust_log.as_deref(), config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
