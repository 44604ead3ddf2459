use std::env;

use interview_ranking::{EngineError, MetricSet, DEFAULT_BUCKET_WIDTH};

pub const DEFAULT_METRICS: [&str; 5] = [
    "Communication",
    "Technical Skills",
    "Projects",
    "Problem Solving",
    "Culture Fit",
];

/// Settings for a report run, read from the environment and then overridden by flags.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub metrics: MetricSet,
    pub bucket_width: f64,
    pub telemetry: TelemetryConfig,
}

impl ReportConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let metrics = match env::var("RANKING_METRICS") {
            Ok(value) => parse_metrics(&value)?,
            Err(_) => MetricSet::new(DEFAULT_METRICS).map_err(ConfigError::Metrics)?,
        };
        let bucket_width = match env::var("RANKING_BUCKET_WIDTH") {
            Ok(value) => parse_bucket_width(&value)?,
            Err(_) => DEFAULT_BUCKET_WIDTH,
        };
        let log_level = env::var("RANKING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            metrics,
            bucket_width,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RANKING_METRICS must list at least one metric")]
    NoMetrics,
    #[error("invalid metric list: {0}")]
    Metrics(EngineError),
    #[error("RANKING_BUCKET_WIDTH must be a number, got {0:?}")]
    InvalidBucketWidth(String),
}

/// Comma separated metric names, in display order.
pub fn parse_metrics(value: &str) -> Result<MetricSet, ConfigError> {
    let names: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Err(ConfigError::NoMetrics);
    }
    MetricSet::new(names).map_err(ConfigError::Metrics)
}

pub fn parse_bucket_width(value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidBucketWidth(value.to_string()))
}
