use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write as _};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use interview_ranking::{CandidateId, HeatmapOrder, MetricSet, RankingEngine, RankingMode};
use serde::Serialize;

use crate::config::{self, ReportConfig};
use crate::error::AppError;
use crate::input::{self, Loaded};
use crate::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "session-report",
    about = "Rank interview candidates and build dashboard aggregates from a score sheet",
    version
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// CSV file with `candidate_id,name,metric,value` rows
    #[arg(long, global = true, conflicts_with = "demo")]
    input: Option<PathBuf>,
    /// Generate a random session with this many candidates instead of reading a file
    #[arg(long, global = true)]
    demo: Option<usize>,
    /// Seed for --demo
    #[arg(long, global = true, default_value_t = 1)]
    seed: u64,
    /// Comma separated metric names, overriding RANKING_METRICS
    #[arg(long, global = true)]
    metrics: Option<String>,
    /// Use the metrics found in the input, in order of first appearance
    #[arg(long, global = true, conflicts_with = "metrics")]
    infer_metrics: bool,
    /// Override RANKING_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Order candidates best-first
    Rank {
        #[command(flatten)]
        mode: ModeArgs,
        /// Only print the first N entries
        #[arg(long)]
        top: Option<usize>,
    },
    /// Histogram of raw values for one metric
    Distribution {
        metric: String,
        #[arg(long)]
        bucket_width: Option<f64>,
    },
    /// Candidate by metric matrix of raw values
    Heatmap {
        /// Order rows by this ranking mode instead of insertion order
        #[arg(long)]
        ranked_by: Option<String>,
        /// Metric for --ranked-by single_metric
        #[arg(long)]
        metric: Option<String>,
        /// NAME=WEIGHT for --ranked-by weighted_average, repeatable
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, f64)>,
    },
    /// Normalized profile of one candidate
    Radar { candidate: String },
    /// Every distribution, the heatmap and every radar vector
    Snapshot {
        #[arg(long)]
        bucket_width: Option<f64>,
    },
    /// Candidate counts, averages and per-metric statistics
    Summary,
    /// Ranked table as CSV
    Export {
        #[command(flatten)]
        mode: ModeArgs,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ModeArgs {
    /// single_metric, weighted_average or composite
    #[arg(long, default_value = RankingMode::COMPOSITE)]
    mode: String,
    /// Metric for single_metric
    #[arg(long)]
    metric: Option<String>,
    /// NAME=WEIGHT for weighted_average, repeatable
    #[arg(long = "weight", value_parser = parse_weight)]
    weights: Vec<(String, f64)>,
}

impl ModeArgs {
    fn resolve(self) -> Result<RankingMode, AppError> {
        Ok(RankingMode::parse(
            &self.mode,
            self.metric,
            self.weights.into_iter().collect::<BTreeMap<_, _>>(),
        )?)
    }
}

fn parse_weight(value: &str) -> Result<(String, f64), String> {
    let (name, weight) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=WEIGHT, got {value:?}"))?;
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid weight {weight:?}: {err}"))?;
    Ok((name.trim().to_string(), weight))
}

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = ReportConfig::load()?;
    if let Some(level) = &cli.source.log_level {
        config.telemetry.log_level = level.clone();
    }
    telemetry::init(&config.telemetry)?;

    let configured = match &cli.source.metrics {
        Some(list) => config::parse_metrics(list)?,
        None => config.metrics.clone(),
    };
    let loaded = load(&cli.source, &configured)?;
    let metrics = if cli.source.infer_metrics {
        loaded.metric_set()?
    } else {
        configured
    };
    tracing::debug!(metrics = ?metrics.names(), "metric set");

    let Loaded { store, session, .. } = loaded;
    let engine = RankingEngine::new(store);
    let session = &session;
    let metrics = &metrics;

    match cli.command {
        Command::Rank { mode, top } => {
            let result = engine.rank(session, metrics, &mode.resolve()?)?;
            let result = match top {
                Some(n) => result.top(n),
                None => result,
            };
            print_json(&result)
        }
        Command::Distribution {
            metric,
            bucket_width,
        } => {
            let width = bucket_width.unwrap_or(config.bucket_width);
            print_json(&engine.distribution(session, metrics, &metric, width)?)
        }
        Command::Heatmap {
            ranked_by,
            metric,
            weights,
        } => {
            let order = match ranked_by {
                None => HeatmapOrder::Insertion,
                Some(kind) => HeatmapOrder::Ranking {
                    mode: ModeArgs {
                        mode: kind,
                        metric,
                        weights,
                    }
                    .resolve()?,
                },
            };
            print_json(&engine.heatmap(session, metrics, &order)?)
        }
        Command::Radar { candidate } => {
            print_json(&engine.radar(session, metrics, &CandidateId::new(candidate))?)
        }
        Command::Snapshot { bucket_width } => {
            let width = bucket_width.unwrap_or(config.bucket_width);
            print_json(&engine.snapshot(session, metrics, width)?)
        }
        Command::Summary => print_json(&engine.summary(session, metrics)?),
        Command::Export { mode, output } => {
            let table = engine.export(session, metrics, &mode.resolve()?)?;
            match output {
                Some(path) => {
                    table.write_csv(File::create(&path)?)?;
                    tracing::info!(path = %path.display(), rows = table.rows.len(), "exported");
                    Ok(())
                }
                None => Ok(table.write_csv(io::stdout().lock())?),
            }
        }
    }
}

fn load(source: &SourceArgs, metrics: &MetricSet) -> Result<Loaded, AppError> {
    match (&source.input, source.demo) {
        (Some(path), _) => Ok(input::load_csv(path)?),
        (None, Some(candidates)) => Ok(input::demo(candidates, metrics, source.seed)?),
        (None, None) => Ok(input::read_csv(io::stdin().lock(), input::SESSION_ID)?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
