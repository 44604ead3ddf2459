//! Session-wide analytics. Every structure keeps columns or axes in metric set order so that
//! candidates can be compared position by position.

pub mod distribution;
pub mod heatmap;
pub mod radar;
pub mod summary;

use serde::Serialize;

pub use self::distribution::{Bucket, Distribution, DEFAULT_BUCKET_WIDTH};
pub use self::heatmap::{Heatmap, HeatmapRow};
pub use self::radar::{RadarAxis, RadarVector};
pub use self::summary::{MetricSummary, SessionSummary};

/// All aggregates of a session computed from a single fetch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub distributions: Vec<Distribution>,
    pub heatmap: Heatmap,
    pub radar: Vec<RadarVector>,
}
