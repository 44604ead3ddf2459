use serde::Serialize;

use crate::normalize::ScoreTable;
use crate::num::MAX_RAW_SCORE;
use crate::EngineError;

pub const DEFAULT_BUCKET_WIDTH: f64 = 2.0;
/// Widths needing more buckets than this are rejected, which also keeps labels distinct.
pub const MAX_BUCKETS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Histogram of one metric's raw values. Candidates without the metric are counted in
/// `unscored`, so `buckets` plus `unscored` always add up to the session size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Distribution {
    pub metric: String,
    pub bucket_width: f64,
    pub buckets: Vec<Bucket>,
    pub unscored: usize,
}

impl Distribution {
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum::<usize>() + self.unscored
    }

    pub fn count(&self, label: &str) -> Option<usize> {
        self.buckets.iter().find(|b| b.label == label).map(|b| b.count)
    }
}

/// Number of buckets needed to cover [0, 10] at `width`.
pub fn bucket_count(width: f64) -> Result<usize, EngineError> {
    if !width.is_finite() || width <= 0.0 || width > MAX_RAW_SCORE {
        return Err(EngineError::InvalidBucketWidth(width));
    }
    // Tolerate widths such as 0.1 whose quotient lands a hair above an integer.
    let count = (MAX_RAW_SCORE / width - 1e-9).ceil().max(1.0);
    if count > MAX_BUCKETS as f64 {
        return Err(EngineError::InvalidBucketWidth(width));
    }
    Ok(count as usize)
}

/// Snap a multiple of the bucket width back onto the decimal grid, so that 3 * 0.1 is 0.3.
fn snap(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

fn bucket_bounds(index: usize, count: usize, width: f64) -> (f64, f64) {
    let lower = snap(index as f64 * width);
    let upper = if index + 1 == count {
        MAX_RAW_SCORE
    } else {
        snap((index + 1) as f64 * width)
    };
    (lower, upper)
}

fn bucket_index(value: f64, count: usize, width: f64) -> usize {
    let mut index = ((value / width).floor() as usize).min(count - 1);
    while index > 0 && value < bucket_bounds(index, count, width).0 {
        index -= 1;
    }
    while index + 1 < count && value >= bucket_bounds(index + 1, count, width).0 {
        index += 1;
    }
    index
}

fn format_bound(value: f64) -> String {
    let formatted = format!("{value:.4}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub fn distribution(
    table: &ScoreTable<'_>,
    metric: usize,
    bucket_width: f64,
) -> Result<Distribution, EngineError> {
    let count = bucket_count(bucket_width)?;
    let mut buckets: Vec<Bucket> = (0..count)
        .map(|index| {
            let (lower, upper) = bucket_bounds(index, count, bucket_width);
            let close = if index + 1 == count { ']' } else { ')' };
            Bucket {
                label: format!("[{}, {}{close}", format_bound(lower), format_bound(upper)),
                lower,
                upper,
                count: 0,
            }
        })
        .collect();

    let mut unscored = 0;
    for value in table.column(metric) {
        match value {
            Some(value) => buckets[bucket_index(value.as_f64(), count, bucket_width)].count += 1,
            None => unscored += 1,
        }
    }

    Ok(Distribution {
        metric: table.metrics().names()[metric].clone(),
        bucket_width,
        buckets,
        unscored,
    })
}
