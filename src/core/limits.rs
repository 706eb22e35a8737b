//! Display range of a parameter grid for colour scaling.
use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Percentile used for the lower bound.
pub const LOW_PERCENTILE: f64 = 1.0;
/// Margin applied to the upper bound.
pub const HIGH_MARGIN: f64 = 1.1;
/// Margin applied to the lower bound.
pub const LOW_MARGIN: f64 = 0.8;

/// Bounds used to scale a parameter for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayRange {
    pub max: f64,
    pub min: f64,
}

/// How the bounds are obtained before margins are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeOptions {
    /// Percentile of the valid cells used as upper bound
    pub max_percentile: f64,
    /// Fixed lower bound, replaces the 1st percentile
    pub min_value: Option<f64>,
    /// Fixed upper bound, replaces `max_percentile`
    pub max_value: Option<f64>,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            max_percentile: 75.0,
            min_value: None,
            max_value: None,
        }
    }
}

/// Percentile `p` (0..=100) of sorted values, interpolating linearly between
/// the closest ranks.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Compute the display range of `parameter`, ignoring cells equal to `no_data`.
///
/// Returns `(high * 1.1, low * 0.8)` where `low` is the 1st percentile and
/// `high` the configured percentile of the valid cells, unless fixed values
/// are configured. Fails with `NoValidData` when no valid cell remains and a
/// bound still has to be computed from the data.
pub fn display_range(
    name: &str,
    parameter: &Array2<f64>,
    no_data: f64,
    options: &RangeOptions,
) -> Result<DisplayRange> {
    let (low, high) = match (options.min_value, options.max_value) {
        (Some(min), Some(max)) => (min, max),
        (min_value, max_value) => {
            let mut valid: Vec<f64> = parameter
                .iter()
                .copied()
                .filter(|&v| v != no_data && !v.is_nan())
                .collect();
            if valid.is_empty() {
                return Err(Error::NoValidData {
                    parameter: name.to_string(),
                });
            }
            valid.sort_by(f64::total_cmp);
            let low = min_value.unwrap_or_else(|| percentile_sorted(&valid, LOW_PERCENTILE));
            let high =
                max_value.unwrap_or_else(|| percentile_sorted(&valid, options.max_percentile));
            debug!(
                "{}: {} valid pixels, p{}={:.4}, p{}={:.4}",
                name,
                valid.len(),
                LOW_PERCENTILE,
                low,
                options.max_percentile,
                high
            );
            (low, high)
        }
    };

    Ok(DisplayRange {
        max: high * HIGH_MARGIN,
        min: low * LOW_MARGIN,
    })
}
