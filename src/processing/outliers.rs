//! Outlier removal by z-score or interquartile range.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::sample::Sample;

/// How outliers are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    None,
    /// Drop samples whose |y - mean| / std reaches the threshold.
    ZScore,
    /// Drop samples outside `[Q1 - k·IQR, Q3 + k·IQR]` with `k` = threshold.
    Iqr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierOptions {
    pub method: OutlierMethod,
    pub threshold: f64,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self {
            method: OutlierMethod::None,
            threshold: 3.0,
        }
    }
}

/// Remove outliers according to `options`.
pub fn remove_outliers(samples: &[Sample], options: &OutlierOptions) -> Result<Vec<Sample>> {
    if options.method != OutlierMethod::None
        && !(options.threshold.is_finite() && options.threshold > 0.0)
    {
        return Err(PeakFitError::InvalidParameter(format!(
            "outlier threshold must be positive, got {}",
            options.threshold
        )));
    }

    let kept = match options.method {
        OutlierMethod::None => samples.to_vec(),
        OutlierMethod::ZScore => zscore_filter(samples, options.threshold),
        OutlierMethod::Iqr => iqr_filter(samples, options.threshold),
    };
    if kept.len() != samples.len() {
        debug!(
            "{:?} outlier filter removed {} of {} samples",
            options.method,
            samples.len() - kept.len(),
            samples.len()
        );
    }
    Ok(kept)
}

fn zscore_filter(samples: &[Sample], threshold: f64) -> Vec<Sample> {
    let n = samples.len();
    if n < 3 {
        return samples.to_vec();
    }
    let mean = samples.iter().map(|s| s.y).sum::<f64>() / n as f64;
    let variance = samples.iter().map(|s| (s.y - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return samples.to_vec();
    }
    samples
        .iter()
        .filter(|s| (s.y - mean).abs() / std < threshold)
        .copied()
        .collect()
}

fn iqr_filter(samples: &[Sample], k: f64) -> Vec<Sample> {
    if samples.len() < 4 {
        return samples.to_vec();
    }
    let mut ys: Vec<f64> = samples.iter().map(|s| s.y).collect();
    ys.sort_by(f64::total_cmp);
    let q1 = quantile(&ys, 0.25);
    let q3 = quantile(&ys, 0.75);
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - k * iqr, q3 + k * iqr);
    samples
        .iter()
        .filter(|s| s.y >= lo && s.y <= hi)
        .copied()
        .collect()
}

/// Quantile of sorted data, interpolating linearly between order statistics.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (n - 1) as f64 * q.clamp(0.0, 1.0);
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
