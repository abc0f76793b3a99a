//! Sample points and helpers for ordered X/Y datasets.
//!
//! Every algorithm in the crate works on a slice of [`Sample`]s sorted
//! ascending by `x`. Curves derived from a dataset (baselines, fitted
//! curves, residuals) are aligned with it by index, never by value lookup.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};

/// Default tolerance used when matching x values between independent grids.
pub const DEFAULT_X_TOLERANCE: f64 = 1e-4;

/// A single observation of the dependent variable `y` at position `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Build samples from parallel x and y slices.
pub fn from_xy(x: &[f64], y: &[f64]) -> Result<Vec<Sample>> {
    if x.len() != y.len() {
        return Err(PeakFitError::DimensionMismatch(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    Ok(x.iter().zip(y).map(|(&x, &y)| Sample { x, y }).collect())
}

/// Split samples into x and y arrays.
pub fn to_arrays(samples: &[Sample]) -> (Array1<f64>, Array1<f64>) {
    let x = samples.iter().map(|s| s.x).collect();
    let y = samples.iter().map(|s| s.y).collect();
    (x, y)
}

/// Pair each sample's x with the value at the same index of `values`.
pub fn with_values(samples: &[Sample], values: &[f64]) -> Vec<Sample> {
    samples
        .iter()
        .zip(values)
        .map(|(s, &y)| Sample { x: s.x, y })
        .collect()
}

/// Whether `samples` are in non-decreasing x order.
pub fn is_sorted(samples: &[Sample]) -> bool {
    samples.windows(2).all(|w| w[0].x <= w[1].x)
}

/// Indices that put `samples` in ascending x order. The sort is stable, so
/// samples sharing an x keep their relative order.
pub fn sort_indices(samples: &[Sample]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..samples.len()).collect();
    indices.sort_by(|&a, &b| samples[a].x.total_cmp(&samples[b].x));
    indices
}

/// Return a copy of `samples` sorted ascending by x.
pub fn sorted(samples: &[Sample]) -> Vec<Sample> {
    sort_indices(samples).into_iter().map(|i| samples[i]).collect()
}

/// Reject NaN or infinite coordinates.
pub fn check_finite(samples: &[Sample]) -> Result<()> {
    match samples
        .iter()
        .position(|s| !s.x.is_finite() || !s.y.is_finite())
    {
        Some(i) => Err(PeakFitError::InvalidInput(format!(
            "sample {} has a non-finite coordinate ({}, {})",
            i, samples[i].x, samples[i].y
        ))),
        None => Ok(()),
    }
}

/// Find the index of the sample whose x lies closest to `x`, provided it is
/// within `tolerance`. `samples` must be sorted.
///
/// Only meant for matching genuinely independent sequences, e.g. original
/// versus resampled data.
pub fn find_nearest(samples: &[Sample], x: f64, tolerance: f64) -> Option<usize> {
    if samples.is_empty() {
        return None;
    }
    let pos = samples.partition_point(|s| s.x < x);
    let mut best: Option<(usize, f64)> = None;
    for candidate in [pos.checked_sub(1), Some(pos)].into_iter().flatten() {
        if let Some(s) = samples.get(candidate) {
            let d = (s.x - x).abs();
            if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((candidate, d));
            }
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(points: &[(f64, f64)]) -> Vec<Sample> {
        points.iter().copied().map(Sample::from).collect()
    }

    #[test]
    fn test_sorted_is_stable() {
        let data = samples(&[(2.0, 1.0), (0.0, 2.0), (2.0, 3.0), (1.0, 4.0)]);
        let out = sorted(&data);
        let ys: Vec<f64> = out.iter().map(|s| s.y).collect();
        assert_eq!(ys, vec![2.0, 4.0, 1.0, 3.0]);
        assert!(is_sorted(&out));
        assert!(!is_sorted(&data));
    }

    #[test]
    fn test_from_xy_length_mismatch() {
        assert!(from_xy(&[1.0, 2.0], &[1.0]).is_err());
        assert_eq!(from_xy(&[1.0], &[5.0]).unwrap(), vec![Sample::new(1.0, 5.0)]);
    }

    #[test]
    fn test_check_finite() {
        assert!(check_finite(&samples(&[(0.0, 1.0), (1.0, 2.0)])).is_ok());
        assert!(check_finite(&samples(&[(0.0, f64::NAN)])).is_err());
    }

    #[test]
    fn test_find_nearest() {
        let data = samples(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(find_nearest(&data, 1.00005, DEFAULT_X_TOLERANCE), Some(1));
        assert_eq!(find_nearest(&data, 1.5, DEFAULT_X_TOLERANCE), None);
        assert_eq!(find_nearest(&data, 1.6, 0.5), Some(2));
        assert_eq!(find_nearest(&[], 1.0, 1.0), None);
    }
}
