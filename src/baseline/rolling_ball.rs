//! Morphological rolling-ball baseline.
//!
//! A sliding minimum over `[i - r, i + r]` gives a step-like lower envelope,
//! which three passes of a three-point moving average then smooth.

use serde::{Deserialize, Serialize};

/// Number of moving-average passes applied to the minimum envelope.
pub const SMOOTHING_PASSES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingBallParams {
    /// Half width of the minimum window, in samples.
    pub radius: usize,
}

impl Default for RollingBallParams {
    fn default() -> Self {
        Self { radius: 20 }
    }
}

/// Minimum of `y` over the inclusive window `[i - radius, i + radius]`.
pub fn sliding_minimum(y: &[f64], radius: usize) -> Vec<f64> {
    let n = y.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(n - 1);
            y[lo..=hi].iter().copied().fold(f64::INFINITY, f64::min)
        })
        .collect()
}

/// Three-point moving average; the end points average their one neighbour.
fn moving_average3(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(n - 1);
            let window = &v[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Rolling-ball baseline of `y`.
///
/// # Arguments
///
/// * `y` - Data values on a uniform grid
/// * `radius` - Half width of the minimum window, in samples
///
/// # Returns
///
/// * The smoothed lower envelope, one value per sample; empty for empty `y`
pub fn rolling_ball(y: &[f64], radius: usize) -> Vec<f64> {
    if y.is_empty() {
        return Vec::new();
    }
    let mut curve = sliding_minimum(y, radius);
    for _ in 0..SMOOTHING_PASSES {
        curve = moving_average3(&curve);
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sliding_minimum() {
        let y = [5.0, 3.0, 4.0, 1.0, 6.0, 7.0];
        assert_eq!(sliding_minimum(&y, 1), vec![3.0, 3.0, 1.0, 1.0, 1.0, 6.0]);
        assert_eq!(sliding_minimum(&y, 0), y.to_vec());
    }

    #[test]
    fn test_constant_signal() {
        for v in rolling_ball(&[2.0; 30], 4) {
            assert_relative_eq!(v, 2.0);
        }
    }

    #[test]
    fn test_larger_radius_never_raises_baseline() {
        let y: Vec<f64> = (0..120)
            .map(|i| {
                let x = i as f64;
                0.02 * x + (x * 0.3).sin() + 4.0 * (-(x - 60.0).powi(2) / 20.0).exp()
            })
            .collect();
        let mut previous = rolling_ball(&y, 1);
        for radius in 2..15 {
            let current = rolling_ball(&y, radius);
            for (c, p) in current.iter().zip(&previous) {
                assert!(c <= &(p + 1e-12));
            }
            previous = current;
        }
    }

    #[test]
    fn test_stays_below_window_maximum() {
        let y: Vec<f64> = (0..80).map(|i| (i as f64 * 0.7).cos() * 3.0).collect();
        let radius = 5;
        let b = rolling_ball(&y, radius);
        let reach = radius + SMOOTHING_PASSES;
        for i in 0..y.len() {
            let lo = i.saturating_sub(reach);
            let hi = (i + reach).min(y.len() - 1);
            let max = y[lo..=hi].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert!(b[i] <= max);
        }
    }
}
