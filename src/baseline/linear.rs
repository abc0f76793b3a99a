//! Straight-line baseline.

use serde::{Deserialize, Serialize};

/// Slope and intercept for a fixed line. When either is missing the line is
/// drawn through the first and last samples instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
}

/// Line through the two endpoint samples as `(slope, intercept)`.
///
/// A single sample or a zero x span gives a flat line at the first y.
pub fn two_point_line(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    match n {
        0 => (0.0, 0.0),
        1 => (0.0, y[0]),
        _ => {
            let dx = x[n - 1] - x[0];
            if dx == 0.0 {
                return (0.0, y[0]);
            }
            let slope = (y[n - 1] - y[0]) / dx;
            (slope, y[0] - slope * x[0])
        }
    }
}

/// Evaluate `slope * x + intercept` at every x.
pub fn line(x: &[f64], slope: f64, intercept: f64) -> Vec<f64> {
    x.iter().map(|&x| slope * x + intercept).collect()
}

/// Linear baseline over `x`.
///
/// # Arguments
///
/// * `x` - Sorted x values
/// * `y` - Data values, used only when the line is not fully specified
/// * `params` - Optional fixed slope and intercept
///
/// # Returns
///
/// * One baseline value per x
pub fn linear_baseline(x: &[f64], y: &[f64], params: &LinearParams) -> Vec<f64> {
    let (slope, intercept) = match (params.slope, params.intercept) {
        (Some(s), Some(i)) => (s, i),
        _ => two_point_line(x, y),
    };
    line(x, slope, intercept)
}
