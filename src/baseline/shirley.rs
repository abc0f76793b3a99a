//! Iterative Shirley background for step-like spectra.
//!
//! Starting from the straight line between the end points, each pass sets
//! the background at every x to
//! `y_end + (y_start - y_end) * A_right(x) / A_total`, where the areas are
//! integrals of `max(0, y - background)` from x to the end and over the whole
//! range.

use log::debug;
use serde::{Deserialize, Serialize};

/// Added to the end-point step so a zero step still gets a finite tolerance.
const STEP_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShirleyParams {
    pub max_iterations: usize,
    /// Stop once no point moves by more than `tolerance * |y_start - y_end|`.
    pub tolerance: f64,
    /// Added to the first sample's y to form `y_start`.
    pub start_offset: f64,
    /// Added to the last sample's y to form `y_end`.
    pub end_offset: f64,
}

impl Default for ShirleyParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
            start_offset: 0.0,
            end_offset: 0.0,
        }
    }
}

/// Trapezoid integral of `values` from each index to the end.
fn area_to_the_right(x: &[f64], values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut right = vec![0.0; n];
    for i in (0..n.saturating_sub(1)).rev() {
        right[i] = right[i + 1] + 0.5 * (values[i] + values[i + 1]) * (x[i + 1] - x[i]);
    }
    right
}

/// Shirley background of `y`.
///
/// Iterates until no point moves by more than the relative tolerance or
/// `max_iterations` passes have run. Stops early when no area lies above the
/// background.
///
/// # Arguments
///
/// * `x` - Sorted x values
/// * `y` - Data values
/// * `params` - End-point offsets and iteration limits
///
/// # Returns
///
/// * One background value per sample; fewer than two samples are returned
///   unchanged
pub fn shirley(x: &[f64], y: &[f64], params: &ShirleyParams) -> Vec<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return y[..n].to_vec();
    }

    let y_start = y[0] + params.start_offset;
    let y_end = y[n - 1] + params.end_offset;
    let span = x[n - 1] - x[0];

    let mut background: Vec<f64> = (0..n)
        .map(|i| {
            let frac = if span != 0.0 {
                (x[i] - x[0]) / span
            } else {
                i as f64 / (n - 1) as f64
            };
            y_start + (y_end - y_start) * frac
        })
        .collect();

    let threshold = params.tolerance * ((y_start - y_end).abs() + STEP_EPSILON);

    for iteration in 0..params.max_iterations {
        let excess: Vec<f64> = (0..n).map(|i| (y[i] - background[i]).max(0.0)).collect();
        let right = area_to_the_right(&x[..n], &excess);
        let total = right[0];
        if !(total > 0.0) {
            debug!("Shirley background: no area above the background, stopping");
            break;
        }

        let mut max_change = 0.0_f64;
        for i in 0..n {
            let next = y_end + (y_start - y_end) * right[i] / total;
            max_change = max_change.max((next - background[i]).abs());
            background[i] = next;
        }

        if max_change < threshold {
            debug!("Shirley background converged after {} iterations", iteration + 1);
            break;
        }
    }

    background
}
