//! Baseline drawn through user-supplied control points.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::processing::resample::interpolate_at;
use crate::sample::{self, Sample};
use crate::utils::banded::solve_tridiagonal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualInterpolation {
    #[default]
    Linear,
    /// Natural cubic spline.
    Spline,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualParams {
    pub points: Vec<Sample>,
    pub interpolation: ManualInterpolation,
}

/// Natural cubic spline through strictly increasing knots.
#[derive(Debug, Clone)]
pub struct NaturalSpline {
    knots: Vec<Sample>,
    /// Second derivatives at the knots; zero at both ends.
    second: Vec<f64>,
}

impl NaturalSpline {
    /// Build the spline. Knots must be sorted with distinct x; fewer than
    /// three knots give a straight segment.
    pub fn new(knots: Vec<Sample>) -> Option<Self> {
        let n = knots.len();
        if n < 2 {
            return None;
        }
        let mut second = vec![0.0; n];
        if n > 2 {
            let h: Vec<f64> = knots.windows(2).map(|w| w[1].x - w[0].x).collect();
            let m = n - 2;
            let diag: Vec<f64> = (0..m).map(|i| 2.0 * (h[i] + h[i + 1])).collect();
            let off: Vec<f64> = (1..m).map(|i| h[i]).collect();
            let rhs: Vec<f64> = (0..m)
                .map(|i| {
                    6.0 * ((knots[i + 2].y - knots[i + 1].y) / h[i + 1]
                        - (knots[i + 1].y - knots[i].y) / h[i])
                })
                .collect();
            let interior = solve_tridiagonal(&off, &diag, &off, &rhs).ok()?;
            second[1..n - 1].copy_from_slice(&interior);
        }
        Some(Self { knots, second })
    }

    /// Evaluate inside the knot span; outside it the end segment's chord is
    /// extended linearly.
    pub fn evaluate(&self, x: f64) -> f64 {
        let k = &self.knots;
        let n = k.len();
        if x <= k[0].x || x >= k[n - 1].x {
            return interpolate_at(k, x);
        }
        let i = k.partition_point(|s| s.x <= x).saturating_sub(1).min(n - 2);
        let (a, b) = (k[i], k[i + 1]);
        let h = b.x - a.x;
        let (ma, mb) = (self.second[i], self.second[i + 1]);
        let dl = b.x - x;
        let dr = x - a.x;
        ma * dl.powi(3) / (6.0 * h)
            + mb * dr.powi(3) / (6.0 * h)
            + (a.y / h - ma * h / 6.0) * dl
            + (b.y / h - mb * h / 6.0) * dr
    }
}

/// Sort control points and drop repeated x positions, keeping the first.
fn prepare_points(points: &[Sample]) -> Vec<Sample> {
    let mut sorted = sample::sorted(points);
    sorted.dedup_by(|b, a| a.x == b.x);
    sorted
}

/// Baseline through the control points in `params`, evaluated at every x.
///
/// No points give a zero baseline and a single point a constant one. If the
/// spline system cannot be solved, linear interpolation is used instead.
///
/// # Arguments
///
/// * `x` - Positions to evaluate
/// * `params` - Control points and interpolation mode
///
/// # Returns
///
/// * One baseline value per x
pub fn manual_baseline(x: &[f64], params: &ManualParams) -> Vec<f64> {
    let points = prepare_points(&params.points);
    match points.len() {
        0 => return vec![0.0; x.len()],
        1 => return vec![points[0].y; x.len()],
        _ => {}
    }

    if params.interpolation == ManualInterpolation::Spline {
        match NaturalSpline::new(points.clone()) {
            Some(spline) => return x.iter().map(|&v| spline.evaluate(v)).collect(),
            None => warn!("spline through control points failed, using linear interpolation"),
        }
    }
    x.iter().map(|&v| interpolate_at(&points, v)).collect()
}
