//! Robust polynomial baseline by iterative sigma clipping.
//!
//! A least-squares polynomial is fitted to the currently included points,
//! then every point lying 1.5σ or more above the fit is excluded and the fit
//! repeated. Peaks sit above the background, so the curve settles onto the
//! lower envelope of the data.
//!
//! x is mapped onto `[0, 1]` before fitting; coefficients are expressed in
//! that normalized variable.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::utils::linear_solve::{polyfit, polyval};

/// Maximum number of fit/clip rounds.
pub const MAX_CLIP_ITERATIONS: usize = 10;

/// Points with a residual of at least this many σ above the fit are excluded.
pub const CLIP_SIGMA: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolynomialParams {
    pub degree: usize,
    /// Coefficients in the normalized x variable, lowest order first. Used
    /// verbatim when automatic fitting is off.
    pub coefficients: Option<Vec<f64>>,
}

impl Default for PolynomialParams {
    fn default() -> Self {
        Self {
            degree: 2,
            coefficients: None,
        }
    }
}

/// Outcome of a robust polynomial fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialBaseline {
    pub coefficients: Vec<f64>,
    pub curve: Vec<f64>,
    /// Number of fit rounds performed.
    pub iterations: usize,
    /// Points that took part in the final fit.
    pub included: usize,
}

/// Map x onto `[0, 1]`. A zero span maps everything to 0.
pub fn normalize_x(x: &[f64]) -> Vec<f64> {
    let (min, max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    if !(span > 0.0) {
        return vec![0.0; x.len()];
    }
    x.iter().map(|&v| (v - min) / span).collect()
}

/// Evaluate normalized-x coefficients at every x.
pub fn evaluate(x: &[f64], coefficients: &[f64]) -> Vec<f64> {
    normalize_x(x)
        .into_iter()
        .map(|t| polyval(coefficients, t))
        .collect()
}

/// Fit a sigma-clipped polynomial of the given degree.
///
/// Returns `None` when there are fewer than `degree + 1` points or the first
/// fit is singular.
pub fn robust_polynomial(x: &[f64], y: &[f64], degree: usize) -> Option<PolynomialBaseline> {
    let n = x.len().min(y.len());
    if n < degree + 1 {
        warn!(
            "polynomial baseline of degree {} needs {} points, got {}",
            degree,
            degree + 1,
            n
        );
        return None;
    }

    let t = normalize_x(&x[..n]);
    let mut mask = vec![true; n];
    let mut coefficients: Option<Vec<f64>> = None;
    let mut iterations = 0;

    while iterations < MAX_CLIP_ITERATIONS {
        let (tx, ty): (Vec<f64>, Vec<f64>) = (0..n)
            .filter(|&i| mask[i])
            .map(|i| (t[i], y[i]))
            .unzip();
        let fit = match polyfit(&tx, &ty, degree) {
            Ok(c) => c,
            Err(err) => {
                debug!("polynomial baseline fit stopped: {}", err);
                break;
            }
        };
        iterations += 1;

        let residuals: Vec<f64> = (0..n).map(|i| y[i] - polyval(&fit, t[i])).collect();
        coefficients = Some(fit);

        let included: Vec<f64> = (0..n).filter(|&i| mask[i]).map(|i| residuals[i]).collect();
        let mean = included.iter().sum::<f64>() / included.len() as f64;
        let sigma = (included.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
            / included.len() as f64)
            .sqrt();
        let scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
        if sigma <= f64::EPSILON * scale {
            break;
        }

        let next: Vec<bool> = residuals.iter().map(|&r| r < CLIP_SIGMA * sigma).collect();
        if next == mask || next.iter().filter(|&&m| m).count() < degree + 1 {
            break;
        }
        mask = next;
    }

    let coefficients = match coefficients {
        Some(c) => c,
        None => {
            warn!("polynomial baseline fit is singular");
            return None;
        }
    };
    let curve = t.iter().map(|&ti| polyval(&coefficients, ti)).collect();
    Some(PolynomialBaseline {
        coefficients,
        curve,
        iterations,
        included: mask.iter().filter(|&&m| m).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_exact_line() {
        let x: Vec<f64> = (0..100).map(|i| 10.0 + i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|x| 0.3 * x + 2.0).collect();
        for degree in 1..=3 {
            let fit = robust_polynomial(&x, &y, degree).unwrap();
            for (b, yi) in fit.curve.iter().zip(&y) {
                assert_relative_eq!(b, yi, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_ignores_peak_above_background() {
        let x: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&x| 1.0 + 0.01 * x + 5.0 * (-(x - 100.0).powi(2) / 50.0).exp())
            .collect();
        let fit = robust_polynomial(&x, &y, 1).unwrap();
        assert!(fit.included < 200);
        // The baseline under the peak stays near the background line
        assert_relative_eq!(fit.curve[100], 2.0, epsilon = 0.1);
        assert_relative_eq!(fit.curve[0], 1.0, epsilon = 0.1);
    }

    #[test]
    fn test_too_few_points() {
        assert!(robust_polynomial(&[0.0, 1.0], &[1.0, 2.0], 2).is_none());
    }

    #[test]
    fn test_evaluate_uses_normalized_x() {
        // c0 + c1*t with t in [0, 1] over x in [5, 15]
        let b = evaluate(&[5.0, 10.0, 15.0], &[1.0, 2.0]);
        assert_eq!(b, vec![1.0, 2.0, 3.0]);
    }
}
