//! Asymmetric least squares (Whittaker) baseline.
//!
//! Solves `(W + λ·D₂ᵗD₂) z = W y` repeatedly, where `D₂` is the second
//! difference operator and `W` holds asymmetric weights: `p` for points above
//! the current curve and `1 - p` for points on or below it. With `p` well
//! under 0.5 the curve is pulled onto the lower envelope of the data.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::utils::banded::solve_pentadiagonal;

/// Number of solve/reweight passes.
pub const ASLS_ITERATIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AslsParams {
    /// Smoothness penalty λ.
    pub lambda: f64,
    /// Asymmetry p, between 0 and 1.
    pub p: f64,
}

impl Default for AslsParams {
    fn default() -> Self {
        Self {
            lambda: 1e5,
            p: 0.01,
        }
    }
}

/// Bands of `D₂ᵗD₂` as `(diag, off1, off2)`.
///
/// Interior rows are `[1, -4, 6, -4, 1]`; the first and last two rows carry
/// the truncated stencils `[1, -2, 1]` and `[-2, 5, -4, 1]`.
pub fn second_difference_bands(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut diag = vec![0.0; n];
    let mut off1 = vec![0.0; n.saturating_sub(1)];
    let mut off2 = vec![0.0; n.saturating_sub(2)];
    const STENCIL: [f64; 3] = [1.0, -2.0, 1.0];

    for k in 0..n.saturating_sub(2) {
        for a in 0..3 {
            diag[k + a] += STENCIL[a] * STENCIL[a];
            for b in (a + 1)..3 {
                let v = STENCIL[a] * STENCIL[b];
                match b - a {
                    1 => off1[k + a] += v,
                    _ => off2[k + a] += v,
                }
            }
        }
    }
    (diag, off1, off2)
}

/// Compute the AsLS baseline of `y`.
///
/// Fewer than three points have no curvature to penalise and are returned
/// unchanged. A negative or non-finite λ is treated as zero.
pub fn asls(y: &[f64], lambda: f64, p: f64) -> Vec<f64> {
    let n = y.len();
    if n < 3 {
        return y.to_vec();
    }
    let lambda = if lambda.is_finite() { lambda.max(0.0) } else { 0.0 };
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.5 };

    let (d2_diag, d2_off1, d2_off2) = second_difference_bands(n);
    let off1: Vec<f64> = d2_off1.iter().map(|v| lambda * v).collect();
    let off2: Vec<f64> = d2_off2.iter().map(|v| lambda * v).collect();

    let mut weights = vec![1.0; n];
    let mut z = y.to_vec();

    for _ in 0..ASLS_ITERATIONS {
        let diag: Vec<f64> = d2_diag
            .iter()
            .zip(&weights)
            .map(|(d, w)| w + lambda * d)
            .collect();
        let rhs: Vec<f64> = weights.iter().zip(y).map(|(w, y)| w * y).collect();

        z = match solve_pentadiagonal(&diag, &off1, &off2, &rhs) {
            Ok(z) => z,
            Err(err) => {
                warn!("AsLS solve failed ({}), keeping previous curve", err);
                break;
            }
        };

        for ((w, &yi), &zi) in weights.iter_mut().zip(y).zip(&z) {
            *w = if yi > zi { p } else { 1.0 - p };
        }
    }
    z
}
