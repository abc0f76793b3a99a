//! Savitzky-Golay smoothing.
//!
//! Every output point is the value at the window center of a least-squares
//! polynomial fitted to the surrounding window. Window positions are index
//! offsets, so the fit is the same linear combination for every center and is
//! computed once as a convolution kernel. Windows running past either end are
//! filled by reflecting the data about the boundary sample.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::sample::Sample;
use crate::utils::linear_solve::solve_lu;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingOptions {
    pub enabled: bool,
    /// Odd window length, at least 3.
    pub window_length: usize,
    /// Polynomial order, below the window length.
    pub poly_order: usize,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            window_length: 5,
            poly_order: 2,
        }
    }
}

impl SmoothingOptions {
    pub fn new(window_length: usize, poly_order: usize) -> Self {
        Self {
            enabled: true,
            window_length,
            poly_order,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_length < 3 || self.window_length % 2 == 0 {
            return Err(PeakFitError::InvalidParameter(format!(
                "window length must be odd and at least 3, got {}",
                self.window_length
            )));
        }
        if self.poly_order >= self.window_length {
            return Err(PeakFitError::InvalidParameter(format!(
                "polynomial order {} must be below the window length {}",
                self.poly_order, self.window_length
            )));
        }
        Ok(())
    }
}

/// Smoothing weights for offsets `-h..=h` where `h = window_length / 2`.
pub fn savgol_kernel(window_length: usize, poly_order: usize) -> Result<Vec<f64>> {
    SmoothingOptions::new(window_length, poly_order).validate()?;
    let half = (window_length / 2) as isize;
    let terms = poly_order + 1;

    // Normal equations of the generalized Vandermonde matrix over the offsets
    let mut normal = Array2::<f64>::zeros((terms, terms));
    for k in -half..=half {
        let k = k as f64;
        for r in 0..terms {
            for c in 0..terms {
                normal[[r, c]] += k.powi((r + c) as i32);
            }
        }
    }

    // The order-0 coefficient is e0ᵀ (VᵀV)⁻¹ Vᵀ y; solve for g = (VᵀV)⁻¹ e0
    let mut e0 = Array1::<f64>::zeros(terms);
    e0[0] = 1.0;
    let g = solve_lu(&normal, &e0)?;

    Ok((-half..=half)
        .map(|k| {
            let k = k as f64;
            g.iter()
                .enumerate()
                .map(|(j, gj)| gj * k.powi(j as i32))
                .sum()
        })
        .collect())
}

/// Reflect an index into `0..n` about the first and last samples.
fn reflect(index: isize, n: usize) -> usize {
    let period = 2 * (n as isize - 1);
    let m = index.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Apply Savitzky-Golay smoothing to the y values of `samples`.
pub fn savitzky_golay(samples: &[Sample], options: &SmoothingOptions) -> Result<Vec<Sample>> {
    options.validate()?;
    let n = samples.len();
    if n < 2 {
        return Ok(samples.to_vec());
    }

    let kernel = savgol_kernel(options.window_length, options.poly_order)?;
    let half = (options.window_length / 2) as isize;

    Ok((0..n)
        .map(|i| {
            let y = kernel
                .iter()
                .enumerate()
                .map(|(j, w)| w * samples[reflect(i as isize + j as isize - half, n)].y)
                .sum();
            Sample::new(samples[i].x, y)
        })
        .collect())
}
