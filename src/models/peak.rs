//! Peak profiles for fitting spectra.
//!
//! This module provides the Gaussian, Lorentzian and pseudo-Voigt line shapes
//! used by the fitter, together with the [`PeakComponent`] record that
//! describes one peak of a multi-peak model.
//!
//! All profiles are parameterised by center, amplitude (height at the center)
//! and full width at half maximum (FWHM):
//!
//! - Gaussian: `amp * exp(-(x - c)² / (2σ²))` with `σ = FWHM / 2.355`
//! - Lorentzian: `amp * γ² / ((x - c)² + γ²)` with `γ = FWHM / 2`
//! - Pseudo-Voigt: `amp * (η·L(x) + (1 - η)·G(x))` with unit-height `L`, `G`
//!   and `η = γ / (σ + γ)`
//!
//! The pseudo-Voigt mixing fraction is a simplified approximation: it mixes by
//! the ratio of the two width parameters rather than the usual FWHM-based
//! polynomial for η, and it is not a true Voigt convolution.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::sample::Sample;

/// Ratio between the FWHM and the standard deviation of a Gaussian.
pub const FWHM_TO_SIGMA: f64 = 2.355;

/// Smallest width the fitter allows.
pub const MIN_WIDTH: f64 = 0.01;

/// Shape of a single peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakProfile {
    Gaussian,
    Lorentzian,
    Voigt,
}

impl Default for PeakProfile {
    fn default() -> Self {
        PeakProfile::Gaussian
    }
}

impl PeakProfile {
    /// Evaluate the profile at `x`.
    ///
    /// Non-positive widths produce zero instead of NaN.
    pub fn evaluate(self, x: f64, center: f64, amplitude: f64, sigma: f64, gamma: f64) -> f64 {
        let dx = x - center;
        match self {
            PeakProfile::Gaussian => amplitude * unit_gaussian(dx, sigma),
            PeakProfile::Lorentzian => amplitude * unit_lorentzian(dx, gamma),
            PeakProfile::Voigt => {
                let total = sigma + gamma;
                if !(total > 0.0) {
                    return 0.0;
                }
                let eta = gamma / total;
                amplitude * (eta * unit_lorentzian(dx, gamma) + (1.0 - eta) * unit_gaussian(dx, sigma))
            }
        }
    }
}

fn unit_gaussian(dx: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) {
        return 0.0;
    }
    (-(dx * dx) / (2.0 * sigma * sigma)).exp()
}

fn unit_lorentzian(dx: f64, gamma: f64) -> f64 {
    if !(gamma > 0.0) {
        return 0.0;
    }
    let g2 = gamma * gamma;
    g2 / (dx * dx + g2)
}

/// One peak of a multi-peak model.
///
/// `width` is the FWHM. When `sigma` or `gamma` are present they replace the
/// values derived from the FWHM. The height at the center is
/// `amplitude * weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakComponent {
    pub id: u32,
    pub profile: PeakProfile,
    pub center: f64,
    pub amplitude: f64,
    pub width: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
}

fn default_weight() -> f64 {
    1.0
}

impl PeakComponent {
    /// Create a component with unit weight and no width overrides.
    pub fn new(id: u32, profile: PeakProfile, center: f64, amplitude: f64, width: f64) -> Self {
        Self {
            id,
            profile,
            center,
            amplitude,
            width,
            weight: 1.0,
            sigma: None,
            gamma: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Gaussian standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma.unwrap_or(self.width / FWHM_TO_SIGMA)
    }

    /// Lorentzian half width at half maximum.
    pub fn gamma(&self) -> f64 {
        self.gamma.unwrap_or(self.width / 2.0)
    }

    /// Height of the peak at its center.
    pub fn effective_amplitude(&self) -> f64 {
        self.amplitude * self.weight
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.profile.evaluate(
            x,
            self.center,
            self.effective_amplitude(),
            self.sigma(),
            self.gamma(),
        )
    }

    /// Evaluate the component at every x.
    pub fn curve(&self, x: &Array1<f64>) -> Array1<f64> {
        x.mapv(|x| self.evaluate(x))
    }

    /// Integrated area under the profile.
    pub fn area(&self) -> f64 {
        let amp = self.effective_amplitude();
        let sigma = self.sigma().max(0.0);
        let gamma = self.gamma().max(0.0);
        let gaussian = sigma * (2.0 * PI).sqrt();
        let lorentzian = PI * gamma;
        match self.profile {
            PeakProfile::Gaussian => amp * gaussian,
            PeakProfile::Lorentzian => amp * lorentzian,
            PeakProfile::Voigt => {
                let total = sigma + gamma;
                if total > 0.0 {
                    let eta = gamma / total;
                    amp * (eta * lorentzian + (1.0 - eta) * gaussian)
                } else {
                    0.0
                }
            }
        }
    }
}

/// Sum of all component curves at every x.
pub fn sum_components(components: &[PeakComponent], x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|x| components.iter().map(|c| c.evaluate(x)).sum())
}

/// Recompute weights as each component's share of the total amplitude.
///
/// Leaves the weights untouched when the total amplitude is not positive.
pub fn normalize_weights(components: &mut [PeakComponent]) {
    let total: f64 = components.iter().map(|c| c.amplitude).sum();
    if total > 0.0 {
        for c in components.iter_mut() {
            c.weight = c.amplitude / total;
        }
    }
}

/// Guess up to `count` initial components from the local maxima of `samples`.
///
/// The highest maxima are taken first. Amplitudes are measured above the
/// minimum of the data and widths from the half-height crossings on either
/// side of each maximum. Weights are normalized to sum to one. `samples` must
/// be sorted by x.
pub fn guess_components(samples: &[Sample], count: usize, profile: PeakProfile) -> Vec<PeakComponent> {
    let n = samples.len();
    if n < 3 || count == 0 {
        return Vec::new();
    }

    let min_y = samples.iter().fold(f64::INFINITY, |a, s| a.min(s.y));
    let span = samples[n - 1].x - samples[0].x;

    let mut maxima: Vec<usize> = (1..n - 1)
        .filter(|&i| samples[i].y > samples[i - 1].y && samples[i].y >= samples[i + 1].y)
        .collect();
    maxima.sort_by(|&a, &b| samples[b].y.total_cmp(&samples[a].y));

    let mut components: Vec<PeakComponent> = maxima
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(k, idx)| {
            let amplitude = samples[idx].y - min_y;
            let half_height = min_y + amplitude / 2.0;

            let mut left = idx;
            while left > 0 && samples[left].y > half_height {
                left -= 1;
            }
            let mut right = idx;
            while right < n - 1 && samples[right].y > half_height {
                right += 1;
            }

            let width = if left < right {
                samples[right].x - samples[left].x
            } else {
                span / 5.0
            };

            PeakComponent::new(
                k as u32 + 1,
                profile,
                samples[idx].x,
                amplitude.max(0.0),
                width.max(MIN_WIDTH),
            )
        })
        .collect();

    components.sort_by(|a, b| a.center.total_cmp(&b.center));
    normalize_weights(&mut components);
    components
}
