//! Synthetic spectra for testing and benchmarking fits.
//!
//! A [`SpectrumSimulator`] evaluates a set of peak components and a baseline
//! on a uniform grid and optionally adds Gaussian noise. Noise comes from a
//! seeded generator, so equal seeds give equal spectra.

use log::debug;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::{PeakFitError, Result};
use crate::models::peak::{sum_components, PeakComponent};
use crate::sample::Sample;

/// Background added under the simulated peaks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SimulatedBaseline {
    #[default]
    None,
    Constant(f64),
    Linear { slope: f64, intercept: f64 },
    /// Polynomial coefficients in raw x, lowest order first.
    Polynomial(Vec<f64>),
    /// Smooth step from `high` (left) to `low` (right) around `center`.
    Step {
        center: f64,
        high: f64,
        low: f64,
        width: f64,
    },
}

impl SimulatedBaseline {
    /// Background value at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        match self {
            SimulatedBaseline::None => 0.0,
            SimulatedBaseline::Constant(c) => *c,
            SimulatedBaseline::Linear { slope, intercept } => slope * x + intercept,
            SimulatedBaseline::Polynomial(c) => crate::utils::linear_solve::polyval(c, x),
            SimulatedBaseline::Step {
                center,
                high,
                low,
                width,
            } => {
                let w = width.abs().max(f64::MIN_POSITIVE);
                low + (high - low) / (1.0 + ((x - center) / w).exp())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpectrumSimulator {
    start: f64,
    end: f64,
    points: usize,
    components: Vec<PeakComponent>,
    baseline: SimulatedBaseline,
    noise_std: f64,
    seed: u64,
}

impl SpectrumSimulator {
    /// Simulator over `points` evenly spaced x values from `start` to `end`
    /// inclusive.
    pub fn new(start: f64, end: f64, points: usize) -> Self {
        Self {
            start,
            end,
            points,
            components: Vec::new(),
            baseline: SimulatedBaseline::None,
            noise_std: 0.0,
            seed: 0,
        }
    }

    /// Add one peak.
    pub fn with_component(mut self, component: PeakComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Add several peaks.
    pub fn with_components(mut self, components: &[PeakComponent]) -> Self {
        self.components.extend_from_slice(components);
        self
    }

    /// Set the background under the peaks.
    pub fn with_baseline(mut self, baseline: SimulatedBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    /// Standard deviation of the additive Gaussian noise.
    pub fn with_noise(mut self, std: f64) -> Self {
        self.noise_std = std;
        self
    }

    /// Seed for the noise generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The x grid.
    pub fn x(&self) -> Array1<f64> {
        Array1::linspace(self.start, self.end, self.points)
    }

    /// Baseline values on the grid.
    pub fn baseline(&self) -> Vec<Sample> {
        self.x()
            .iter()
            .map(|&x| Sample::new(x, self.baseline.evaluate(x)))
            .collect()
    }

    /// Peaks plus baseline without noise.
    pub fn noiseless(&self) -> Vec<Sample> {
        let x = self.x();
        let peaks = sum_components(&self.components, &x);
        x.iter()
            .zip(peaks.iter())
            .map(|(&x, &p)| Sample::new(x, p + self.baseline.evaluate(x)))
            .collect()
    }

    /// Peaks plus baseline plus noise.
    ///
    /// A negative or non-finite noise level is an error.
    pub fn generate(&self) -> Result<Vec<Sample>> {
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(PeakFitError::InvalidParameter(format!(
                "noise level must be finite and non-negative, got {}",
                self.noise_std
            )));
        }
        let mut samples = self.noiseless();
        if self.noise_std == 0.0 {
            return Ok(samples);
        }
        let normal = Normal::new(0.0, self.noise_std).map_err(|e| {
            PeakFitError::InvalidParameter(format!("noise level {}: {}", self.noise_std, e))
        })?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        for s in samples.iter_mut() {
            s.y += normal.sample(&mut rng);
        }
        debug!(
            "simulated {} samples with noise std {}",
            samples.len(),
            self.noise_std
        );
        Ok(samples)
    }
}
