//! Peak fitting.
//!
//! [`PeakFitter`] fits a sum of [`PeakComponent`]s plus a baseline to a
//! dataset with the Levenberg-Marquardt optimizer. Two modes are supported:
//!
//! - sequential (default): the baseline is computed once from the raw data,
//!   or taken from a supplied curve, and only the peaks are fitted to the
//!   corrected data
//! - simultaneous: the baseline parameters join the peak parameters and the
//!   baseline is re-derived on every model evaluation
//!
//! # Example
//!
//! ```
//! use peakfit_rs::fit::PeakFitter;
//! use peakfit_rs::models::{PeakComponent, PeakProfile};
//! use peakfit_rs::sample::Sample;
//!
//! let truth = PeakComponent::new(1, PeakProfile::Gaussian, 5.0, 2.0, 1.5);
//! let samples: Vec<Sample> = (0..101)
//!     .map(|i| {
//!         let x = i as f64 * 0.1;
//!         Sample::new(x, truth.evaluate(x))
//!     })
//!     .collect();
//!
//! let guess = PeakComponent::new(1, PeakProfile::Gaussian, 4.8, 1.8, 1.2);
//! let result = PeakFitter::new().fit(&samples, &[guess], None).unwrap();
//! assert!((result.components[0].center - 5.0).abs() < 1e-4);
//! ```

pub mod pack;
pub mod statistics;

use log::{info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::baseline::{self, BaselineMethod, BaselineOptions};
use crate::error::{PeakFitError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::models::peak::PeakComponent;
use crate::sample::{self, Sample};

pub use pack::{pack, unpack_components, PeakFitProblem, PARAMS_PER_PEAK};
pub use statistics::FitStatistics;

/// Outcome of a peak fit. Every curve is aligned with the sorted input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Peaks plus baseline.
    pub fitted_curve: Vec<Sample>,
    /// Data minus the fitted curve.
    pub residuals: Vec<Sample>,
    /// One curve per component, in component order.
    pub component_curves: Vec<Vec<Sample>>,
    pub baseline: Vec<Sample>,
    /// Data minus the baseline.
    pub corrected: Vec<Sample>,
    pub statistics: FitStatistics,
    /// Optimized components, with their weights reset to 1.
    pub components: Vec<PeakComponent>,
    /// Final flat parameter vector.
    pub parameters: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Baseline parameters found when the baseline was co-optimized.
    pub baseline_parameters: Option<Vec<f64>>,
    /// Baseline options carrying those parameters.
    pub optimized_baseline: Option<BaselineOptions>,
}

impl FitResult {
    /// Integrated area of every fitted component.
    pub fn component_areas(&self) -> Vec<f64> {
        self.components.iter().map(PeakComponent::area).collect()
    }

    /// Result returned for inputs with nothing to fit.
    fn unfitted(
        samples: &[Sample],
        baseline: &[f64],
        components: &[PeakComponent],
    ) -> Self {
        let corrected: Vec<f64> = samples.iter().zip(baseline).map(|(s, b)| s.y - b).collect();
        Self {
            fitted_curve: sample::with_values(samples, baseline),
            residuals: sample::with_values(samples, &corrected),
            component_curves: Vec::new(),
            baseline: sample::with_values(samples, baseline),
            corrected: sample::with_values(samples, &corrected),
            statistics: FitStatistics::default(),
            components: components.to_vec(),
            parameters: pack(components, &[]).to_vec(),
            iterations: 0,
            converged: false,
            baseline_parameters: None,
            optimized_baseline: None,
        }
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result:")?;
        writeln!(f, "  Converged: {}", self.converged)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        write!(f, "{}", self.statistics)?;
        for (c, area) in self.components.iter().zip(self.component_areas()) {
            writeln!(
                f,
                "  Peak {} ({:?}): center = {:.6}, amplitude = {:.6}, FWHM = {:.6}, area = {:.6}",
                c.id, c.profile, c.center, c.amplitude, c.width, area
            )?;
        }
        if let Some(params) = &self.baseline_parameters {
            writeln!(f, "  Baseline parameters: {:?}", params)?;
        }
        Ok(())
    }
}

/// Fits peak components and a baseline to a dataset.
#[derive(Debug, Clone, Default)]
pub struct PeakFitter {
    optimizer: LevenbergMarquardt,
    baseline: BaselineOptions,
}

impl PeakFitter {
    /// Fitter with the default optimizer settings and no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the optimizer settings.
    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.optimizer = LevenbergMarquardt::with_config(config);
        self
    }

    /// Cap the number of optimizer iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.optimizer = self.optimizer.with_max_iterations(max_iterations);
        self
    }

    /// Set the baseline method, its parameters and the fit mode.
    pub fn with_baseline_options(mut self, options: BaselineOptions) -> Self {
        self.baseline = options;
        self
    }

    pub fn baseline_options(&self) -> &BaselineOptions {
        &self.baseline
    }

    /// Fit `components` to `samples`.
    ///
    /// `baseline`, when given, must hold one sample per input sample in the
    /// same order and replaces the estimated baseline in sequential mode. It
    /// is ignored when the baseline is co-optimized.
    ///
    /// Mismatched lengths and non-finite samples are errors. An empty dataset,
    /// an empty component list, or too few samples for the requested baseline
    /// polynomial gives an unfitted result with zeroed statistics and
    /// `converged == false`.
    pub fn fit(
        &self,
        samples: &[Sample],
        components: &[PeakComponent],
        baseline: Option<&[Sample]>,
    ) -> Result<FitResult> {
        sample::check_finite(samples)?;
        if let Some(b) = baseline {
            if b.len() != samples.len() {
                return Err(PeakFitError::DimensionMismatch(format!(
                    "baseline has {} samples but the data has {}",
                    b.len(),
                    samples.len()
                )));
            }
        }

        let order = sample::sort_indices(samples);
        let data: Vec<Sample> = order.iter().map(|&i| samples[i]).collect();
        let supplied: Option<Vec<f64>> =
            baseline.map(|b| order.iter().map(|&i| b[i].y).collect());

        let (x, y) = sample::to_arrays(&data);
        let x_values = x.to_vec();
        let y_values = y.to_vec();
        let co_optimize = self.baseline.co_optimizes();

        let estimates_baseline = supplied.is_none() || co_optimize;
        if estimates_baseline && self.baseline.method != BaselineMethod::None {
            if let Some(range) = &self.baseline.calc_range {
                if range.index_span(&x_values).is_none() {
                    warn!(
                        "calc range [{}, {}] holds fewer than two samples, using the full domain",
                        range.start, range.end
                    );
                }
            }
        }

        let initial_baseline: Vec<f64> = match &supplied {
            Some(b) if !co_optimize => b.clone(),
            _ => baseline::baseline_curve(&x_values, &y_values, &self.baseline),
        };

        if data.is_empty() || components.is_empty() {
            warn!(
                "nothing to fit ({} samples, {} components)",
                data.len(),
                components.len()
            );
            return Ok(FitResult::unfitted(&data, &initial_baseline, components));
        }

        if estimates_baseline && self.baseline.has_too_few_points(&x_values) {
            warn!(
                "{} samples cannot determine a degree {} baseline polynomial",
                data.len(),
                self.baseline.polynomial.degree
            );
            return Ok(FitResult::unfitted(&data, &initial_baseline, components));
        }

        info!(
            "fitting {} components to {} samples ({:?} baseline, {})",
            components.len(),
            data.len(),
            self.baseline.method,
            if co_optimize { "simultaneous" } else { "sequential" }
        );

        let (lm, baseline_curve, baseline_params) = if co_optimize {
            let initial = baseline::initial_parameters(&x_values, &y_values, &self.baseline);
            let problem = PeakFitProblem::simultaneous(&x, y.clone(), components, &self.baseline)?;
            let lm = self.optimizer.minimize(&problem, pack(components, &initial))?;

            let n_peak = components.len() * PARAMS_PER_PEAK;
            let params: Vec<f64> = lm.params.iter().skip(n_peak).copied().collect();
            let peaks = problem.peaks(&lm.params);
            let curve = problem
                .baseline(&lm.params, &peaks)
                .unwrap_or_else(|| vec![0.0; x_values.len()]);
            (lm, curve, Some(params))
        } else {
            let target = &y - &Array1::from_vec(initial_baseline.clone());
            let problem = PeakFitProblem::sequential(&x, target, components)?;
            let lm = self.optimizer.minimize(&problem, pack(components, &[]))?;
            (lm, initial_baseline, None)
        };

        let fitted_components = unpack_components(components, &lm.params);
        let component_curves: Vec<Vec<Sample>> = fitted_components
            .iter()
            .map(|c| sample::with_values(&data, &c.curve(&x).to_vec()))
            .collect();
        let peaks = crate::models::peak::sum_components(&fitted_components, &x);

        let fitted: Vec<f64> = peaks.iter().zip(&baseline_curve).map(|(p, b)| p + b).collect();
        let residuals: Vec<f64> = y_values.iter().zip(&fitted).map(|(y, f)| y - f).collect();
        let corrected: Vec<f64> = y_values
            .iter()
            .zip(&baseline_curve)
            .map(|(y, b)| y - b)
            .collect();

        let n_params = lm.params.len();
        let statistics = FitStatistics::compute(&corrected, &residuals, lm.chi_squared, n_params);

        info!(
            "fit finished after {} iterations: R² = {:.6}, converged = {}",
            lm.iterations, statistics.r_squared, lm.converged
        );

        let optimized_baseline = baseline_params
            .as_deref()
            .map(|p| baseline::with_parameters(&self.baseline, p));

        Ok(FitResult {
            fitted_curve: sample::with_values(&data, &fitted),
            residuals: sample::with_values(&data, &residuals),
            component_curves,
            baseline: sample::with_values(&data, &baseline_curve),
            corrected: sample::with_values(&data, &corrected),
            statistics,
            components: fitted_components,
            parameters: lm.params.to_vec(),
            iterations: lm.iterations,
            converged: lm.converged,
            baseline_parameters: baseline_params,
            optimized_baseline,
        })
    }
}

/// Fit `components` to `samples` with at most `max_iterations` optimizer
/// iterations.
///
/// `options` selects the baseline method and mode; `None` fits without a
/// baseline unless `baseline` supplies one. See [`PeakFitter::fit`].
pub fn fit(
    samples: &[Sample],
    components: &[PeakComponent],
    baseline: Option<&[Sample]>,
    options: Option<&BaselineOptions>,
    max_iterations: usize,
) -> Result<FitResult> {
    let mut fitter = PeakFitter::new().with_max_iterations(max_iterations);
    if let Some(options) = options {
        fitter = fitter.with_baseline_options(options.clone());
    }
    fitter.fit(samples, components, baseline)
}
