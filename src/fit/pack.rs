//! Flat parameter vector layout and the least-squares problem of a peak fit.
//!
//! The vector holds `[center, amplitude, width]` for every component, with the
//! component weight folded into the amplitude, followed by the baseline
//! parameters when the baseline is co-optimized.

use ndarray::Array1;

use crate::baseline::{self, BaselineOptions};
use crate::error::{PeakFitError, Result};
use crate::models::peak::{PeakComponent, MIN_WIDTH};
use crate::problem::Problem;

/// Number of packed values per component.
pub const PARAMS_PER_PEAK: usize = 3;

/// Pack components and baseline parameters into one vector.
pub fn pack(components: &[PeakComponent], baseline_params: &[f64]) -> Array1<f64> {
    components
        .iter()
        .flat_map(|c| [c.center, c.effective_amplitude(), c.width])
        .chain(baseline_params.iter().copied())
        .collect()
}

/// Rebuild components from the peak part of `params`.
///
/// Ids and profiles come from `template`. The packed amplitude already
/// includes the weight, so the weight is reset to 1. Width overrides are
/// dropped so the packed width is the only width parameter.
pub fn unpack_components(template: &[PeakComponent], params: &Array1<f64>) -> Vec<PeakComponent> {
    template
        .iter()
        .enumerate()
        .map(|(k, c)| {
            let base = k * PARAMS_PER_PEAK;
            PeakComponent::new(
                c.id,
                c.profile,
                params[base],
                params[base + 1],
                params[base + 2],
            )
        })
        .collect()
}

/// Clamp amplitudes to be non-negative and widths to at least [`MIN_WIDTH`].
pub fn clamp_peaks(params: &mut Array1<f64>, n_components: usize) {
    for k in 0..n_components {
        let base = k * PARAMS_PER_PEAK;
        params[base + 1] = params[base + 1].max(0.0);
        params[base + 2] = params[base + 2].max(MIN_WIDTH);
    }
}

/// Least-squares problem for a multi-peak fit.
///
/// Sequentially, the residuals are the peak sum minus the baseline-corrected
/// target. When a baseline is co-optimized, the model is the peak sum plus a
/// baseline re-derived from the trial baseline parameters, and the target is
/// the raw data.
pub struct PeakFitProblem<'a> {
    x: &'a Array1<f64>,
    x_values: Vec<f64>,
    target: Array1<f64>,
    template: &'a [PeakComponent],
    baseline: Option<&'a BaselineOptions>,
}

impl<'a> PeakFitProblem<'a> {
    /// Problem that fits peaks to `target`, the data with its baseline removed.
    pub fn sequential(
        x: &'a Array1<f64>,
        target: Array1<f64>,
        template: &'a [PeakComponent],
    ) -> Result<Self> {
        Self::build(x, target, template, None)
    }

    /// Problem that fits peaks and baseline parameters to the raw data `y`.
    pub fn simultaneous(
        x: &'a Array1<f64>,
        y: Array1<f64>,
        template: &'a [PeakComponent],
        baseline: &'a BaselineOptions,
    ) -> Result<Self> {
        Self::build(x, y, template, Some(baseline))
    }

    fn build(
        x: &'a Array1<f64>,
        target: Array1<f64>,
        template: &'a [PeakComponent],
        baseline: Option<&'a BaselineOptions>,
    ) -> Result<Self> {
        if x.len() != target.len() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "x has {} values but the fit target has {}",
                x.len(),
                target.len()
            )));
        }
        Ok(Self {
            x,
            x_values: x.to_vec(),
            target,
            template,
            baseline,
        })
    }

    fn peak_param_count(&self) -> usize {
        self.template.len() * PARAMS_PER_PEAK
    }

    fn baseline_param_count(&self) -> usize {
        self.baseline.map_or(0, BaselineOptions::parameter_count)
    }

    /// Sum of the peak curves at `params`.
    pub fn peaks(&self, params: &Array1<f64>) -> Array1<f64> {
        let components = unpack_components(self.template, params);
        crate::models::peak::sum_components(&components, self.x)
    }

    /// Baseline at `params` given the peak sum, or `None` when the baseline is
    /// not co-optimized.
    pub fn baseline(&self, params: &Array1<f64>, peaks: &Array1<f64>) -> Option<Vec<f64>> {
        let options = self.baseline?;
        let remainder: Vec<f64> = self
            .target
            .iter()
            .zip(peaks.iter())
            .map(|(y, p)| y - p)
            .collect();
        let start = self.peak_param_count();
        let bparams: Vec<f64> = params.iter().skip(start).copied().collect();
        Some(baseline::curve_from_parameters(
            &self.x_values,
            &remainder,
            options,
            &bparams,
        ))
    }

    /// Full model curve at `params`.
    pub fn model(&self, params: &Array1<f64>) -> Array1<f64> {
        let peaks = self.peaks(params);
        match self.baseline(params, &peaks) {
            Some(b) => &peaks + &Array1::from_vec(b),
            None => peaks,
        }
    }
}

impl Problem for PeakFitProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != self.parameter_count() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "expected {} fit parameters, got {}",
                self.parameter_count(),
                params.len()
            )));
        }
        Ok(self.model(params) - &self.target)
    }

    fn parameter_count(&self) -> usize {
        self.peak_param_count() + self.baseline_param_count()
    }

    fn residual_count(&self) -> usize {
        self.target.len()
    }

    fn constrain(&self, params: &mut Array1<f64>) {
        clamp_peaks(params, self.template.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineMethod;
    use crate::models::peak::PeakProfile;
    use approx::assert_relative_eq;

    fn components() -> Vec<PeakComponent> {
        vec![
            PeakComponent::new(1, PeakProfile::Gaussian, 2.0, 4.0, 1.0).with_weight(0.5),
            PeakComponent::new(2, PeakProfile::Lorentzian, 6.0, 1.0, 2.0).with_sigma(9.0),
        ]
    }

    #[test]
    fn test_pack_layout() {
        let p = pack(&components(), &[0.1, 0.2]);
        assert_eq!(p.to_vec(), vec![2.0, 2.0, 1.0, 6.0, 1.0, 2.0, 0.1, 0.2]);
    }

    #[test]
    fn test_unpack_resets_weight_and_overrides() {
        let template = components();
        let out = unpack_components(&template, &pack(&template, &[]));
        assert_eq!(out[0].weight, 1.0);
        assert_eq!(out[0].amplitude, 2.0);
        assert_eq!(out[1].sigma, None);
        assert_eq!(out[1].id, 2);
        assert_eq!(out[1].profile, PeakProfile::Lorentzian);
    }

    #[test]
    fn test_clamp_peaks() {
        let mut p = Array1::from_vec(vec![1.0, -3.0, 0.0, 2.0, 5.0, -1.0, -7.0]);
        clamp_peaks(&mut p, 2);
        assert_eq!(p.to_vec(), vec![1.0, 0.0, MIN_WIDTH, 2.0, 5.0, MIN_WIDTH, -7.0]);
    }

    #[test]
    fn test_sequential_residuals_vanish_at_truth() {
        let x = Array1::linspace(0.0, 10.0, 51);
        let template = components();
        let truth = unpack_components(&template, &pack(&template, &[]));
        let target = crate::models::peak::sum_components(&truth, &x);
        let problem = PeakFitProblem::sequential(&x, target, &template).unwrap();

        let r = problem.eval(&pack(&template, &[])).unwrap();
        assert!(r.iter().all(|v| v.abs() < 1e-12));
        assert_eq!(problem.parameter_count(), 6);
    }

    #[test]
    fn test_simultaneous_linear_baseline_is_added() {
        let x = Array1::linspace(0.0, 10.0, 21);
        let template = vec![PeakComponent::new(1, PeakProfile::Gaussian, 5.0, 1.0, 1.0)];
        let options = BaselineOptions::new(BaselineMethod::Linear);
        let y = Array1::zeros(21);
        let problem = PeakFitProblem::simultaneous(&x, y, &template, &options).unwrap();
        assert_eq!(problem.parameter_count(), 5);

        let params = pack(&template, &[0.5, 1.0]);
        let model = problem.model(&params);
        let peaks = problem.peaks(&params);
        for i in 0..21 {
            assert_relative_eq!(model[i] - peaks[i], 0.5 * x[i] + 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_wrong_parameter_count() {
        let x = Array1::linspace(0.0, 1.0, 5);
        let template = components();
        let problem = PeakFitProblem::sequential(&x, Array1::zeros(5), &template).unwrap();
        assert!(problem.eval(&Array1::zeros(3)).is_err());
        assert!(PeakFitProblem::sequential(&x, Array1::zeros(4), &template).is_err());
    }
}
