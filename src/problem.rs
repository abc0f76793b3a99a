//! Problem definition trait and implementations.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm,
//! and `CurveProblem`, which turns a plain model function `f(x, params)` and
//! observed data into a `Problem`.

use ndarray::{Array1, Array2};

use crate::error::{PeakFitError, Result};

/// A trait representing a nonlinear least squares problem.
///
/// Residuals follow the convention `model - observed`, so the Jacobian of the
/// residuals equals the Jacobian of the model.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// `residuals` must be the residuals at `params`; the default forward
    /// difference implementation reuses them instead of evaluating again.
    fn jacobian(
        &self,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
        epsilon: f64,
    ) -> Result<Array2<f64>> {
        crate::utils::finite_difference::jacobian(self, params, residuals, Some(epsilon))
    }

    /// Check if this problem provides a custom Jacobian implementation.
    ///
    /// Problems with a custom Jacobian are never differentiated in parallel.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Project a trial parameter vector back into the feasible region.
    ///
    /// Called by the optimizer on every trial step before it is evaluated.
    fn constrain(&self, _params: &mut Array1<f64>) {}

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// A curve-fitting problem built from a model function and observed data.
///
/// The model function receives the full x array and the parameter vector and
/// must return one predicted value per x.
pub struct CurveProblem<'a, F>
where
    F: Fn(&Array1<f64>, &Array1<f64>) -> Array1<f64>,
{
    x: &'a Array1<f64>,
    y: &'a Array1<f64>,
    n_params: usize,
    model: F,
}

impl<'a, F> CurveProblem<'a, F>
where
    F: Fn(&Array1<f64>, &Array1<f64>) -> Array1<f64>,
{
    /// Create a new curve problem.
    ///
    /// Fails if `x` and `y` differ in length.
    pub fn new(x: &'a Array1<f64>, y: &'a Array1<f64>, n_params: usize, model: F) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "x has {} values but y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(Self {
            x,
            y,
            n_params,
            model,
        })
    }

    /// Evaluate the model function without subtracting the data.
    pub fn predict(&self, params: &Array1<f64>) -> Array1<f64> {
        (self.model)(self.x, params)
    }
}

impl<'a, F> Problem for CurveProblem<'a, F>
where
    F: Fn(&Array1<f64>, &Array1<f64>) -> Array1<f64>,
{
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != self.n_params {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                self.n_params,
                params.len()
            )));
        }
        let predicted = self.predict(params);
        if predicted.len() != self.y.len() {
            return Err(PeakFitError::FunctionEvaluation(format!(
                "model returned {} values for {} samples",
                predicted.len(),
                self.y.len()
            )));
        }
        Ok(predicted - self.y)
    }

    fn parameter_count(&self) -> usize {
        self.n_params
    }

    fn residual_count(&self) -> usize {
        self.y.len()
    }
}
