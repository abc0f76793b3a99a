//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Each iteration solves the damped normal equations
//! `(JᵗJ + λ·diag(max(JᵗJ_ii, 1e-10))) δ = -Jᵗr` for a trial step. A step that
//! lowers χ² is accepted and λ shrinks; otherwise λ grows and the same
//! linearisation is reused for the next attempt.

use log::{debug, trace};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PeakFitError, Result};
use crate::problem::{CurveProblem, Problem};
use crate::utils::linear_solve::solve_lu;

use super::config::LmConfig;

/// Floor applied to the diagonal of JᵗJ before damping.
const MIN_DIAGONAL: f64 = 1e-10;

/// Floor for χ² when measuring the relative improvement of a step, so fits
/// approaching an exact solution still meet the tolerance.
const MIN_COST_SCALE: f64 = 1e-10;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals (`model - observed`) at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals at the solution
    pub chi_squared: f64,

    /// Number of iterations performed, accepted or not
    pub iterations: usize,

    /// Number of residual evaluations, including those spent on Jacobians
    pub func_evals: usize,

    /// True only when the relative χ² improvement fell below the tolerance
    /// (or χ² is already too small for any step to meet it)
    pub converged: bool,

    /// A message describing how the optimization ended
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Converged: {}", self.converged)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Chi-squared: {:.6e}", self.chi_squared)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// JᵗJ and Jᵗr at the current parameters.
struct NormalEquations {
    jtj: Array2<f64>,
    jtr: Array1<f64>,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self {
            config: LmConfig::default(),
        }
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The configuration this optimizer runs with.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the relative χ² improvement tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the factor by which to increase lambda.
    pub fn with_lambda_up_factor(mut self, factor: f64) -> Self {
        self.config.lambda_up_factor = factor;
        self
    }

    /// Set the factor by which to decrease lambda.
    pub fn with_lambda_down_factor(mut self, factor: f64) -> Self {
        self.config.lambda_down_factor = factor;
        self
    }

    /// Set the maximum value for lambda.
    pub fn with_max_lambda(mut self, max_lambda: f64) -> Self {
        self.config.max_lambda = max_lambda;
        self
    }

    /// Set the absolute finite-difference step.
    pub fn with_fd_epsilon(mut self, epsilon: f64) -> Self {
        self.config.fd_epsilon = epsilon;
        self
    }

    /// Evaluate Jacobian columns in parallel.
    pub fn with_parallel_jacobian(mut self, parallel: bool) -> Self {
        self.config.parallel_jacobian = parallel;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    ///
    /// # Returns
    ///
    /// * `Result<LmResult>` - The result of the optimization. Failing to
    ///   converge is not an error; check `LmResult::converged`.
    pub fn minimize<P: Problem + Sync>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        problem.constrain(&mut params);

        let mut residuals = problem.eval(&params)?;
        if residuals.len() != problem.residual_count() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        let mut func_evals = 1;
        let mut cost = sum_of_squares(&residuals);
        let mut lambda = self.config.initial_lambda;

        let mut iterations = 0;
        let mut converged = false;
        let mut message = format!(
            "Maximum iterations ({}) reached",
            self.config.max_iterations
        );
        let mut normal: Option<NormalEquations> = None;

        while iterations < self.config.max_iterations {
            // Below this no step can improve χ² by the tolerance
            if cost <= MIN_COST_SCALE * self.config.tolerance {
                converged = true;
                message = format!("Cost {:.2e} is below the resolvable improvement", cost);
                break;
            }
            if n_params == 0 {
                message = "No free parameters".to_string();
                break;
            }
            iterations += 1;

            // The linearisation is only rebuilt after the parameters move
            if normal.is_none() {
                let jacobian = self.jacobian(problem, &params, &residuals)?;
                func_evals += n_params;
                normal = Some(NormalEquations {
                    jtj: jacobian.t().dot(&jacobian),
                    jtr: jacobian.t().dot(&residuals),
                });
            }
            let Some(eq) = normal.as_ref() else {
                break;
            };

            let step = match damped_step(eq, lambda) {
                Ok(step) => step,
                Err(_) => {
                    lambda *= self.config.lambda_up_factor;
                    trace!("iteration {}: singular system, lambda -> {:.3e}", iterations, lambda);
                    if lambda > self.config.max_lambda {
                        message = "Singular system and lambda reached maximum".to_string();
                        break;
                    }
                    continue;
                }
            };

            let mut trial = &params + &step;
            problem.constrain(&mut trial);
            let trial_residuals = problem.eval(&trial)?;
            func_evals += 1;
            let trial_cost = sum_of_squares(&trial_residuals);

            if trial_cost.is_finite() && trial_cost < cost {
                let improvement = (cost - trial_cost) / cost.max(MIN_COST_SCALE);
                trace!(
                    "iteration {}: accepted, chi2 {:.6e} -> {:.6e}",
                    iterations,
                    cost,
                    trial_cost
                );

                params = trial;
                residuals = trial_residuals;
                cost = trial_cost;
                lambda *= self.config.lambda_down_factor;
                normal = None;

                if improvement < self.config.tolerance {
                    converged = true;
                    message = format!(
                        "Cost convergence: relative improvement {:.2e} < {:.2e}",
                        improvement, self.config.tolerance
                    );
                    break;
                }
            } else {
                lambda *= self.config.lambda_up_factor;
                trace!(
                    "iteration {}: rejected (chi2 {:.6e}), lambda -> {:.3e}",
                    iterations,
                    trial_cost,
                    lambda
                );
                if lambda > self.config.max_lambda {
                    message = "Failed to decrease cost, and lambda reached maximum".to_string();
                    break;
                }
            }
        }

        debug!(
            "LM finished after {} iterations: chi2 = {:.6e}, converged = {} ({})",
            iterations, cost, converged, message
        );

        Ok(LmResult {
            params,
            residuals,
            chi_squared: cost,
            iterations,
            func_evals,
            converged,
            message,
        })
    }

    fn jacobian<P: Problem + Sync>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        #[cfg(feature = "parallel")]
        if self.config.parallel_jacobian && !problem.has_custom_jacobian() {
            return crate::utils::finite_difference::jacobian_parallel(
                problem,
                params,
                residuals,
                Some(self.config.fd_epsilon),
            );
        }
        problem.jacobian(params, residuals, self.config.fd_epsilon)
    }
}

/// Solve the damped normal equations for the step `δ`.
fn damped_step(eq: &NormalEquations, lambda: f64) -> Result<Array1<f64>> {
    let mut a = eq.jtj.clone();
    for i in 0..a.nrows() {
        a[[i, i]] += lambda * a[[i, i]].max(MIN_DIAGONAL);
    }
    let neg_jtr = -&eq.jtr;
    solve_lu(&a, &neg_jtr)
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Fit `model(x, params)` to the observations `y`.
///
/// This is the functional entry point to the optimizer: it wraps the data
/// and model in a [`CurveProblem`] and minimizes `Σ(y - ŷ)²`.
///
/// # Arguments
///
/// * `x` - Independent variable values
/// * `y` - Observed values, same length as `x`
/// * `initial_params` - Starting parameter vector
/// * `model` - Model function returning one prediction per x
/// * `config` - Optimizer configuration
pub fn optimize<F>(
    x: &Array1<f64>,
    y: &Array1<f64>,
    initial_params: Array1<f64>,
    model: F,
    config: &LmConfig,
) -> Result<LmResult>
where
    F: Fn(&Array1<f64>, &Array1<f64>) -> Array1<f64> + Sync,
{
    let problem = CurveProblem::new(x, y, initial_params.len(), model)?;
    LevenbergMarquardt::with_config(config.clone()).minimize(&problem, initial_params)
}
