//! Finite difference methods for numerical differentiation.
//!
//! This module provides forward-difference Jacobians for problems whose
//! model function has no analytical derivative.

use crate::error::{PeakFitError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default step size for finite differences.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Compute the Jacobian matrix using forward finite differences.
///
/// The Jacobian is the matrix of partial derivatives of the residuals with
/// respect to the parameters: J[i,j] = ∂residual[i]/∂param[j]. Every parameter
/// is perturbed by the same absolute step `epsilon`.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `residuals` - The residuals already evaluated at `params`
/// * `epsilon` - The absolute step size (optional)
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian matrix
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = residuals.len();

    let mut jac = Array2::zeros((n_residuals, n_params));
    for j in 0..n_params {
        let column = jacobian_column(problem, params, residuals, j, eps)?;
        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}

/// Compute the Jacobian with one rayon task per parameter.
///
/// Columns are independent evaluations, so the result is identical to
/// [`jacobian`].
#[cfg(feature = "parallel")]
pub fn jacobian_parallel<P: Problem + Sync + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    use rayon::prelude::*;

    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = residuals.len();

    let columns: Result<Vec<Array1<f64>>> = (0..n_params)
        .into_par_iter()
        .map(|j| jacobian_column(problem, params, residuals, j, eps))
        .collect();

    let mut jac = Array2::zeros((n_residuals, n_params));
    for (j, column) in columns?.into_iter().enumerate() {
        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}

fn jacobian_column<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    j: usize,
    eps: f64,
) -> Result<Array1<f64>> {
    let mut perturbed = params.clone();
    perturbed[j] += eps;

    let shifted = problem.eval(&perturbed)?;
    if shifted.len() != residuals.len() {
        return Err(PeakFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            residuals.len(),
            shifted.len()
        )));
    }

    Ok((&shifted - residuals) / eps)
}
