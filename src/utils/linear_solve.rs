//! Dense linear solves and polynomial least squares.
//!
//! The optimizer's damped normal equations and the polynomial fits used by
//! the baseline estimators are small dense systems, solved here with faer's
//! LU decomposition with partial pivoting.

use faer::linalg::solvers::Solve;
use faer::Mat;
use ndarray::{Array1, Array2};

use crate::error::{PeakFitError, Result};

/// Solve `a * x = b` by LU decomposition with partial pivoting.
///
/// # Arguments
///
/// * `a` - Square coefficient matrix
/// * `b` - Right-hand side vector
///
/// # Returns
///
/// * The solution vector, or `SingularMatrix` if a pivot of `U` is zero or
///   non-finite
pub fn solve_lu(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(PeakFitError::DimensionMismatch(format!(
            "cannot solve a {}x{} system with a right-hand side of length {}",
            a.nrows(),
            a.ncols(),
            b.len()
        )));
    }
    if n == 0 {
        return Ok(Array1::zeros(0));
    }

    let a_faer = Mat::from_fn(n, n, |i, j| a[[i, j]]);
    let lu = a_faer.partial_piv_lu();

    let u = lu.U();
    if (0..n).any(|i| {
        let pivot = u[(i, i)];
        pivot == 0.0 || !pivot.is_finite()
    }) {
        return Err(PeakFitError::SingularMatrix);
    }

    let rhs = Mat::from_fn(n, 1, |i, _| b[i]);
    let x = lu.solve(&rhs);
    let solution: Array1<f64> = (0..n).map(|i| x[(i, 0)]).collect();

    if solution.iter().all(|v| v.is_finite()) {
        Ok(solution)
    } else {
        Err(PeakFitError::SingularMatrix)
    }
}

/// Least-squares polynomial fit through the normal equations.
///
/// Returns coefficients in ascending order: `c[0] + c[1]*x + ... + c[d]*x^d`.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(PeakFitError::DimensionMismatch(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    let terms = degree + 1;
    if distinct_count(x) < terms {
        return Err(PeakFitError::InvalidInput(format!(
            "a degree {} polynomial needs at least {} distinct x values, got {}",
            degree,
            terms,
            distinct_count(x)
        )));
    }

    // Accumulate V^T V and V^T y without materialising the Vandermonde matrix
    let mut normal = Array2::<f64>::zeros((terms, terms));
    let mut rhs = Array1::<f64>::zeros(terms);
    let mut powers = vec![0.0; 2 * degree + 1];
    for (&xi, &yi) in x.iter().zip(y) {
        let mut p = 1.0;
        for slot in powers.iter_mut() {
            *slot = p;
            p *= xi;
        }
        for r in 0..terms {
            rhs[r] += powers[r] * yi;
            for c in 0..terms {
                normal[[r, c]] += powers[r + c];
            }
        }
    }

    Ok(solve_lu(&normal, &rhs)?.to_vec())
}

/// Number of distinct values in `x`, which is sorted or nearly so in practice.
fn distinct_count(x: &[f64]) -> usize {
    let mut sorted = x.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Evaluate a polynomial with ascending coefficients using Horner's scheme.
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}
