//! Banded linear solvers.
//!
//! Both solvers run in O(n) and never form the full matrix.

use crate::error::{PeakFitError, Result};

/// Smallest pivot accepted by the banded factorizations.
const MIN_PIVOT: f64 = 1e-300;

/// Solve a symmetric pentadiagonal system `A z = rhs` by LDLᵗ factorization.
///
/// `A` is given by its three non-redundant bands:
///
/// * `diag[i]` = `A[i][i]` (length n)
/// * `off1[i]` = `A[i][i+1]` = `A[i+1][i]` (length n-1)
/// * `off2[i]` = `A[i][i+2]` = `A[i+2][i]` (length n-2)
///
/// `L` is unit lower triangular with two sub-diagonals, so factorization and
/// both substitutions touch at most two previous entries per row.
pub fn solve_pentadiagonal(
    diag: &[f64],
    off1: &[f64],
    off2: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>> {
    let n = diag.len();
    if rhs.len() != n
        || off1.len() != n.saturating_sub(1)
        || off2.len() != n.saturating_sub(2)
    {
        return Err(PeakFitError::DimensionMismatch(format!(
            "pentadiagonal bands have lengths {}/{}/{} for a system of size {} (rhs {})",
            diag.len(),
            off1.len(),
            off2.len(),
            n,
            rhs.len()
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut d = vec![0.0; n];
    // l1[i] = L[i+1][i], l2[i] = L[i+2][i]
    let mut l1 = vec![0.0; n.saturating_sub(1)];
    let mut l2 = vec![0.0; n.saturating_sub(2)];

    for i in 0..n {
        let mut di = diag[i];
        if i >= 1 {
            di -= l1[i - 1] * l1[i - 1] * d[i - 1];
        }
        if i >= 2 {
            di -= l2[i - 2] * l2[i - 2] * d[i - 2];
        }
        if di.abs() < MIN_PIVOT || !di.is_finite() {
            return Err(PeakFitError::SingularMatrix);
        }
        d[i] = di;

        if i + 1 < n {
            let mut b = off1[i];
            if i >= 1 {
                b -= l2[i - 1] * l1[i - 1] * d[i - 1];
            }
            l1[i] = b / di;
        }
        if i + 2 < n {
            l2[i] = off2[i] / di;
        }
    }

    // L u = rhs
    let mut z = rhs.to_vec();
    for i in 1..n {
        z[i] -= l1[i - 1] * z[i - 1];
        if i >= 2 {
            z[i] -= l2[i - 2] * z[i - 2];
        }
    }
    // D v = u
    for (zi, di) in z.iter_mut().zip(&d) {
        *zi /= di;
    }
    // Lᵗ z = v
    for i in (0..n).rev() {
        if i + 1 < n {
            z[i] -= l1[i] * z[i + 1];
        }
        if i + 2 < n {
            z[i] -= l2[i] * z[i + 2];
        }
    }

    Ok(z)
}

/// Solve a tridiagonal system with the Thomas algorithm.
///
/// * `sub[i]` = `A[i+1][i]` (length n-1)
/// * `diag[i]` = `A[i][i]` (length n)
/// * `sup[i]` = `A[i][i+1]` (length n-1)
pub fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Result<Vec<f64>> {
    let n = diag.len();
    if rhs.len() != n || sub.len() != n.saturating_sub(1) || sup.len() != n.saturating_sub(1) {
        return Err(PeakFitError::DimensionMismatch(format!(
            "tridiagonal bands have lengths {}/{}/{} for a system of size {} (rhs {})",
            sub.len(),
            diag.len(),
            sup.len(),
            n,
            rhs.len()
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut c = vec![0.0; n];
    let mut x = rhs.to_vec();

    let mut denom = diag[0];
    if denom.abs() < MIN_PIVOT {
        return Err(PeakFitError::SingularMatrix);
    }
    if n > 1 {
        c[0] = sup[0] / denom;
    }
    x[0] /= denom;

    for i in 1..n {
        denom = diag[i] - sub[i - 1] * c[i - 1];
        if denom.abs() < MIN_PIVOT || !denom.is_finite() {
            return Err(PeakFitError::SingularMatrix);
        }
        if i + 1 < n {
            c[i] = sup[i] / denom;
        }
        x[i] = (x[i] - sub[i - 1] * x[i - 1]) / denom;
    }

    for i in (0..n - 1).rev() {
        x[i] -= c[i] * x[i + 1];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Multiply a symmetric pentadiagonal matrix by a vector.
    fn penta_mul(diag: &[f64], off1: &[f64], off2: &[f64], v: &[f64]) -> Vec<f64> {
        let n = diag.len();
        (0..n)
            .map(|i| {
                let mut s = diag[i] * v[i];
                if i + 1 < n {
                    s += off1[i] * v[i + 1];
                }
                if i >= 1 {
                    s += off1[i - 1] * v[i - 1];
                }
                if i + 2 < n {
                    s += off2[i] * v[i + 2];
                }
                if i >= 2 {
                    s += off2[i - 2] * v[i - 2];
                }
                s
            })
            .collect()
    }

    #[test]
    fn test_pentadiagonal_matches_product() {
        let n = 12;
        let lambda = 50.0;
        // W + lambda * D2ᵗD2 with unit weights
        let mut diag = vec![1.0 + 6.0 * lambda; n];
        diag[0] = 1.0 + lambda;
        diag[n - 1] = 1.0 + lambda;
        diag[1] = 1.0 + 5.0 * lambda;
        diag[n - 2] = 1.0 + 5.0 * lambda;
        let mut off1 = vec![-4.0 * lambda; n - 1];
        off1[0] = -2.0 * lambda;
        off1[n - 2] = -2.0 * lambda;
        let off2 = vec![lambda; n - 2];

        let expected: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin()).collect();
        let rhs = penta_mul(&diag, &off1, &off2, &expected);
        let z = solve_pentadiagonal(&diag, &off1, &off2, &rhs).unwrap();
        for (a, b) in z.iter().zip(&expected) {
            assert_relative_eq!(a, b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_pentadiagonal_small_sizes() {
        assert_eq!(solve_pentadiagonal(&[], &[], &[], &[]).unwrap(), Vec::<f64>::new());
        let z = solve_pentadiagonal(&[2.0], &[], &[], &[4.0]).unwrap();
        assert_relative_eq!(z[0], 2.0);
        let z = solve_pentadiagonal(&[2.0, 3.0], &[1.0], &[], &[3.0, 4.0]).unwrap();
        assert_relative_eq!(z[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(z[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pentadiagonal_rejects_bad_bands() {
        assert!(solve_pentadiagonal(&[1.0, 1.0], &[], &[], &[1.0, 1.0]).is_err());
        assert!(matches!(
            solve_pentadiagonal(&[0.0], &[], &[], &[1.0]),
            Err(PeakFitError::SingularMatrix)
        ));
    }

    #[test]
    fn test_tridiagonal() {
        // [2 1 0; 1 2 1; 0 1 2] x = [4 8 8] => x = [1 2 3]
        let x = solve_tridiagonal(&[1.0, 1.0], &[2.0, 2.0, 2.0], &[1.0, 1.0], &[4.0, 8.0, 8.0])
            .unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 3.0, epsilon = 1e-12);
    }
}
