//! Goodness-of-fit statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Total sums of squares at or below this fraction of `Σy²` count as zero.
const FLAT_RELATIVE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FitStatistics {
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub rmse: f64,
    pub chi_squared: f64,
    pub reduced_chi_squared: f64,
    pub aic: f64,
    pub bic: f64,
    /// Number of samples.
    pub n_points: usize,
    /// Number of free parameters.
    pub n_params: usize,
}

impl FitStatistics {
    /// Compute the statistics of a fit.
    ///
    /// `observed` is the curve the R² total sum of squares is taken over (the
    /// baseline-corrected data), `residuals` the data minus the fitted curve,
    /// and `chi_squared` the optimizer's final sum of squared residuals.
    pub fn compute(observed: &[f64], residuals: &[f64], chi_squared: f64, n_params: usize) -> Self {
        let n = observed.len().min(residuals.len());
        if n == 0 {
            return Self::default();
        }
        let nf = n as f64;
        let pf = n_params as f64;

        let ss_res: f64 = residuals[..n].iter().map(|r| r * r).sum();
        let mean = observed[..n].iter().sum::<f64>() / nf;
        let ss_tot: f64 = observed[..n].iter().map(|y| (y - mean).powi(2)).sum();
        let sum_sq: f64 = observed[..n].iter().map(|y| y * y).sum();

        let r_squared = if ss_tot > FLAT_RELATIVE_TOLERANCE * sum_sq {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        let dof_adjusted = nf - pf - 1.0;
        let adjusted_r_squared = if dof_adjusted > 0.0 {
            1.0 - (1.0 - r_squared) * (nf - 1.0) / dof_adjusted
        } else {
            r_squared
        };

        let dof = n.saturating_sub(n_params).max(1) as f64;
        let log_likelihood = -nf / 2.0 * (ss_res / nf).max(f64::MIN_POSITIVE).ln();

        Self {
            r_squared,
            adjusted_r_squared,
            rmse: (ss_res / nf).sqrt(),
            chi_squared,
            reduced_chi_squared: chi_squared / dof,
            aic: 2.0 * pf - 2.0 * log_likelihood,
            bic: pf * nf.ln() - 2.0 * log_likelihood,
            n_points: n,
            n_params,
        }
    }
}

impl fmt::Display for FitStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  R²: {:.6}", self.r_squared)?;
        writeln!(f, "  Adjusted R²: {:.6}", self.adjusted_r_squared)?;
        writeln!(f, "  RMSE: {:.6e}", self.rmse)?;
        writeln!(f, "  Chi-squared: {:.6e}", self.chi_squared)?;
        writeln!(f, "  Reduced chi-squared: {:.6e}", self.reduced_chi_squared)?;
        writeln!(f, "  AIC: {:.4}", self.aic)?;
        writeln!(f, "  BIC: {:.4}", self.bic)?;
        Ok(())
    }
}
