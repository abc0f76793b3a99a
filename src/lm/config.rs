//! Configuration options for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

use crate::utils::finite_difference::DEFAULT_EPSILON;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 200
    pub max_iterations: usize,

    /// Relative decrease of χ² below which an accepted step counts as
    /// converged. Default: 1e-8
    pub tolerance: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// The optimizer gives up once lambda exceeds this value. Default: 1e10
    pub max_lambda: f64,

    /// Absolute forward-difference step for the Jacobian. Default: 1e-8
    pub fd_epsilon: f64,

    /// Evaluate Jacobian columns on the rayon thread pool. Default: false
    pub parallel_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            max_lambda: 1e10,
            fd_epsilon: DEFAULT_EPSILON,
            parallel_jacobian: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LmConfig = serde_json::from_str(r#"{"max_iterations": 50}"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.lambda_up_factor, 10.0);
        assert!(!config.parallel_jacobian);
    }
}
