//! Integration tests for the Levenberg-Marquardt optimizer.

use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use peakfit_rs::lm::{optimize, LevenbergMarquardt, LmConfig};
use peakfit_rs::{PeakFitError, Problem, Result};

/// A simple linear model for testing: f(x) = a * x + b
struct LinearModel {
    x_data: Array1<f64>,
    y_data: Array1<f64>,
}

impl Problem for LinearModel {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != 2 {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }
        Ok(self
            .x_data
            .iter()
            .zip(self.y_data.iter())
            .map(|(x, y)| params[0] * x + params[1] - y)
            .collect())
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }

    fn jacobian(
        &self,
        _params: &Array1<f64>,
        _residuals: &Array1<f64>,
        _epsilon: f64,
    ) -> Result<Array2<f64>> {
        let n = self.x_data.len();
        let mut jac = Array2::zeros((n, 2));
        for i in 0..n {
            jac[[i, 0]] = self.x_data[i];
            jac[[i, 1]] = 1.0;
        }
        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// The Rosenbrock function in least-squares form:
/// r₁ = 1 - x, r₂ = 10(y - x²)
struct RosenbrockProblem;

impl Problem for RosenbrockProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let (x, y) = (params[0], params[1]);
        Ok(array![1.0 - x, 10.0 * (y - x.powi(2))])
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        2
    }
}

/// Exponential decay with the rate kept non-negative.
struct ClampedDecay {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl Problem for ClampedDecay {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.x.mapv(|x| params[0] * (-params[1] * x).exp()) - &self.y)
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }

    fn constrain(&self, params: &mut Array1<f64>) {
        params[1] = params[1].max(0.0);
    }
}

#[test]
fn test_linear_fit_with_noise() {
    let model = LinearModel {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        y_data: array![3.1, 4.9, 7.1, 8.9, 11.1, 12.9],
    };
    let result = LevenbergMarquardt::new()
        .minimize(&model, array![1.0, 1.0])
        .unwrap();

    assert!(result.converged);
    assert_relative_eq!(result.params[0], 2.0, epsilon = 0.1);
    assert_relative_eq!(result.params[1], 3.0, epsilon = 0.1);
    assert!(result.chi_squared < 0.2);
}

#[test]
fn test_multiple_starting_points() {
    let model = LinearModel {
        x_data: array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        y_data: array![3.0, 5.0, 7.0, 9.0, 11.0, 13.0],
    };
    let lm = LevenbergMarquardt::new();

    for start in [
        array![1.0, 1.0],
        array![0.0, 0.0],
        array![10.0, 10.0],
        array![-5.0, -5.0],
    ] {
        let result = lm.minimize(&model, start).unwrap();
        assert!(result.converged, "{}", result);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 3.0, epsilon = 1e-6);
    }
}

#[test]
fn test_rosenbrock() {
    let result = LevenbergMarquardt::new()
        .with_max_iterations(500)
        .minimize(&RosenbrockProblem, array![-1.2, 1.0])
        .unwrap();

    assert!(result.converged);
    assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-4);
    assert!(result.chi_squared < 1e-8);
}

#[test]
fn test_gaussian_from_perturbed_start() {
    // Noisy single Gaussian, started 20% away from the truth in every parameter
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.02).unwrap();
    let x = Array1::linspace(0.0, 100.0, 201);
    let gaussian = |x: &Array1<f64>, p: &Array1<f64>| {
        let sigma = p[2] / 2.355;
        x.mapv(|x| p[1] * (-(x - p[0]).powi(2) / (2.0 * sigma * sigma)).exp())
    };
    let truth = array![50.0, 10.0, 8.0];
    let y = gaussian(&x, &truth) + x.mapv(|_| noise.sample(&mut rng));

    let result = optimize(&x, &y, array![60.0, 8.0, 9.6], gaussian, &LmConfig::default()).unwrap();

    assert!(result.converged);
    assert!(result.iterations <= 200);
    for (fitted, expected) in result.params.iter().zip(truth.iter()) {
        assert_relative_eq!(*fitted, *expected, max_relative = 0.01);
    }
}

#[test]
fn test_constrain_hook_is_applied() {
    // Growth data pulls the rate negative; the clamp holds it at zero
    let x = Array1::linspace(0.0, 2.0, 20);
    let y = x.mapv(|x: f64| 2.0 * (0.5 * x).exp());
    let problem = ClampedDecay { x, y };
    let result = LevenbergMarquardt::new()
        .minimize(&problem, array![1.0, -1.0])
        .unwrap();
    assert!(result.params[1] >= 0.0);
}

#[test]
fn test_builder_matches_config() {
    let lm = LevenbergMarquardt::new()
        .with_max_iterations(10)
        .with_tolerance(1e-6)
        .with_lambda(1.0)
        .with_lambda_up_factor(5.0)
        .with_lambda_down_factor(0.5)
        .with_max_lambda(1e6)
        .with_fd_epsilon(1e-7);
    let expected = LmConfig {
        max_iterations: 10,
        tolerance: 1e-6,
        initial_lambda: 1.0,
        lambda_up_factor: 5.0,
        lambda_down_factor: 0.5,
        max_lambda: 1e6,
        fd_epsilon: 1e-7,
        parallel_jacobian: false,
    };
    assert_eq!(lm.config(), &expected);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_jacobian_matches_serial() {
    let x = Array1::linspace(0.0, 4.0, 40);
    let y = x.mapv(|x: f64| 3.0 * (-0.7 * x).exp() + 0.01 * (5.0 * x).cos());
    let model = |x: &Array1<f64>, p: &Array1<f64>| x.mapv(|x| p[0] * (-p[1] * x).exp());

    let serial = optimize(&x, &y, array![2.0, 1.0], model, &LmConfig::default()).unwrap();
    let config = LmConfig {
        parallel_jacobian: true,
        ..LmConfig::default()
    };
    let parallel = optimize(&x, &y, array![2.0, 1.0], model, &config).unwrap();

    assert_eq!(serial.params, parallel.params);
    assert_eq!(serial.iterations, parallel.iterations);
}
