//! Baseline (background) estimation.
//!
//! Six interchangeable estimators produce a background curve aligned index
//! for index with the input samples:
//!
//! - [`linear`]: straight line, fixed or through the end points
//! - [`polynomial`]: sigma-clipped least-squares polynomial
//! - [`asls`]: asymmetric least squares (Whittaker smoother)
//! - [`rolling_ball`]: sliding minimum plus moving average
//! - [`shirley`]: iterative Shirley step background
//! - [`manual`]: interpolation through control points
//!
//! An optional calc range restricts where the estimator runs; outside it the
//! curve is held flat at the value of the nearest computed end.
//!
//! Besides one-shot estimation, every method except `none` and `manual` can be
//! driven by a small parameter vector (see [`initial_parameters`] and
//! [`curve_from_parameters`]) so the fitter can optimize the background
//! together with the peaks.

pub mod asls;
pub mod linear;
pub mod manual;
pub mod polynomial;
pub mod rolling_ball;
pub mod shirley;

use log::debug;
use serde::{Deserialize, Serialize};
use std::iter;

use crate::sample::{self, Sample};

pub use asls::AslsParams;
pub use linear::LinearParams;
pub use manual::{ManualInterpolation, ManualParams};
pub use polynomial::PolynomialParams;
pub use rolling_ball::RollingBallParams;
pub use shirley::ShirleyParams;

/// Lower and upper clamp for the AsLS asymmetry while it is optimized.
const ASLS_P_LIMITS: (f64, f64) = (1e-6, 1.0 - 1e-6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMethod {
    #[default]
    None,
    Linear,
    Polynomial,
    Asls,
    RollingBall,
    Shirley,
    Manual,
}

impl BaselineMethod {
    /// Whether the method has parameters the fitter can optimize.
    pub fn is_optimizable(self) -> bool {
        !matches!(self, BaselineMethod::None | BaselineMethod::Manual)
    }

    /// Parametric methods are evaluated from their coefficients alone, without
    /// looking at the data.
    pub fn is_parametric(self) -> bool {
        matches!(self, BaselineMethod::Linear | BaselineMethod::Polynomial)
    }
}

/// Inclusive x range the baseline is computed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcRange {
    pub start: f64,
    pub end: f64,
}

impl CalcRange {
    /// Range from `start` to `end`; the bounds may be given in either order.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// First and last index of sorted `x` inside the range, if at least two
    /// samples fall in it.
    pub fn index_span(&self, x: &[f64]) -> Option<(usize, usize)> {
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        let first = x.partition_point(|&v| v < lo);
        let past = x.partition_point(|&v| v <= hi);
        if past >= first + 2 {
            Some((first, past - 1))
        } else {
            None
        }
    }
}

/// Baseline configuration.
///
/// Only the parameter block belonging to `method` is consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineOptions {
    pub method: BaselineMethod,
    /// Fit the baseline from the data. When off, supplied parameters (line
    /// slope/intercept, polynomial coefficients) are used verbatim.
    pub auto_baseline: bool,
    /// Make the baseline parameters free variables of the peak fit.
    pub optimize_simultaneously: bool,
    pub calc_range: Option<CalcRange>,
    pub linear: LinearParams,
    pub polynomial: PolynomialParams,
    pub asls: AslsParams,
    pub rolling_ball: RollingBallParams,
    pub shirley: ShirleyParams,
    pub manual: ManualParams,
}

impl Default for BaselineOptions {
    fn default() -> Self {
        Self {
            method: BaselineMethod::None,
            auto_baseline: true,
            optimize_simultaneously: false,
            calc_range: None,
            linear: LinearParams::default(),
            polynomial: PolynomialParams::default(),
            asls: AslsParams::default(),
            rolling_ball: RollingBallParams::default(),
            shirley: ShirleyParams::default(),
            manual: ManualParams::default(),
        }
    }
}

impl BaselineOptions {
    /// Options for `method` with every parameter block at its default.
    pub fn new(method: BaselineMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Restrict the estimator to `[start, end]`.
    pub fn with_calc_range(mut self, start: f64, end: f64) -> Self {
        self.calc_range = Some(CalcRange::new(start, end));
        self
    }

    /// Co-optimize the baseline parameters with the peaks.
    pub fn with_simultaneous_optimization(mut self, enabled: bool) -> Self {
        self.optimize_simultaneously = enabled;
        self
    }

    /// Whether a fit with these options co-optimizes the baseline.
    pub fn co_optimizes(&self) -> bool {
        self.optimize_simultaneously && self.method.is_optimizable()
    }

    /// Whether `x` has too few samples on the calc range to fit the
    /// configured baseline. Only a polynomial fitted from the data needs a
    /// minimum, `degree + 1` samples.
    ///
    /// # Arguments
    ///
    /// * `x` - Sorted x values of the dataset
    pub fn has_too_few_points(&self, x: &[f64]) -> bool {
        if self.method != BaselineMethod::Polynomial || supplied_coefficients(self).is_some() {
            return false;
        }
        let available = self
            .calc_range
            .as_ref()
            .and_then(|range| range.index_span(x))
            .map_or(x.len(), |(lo, hi)| hi - lo + 1);
        available < self.polynomial.degree + 1
    }

    /// Length of the parameter vector used when co-optimizing.
    pub fn parameter_count(&self) -> usize {
        match self.method {
            BaselineMethod::None | BaselineMethod::Manual => 0,
            BaselineMethod::Linear => 2,
            BaselineMethod::Polynomial => self.polynomial.degree + 1,
            BaselineMethod::Asls => 2,
            BaselineMethod::RollingBall => 1,
            BaselineMethod::Shirley => 2,
        }
    }
}

/// Run `estimator` on the calc-range slice of `x`/`y` and hold its end values
/// flat across the rest of the domain.
fn on_calc_range<F>(x: &[f64], y: &[f64], range: Option<&CalcRange>, estimator: F) -> Vec<f64>
where
    F: FnOnce(&[f64], &[f64]) -> Vec<f64>,
{
    let n = x.len();
    let Some(range) = range else {
        return estimator(x, y);
    };
    let Some((lo, hi)) = range.index_span(x) else {
        debug!(
            "calc range [{}, {}] holds fewer than two samples, using the full domain",
            range.start, range.end
        );
        return estimator(x, y);
    };

    let inner = estimator(&x[lo..=hi], &y[lo..=hi]);
    let (first, last) = match (inner.first(), inner.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return vec![0.0; n],
    };
    iter::repeat(first)
        .take(lo)
        .chain(inner)
        .chain(iter::repeat(last).take(n - 1 - hi))
        .collect()
}

/// Compute the baseline curve for parallel `x`/`y` arrays.
///
/// Degenerate inputs fall back to a zero baseline rather than failing.
pub fn baseline_curve(x: &[f64], y: &[f64], options: &BaselineOptions) -> Vec<f64> {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    if n == 0 {
        return Vec::new();
    }

    let curve = on_calc_range(x, y, options.calc_range.as_ref(), |xs, ys| {
        match options.method {
            BaselineMethod::None => vec![0.0; xs.len()],
            BaselineMethod::Linear => linear::linear_baseline(xs, ys, &options.linear),
            BaselineMethod::Polynomial => polynomial_curve(xs, ys, options),
            BaselineMethod::Asls => asls::asls(ys, options.asls.lambda, options.asls.p),
            BaselineMethod::RollingBall => {
                rolling_ball::rolling_ball(ys, options.rolling_ball.radius)
            }
            BaselineMethod::Shirley => shirley::shirley(xs, ys, &options.shirley),
            BaselineMethod::Manual => manual::manual_baseline(xs, &options.manual),
        }
    });
    debug!("{:?} baseline computed over {} samples", options.method, n);
    curve
}

fn supplied_coefficients(options: &BaselineOptions) -> Option<&[f64]> {
    if options.auto_baseline {
        return None;
    }
    options
        .polynomial
        .coefficients
        .as_deref()
        .filter(|c| !c.is_empty())
}

fn polynomial_curve(x: &[f64], y: &[f64], options: &BaselineOptions) -> Vec<f64> {
    if let Some(coefficients) = supplied_coefficients(options) {
        return polynomial::evaluate(x, coefficients);
    }
    match polynomial::robust_polynomial(x, y, options.polynomial.degree) {
        Some(fit) => fit.curve,
        None => vec![0.0; x.len()],
    }
}

/// Estimate the baseline of `samples`.
///
/// The result holds one sample per input sample, in ascending x order.
pub fn estimate_baseline(samples: &[Sample], options: &BaselineOptions) -> Vec<Sample> {
    let data = if sample::is_sorted(samples) {
        samples.to_vec()
    } else {
        sample::sorted(samples)
    };
    let x: Vec<f64> = data.iter().map(|s| s.x).collect();
    let y: Vec<f64> = data.iter().map(|s| s.y).collect();
    let curve = baseline_curve(&x, &y, options);
    sample::with_values(&data, &curve)
}

/// Starting parameter vector for co-optimizing the baseline.
///
/// - linear: `[slope, intercept]`
/// - polynomial: `degree + 1` coefficients in normalized x
/// - asls: `[log10(λ), p]`
/// - rolling ball: `[radius]`
/// - shirley: `[start_offset, end_offset]`
/// - none / manual: empty
pub fn initial_parameters(x: &[f64], y: &[f64], options: &BaselineOptions) -> Vec<f64> {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    let (xs, ys) = match options.calc_range.as_ref().and_then(|r| r.index_span(x)) {
        Some((lo, hi)) => (&x[lo..=hi], &y[lo..=hi]),
        None => (x, y),
    };

    match options.method {
        BaselineMethod::None | BaselineMethod::Manual => Vec::new(),
        BaselineMethod::Linear => {
            let (slope, intercept) = match (options.linear.slope, options.linear.intercept) {
                (Some(s), Some(i)) => (s, i),
                _ => linear::two_point_line(xs, ys),
            };
            vec![slope, intercept]
        }
        BaselineMethod::Polynomial => {
            let terms = options.polynomial.degree + 1;
            if let Some(c) = supplied_coefficients(options) {
                let mut c = c.to_vec();
                c.resize(terms, 0.0);
                return c;
            }
            polynomial::robust_polynomial(xs, ys, options.polynomial.degree)
                .map(|fit| fit.coefficients)
                .unwrap_or_else(|| vec![0.0; terms])
        }
        BaselineMethod::Asls => vec![options.asls.lambda.max(f64::MIN_POSITIVE).log10(), options.asls.p],
        BaselineMethod::RollingBall => vec![options.rolling_ball.radius as f64],
        BaselineMethod::Shirley => vec![options.shirley.start_offset, options.shirley.end_offset],
    }
}

/// Evaluate the baseline from a parameter vector laid out as in
/// [`initial_parameters`].
///
/// Parametric methods (linear, polynomial) ignore `y`. The others estimate
/// the baseline of `y`, which during a simultaneous fit is the data minus the
/// current peak model.
pub fn curve_from_parameters(
    x: &[f64],
    y: &[f64],
    options: &BaselineOptions,
    params: &[f64],
) -> Vec<f64> {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    if params.len() < options.parameter_count() {
        return vec![0.0; n];
    }

    on_calc_range(x, y, options.calc_range.as_ref(), |xs, ys| match options.method {
        BaselineMethod::None | BaselineMethod::Manual => vec![0.0; xs.len()],
        BaselineMethod::Linear => linear::line(xs, params[0], params[1]),
        BaselineMethod::Polynomial => {
            polynomial::evaluate(xs, &params[..options.polynomial.degree + 1])
        }
        BaselineMethod::Asls => {
            let p = params[1].clamp(ASLS_P_LIMITS.0, ASLS_P_LIMITS.1);
            asls::asls(ys, 10f64.powf(params[0]), p)
        }
        BaselineMethod::RollingBall => {
            rolling_ball::rolling_ball(ys, params[0].round().max(0.0) as usize)
        }
        BaselineMethod::Shirley => {
            let shirley = ShirleyParams {
                start_offset: params[0],
                end_offset: params[1],
                ..options.shirley.clone()
            };
            shirley::shirley(xs, ys, &shirley)
        }
    })
}

/// Copy of `options` with the parameter vector written back into the
/// method's parameter block, so estimating with the result reproduces the
/// optimized baseline.
pub fn with_parameters(options: &BaselineOptions, params: &[f64]) -> BaselineOptions {
    let mut out = options.clone();
    if params.len() < options.parameter_count() {
        return out;
    }
    match options.method {
        BaselineMethod::None | BaselineMethod::Manual => {}
        BaselineMethod::Linear => {
            out.linear.slope = Some(params[0]);
            out.linear.intercept = Some(params[1]);
        }
        BaselineMethod::Polynomial => {
            out.polynomial.coefficients = Some(params[..options.polynomial.degree + 1].to_vec());
            out.auto_baseline = false;
        }
        BaselineMethod::Asls => {
            out.asls.lambda = 10f64.powf(params[0]);
            out.asls.p = params[1].clamp(ASLS_P_LIMITS.0, ASLS_P_LIMITS.1);
        }
        BaselineMethod::RollingBall => {
            out.rolling_ball.radius = params[0].round().max(0.0) as usize;
        }
        BaselineMethod::Shirley => {
            out.shirley.start_offset = params[0];
            out.shirley.end_offset = params[1];
        }
    }
    out
}
