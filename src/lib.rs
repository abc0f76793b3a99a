//! # peakfit-rs
//!
//! `peakfit-rs` fits sums of peak shapes plus a background to one-dimensional
//! X/Y data such as spectra and diffractograms.
//!
//! The library provides:
//! - Gaussian, Lorentzian and pseudo-Voigt peak profiles
//! - Data preparation: outlier removal, cropping, resampling, Savitzky-Golay
//!   smoothing and normalization
//! - Baseline estimation: linear, robust polynomial, asymmetric least
//!   squares, rolling ball, Shirley and manual control points
//! - A Levenberg-Marquardt optimizer for general nonlinear least squares
//! - Peak fitting with the baseline either subtracted up front or optimized
//!   together with the peaks
//!
//! ## Basic Usage
//!
//! ```
//! use peakfit_rs::baseline::{BaselineMethod, BaselineOptions};
//! use peakfit_rs::models::{PeakComponent, PeakProfile};
//! use peakfit_rs::simulate::{SimulatedBaseline, SpectrumSimulator};
//!
//! let samples = SpectrumSimulator::new(0.0, 20.0, 201)
//!     .with_component(PeakComponent::new(1, PeakProfile::Gaussian, 8.0, 4.0, 2.0))
//!     .with_baseline(SimulatedBaseline::Linear { slope: 0.05, intercept: 1.0 })
//!     .noiseless();
//!
//! let options = BaselineOptions::new(BaselineMethod::Linear);
//! let guess = PeakComponent::new(1, PeakProfile::Gaussian, 7.5, 3.0, 2.5);
//! let result = peakfit_rs::fit(&samples, &[guess], None, Some(&options), 200).unwrap();
//!
//! assert!(result.statistics.r_squared > 0.999);
//! ```

pub mod baseline;
pub mod error;
pub mod fit;
pub mod lm;
pub mod models;
pub mod problem;
pub mod processing;
pub mod sample;
pub mod settings;
pub mod simulate;
pub mod utils;

// Re-exports for convenience
pub use baseline::{estimate_baseline, BaselineMethod, BaselineOptions};
pub use error::{PeakFitError, Result};
pub use fit::{fit, FitResult, FitStatistics, PeakFitter};
pub use lm::{optimize, LevenbergMarquardt, LmConfig, LmResult};
pub use models::{PeakComponent, PeakProfile};
pub use problem::Problem;
pub use processing::{prepare, ProcessingOptions};
pub use sample::Sample;
pub use settings::FitSettings;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
