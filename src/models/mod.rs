//! Peak models for fitting spectra.

pub mod peak;

pub use peak::{
    guess_components, normalize_weights, sum_components, PeakComponent, PeakProfile,
    FWHM_TO_SIGMA, MIN_WIDTH,
};
