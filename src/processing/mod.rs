//! Data preparation before fitting.
//!
//! [`prepare`] runs a fixed pipeline over a dataset:
//!
//! 1. outlier removal (z-score or IQR)
//! 2. crop to an x range
//! 3. resampling onto a uniform grid
//! 4. Savitzky-Golay smoothing
//! 5. normalization by the largest absolute y
//!
//! Each step is also available on its own.

pub mod outliers;
pub mod resample;
pub mod smoothing;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::sample::{self, Sample};

pub use outliers::{remove_outliers, OutlierMethod, OutlierOptions};
pub use resample::{interpolate_at, resample, ResampleOptions};
pub use smoothing::{savgol_kernel, savitzky_golay, SmoothingOptions};

/// Inclusive x range. Missing bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl CropRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        self.min.map_or(true, |m| x >= m) && self.max.map_or(true, |m| x <= m)
    }
}

/// Options for [`prepare`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub crop: Option<CropRange>,
    pub resample: Option<ResampleOptions>,
    pub normalize: bool,
    pub smoothing: SmoothingOptions,
    pub outliers: OutlierOptions,
}

/// Keep samples with x inside `range`.
pub fn crop(samples: &[Sample], range: &CropRange) -> Result<Vec<Sample>> {
    if let (Some(lo), Some(hi)) = (range.min, range.max) {
        if lo > hi {
            return Err(PeakFitError::InvalidParameter(format!(
                "crop range minimum {} exceeds maximum {}",
                lo, hi
            )));
        }
    }
    Ok(samples
        .iter()
        .filter(|s| range.contains(s.x))
        .copied()
        .collect())
}

/// Divide every y by the largest absolute y. No-op when that is zero.
pub fn normalize(samples: &[Sample]) -> Vec<Sample> {
    let max_abs = samples.iter().fold(0.0_f64, |m, s| m.max(s.y.abs()));
    if max_abs == 0.0 {
        return samples.to_vec();
    }
    samples
        .iter()
        .map(|s| Sample::new(s.x, s.y / max_abs))
        .collect()
}

/// Run the preparation pipeline over `samples`.
///
/// The input is sorted by x first. Invalid options (non-positive step,
/// even window length, inverted crop range, ...) are reported as errors.
pub fn prepare(samples: &[Sample], options: &ProcessingOptions) -> Result<Vec<Sample>> {
    sample::check_finite(samples)?;
    if options.smoothing.enabled {
        options.smoothing.validate()?;
    }

    let mut data = sample::sorted(samples);
    let input_len = data.len();

    data = remove_outliers(&data, &options.outliers)?;
    if let Some(range) = &options.crop {
        data = crop(&data, range)?;
    }
    if let Some(grid) = &options.resample {
        data = resample(&data, grid)?;
    }
    if options.smoothing.enabled {
        data = savitzky_golay(&data, &options.smoothing)?;
    }
    if options.normalize {
        data = normalize(&data);
    }

    debug!("prepared {} samples from {} inputs", data.len(), input_len);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(i as f64, i as f64)).collect()
    }

    #[test]
    fn test_default_options_only_sort() {
        let input = vec![Sample::new(2.0, 1.0), Sample::new(1.0, 3.0)];
        let out = prepare(&input, &ProcessingOptions::default()).unwrap();
        assert_eq!(out, vec![Sample::new(1.0, 3.0), Sample::new(2.0, 1.0)]);
    }

    #[test]
    fn test_crop_and_normalize() {
        let opts = ProcessingOptions {
            crop: Some(CropRange::new(2.0, 5.0)),
            normalize: true,
            ..Default::default()
        };
        let out = prepare(&ramp(10), &opts).unwrap();
        assert_eq!(out.len(), 4);
        assert_relative_eq!(out[0].y, 0.4);
        assert_relative_eq!(out[3].y, 1.0);
    }

    #[test]
    fn test_normalize_zero_is_noop() {
        let flat = vec![Sample::new(0.0, 0.0), Sample::new(1.0, 0.0)];
        assert_eq!(normalize(&flat), flat);
    }

    #[test]
    fn test_pipeline_order() {
        // The spike is removed before resampling, so it never reaches the grid
        let mut input = ramp(21);
        input[10].y = 500.0;
        let opts = ProcessingOptions {
            outliers: OutlierOptions {
                method: OutlierMethod::ZScore,
                threshold: 3.0,
            },
            resample: Some(ResampleOptions::with_step(0.5)),
            smoothing: SmoothingOptions::new(5, 2),
            ..Default::default()
        };
        let out = prepare(&input, &opts).unwrap();
        assert_eq!(out.len(), 41);
        // Reflection bends the line at the two ends, so only check the interior
        for s in &out[2..39] {
            assert_relative_eq!(s.y, s.x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_crop_range() {
        let opts = ProcessingOptions {
            crop: Some(CropRange::new(5.0, 1.0)),
            ..Default::default()
        };
        assert!(prepare(&ramp(5), &opts).is_err());
    }

    #[test]
    fn test_non_finite_input() {
        let input = vec![Sample::new(0.0, f64::INFINITY)];
        assert!(prepare(&input, &ProcessingOptions::default()).is_err());
    }
}
