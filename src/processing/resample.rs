//! Linear interpolation onto a uniform grid.

use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::sample::Sample;

/// Upper bound on the number of points a resampling grid may have.
const MAX_GRID_POINTS: usize = 10_000_000;

/// Uniform grid definition.
///
/// `start` and `end` default to the first and last x of the data. Grid
/// points beyond the data span are extrapolated linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleOptions {
    pub step: f64,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

impl ResampleOptions {
    pub fn with_step(step: f64) -> Self {
        Self {
            step,
            start: None,
            end: None,
        }
    }
}

/// Linearly interpolate sorted `samples` at `x`.
///
/// Outside the data span the nearest edge segment is extended. A single
/// sample gives a constant; an empty slice gives zero.
pub fn interpolate_at(samples: &[Sample], x: f64) -> f64 {
    let n = samples.len();
    match n {
        0 => return 0.0,
        1 => return samples[0].y,
        _ => {}
    }

    let pos = samples.partition_point(|s| s.x < x);
    let (a, b) = if pos == 0 {
        (samples[0], samples[1])
    } else if pos >= n {
        (samples[n - 2], samples[n - 1])
    } else {
        (samples[pos - 1], samples[pos])
    };

    let dx = b.x - a.x;
    if dx == 0.0 {
        return a.y;
    }
    a.y + (b.y - a.y) * (x - a.x) / dx
}

/// Resample sorted `samples` onto the grid described by `options`.
pub fn resample(samples: &[Sample], options: &ResampleOptions) -> Result<Vec<Sample>> {
    if !(options.step.is_finite() && options.step > 0.0) {
        return Err(PeakFitError::InvalidParameter(format!(
            "resampling step must be positive, got {}",
            options.step
        )));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let start = options.start.unwrap_or(samples[0].x);
    let end = options.end.unwrap_or(samples[samples.len() - 1].x);
    if !(start.is_finite() && end.is_finite()) || end < start {
        return Err(PeakFitError::InvalidParameter(format!(
            "invalid resampling range [{}, {}]",
            start, end
        )));
    }

    // Tolerance keeps an end point that lies on the grid despite rounding
    let intervals = ((end - start) / options.step + 1e-9).floor();
    if intervals >= MAX_GRID_POINTS as f64 {
        return Err(PeakFitError::InvalidParameter(format!(
            "resampling grid of {} points is too large",
            intervals
        )));
    }
    let count = intervals as usize + 1;

    Ok((0..count)
        .map(|i| {
            let x = start + i as f64 * options.step;
            Sample::new(x, interpolate_at(samples, x))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn data() -> Vec<Sample> {
        vec![Sample::new(0.0, 0.0), Sample::new(1.0, 2.0), Sample::new(3.0, 0.0)]
    }

    #[test]
    fn test_interpolate_inside_and_outside() {
        let d = data();
        assert_relative_eq!(interpolate_at(&d, 0.5), 1.0);
        assert_relative_eq!(interpolate_at(&d, 2.0), 1.0);
        assert_relative_eq!(interpolate_at(&d, -1.0), -2.0);
        assert_relative_eq!(interpolate_at(&d, 4.0), -1.0);
        assert_relative_eq!(interpolate_at(&d, 1.0), 2.0);
    }

    #[test]
    fn test_resample_grid() {
        let out = resample(&data(), &ResampleOptions::with_step(0.5)).unwrap();
        assert_eq!(out.len(), 7);
        assert_relative_eq!(out[6].x, 3.0);
        assert_relative_eq!(out[3].y, 1.5);
    }

    #[test]
    fn test_resample_extrapolates() {
        let opts = ResampleOptions {
            step: 1.0,
            start: Some(-2.0),
            end: Some(5.0),
        };
        let out = resample(&data(), &opts).unwrap();
        assert_eq!(out.len(), 8);
        assert_relative_eq!(out[0].y, -4.0);
        assert_relative_eq!(out[7].y, -2.0);
    }

    #[test]
    fn test_resample_rejects_bad_step() {
        assert!(resample(&data(), &ResampleOptions::with_step(0.0)).is_err());
        assert!(resample(&data(), &ResampleOptions::with_step(f64::NAN)).is_err());
    }
}
