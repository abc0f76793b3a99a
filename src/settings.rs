//! Persistable fit configuration.
//!
//! [`FitSettings`] bundles everything needed to reproduce a fit from raw
//! data: the preparation pipeline, the baseline and the optimizer settings.
//! Missing fields in a JSON document take their defaults.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::baseline::BaselineOptions;
use crate::error::Result;
use crate::fit::PeakFitter;
use crate::lm::LmConfig;
use crate::processing::ProcessingOptions;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    pub processing: ProcessingOptions,
    pub baseline: BaselineOptions,
    pub optimizer: LmConfig,
}

impl FitSettings {
    /// Parse settings from a JSON string.
    ///
    /// # Examples
    ///
    /// ```
    /// use peakfit_rs::settings::FitSettings;
    /// use peakfit_rs::baseline::BaselineMethod;
    ///
    /// let json = r#"{
    ///   "baseline": { "method": "asls", "asls": { "lambda": 1e6 } },
    ///   "optimizer": { "max_iterations": 50 }
    /// }"#;
    ///
    /// let settings = FitSettings::from_json_str(json).unwrap();
    /// assert_eq!(settings.baseline.method, BaselineMethod::Asls);
    /// assert_eq!(settings.baseline.asls.p, 0.01);
    /// assert_eq!(settings.optimizer.max_iterations, 50);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json_str(&contents)
    }

    /// Pretty-printed JSON representation.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save settings to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// A fitter configured with these baseline and optimizer settings.
    pub fn fitter(&self) -> PeakFitter {
        PeakFitter::new()
            .with_config(self.optimizer.clone())
            .with_baseline_options(self.baseline.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{BaselineMethod, ManualInterpolation};
    use crate::processing::{CropRange, OutlierMethod};
    use crate::sample::Sample;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(FitSettings::from_json_str("{}").unwrap(), FitSettings::default());
    }

    #[test]
    fn test_round_trip() {
        let mut settings = FitSettings::default();
        settings.processing.crop = Some(CropRange::new(1.0, 9.0));
        settings.processing.outliers.method = OutlierMethod::Iqr;
        settings.baseline = BaselineOptions::new(BaselineMethod::Manual).with_calc_range(2.0, 8.0);
        settings.baseline.manual.points = vec![Sample::new(2.0, 0.5), Sample::new(8.0, 1.5)];
        settings.baseline.manual.interpolation = ManualInterpolation::Spline;
        settings.optimizer.tolerance = 1e-10;

        let json = settings.to_json_string().unwrap();
        assert_eq!(FitSettings::from_json_str(&json).unwrap(), settings);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("peakfit-settings-{}.json", std::process::id()));
        let mut settings = FitSettings::default();
        settings.baseline.method = BaselineMethod::Shirley;
        settings.save_json(&path).unwrap();

        let loaded = FitSettings::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_errors() {
        assert!(FitSettings::from_json_str("{ not json").is_err());
        assert!(FitSettings::from_json_file("/nonexistent/peakfit/settings.json").is_err());
    }

    #[test]
    fn test_fitter_uses_settings() {
        let mut settings = FitSettings::default();
        settings.baseline.method = BaselineMethod::Linear;
        let fitter = settings.fitter();
        assert_eq!(fitter.baseline_options().method, BaselineMethod::Linear);
    }
}
