use thiserror::Error;

/// Error types for the peakfit-rs library.
///
/// Only broken call contracts end up here. Numerical trouble during a fit
/// (singular steps, non-convergence, degenerate data) is reported through
/// the returned values instead.
#[derive(Error, Debug)]
pub enum PeakFitError {
    /// Error indicating a mismatch in array or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Error for invalid option or parameter values.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during model function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for peakfit-rs operations.
pub type Result<T> = std::result::Result<T, PeakFitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PeakFitError::DimensionMismatch("expected 3 values, got 2".to_string());
        assert!(format!("{}", err).contains("expected 3 values, got 2"));

        let err = PeakFitError::InvalidParameter("window length must be odd".to_string());
        assert!(format!("{}", err).contains("window length must be odd"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PeakFitError = io_err.into();

        match err {
            PeakFitError::IoError(_) => (),
            _ => panic!("Expected IoError variant"),
        }

        let json_err = serde_json::from_str::<f64>("not json").unwrap_err();
        let err: PeakFitError = json_err.into();
        assert!(matches!(err, PeakFitError::JsonError(_)));
    }
}
