//! Error types for cvxfolio.

use thiserror::Error;

/// Error type for modeling and portfolio operations.
///
/// Solver outcomes such as infeasibility are not errors at the portfolio
/// level; they are reported through `SolveResult::status`.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Problem is not DCP-compliant.
    #[error("Problem is not DCP: {0}")]
    NotDcp(String),

    /// Solver error.
    #[error("Solver error: {0}")]
    SolverError(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Invalid problem specification.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Malformed, empty or misaligned return data.
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Out-of-domain scalar parameter.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Failure reading from a historical data source.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Malformed engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FolioError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        FolioError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for FolioError {
    fn from(e: csv::Error) -> Self {
        FolioError::DataSource(e.to_string())
    }
}

impl From<std::io::Error> for FolioError {
    fn from(e: std::io::Error) -> Self {
        FolioError::DataSource(e.to_string())
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        FolioError::Config(e.to_string())
    }
}

/// Result type for cvxfolio operations.
pub type Result<T> = std::result::Result<T, FolioError>;
