//! Error types for the enercast engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while training models or detecting anomalies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Not enough data points to satisfy a window or training requirement.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Predict or detect was called before train.
    #[error("model must be trained before use")]
    ModelNotTrained,

    /// Non-finite values appeared during training.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// A time or memory budget was exceeded.
    #[error("resource budget exceeded: {0}")]
    ResourceExhausted(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// A named forecast tier or anomaly detector failed.
    #[error("{method}: {source}")]
    MethodFailed {
        method: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Wrap this error with the name of the tier or detector that raised it.
    pub fn in_method(self, method: impl Into<String>) -> Self {
        EngineError::MethodFailed {
            method: method.into(),
            source: Box::new(self),
        }
    }
}
