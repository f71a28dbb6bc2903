//! Error types for rbc-control.

use rbc_model::ModelError;
use rbc_rigid::DynamicsError;
use thiserror::Error;

/// Failures of a feedback term.
///
/// Numeric failures ("wrong number") leave the previous command in place and
/// can be retried next cycle. A [`ControlError::PassivityViolation`] means the
/// command could inject energy into the mechanism: actuation must stop.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("dynamics error: {0}")]
    Dynamics(#[from] DynamicsError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("mass matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("feedback gain K + C is singular")]
    SingularGain,

    #[error("saturation did not converge after {iterations} iterations (worst excess {excess})")]
    SaturationNotConverged { iterations: usize, excess: f64 },

    #[error("saturation lowered P·s from {before} to {after}")]
    PassivityViolation { before: f64, after: f64 },

    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

impl ControlError {
    /// Whether emitting a command after this error would be unsafe.
    pub fn is_safety_fault(&self) -> bool {
        matches!(self, ControlError::PassivityViolation { .. })
    }
}

impl From<ModelError> for ControlError {
    fn from(err: ModelError) -> Self {
        ControlError::Dynamics(DynamicsError::Model(err))
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ControlError>;
