//! Error types for rbc-rigid.

use rbc_model::ModelError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("matrix is not positive definite: pivot {pivot:e} at index {index}")]
    NotPositiveDefinite { index: usize, pivot: f64 },

    #[error("engine was sized for {expected} {what}, model has {got}")]
    EngineMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, DynamicsError>;
