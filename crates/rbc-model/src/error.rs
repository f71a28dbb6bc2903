//! Error types for rbc-model.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("body {body} has parent {parent}, parents must precede their children")]
    InvalidParent { body: usize, parent: i32 },

    #[error("body {body} references joint {joint}, model has {njoints} joints")]
    InvalidJointIndex {
        body: usize,
        joint: usize,
        njoints: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
