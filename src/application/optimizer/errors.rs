//! Optimizer error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::opportunity::DecodeError;
use crate::domain::resilience::CircuitOpenError;

/// Errors that abort a whole run.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Missing or rejected credentials. Retrying will not help.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid optimization config: {0}")]
    InvalidConfig(String),
}

/// Errors that abort one iteration. The run continues with the next one.
#[derive(Debug, Error)]
pub enum IterationError {
    #[error("suggestion generation failed: {0}")]
    Generator(String),

    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    #[error("generator output could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    /// The bulk metrics request failed; the batch is discarded.
    #[error("keyword validation failed: {0}")]
    ValidationBatch(String),
}

impl IterationError {
    pub fn kind(&self) -> IterationFailureKind {
        match self {
            IterationError::Generator(_) => IterationFailureKind::Generator,
            IterationError::CircuitOpen(_) => IterationFailureKind::CircuitOpen,
            IterationError::Decode(_) => IterationFailureKind::Decode,
            IterationError::ValidationBatch(_) => IterationFailureKind::ValidationBatch,
        }
    }
}

/// How an iteration ended when it did not produce a result.
#[derive(Debug)]
pub(crate) enum IterationOutcomeError {
    /// Aborts the run.
    Fatal(OptimizerError),
    /// Recorded, then the run moves on.
    Iteration(IterationError),
}

impl From<IterationError> for IterationOutcomeError {
    fn from(e: IterationError) -> Self {
        IterationOutcomeError::Iteration(e)
    }
}

/// Category of an isolated iteration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationFailureKind {
    Generator,
    CircuitOpen,
    Decode,
    ValidationBatch,
}

impl IterationFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationFailureKind::Generator => "generator",
            IterationFailureKind::CircuitOpen => "circuit_open",
            IterationFailureKind::Decode => "decode",
            IterationFailureKind::ValidationBatch => "validation_batch",
        }
    }
}
