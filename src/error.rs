//! Loop-level error types.
//!
//! Partition, ranking, and driver failures surface as [`LoopError`]
//! variants so callers can match on what went wrong. Model-side causes
//! cross the capability seam as `anyhow` errors and arrive here through
//! [`LoopError::ModelFailure`] with the failing operation named.

use std::fmt;

pub type LoopResult<T> = Result<T, LoopError>;

/// Everything that can stop an active-learning run.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopError {
    /// A hyperparameter is outside its valid range
    InvalidConfiguration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// A pool position passed to a labelling operation does not exist
    PoolIndexOutOfRange { index: usize, pool_size: usize },

    /// A collaborator returned a different number of items than the pool holds
    CountMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    /// The heuristic produced a ranking that is not a pool permutation
    InvalidRanking { details: String },

    /// A labelled set or pool was empty where items were required
    EmptyCollection { collection: String },

    /// A model capability failed mid-step; fatal for the run
    ModelFailure { operation: String, details: String },
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::InvalidConfiguration {
                parameter,
                value,
                reason,
            } => {
                write!(
                    f,
                    "invalid hyperparameter '{}' (value '{}'): {}",
                    parameter, value, reason
                )
            }
            LoopError::PoolIndexOutOfRange { index, pool_size } => {
                write!(
                    f,
                    "pool position {} does not exist; the pool holds {} items",
                    index, pool_size
                )
            }
            LoopError::CountMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "{} returned {} items where {} were expected",
                    context, got, expected
                )
            }
            LoopError::InvalidRanking { details } => {
                write!(f, "ranking violates the heuristic contract: {}", details)
            }
            LoopError::EmptyCollection { collection } => {
                write!(f, "{} holds no items", collection)
            }
            LoopError::ModelFailure { operation, details } => {
                write!(
                    f,
                    "model {} failed: {}; the run is aborted without partial-state recovery",
                    operation, details
                )
            }
        }
    }
}

impl std::error::Error for LoopError {}

impl LoopError {
    pub fn invalid_config(
        parameter: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        LoopError::InvalidConfiguration {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn pool_index_out_of_range(index: usize, pool_size: usize) -> Self {
        LoopError::PoolIndexOutOfRange { index, pool_size }
    }

    pub fn count_mismatch(expected: usize, got: usize, context: impl Into<String>) -> Self {
        LoopError::CountMismatch {
            expected,
            got,
            context: context.into(),
        }
    }

    pub fn invalid_ranking(details: impl Into<String>) -> Self {
        LoopError::InvalidRanking {
            details: details.into(),
        }
    }

    pub fn empty_collection(collection: impl Into<String>) -> Self {
        LoopError::EmptyCollection {
            collection: collection.into(),
        }
    }

    /// Wraps any displayable model-side cause, naming the failed operation.
    pub fn model_failure(operation: impl Into<String>, details: impl fmt::Display) -> Self {
        LoopError::ModelFailure {
            operation: operation.into(),
            details: details.to_string(),
        }
    }
}
