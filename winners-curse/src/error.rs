//! Error taxonomy for the simulation engine.
use thiserror::Error;

/// Errors raised when simulation inputs violate engine invariants.
///
/// Input problems are detected before any random draw is made, so a failed
/// call never advances the caller's generator. `NonFiniteTruth` is the
/// exception: it is raised after selection, for models whose truth cannot
/// be checked up front.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("{what} has length {actual}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("iteration count must be positive (got {0})")]
    InvalidIterationCount(usize),
    #[error("candidate set is empty")]
    EmptyCandidates,
    #[error("noise level list is empty")]
    EmptyNoiseLevels,
    #[error("outcome sequence is empty")]
    EmptyOutcomes,
    #[error("score at index {index} is not a number")]
    NonFiniteScore { index: usize },
    #[error("true value of candidate {index} is not finite")]
    NonFiniteTruth { index: usize },
    #[error("{field} = {value} is invalid: {reason}")]
    InvalidParameter {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl SimulationError {
    pub(crate) const fn invalid(field: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            field,
            value,
            reason,
        }
    }

    pub(crate) fn check_len(
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}
