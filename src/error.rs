//! Error types for the training core
//!
//! All fatal conditions surface as a [`TrainError`] variant naming the
//! violated invariant. Checkpoint I/O goes through `anyhow` at the mode
//! layer instead, because a failed write is survivable (training continues
//! without durability).

use thiserror::Error;

/// Errors raised by the training core.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Observation or action dimensions disagree with the declared spaces.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A batch was requested from a replay buffer that holds fewer entries.
    ///
    /// Callers respect the warm-up gating, so hitting this is a logic error.
    #[error("replay buffer underflow: requested {requested}, only {available} stored")]
    BufferUnderflow { requested: usize, available: usize },

    /// A loss became NaN or infinite; the run halts rather than training on
    /// corrupted weights.
    #[error("numeric divergence: {quantity} is not finite")]
    NumericDivergence { quantity: &'static str },

    /// The underlying environment failed during step or reset. The run
    /// aborts; environment state after a failure is undefined.
    #[error("environment failure: {0}")]
    Environment(String),

    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underflow_message_names_counts() {
        let err = TrainError::BufferUnderflow {
            requested: 256,
            available: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("256"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_divergence_message_names_quantity() {
        let err = TrainError::NumericDivergence {
            quantity: "critic loss",
        };
        assert!(err.to_string().contains("critic loss"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = TrainError::ShapeMismatch("expected [3, 40, 40], got [1, 40, 40]".to_string());
        assert!(err.to_string().starts_with("shape mismatch"));
    }
}
