//! Error types for mlpeval.
//!
//! Construction problems are reported as [`ConfigError`]; evaluation wraps
//! them in [`MlpError`] next to dimension mismatches. Neither is recoverable
//! locally: a caller should abort the solve rather than continue with
//! numbers from a half-built or mis-fed network.
//!
//! Two outcomes are deliberately not errors: a failed variable match is a
//! [`MatchResult`](crate::MatchResult) with `is_match == false`, and an input
//! outside its trust region is an [`ExtrapolationWarning`].
//!
//! # Example
//!
//! ```rust
//! use mlpeval::MlpError;
//!
//! fn check_inputs(expected: usize, got: &[f64]) -> Result<(), MlpError> {
//!     if got.len() != expected {
//!         return Err(MlpError::dimension_mismatch("network inputs", expected, got.len()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_inputs(2, &[1.0]).is_err());
//! ```

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;

/// Unified error type for network evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MlpError {
    /// Malformed or incomplete architecture.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A caller-provided vector or buffer has the wrong length.
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Which buffer was checked.
        context: &'static str,
        /// Length the network requires.
        expected: usize,
        /// Length received.
        got: usize,
    },
}

/// Result type alias for mlpeval operations.
pub type MlpResult<T> = Result<T, MlpError>;

impl MlpError {
    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, got: usize) -> Self {
        MlpError::DimensionMismatch {
            context,
            expected,
            got,
        }
    }

    /// True for construction-time errors.
    pub fn is_config(&self) -> bool {
        matches!(self, MlpError::Config(_))
    }
}

/// An input that lies outside the trust region of its normalization.
///
/// Evaluation still proceeds; the result is just less trustworthy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrapolationWarning {
    /// Network input index.
    pub input: usize,
    /// Network input name.
    pub name: String,
    /// Raw value supplied.
    pub value: f64,
}

impl fmt::Display for ExtrapolationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input {} ('{}') = {} is outside the trust region",
            self.input, self.name, self.value
        )
    }
}
