//! Error types for the pricing core.
//!
//! Structural failures (bad inputs, an engine asked for something it cannot
//! price) are reported through [`PricingError`]. Numerical oddities that leave
//! the arithmetic well defined are reported separately as [`NumericAnomaly`]
//! and never abort a pricing call.

use std::fmt;

use thiserror::Error;

use crate::pricing::types::ExerciseStyle;

/// The error type returned by constructors, engines and configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    /// A contract or market value violated one of its invariants.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The engine has no method for the requested exercise style.
    #[error("{engine} engine cannot price {style} options")]
    UnsupportedConfiguration {
        /// Name of the engine that rejected the request.
        engine: &'static str,
        /// The exercise style it was asked to price.
        style: ExerciseStyle,
    },

    /// A pricer configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The lattice ran past its deadline before reaching the root node.
    #[error("lattice deadline exceeded after {completed_layers} of {steps} layers")]
    DeadlineExceeded {
        /// Backward-induction layers finished before the check fired.
        completed_layers: usize,
        /// Total number of layers in the tree.
        steps: usize,
    },
}

/// Shorthand `Result` used throughout the crate.
pub type Result<T, E = PricingError> = std::result::Result<T, E>;

/// Returns `Err(PricingError::InvalidParameter(..))` when the condition is false.
macro_rules! require {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::error::PricingError::InvalidParameter(format!($($msg)*)));
        }
    };
}

pub(crate) use require;

/// Advisory numeric conditions. The engines still return a number when one
/// of these is detected; callers decide whether to trust it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericAnomaly {
    /// Lattice risk-neutral up-probability fell outside `[0, 1]` (or is not finite).
    ProbabilityOutOfRange {
        /// The offending probability.
        p: f64,
    },
    /// `σ·√T` is zero on an unexpired contract, so `d1`/`d2` are undefined.
    DegenerateDiffusion,
}

impl fmt::Display for NumericAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericAnomaly::ProbabilityOutOfRange { p } => {
                write!(f, "risk-neutral probability {p} is outside [0, 1]")
            }
            NumericAnomaly::DegenerateDiffusion => {
                write!(f, "zero diffusion (sigma * sqrt(T) = 0) before expiry")
            }
        }
    }
}
