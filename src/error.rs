//! Error types for the fitopt-rs library.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`FitOptError`]. Non-convergence of a minimizer is not an error; it is
//! reported as a [`crate::optimizer::FitWarning`] instead.

use thiserror::Error;

use crate::parameters::BoundsError;

/// The main error type for the fitopt-rs library.
#[derive(Error, Debug)]
pub enum FitOptError {
    /// The requested algorithm name is not recognized.
    #[error("Unrecognized algorithm '{name}'; expected one of lm, simplex, cg, conjugate, powell, bfgs, newton, l-bfgs-b")]
    UnknownAlgorithm { name: String },

    /// A fit was requested without any adjustable parameters.
    #[error("At least one parameter is required")]
    NoParameters,

    /// Error when matrix dimensions don't match for an operation.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error when the fit or interval configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Error when an input value is invalid.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error from parameter bounds handling.
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    /// Too few observations to derive goodness-of-fit statistics.
    #[error("Insufficient data: {observations} observations cannot constrain {parameters} parameters")]
    InsufficientData {
        observations: usize,
        parameters: usize,
    },

    /// Error when the model function fails or produces invalid results.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Error when a minimizer fails without producing any usable point.
    #[error("Optimization failed: {0}")]
    OptimizationFailure(String),

    /// Error from JSON serialization/deserialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FitOptError {
    /// Returns true for errors raised while validating a request, before any
    /// model evaluation takes place.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FitOptError::UnknownAlgorithm { .. }
                | FitOptError::NoParameters
                | FitOptError::DimensionMismatch(_)
                | FitOptError::InvalidConfiguration(_)
                | FitOptError::Bounds(_)
                | FitOptError::JsonError(_)
        )
    }
}

/// Convenient Result type alias for fitopt-rs operations.
pub type Result<T> = std::result::Result<T, FitOptError>;
