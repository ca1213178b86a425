//! # Parameters
//!
//! - [`Parameter`]: an adjustable scalar with an optional, sorted confidence interval
//! - [`Bounds`] and [`BoundsTransform`]: box constraints for the bound-constrained backend
//!
//! ```rust
//! use fitopt_rs::parameters::Parameter;
//!
//! let mut params = vec![Parameter::new(1.0), Parameter::new(0.5)];
//! params[1].set(0.75);
//! assert_eq!(params[1].value(), 0.75);
//! ```

pub mod bounds;
pub mod parameter;

pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::Parameter;

/// Collect the current values of a parameter slice in index order.
pub(crate) fn values(parameters: &[Parameter]) -> ndarray::Array1<f64> {
    parameters.iter().map(Parameter::value).collect()
}
