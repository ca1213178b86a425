//! # fitopt-rs
//!
//! `fitopt-rs` fits user-supplied model functions to observed data by
//! minimizing a weighted sum of squared residuals.
//!
//! The library provides:
//! - A choice of seven minimizers behind one selector: Levenberg-Marquardt
//!   (the default), Nelder-Mead simplex, nonlinear conjugate gradient,
//!   Powell, BFGS, Newton-CG and bound-constrained L-BFGS
//! - Goodness-of-fit statistics (residuals, reduced chi-squared, RMS error)
//! - Profile-likelihood confidence intervals for individual parameters
//!
//! ## Basic Usage
//!
//! ```
//! use fitopt_rs::{confidence_interval, fit, Arguments, FitConfig, IntervalConfig};
//! use fitopt_rs::{ModelFunction, Parameter};
//! use ndarray::array;
//!
//! let model = ModelFunction::single(|p, x| x * p[0]);
//! let x = array![0.0, 1.0, 2.0, 3.0, 4.0];
//! let y = &x * 1.5;
//! let args = Arguments::from(x);
//!
//! let mut params = vec![Parameter::new(2.0)];
//! let config = FitConfig::new().with_algorithm_name("bfgs").unwrap();
//! let result = fit(&model, &mut params, &y, &args, &config)
//!     .unwrap()
//!     .into_fitted()
//!     .unwrap();
//! assert!((params[0].value() - 1.5).abs() < 1e-6);
//! assert!(result.warnings.is_empty());
//!
//! let ci = confidence_interval(&model, &y, &args, &mut params, 0, &IntervalConfig::default())
//!     .unwrap();
//! assert!(ci.lower < 1.5 && 1.5 < ci.upper);
//! ```

pub mod error;
pub mod fit;
pub mod goodness;
pub mod lm;
pub mod model;
pub mod optimizer;
pub mod parameters;
pub mod problem;
pub mod residuals;
pub mod uncertainty;

mod utils;

// Re-exports for convenience
pub use error::{FitOptError, Result};
pub use fit::{fit, FitConfig, FitOutput, FitResult};
pub use goodness::{goodness_of_fit, GoodnessOfFit};
pub use lm::LevenbergMarquardt;
pub use model::{Arguments, CallingConvention, ModelFunction};
pub use optimizer::{Algorithm, AlgorithmOptions, FitWarning, RawOutput, Termination};
pub use parameters::{Bounds, Parameter};
pub use problem::Problem;
pub use residuals::WeightedResiduals;
pub use uncertainty::{confidence_interval, confidence_intervals, ConfidenceInterval, IntervalConfig};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
