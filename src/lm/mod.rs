//! Levenberg-Marquardt algorithm implementation.
//!
//! Damped Gauss-Newton steps on the vector residual, with the damping raised
//! on rejected steps and lowered on accepted ones.

pub mod algorithm;
pub mod config;
pub mod convergence;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::{DecompositionMethod, LmConfig};
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
