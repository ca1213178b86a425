//! # Uncertainty
//!
//! Profile-likelihood confidence intervals for fitted parameters. Each
//! interval end is where the chi-squared objective, with the other
//! parameters fixed, rises a configurable threshold above its minimum.
//! Ends that cannot be located are reported as infinite, with a warning,
//! rather than as errors.

mod confidence;

pub use confidence::{
    confidence_interval, confidence_intervals, BoundSide, ConfidenceInterval, IntervalConfig,
    IntervalWarning, DEFAULT_MAX_ITERATIONS, DEFAULT_THRESHOLD, DEFAULT_TOLERANCE,
};
