//! Integration tests for uncertainty quantification

// Profile-likelihood confidence intervals after a fit
mod confidence_intervals_tests;
