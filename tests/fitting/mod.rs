//! Integration tests for curve fitting
//!
//! These tests run every minimizer through the public `fit` entry point.

// Every algorithm on the same problems
mod algorithms;

// Weights and goodness-of-fit statistics
mod weights;

// Algorithm options, raw output and error reporting
mod options;
