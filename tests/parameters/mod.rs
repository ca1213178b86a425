//! Integration tests for the parameter system
//!
//! These tests verify that parameters and bounds behave correctly in various scenarios.

// Tests for the Parameter struct
mod parameter_tests;

// Tests for Bounds and BoundsTransform
mod bounds_tests;
