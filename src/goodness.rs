//! Goodness-of-fit statistics.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{FitOptError, Result};

/// Residuals at the solution with the derived fit statistics.
///
/// Serializes with the keys `"residuals"`, `"Reduced Chi2"` and `"RMS error"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    /// `observed - model` at the solution, without weights
    pub residuals: Array1<f64>,

    /// Minimum objective per degree of freedom
    #[serde(rename = "Reduced Chi2")]
    pub reduced_chi2: f64,

    /// Square root of the sum of squared residuals
    #[serde(rename = "RMS error")]
    pub rms_error: f64,
}

/// Compute the fit statistics.
///
/// `reduced_chi2 = minimum_objective / (residuals.len() - n_parameters)` and
/// `rms_error = sqrt(sum(residuals^2))`.
///
/// # Errors
///
/// [`FitOptError::InsufficientData`] if there are no more residuals than
/// parameters, as the reduced chi-squared is undefined.
///
/// ```
/// use fitopt_rs::goodness_of_fit;
/// use ndarray::array;
///
/// let gof = goodness_of_fit(array![3.0, -4.0, 0.0], 10.0, 1).unwrap();
/// assert_eq!(gof.reduced_chi2, 5.0);
/// assert_eq!(gof.rms_error, 5.0);
/// assert!(goodness_of_fit(array![1.0], 1.0, 1).is_err());
/// ```
pub fn goodness_of_fit(
    residuals: Array1<f64>,
    minimum_objective: f64,
    n_parameters: usize,
) -> Result<GoodnessOfFit> {
    let observations = residuals.len();
    if observations <= n_parameters {
        return Err(FitOptError::InsufficientData {
            observations,
            parameters: n_parameters,
        });
    }

    let dof = (observations - n_parameters) as f64;
    let rms_error = residuals.dot(&residuals).sqrt();

    Ok(GoodnessOfFit {
        residuals,
        reduced_chi2: minimum_objective / dof,
        rms_error,
    })
}
