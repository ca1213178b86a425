//! # Fitting
//!
//! [`fit`] is the main entry point: it validates a request, runs the selected
//! minimizer on the weighted chi-squared objective, writes the solution back
//! into the caller's parameters and reports goodness-of-fit statistics.
//!
//! ```
//! use fitopt_rs::{fit, Arguments, FitConfig, ModelFunction, Parameter};
//! use ndarray::array;
//!
//! let model = ModelFunction::single(|p, x| x.mapv(|x| p[0] * (-p[1] * x).exp()));
//! let x = array![0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
//! let y = x.mapv(|x: f64| 4.0 * (-1.3 * x).exp());
//!
//! let mut params = vec![Parameter::new(1.0), Parameter::new(0.5)];
//! let result = fit(&model, &mut params, &y, &Arguments::from(x), &FitConfig::default())
//!     .unwrap()
//!     .into_fitted()
//!     .unwrap();
//!
//! assert!((params[0].value() - 4.0).abs() < 1e-6);
//! assert!((params[1].value() - 1.3).abs() < 1e-6);
//! assert!(result.reduced_chi2() < 1e-12);
//! ```

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{FitOptError, Result};
use crate::goodness::{goodness_of_fit, GoodnessOfFit};
use crate::model::{Arguments, ModelFunction};
use crate::optimizer::{self, Algorithm, AlgorithmOptions, FitWarning, RawOutput, Termination};
use crate::parameters::{self, Parameter};
use crate::residuals::WeightedResiduals;

/// How a fit is run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Minimizer to use; Levenberg-Marquardt by default.
    pub algorithm: Algorithm,

    /// Per-observation weights; all ones if `None`.
    pub weights: Option<Array1<f64>>,

    /// Return the minimizer's native result instead of a [`FitResult`].
    ///
    /// In this mode the parameters are left untouched and no goodness-of-fit
    /// statistics are computed.
    pub raw_output: bool,

    /// Backend settings.
    pub options: AlgorithmOptions,
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Select the algorithm by name, e.g. `"simplex"` or `"l-bfgs-b"`.
    ///
    /// # Errors
    ///
    /// [`FitOptError::UnknownAlgorithm`] if the name is not recognized.
    pub fn with_algorithm_name(mut self, name: &str) -> Result<Self> {
        self.algorithm = name.parse()?;
        Ok(self)
    }

    pub fn with_weights(mut self, weights: Array1<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_raw_output(mut self, raw_output: bool) -> Self {
        self.raw_output = raw_output;
        self
    }

    pub fn with_options(mut self, options: AlgorithmOptions) -> Self {
        self.options = options;
        self
    }
}

/// A completed fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// The parameters holding their fitted values
    pub parameters: Vec<Parameter>,

    pub goodness: GoodnessOfFit,

    /// Weighted chi-squared at the solution
    pub minimum_objective: f64,

    pub algorithm: Algorithm,

    pub termination: Termination,

    /// Non-convergence reports; empty when the minimizer converged
    pub warnings: Vec<FitWarning>,
}

impl FitResult {
    /// Unweighted residuals at the solution.
    pub fn residuals(&self) -> &Array1<f64> {
        &self.goodness.residuals
    }

    pub fn reduced_chi2(&self) -> f64 {
        self.goodness.reduced_chi2
    }

    pub fn rms_error(&self) -> f64 {
        self.goodness.rms_error
    }

    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}

/// What [`fit`] returns, depending on [`FitConfig::raw_output`].
#[derive(Debug, Clone)]
pub enum FitOutput {
    Fitted(FitResult),
    Raw(RawOutput),
}

impl FitOutput {
    pub fn into_fitted(self) -> Option<FitResult> {
        match self {
            FitOutput::Fitted(result) => Some(result),
            FitOutput::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<RawOutput> {
        match self {
            FitOutput::Raw(raw) => Some(raw),
            FitOutput::Fitted(_) => None,
        }
    }
}

/// Fit `model` to `observed` by adjusting `parameters`.
///
/// The flat parameter vector handed to the model follows the order of the
/// `parameters` slice. On success the fitted values are written back into
/// `parameters`; a minimizer that stops without converging still yields its
/// best point, together with a [`FitWarning`] in the result.
///
/// # Arguments
///
/// * `model` - The model function
/// * `parameters` - Initial guesses, updated in place with the fitted values
/// * `observed` - One observed value per data point
/// * `arguments` - Independent variables, matching the model's calling convention
/// * `config` - Algorithm, weights and backend options
///
/// # Errors
///
/// Configuration errors are reported before the model is evaluated, and
/// leave `parameters` untouched. Model failures during the minimization are
/// propagated. With fewer observations than parameters plus one, the result
/// is [`FitOptError::InsufficientData`] unless raw output was requested.
pub fn fit(
    model: &ModelFunction,
    parameters: &mut [Parameter],
    observed: &Array1<f64>,
    arguments: &Arguments,
    config: &FitConfig,
) -> Result<FitOutput> {
    let n_params = parameters.len();
    let residuals =
        WeightedResiduals::new(model, observed, arguments, config.weights.as_ref(), n_params)?;
    config.options.validate(config.algorithm, n_params)?;
    if !config.raw_output && observed.len() <= n_params {
        return Err(FitOptError::InsufficientData {
            observations: observed.len(),
            parameters: n_params,
        });
    }

    let x0 = parameters::values(parameters);
    let raw = optimizer::minimize(config.algorithm, &residuals, &x0, &config.options)?;
    if config.raw_output {
        return Ok(FitOutput::Raw(raw));
    }

    let outcome = raw.outcome();
    let mut warnings = Vec::new();
    if !outcome.termination.is_converged() {
        let warning = FitWarning {
            algorithm: config.algorithm,
            termination: outcome.termination.clone(),
        };
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    for (param, &value) in parameters.iter_mut().zip(outcome.solution.iter()) {
        param.set(value);
    }

    let goodness = goodness_of_fit(
        residuals.unweighted(&outcome.solution)?,
        outcome.objective,
        n_params,
    )?;
    log::debug!(
        "{} fit finished: chi2 {:e}, reduced chi2 {:e}",
        config.algorithm.label(),
        outcome.objective,
        goodness.reduced_chi2
    );

    Ok(FitOutput::Fitted(FitResult {
        parameters: parameters.to_vec(),
        goodness,
        minimum_objective: outcome.objective,
        algorithm: config.algorithm,
        termination: outcome.termination,
        warnings,
    }))
}
