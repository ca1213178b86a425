//! # Optimizer dispatch
//!
//! Seven minimizers behind one selector. Levenberg-Marquardt works on the
//! weighted residual vector; every other backend minimizes the scalar
//! chi-squared objective with finite-difference derivatives.
//!
//! | name                 | [`Algorithm`]                     | engine                             |
//! |----------------------|-----------------------------------|------------------------------------|
//! | `lm` (default)       | [`Algorithm::LevenbergMarquardt`] | [`crate::lm::LevenbergMarquardt`]  |
//! | `simplex`            | [`Algorithm::Simplex`]            | argmin `NelderMead`                |
//! | `cg`, `conjugate`    | [`Algorithm::ConjugateGradient`]  | argmin `NonlinearConjugateGradient`|
//! | `powell`             | [`Algorithm::Powell`]             | in-crate direction set method      |
//! | `bfgs`               | [`Algorithm::Bfgs`]               | argmin `BFGS`                      |
//! | `newton`             | [`Algorithm::NewtonCg`]           | argmin `NewtonCG`                  |
//! | `l-bfgs-b`           | [`Algorithm::LBfgsB`]             | argmin `LBFGS` on bounded coordinates |
//!
//! Each backend returns its own [`RawOutput`] shape; [`RawOutput::outcome`]
//! normalizes it to an [`Outcome`].

mod bfgs;
mod conjugate_gradient;
mod lbfgsb;
mod levenberg_marquardt;
mod newton_cg;
mod objective;
mod powell;
mod raw;
mod simplex;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FitOptError, Result};
use crate::lm::DecompositionMethod;
use crate::parameters::Bounds;
use crate::residuals::WeightedResiduals;

pub use raw::{
    BfgsOutput, ConjugateGradientOutput, LbfgsbInfo, LbfgsbOutput, NewtonCgOutput, PowellOutput,
    RawOutput, SimplexOutput,
};

/// Default tolerance on the gradient norm for gradient-based backends.
pub const DEFAULT_GTOL: f64 = 1e-5;

/// Default tolerance on the change in the objective.
pub const DEFAULT_FTOL: f64 = 1e-10;

/// Default tolerance on the change in parameter values.
pub const DEFAULT_XTOL: f64 = 1e-8;

/// The minimization algorithm used by a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    LevenbergMarquardt,
    Simplex,
    ConjugateGradient,
    Powell,
    Bfgs,
    NewtonCg,
    LBfgsB,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::LevenbergMarquardt,
        Algorithm::Simplex,
        Algorithm::ConjugateGradient,
        Algorithm::Powell,
        Algorithm::Bfgs,
        Algorithm::NewtonCg,
        Algorithm::LBfgsB,
    ];

    /// Resolve an optional algorithm name; `None` selects Levenberg-Marquardt.
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        name.map_or(Ok(Algorithm::default()), str::parse)
    }

    /// The canonical selector name, e.g. `"l-bfgs-b"`.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::LevenbergMarquardt => "lm",
            Algorithm::Simplex => "simplex",
            Algorithm::ConjugateGradient => "cg",
            Algorithm::Powell => "powell",
            Algorithm::Bfgs => "bfgs",
            Algorithm::NewtonCg => "newton",
            Algorithm::LBfgsB => "l-bfgs-b",
        }
    }

    /// Human-readable name used in warnings.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::LevenbergMarquardt => "Levenberg-Marquardt",
            Algorithm::Simplex => "Simplex",
            Algorithm::ConjugateGradient => "Conjugate Gradient",
            Algorithm::Powell => "Powell",
            Algorithm::Bfgs => "BFGS",
            Algorithm::NewtonCg => "Newton-CG",
            Algorithm::LBfgsB => "L-BFGS-B",
        }
    }
}

impl FromStr for Algorithm {
    type Err = FitOptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lm" => Ok(Algorithm::LevenbergMarquardt),
            "simplex" => Ok(Algorithm::Simplex),
            "cg" | "conjugate" => Ok(Algorithm::ConjugateGradient),
            "powell" => Ok(Algorithm::Powell),
            "bfgs" => Ok(Algorithm::Bfgs),
            "newton" => Ok(Algorithm::NewtonCg),
            "l-bfgs-b" => Ok(Algorithm::LBfgsB),
            _ => Err(FitOptError::UnknownAlgorithm { name: s.to_string() }),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backend settings. Options a backend does not understand are rejected.
///
/// ```
/// use fitopt_rs::optimizer::AlgorithmOptions;
///
/// let options = AlgorithmOptions::from_json(r#"{"max_evaluations": 500, "ftol": 1e-12}"#).unwrap();
/// assert_eq!(options.max_evaluations, Some(500));
/// assert!(AlgorithmOptions::from_json(r#"{"maxfun": 500}"#).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlgorithmOptions {
    /// Iteration cap.
    pub max_iterations: Option<u64>,

    /// Cap on objective evaluations, finite-difference steps included.
    pub max_evaluations: Option<usize>,

    /// Tolerance on parameter changes.
    pub xtol: Option<f64>,

    /// Tolerance on objective changes.
    pub ftol: Option<f64>,

    /// Tolerance on the gradient norm.
    pub gtol: Option<f64>,

    /// One box constraint per parameter (`l-bfgs-b` only).
    pub bounds: Option<Vec<Bounds>>,

    /// Number of correction pairs kept (`l-bfgs-b` only).
    pub memory: Option<usize>,

    /// Relative size of the initial simplex (`simplex` only).
    pub initial_step: Option<f64>,

    /// Linear solver for the damped step (`lm` only).
    pub decomposition: Option<DecompositionMethod>,
}

impl AlgorithmOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = Some(xtol);
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = Some(ftol);
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = Some(gtol);
        self
    }

    pub fn with_bounds(mut self, bounds: Vec<Bounds>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = Some(initial_step);
        self
    }

    pub fn with_decomposition(mut self, decomposition: DecompositionMethod) -> Self {
        self.decomposition = Some(decomposition);
        self
    }

    /// Check the options against the selected backend and parameter count.
    pub fn validate(&self, algorithm: Algorithm, n_params: usize) -> Result<()> {
        let exclusive = [
            ("bounds", self.bounds.is_some(), Algorithm::LBfgsB),
            ("memory", self.memory.is_some(), Algorithm::LBfgsB),
            ("initial_step", self.initial_step.is_some(), Algorithm::Simplex),
            ("decomposition", self.decomposition.is_some(), Algorithm::LevenbergMarquardt),
        ];
        for (option, present, owner) in exclusive {
            if present && algorithm != owner {
                return Err(FitOptError::InvalidConfiguration(format!(
                    "option '{}' is only accepted by '{}', not '{}'",
                    option, owner, algorithm
                )));
            }
        }

        for (option, value) in [("xtol", self.xtol), ("ftol", self.ftol), ("gtol", self.gtol)] {
            if let Some(tol) = value {
                if !tol.is_finite() || tol < 0.0 {
                    return Err(FitOptError::InvalidConfiguration(format!(
                        "{} must be a finite non-negative number, got {}",
                        option, tol
                    )));
                }
            }
        }

        if self.max_evaluations == Some(0) {
            return Err(FitOptError::InvalidConfiguration(
                "max_evaluations must be at least 1".to_string(),
            ));
        }
        if self.memory == Some(0) {
            return Err(FitOptError::InvalidConfiguration(
                "memory must be at least 1".to_string(),
            ));
        }
        if let Some(step) = self.initial_step {
            if !step.is_finite() || step == 0.0 {
                return Err(FitOptError::InvalidConfiguration(format!(
                    "initial_step must be finite and non-zero, got {}",
                    step
                )));
            }
        }
        if let Some(bounds) = &self.bounds {
            if bounds.len() != n_params {
                return Err(FitOptError::DimensionMismatch(format!(
                    "{} bounds given for {} parameters",
                    bounds.len(),
                    n_params
                )));
            }
        }

        Ok(())
    }
}

/// Why a backend stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// A convergence criterion was met.
    Converged,

    /// The iteration cap was hit.
    MaxIterations,

    /// The evaluation cap was hit.
    MaxEvaluations,

    /// The objective stopped improving before the gradient became small.
    Stagnation,

    /// A step could not be taken, e.g. a failed line search or exhausted damping.
    StepFailure(String),
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged)
    }

    /// Short description in the minimizer's own words.
    pub fn description(&self) -> String {
        match self {
            Termination::Converged => "Optimization terminated successfully.".to_string(),
            Termination::MaxIterations => "Maximum number of iterations reached.".to_string(),
            Termination::MaxEvaluations => {
                "Maximum number of function evaluations made.".to_string()
            }
            Termination::Stagnation => "Gradient and/or function calls not changing.".to_string(),
            Termination::StepFailure(reason) => reason.clone(),
        }
    }
}

/// A fit that finished without meeting its convergence criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitWarning {
    pub algorithm: Algorithm,
    pub termination: Termination,
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Warning: {}",
            self.algorithm.label(),
            self.termination.description()
        )
    }
}

/// The backend-independent view of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Parameter vector at the reported minimum
    pub solution: Array1<f64>,

    /// Weighted chi-squared at `solution`
    pub objective: f64,

    pub termination: Termination,
}

/// Run `algorithm` on `residuals` from the starting vector `x0`.
///
/// `options` must already have passed [`AlgorithmOptions::validate`].
pub(crate) fn minimize(
    algorithm: Algorithm,
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<RawOutput> {
    log::debug!(
        "minimizing chi2 over {} parameters and {} observations with {}",
        x0.len(),
        residuals.observation_count(),
        algorithm.label()
    );

    let raw = match algorithm {
        Algorithm::LevenbergMarquardt => {
            RawOutput::Lm(levenberg_marquardt::minimize(residuals, x0, options)?)
        }
        Algorithm::Simplex => RawOutput::Simplex(simplex::minimize(residuals, x0, options)?),
        Algorithm::ConjugateGradient => {
            RawOutput::ConjugateGradient(conjugate_gradient::minimize(residuals, x0, options)?)
        }
        Algorithm::Powell => RawOutput::Powell(powell::minimize(residuals, x0, options)?),
        Algorithm::Bfgs => RawOutput::Bfgs(bfgs::minimize(residuals, x0, options)?),
        Algorithm::NewtonCg => RawOutput::NewtonCg(newton_cg::minimize(residuals, x0, options)?),
        Algorithm::LBfgsB => RawOutput::LBfgsB(lbfgsb::minimize(residuals, x0, options)?),
    };

    Ok(raw)
}
