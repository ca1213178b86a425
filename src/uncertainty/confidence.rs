//! Profile-likelihood confidence intervals.
//!
//! For a target parameter `k` with every other parameter held at its current
//! value, the interval ends are the roots of
//!
//! ```text
//! g(v) = chi2(p with p[k] = v) - minimum_objective - threshold
//! ```
//!
//! searched with Brent's method on the brackets `[v0, 11 v0 + offset]`
//! (upper) and `[v0, -9 v0 - offset]` (lower), where `offset` is 100 when
//! `v0` is exactly zero and 0 otherwise. A side whose bracket shows no sign
//! change, whose evaluation fails, or whose search does not converge falls
//! back to an infinite bound with a warning.

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, State, TerminationReason, TerminationStatus,
};
use argmin::solver::brent::BrentRoot;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FitOptError, Result};
use crate::model::{Arguments, ModelFunction};
use crate::parameters::parameter::{open_interval, sorted_pair};
use crate::parameters::{self, Parameter};
use crate::residuals::WeightedResiduals;

/// Default rise in chi-squared above the minimum that bounds the interval.
pub const DEFAULT_THRESHOLD: f64 = 4.0;

/// Default iteration cap for each root search.
pub const DEFAULT_MAX_ITERATIONS: u64 = 1000;

/// Default absolute tolerance of each root search.
pub const DEFAULT_TOLERANCE: f64 = 2e-12;

/// Bracket offset used when the parameter value is exactly zero.
const ZERO_OFFSET: f64 = 100.0;

/// Settings for [`confidence_interval`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Minimum of the objective; chi-squared at the current values if `None`
    pub minimum_objective: Option<f64>,

    /// Per-observation weights; all ones if `None`
    pub weights: Option<Array1<f64>>,

    /// Rise in chi-squared that defines the interval ends
    pub threshold: f64,

    pub max_iterations: u64,

    pub tolerance: f64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            minimum_objective: None,
            weights: None,
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl IntervalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minimum_objective(mut self, minimum_objective: f64) -> Self {
        self.minimum_objective = Some(minimum_objective);
        self
    }

    pub fn with_weights(mut self, weights: Array1<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(FitOptError::InvalidConfiguration(format!(
                "threshold must be positive and finite, got {}",
                self.threshold
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(FitOptError::InvalidConfiguration(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitOptError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(minimum) = self.minimum_objective {
            if !minimum.is_finite() {
                return Err(FitOptError::InvalidConfiguration(format!(
                    "minimum_objective must be finite, got {}",
                    minimum
                )));
            }
        }
        Ok(())
    }
}

/// Which end of an interval a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundSide {
    Lower,
    Upper,
}

/// An interval end that fell back to infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalWarning {
    /// Index of the parameter
    pub parameter: usize,
    pub side: BoundSide,
    pub reason: String,
}

impl fmt::Display for IntervalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (side, bound) = match self.side {
            BoundSide::Lower => ("lower", "-inf"),
            BoundSide::Upper => ("upper", "+inf"),
        };
        write!(
            f,
            "parameter {}: {} bound set to {}: {}",
            self.parameter, side, bound, self.reason
        )
    }
}

/// A confidence interval, `lower <= upper`. Either end may be infinite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    #[serde(with = "open_interval::lower")]
    pub lower: f64,
    #[serde(with = "open_interval::upper")]
    pub upper: f64,
    pub warnings: Vec<IntervalWarning>,
}

impl ConfidenceInterval {
    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }
}

/// `g(v)` for one parameter, as an argmin cost function.
#[derive(Clone)]
struct ProfileObjective<'a> {
    residuals: &'a WeightedResiduals<'a>,
    point: Array1<f64>,
    target: usize,
    level: f64,
}

impl ProfileObjective<'_> {
    fn shifted_chi2(&self, value: f64) -> Result<f64> {
        let mut point = self.point.clone();
        point[self.target] = value;
        Ok(self.residuals.chi2(&point)? - self.level)
    }
}

impl CostFunction for ProfileObjective<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, value: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        Ok(self.shifted_chi2(*value)?)
    }
}

/// Search `[start, end]` for a root of the profile objective.
fn find_root(
    objective: &ProfileObjective<'_>,
    start: f64,
    end: f64,
    config: &IntervalConfig,
) -> std::result::Result<f64, String> {
    let at_start = objective.shifted_chi2(start).map_err(|e| e.to_string())?;
    let at_end = objective.shifted_chi2(end).map_err(|e| e.to_string())?;
    if !(at_start.is_finite() && at_end.is_finite()) || at_start * at_end > 0.0 {
        return Err(format!(
            "no sign change over [{}, {}] (g = {:e}, {:e})",
            start, end, at_start, at_end
        ));
    }

    let solver = BrentRoot::new(start, end, config.tolerance);
    let result = Executor::new(objective.clone(), solver)
        .configure(|state| state.param(start).max_iters(config.max_iterations))
        .run()
        .map_err(|e| e.to_string())?;

    let state = result.state();
    match state.get_termination_status() {
        TerminationStatus::Terminated(TerminationReason::SolverConverged) => state
            .get_param()
            .copied()
            .ok_or_else(|| "root search returned no point".to_string()),
        TerminationStatus::Terminated(TerminationReason::MaxItersReached) => Err(format!(
            "root search did not converge in {} iterations",
            config.max_iterations
        )),
        other => Err(format!("root search stopped early: {:?}", other)),
    }
}

fn interval_for(
    residuals: &WeightedResiduals<'_>,
    point: &Array1<f64>,
    target: usize,
    minimum_objective: f64,
    config: &IntervalConfig,
) -> ConfidenceInterval {
    let objective = ProfileObjective {
        residuals,
        point: point.clone(),
        target,
        level: minimum_objective + config.threshold,
    };

    let v0 = point[target];
    let offset = if v0 == 0.0 { ZERO_OFFSET } else { 0.0 };
    let sides = [
        (BoundSide::Upper, 11.0 * v0 + offset, f64::INFINITY),
        (BoundSide::Lower, -9.0 * v0 - offset, f64::NEG_INFINITY),
    ];

    let mut warnings = Vec::new();
    let mut ends = [0.0; 2];
    for (end, (side, bracket_end, fallback)) in ends.iter_mut().zip(sides) {
        *end = match find_root(&objective, v0, bracket_end, config) {
            Ok(root) => root,
            Err(reason) => {
                let warning = IntervalWarning {
                    parameter: target,
                    side,
                    reason,
                };
                log::warn!("{}", warning);
                warnings.push(warning);
                fallback
            }
        };
    }

    let (lower, upper) = sorted_pair(ends[1], ends[0]);
    log::debug!("parameter {}: interval ({:e}, {:e})", target, lower, upper);
    ConfidenceInterval {
        lower,
        upper,
        warnings,
    }
}

/// Profile-likelihood confidence interval for `parameters[target]`.
///
/// The other parameters are held at their current values, which should be
/// the fitted ones. No parameter value is modified; the interval is stored
/// on `parameters[target]` and returned.
///
/// # Errors
///
/// Configuration errors for an out-of-range `target`, an invalid
/// [`IntervalConfig`], or inputs that do not fit the model. Failure to find
/// an interval end is not an error; see [`ConfidenceInterval::warnings`].
///
/// ```
/// use fitopt_rs::{confidence_interval, Arguments, IntervalConfig, ModelFunction, Parameter};
/// use ndarray::array;
///
/// // chi2(a) = 30 (a - 3)^2 with a minimum of 0
/// let model = ModelFunction::single(|p, x| x * p[0]);
/// let x = array![0.0, 1.0, 2.0, 3.0, 4.0];
/// let y = &x * 3.0;
/// let mut params = vec![Parameter::new(3.0)];
///
/// let ci = confidence_interval(&model, &y, &Arguments::from(x), &mut params, 0, &IntervalConfig::default())
///     .unwrap();
/// let half_width = (4.0_f64 / 30.0).sqrt();
/// assert!((ci.upper - (3.0 + half_width)).abs() < 1e-8);
/// assert!((ci.lower - (3.0 - half_width)).abs() < 1e-8);
/// assert_eq!(params[0].value(), 3.0);
/// ```
pub fn confidence_interval(
    model: &ModelFunction,
    observed: &Array1<f64>,
    arguments: &Arguments,
    parameters: &mut [Parameter],
    target: usize,
    config: &IntervalConfig,
) -> Result<ConfidenceInterval> {
    check_target(target, parameters.len())?;
    let (residuals, point, minimum) = prepare(model, observed, arguments, parameters, config)?;

    let interval = interval_for(&residuals, &point, target, minimum, config);
    parameters[target].set_confidence_interval((interval.lower, interval.upper));
    Ok(interval)
}

/// Confidence intervals for every parameter, sharing one minimum objective.
///
/// Each interval is also stored on its parameter.
pub fn confidence_intervals(
    model: &ModelFunction,
    observed: &Array1<f64>,
    arguments: &Arguments,
    parameters: &mut [Parameter],
    config: &IntervalConfig,
) -> Result<Vec<ConfidenceInterval>> {
    let (residuals, point, minimum) = prepare(model, observed, arguments, parameters, config)?;

    let intervals: Vec<ConfidenceInterval> = (0..point.len())
        .map(|target| interval_for(&residuals, &point, target, minimum, config))
        .collect();
    for (param, interval) in parameters.iter_mut().zip(&intervals) {
        param.set_confidence_interval((interval.lower, interval.upper));
    }
    Ok(intervals)
}

fn check_target(target: usize, n_params: usize) -> Result<()> {
    if target >= n_params {
        return Err(FitOptError::InvalidInput(format!(
            "parameter index {} out of range for {} parameters",
            target, n_params
        )));
    }
    Ok(())
}

/// Validate the request and resolve the minimum objective.
fn prepare<'a>(
    model: &'a ModelFunction,
    observed: &'a Array1<f64>,
    arguments: &'a Arguments,
    parameters: &[Parameter],
    config: &IntervalConfig,
) -> Result<(WeightedResiduals<'a>, Array1<f64>, f64)> {
    config.validate()?;
    let residuals = WeightedResiduals::new(
        model,
        observed,
        arguments,
        config.weights.as_ref(),
        parameters.len(),
    )?;
    let point = parameters::values(parameters);
    let minimum = match config.minimum_objective {
        Some(minimum) => minimum,
        None => residuals.chi2(&point)?,
    };
    Ok((residuals, point, minimum))
}
