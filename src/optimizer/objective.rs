//! The chi-squared objective as an argmin problem.
//!
//! [`ScalarObjective`] is moved into each argmin executor, so everything that
//! must survive a failed run (evaluation counters, the best point seen) lives
//! in an [`EvaluationLog`] owned by the calling backend.

use argmin::core::{
    CostFunction, Error as ArgminError, Gradient, Hessian, TerminationReason, TerminationStatus,
};
use ndarray::Array1;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::error::{FitOptError, Result};
use crate::parameters::BoundsTransform;
use crate::residuals::WeightedResiduals;
use crate::utils::finite_difference;

use super::Termination;

/// Raised inside argmin when the evaluation cap is reached.
#[derive(Error, Debug)]
#[error("function evaluation limit of {limit} reached")]
pub(crate) struct EvaluationBudgetExhausted {
    limit: usize,
}

/// Raised from a gradient evaluation once the gradient norm drops below the
/// requested tolerance, for solvers without a gradient stopping rule.
#[derive(Error, Debug)]
#[error("gradient norm {norm:e} below tolerance")]
pub(crate) struct GradientConverged {
    norm: f64,
}

/// Stands in for a model error inside argmin; the error itself is kept in
/// the [`EvaluationLog`].
#[derive(Error, Debug)]
#[error("model evaluation failed: {0}")]
pub(crate) struct ModelFailure(String);

/// Evaluation counters, the lowest objective value seen, and the reason the
/// objective refused to continue, if it did.
///
/// Solvers may wrap or stringify the errors raised by the objective, so the
/// stop reason is read back from here rather than from the error they return.
#[derive(Debug, Default)]
pub(crate) struct EvaluationLog {
    cost_calls: AtomicUsize,
    gradient_calls: AtomicUsize,
    hessian_calls: AtomicUsize,
    budget_spent: AtomicBool,
    gradient_small: AtomicBool,
    best: Mutex<Option<(Vec<f64>, f64)>>,
    model_error: Mutex<Option<FitOptError>>,
}

impl EvaluationLog {
    pub fn cost_calls(&self) -> usize {
        self.cost_calls.load(Ordering::Relaxed)
    }

    pub fn gradient_calls(&self) -> usize {
        self.gradient_calls.load(Ordering::Relaxed)
    }

    pub fn hessian_calls(&self) -> usize {
        self.hessian_calls.load(Ordering::Relaxed)
    }

    /// Lowest objective value seen and the (internal) point it was seen at.
    pub fn best(&self) -> Option<(Vec<f64>, f64)> {
        self.best
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, point: &[f64], cost: f64) {
        let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        if best.as_ref().map_or(true, |(_, lowest)| cost < *lowest) {
            *best = Some((point.to_vec(), cost));
        }
    }

    /// Whether the evaluation cap refused at least one evaluation.
    pub fn budget_spent(&self) -> bool {
        self.budget_spent.load(Ordering::Relaxed)
    }

    /// Replace the termination a solver reported with the objective's own
    /// stop reason, if it had one.
    ///
    /// A model error is returned as the error. A refused evaluation becomes
    /// [`Termination::MaxEvaluations`] and a small-gradient stop
    /// [`Termination::Converged`].
    pub fn settle(&self, reported: Termination) -> Result<Termination> {
        let model_error = self
            .model_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(err) = model_error {
            return Err(err);
        }

        if self.budget_spent() {
            Ok(Termination::MaxEvaluations)
        } else if self.gradient_small.load(Ordering::Relaxed) {
            Ok(Termination::Converged)
        } else {
            Ok(reported)
        }
    }

    /// Turn an argmin failure into a usable result, or into an error if the
    /// model itself failed.
    ///
    /// The termination is decided by [`EvaluationLog::settle`]; a failure the
    /// objective did not cause becomes [`Termination::StepFailure`]. The best
    /// point seen so far is returned.
    pub fn recover(&self, err: ArgminError) -> Result<(Vec<f64>, f64, Termination)> {
        let err = match err.downcast::<FitOptError>() {
            Ok(model_error) => return Err(model_error),
            Err(err) => err,
        };

        let termination = self.settle(Termination::StepFailure(err.to_string()))?;
        log::debug!("solver stopped early ({}); using best point seen", err);

        let (point, cost) = self.best().ok_or_else(|| {
            FitOptError::OptimizationFailure(format!("no objective value was computed: {}", err))
        })?;
        Ok((point, cost, termination))
    }
}

/// `chi2(p)` with central-difference derivatives, optionally seen through a
/// bounds transform.
pub(crate) struct ScalarObjective<'a> {
    residuals: &'a WeightedResiduals<'a>,
    log: &'a EvaluationLog,
    transforms: Option<&'a [BoundsTransform]>,
    max_evaluations: Option<usize>,
    gradient_tolerance: Option<f64>,
}

impl<'a> ScalarObjective<'a> {
    pub fn new(residuals: &'a WeightedResiduals<'a>, log: &'a EvaluationLog) -> Self {
        Self {
            residuals,
            log,
            transforms: None,
            max_evaluations: None,
            gradient_tolerance: None,
        }
    }

    pub fn with_max_evaluations(mut self, max_evaluations: Option<usize>) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Stop the solver from the gradient once its norm is below `tolerance`.
    pub fn with_gradient_tolerance(mut self, tolerance: f64) -> Self {
        self.gradient_tolerance = Some(tolerance);
        self
    }

    /// Evaluate the model at `transforms[i].to_external(p[i])`.
    pub fn with_transforms(mut self, transforms: &'a [BoundsTransform]) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// The model-space point for an optimizer-space point.
    pub fn external(&self, point: &[f64]) -> Array1<f64> {
        match self.transforms {
            Some(transforms) => point
                .iter()
                .zip(transforms)
                .map(|(&u, t)| t.to_external(u))
                .collect(),
            None => Array1::from(point.to_vec()),
        }
    }

    /// Counted objective evaluation. NaN is reported as +inf so that the
    /// argmin solvers can compare it.
    pub fn evaluate(&self, point: &[f64]) -> std::result::Result<f64, ArgminError> {
        if let Some(limit) = self.max_evaluations {
            if self.log.cost_calls() >= limit {
                self.log.budget_spent.store(true, Ordering::Relaxed);
                return Err(EvaluationBudgetExhausted { limit }.into());
            }
        }
        self.log.cost_calls.fetch_add(1, Ordering::Relaxed);

        let cost = match self.residuals.chi2(&self.external(point)) {
            Ok(cost) => cost,
            Err(err) => {
                let failure = ModelFailure(err.to_string());
                *self
                    .log
                    .model_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(err);
                return Err(failure.into());
            }
        };
        let cost = if cost.is_nan() { f64::INFINITY } else { cost };
        self.log.record(point, cost);
        Ok(cost)
    }

    fn evaluate_array(&self, point: &Array1<f64>) -> std::result::Result<f64, ArgminError> {
        self.evaluate(&point.to_vec())
    }

    pub fn gradient_at(&self, point: &[f64]) -> std::result::Result<Vec<f64>, ArgminError> {
        self.log.gradient_calls.fetch_add(1, Ordering::Relaxed);
        let grad = finite_difference::gradient(
            |p| self.evaluate_array(p),
            &Array1::from(point.to_vec()),
            None,
        )?;
        let grad = grad.to_vec();

        if let Some(tolerance) = self.gradient_tolerance {
            let norm = norm(&grad);
            if norm < tolerance {
                self.log.gradient_small.store(true, Ordering::Relaxed);
                return Err(GradientConverged { norm }.into());
            }
        }
        Ok(grad)
    }
}

impl CostFunction for ScalarObjective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        self.evaluate(param)
    }
}

impl Gradient for ScalarObjective<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> std::result::Result<Self::Gradient, ArgminError> {
        self.gradient_at(param)
    }
}

impl Hessian for ScalarObjective<'_> {
    type Param = Vec<f64>;
    type Hessian = Vec<Vec<f64>>;

    fn hessian(&self, param: &Self::Param) -> std::result::Result<Self::Hessian, ArgminError> {
        self.log.hessian_calls.fetch_add(1, Ordering::Relaxed);
        let hess = finite_difference::hessian(
            |p| self.evaluate_array(p),
            &Array1::from(param.clone()),
            None,
        )?;
        Ok(hess.outer_iter().map(|row| row.to_vec()).collect())
    }
}

/// Map an argmin termination status onto [`Termination`].
pub(crate) fn termination_from(status: &TerminationStatus) -> Termination {
    match status {
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
        | TerminationStatus::Terminated(TerminationReason::TargetCostReached) => {
            Termination::Converged
        }
        TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
            Termination::MaxIterations
        }
        TerminationStatus::Terminated(reason) => Termination::StepFailure(format!("{reason:?}")),
        TerminationStatus::NotTerminated => {
            Termination::StepFailure("solver stopped without a termination reason".to_string())
        }
    }
}

/// Solver construction errors are configuration errors.
pub(crate) fn setup_error(err: ArgminError) -> FitOptError {
    FitOptError::InvalidConfiguration(err.to_string())
}

/// Euclidean norm of a gradient vector.
pub(crate) fn norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}
