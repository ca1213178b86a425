//! Convergence criteria for the Levenberg-Marquardt iteration.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Possible states of the Levenberg-Marquardt iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// Converged due to a small parameter change.
    ParameterConvergence,

    /// Converged due to a small change in the sum of squares.
    FunctionValueConvergence,

    /// Converged due to a small gradient.
    GradientConvergence,

    /// The residuals vanished exactly.
    ZeroResiduals,

    /// Terminated after the maximum number of iterations.
    MaxIterationsReached,

    /// Terminated after the maximum number of residual evaluations.
    MaxEvaluationsReached,

    /// No damping up to the maximum lambda produced a decrease.
    DampingExhausted,
}

impl ConvergenceStatus {
    /// Returns true if the iteration has stopped, converged or not.
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the iteration converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::ZeroResiduals
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small function value change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::ZeroResiduals => "Converged: residuals are zero",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::MaxEvaluationsReached => {
                "Terminated: maximum function evaluations reached"
            }
            ConvergenceStatus::DampingExhausted => {
                "Failed to decrease cost, and lambda reached maximum"
            }
        }
    }
}

/// Tolerances checked after every accepted step.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for relative change in parameter values.
    pub xtol: f64,

    /// Tolerance for relative change in the sum of squares.
    pub ftol: f64,

    /// Tolerance for the gradient norm.
    pub gtol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_iterations,
        }
    }

    /// Checks whether an accepted step ends the iteration.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values before the step
    /// * `new_params` - The parameter values after the step
    /// * `cost` - The sum of squares before the step
    /// * `new_cost` - The sum of squares after the step
    /// * `gradient_norm` - The norm of the gradient before the step
    /// * `iterations` - The number of completed iterations
    pub fn check(
        &self,
        params: &Array1<f64>,
        new_params: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        gradient_norm: f64,
        iterations: usize,
    ) -> ConvergenceStatus {
        if new_cost == 0.0 {
            return ConvergenceStatus::ZeroResiduals;
        }

        if gradient_norm < self.gtol {
            return ConvergenceStatus::GradientConvergence;
        }

        let param_change = new_params
            .iter()
            .zip(params.iter())
            .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
            .fold(0.0, f64::max);
        if param_change < self.xtol {
            return ConvergenceStatus::ParameterConvergence;
        }

        let cost_change = (cost - new_cost).abs() / cost.max(1e-300);
        if cost_change < self.ftol {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }

        ConvergenceStatus::Running
    }
}
