//! Backend-native minimization results.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::lm::{ConvergenceStatus, LmResult};

use super::{Outcome, Termination};

/// Nelder-Mead result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplexOutput {
    pub solution: Array1<f64>,
    pub fmin: f64,
    /// `None` when the solver was stopped from inside the objective
    pub iterations: Option<u64>,
    pub func_calls: usize,
    pub termination: Termination,
}

/// Nonlinear conjugate gradient result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjugateGradientOutput {
    pub solution: Array1<f64>,
    pub fmin: f64,
    pub func_calls: usize,
    pub grad_calls: usize,
    pub termination: Termination,
}

/// Powell direction set result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowellOutput {
    pub solution: Array1<f64>,
    pub fmin: f64,
    /// Final set of search directions, one per row
    pub direc: Array2<f64>,
    pub iterations: u64,
    pub func_calls: usize,
    pub termination: Termination,
}

/// BFGS result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BfgsOutput {
    pub solution: Array1<f64>,
    pub fmin: f64,
    /// Gradient at `solution`, when the solver kept one
    pub gradient: Option<Array1<f64>>,
    /// Final inverse Hessian estimate, when the solver kept one
    pub inverse_hessian: Option<Array2<f64>>,
    pub func_calls: usize,
    pub grad_calls: usize,
    pub termination: Termination,
}

/// Newton-CG result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonCgOutput {
    pub solution: Array1<f64>,
    pub fmin: f64,
    pub func_calls: usize,
    pub grad_calls: usize,
    pub hess_calls: usize,
    pub termination: Termination,
}

/// Bound-constrained L-BFGS result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbfgsbOutput {
    pub solution: Array1<f64>,
    pub fmin: f64,
    pub info: LbfgsbInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbfgsbInfo {
    /// Gradient in the solver's (unbounded) coordinates
    pub gradient: Option<Array1<f64>>,
    pub func_calls: usize,
    pub iterations: Option<u64>,
    pub warnflag: Termination,
    pub task: String,
}

/// What a backend returned, untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum RawOutput {
    Lm(LmResult),
    Simplex(SimplexOutput),
    ConjugateGradient(ConjugateGradientOutput),
    Powell(PowellOutput),
    Bfgs(BfgsOutput),
    NewtonCg(NewtonCgOutput),
    LBfgsB(LbfgsbOutput),
}

impl RawOutput {
    /// Normalize to the backend-independent [`Outcome`].
    pub fn outcome(&self) -> Outcome {
        match self {
            RawOutput::Lm(r) => Outcome {
                solution: r.params.clone(),
                objective: r.cost,
                termination: lm_termination(r.status),
            },
            RawOutput::Simplex(r) => outcome(&r.solution, r.fmin, &r.termination),
            RawOutput::ConjugateGradient(r) => outcome(&r.solution, r.fmin, &r.termination),
            RawOutput::Powell(r) => outcome(&r.solution, r.fmin, &r.termination),
            RawOutput::Bfgs(r) => outcome(&r.solution, r.fmin, &r.termination),
            RawOutput::NewtonCg(r) => outcome(&r.solution, r.fmin, &r.termination),
            RawOutput::LBfgsB(r) => outcome(&r.solution, r.fmin, &r.info.warnflag),
        }
    }
}

fn outcome(solution: &Array1<f64>, fmin: f64, termination: &Termination) -> Outcome {
    Outcome {
        solution: solution.clone(),
        objective: fmin,
        termination: termination.clone(),
    }
}

fn lm_termination(status: ConvergenceStatus) -> Termination {
    match status {
        s if s.is_converged() => Termination::Converged,
        ConvergenceStatus::MaxIterationsReached => Termination::MaxIterations,
        ConvergenceStatus::MaxEvaluationsReached => Termination::MaxEvaluations,
        other => Termination::StepFailure(other.description().to_string()),
    }
}
