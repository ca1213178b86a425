//! Line-search Newton-CG with a finite-difference Hessian.
//!
//! Stops when the objective change falls below `ftol` or, through the
//! objective, when the gradient norm falls below `gtol`.

use argmin::core::{Executor, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::newton::NewtonCG;
use ndarray::Array1;

use crate::error::Result;
use crate::residuals::WeightedResiduals;

use super::objective::{setup_error, termination_from, EvaluationLog, ScalarObjective};
use super::{AlgorithmOptions, NewtonCgOutput, DEFAULT_FTOL, DEFAULT_GTOL};

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<NewtonCgOutput> {
    let n = x0.len();
    let max_iterations = options.max_iterations.unwrap_or(200 * n as u64);

    let log = EvaluationLog::default();
    let objective = ScalarObjective::new(residuals, &log)
        .with_max_evaluations(options.max_evaluations)
        .with_gradient_tolerance(options.gtol.unwrap_or(DEFAULT_GTOL));
    let solver = NewtonCG::new(MoreThuenteLineSearch::new())
        .with_tolerance(options.ftol.unwrap_or(DEFAULT_FTOL))
        .map_err(setup_error)?;

    let run = Executor::new(objective, solver)
        .configure(|state| state.param(x0.to_vec()).max_iters(max_iterations))
        .run();

    let (solution, fmin, termination) = match run {
        Ok(result) => {
            let state = result.state();
            let termination = log.settle(termination_from(state.get_termination_status()))?;
            match state.get_best_param() {
                Some(best) => (best.clone(), state.get_best_cost(), termination),
                None => {
                    let (point, cost) = log.best().unwrap_or((x0.to_vec(), f64::INFINITY));
                    (point, cost, termination)
                }
            }
        }
        Err(err) => log.recover(err)?,
    };

    Ok(NewtonCgOutput {
        solution: Array1::from(solution),
        fmin,
        func_calls: log.cost_calls(),
        grad_calls: log.gradient_calls(),
        hess_calls: log.hessian_calls(),
        termination,
    })
}
