//! Polak-Ribiere nonlinear conjugate gradient with a More-Thuente line search.
//!
//! The argmin solver has no gradient stopping rule of its own, so the
//! objective ends the run once the gradient norm drops below `gtol`.

use argmin::core::{Executor, State};
use argmin::solver::conjugategradient::beta::PolakRibiere;
use argmin::solver::conjugategradient::NonlinearConjugateGradient;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use ndarray::Array1;

use crate::error::Result;
use crate::residuals::WeightedResiduals;

use super::objective::{termination_from, EvaluationLog, ScalarObjective};
use super::{AlgorithmOptions, ConjugateGradientOutput, Termination, DEFAULT_GTOL};

/// Iterations between forced restarts along the steepest descent direction.
const RESTART_ITERS: u64 = 10;

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<ConjugateGradientOutput> {
    let n = x0.len();
    let max_iterations = options.max_iterations.unwrap_or(200 * n as u64);

    let log = EvaluationLog::default();
    let objective = ScalarObjective::new(residuals, &log)
        .with_max_evaluations(options.max_evaluations)
        .with_gradient_tolerance(options.gtol.unwrap_or(DEFAULT_GTOL));
    let solver = NonlinearConjugateGradient::new(MoreThuenteLineSearch::new(), PolakRibiere::new())
        .restart_iters(RESTART_ITERS)
        .restart_orthogonality(0.1);

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
        Err(err) => match log.recover(err)? {
            // A line search that cannot make progress means the iterates stalled
            (point, cost, Termination::StepFailure(reason)) => {
                log::debug!("conjugate gradient line search failed: {}", reason);
                (point, cost, Termination::Stagnation)
            }
            recovered => recovered,
        },
    };

    Ok(ConjugateGradientOutput {
        solution: Array1::from(solution),
        fmin,
        func_calls: log.cost_calls(),
        grad_calls: log.gradient_calls(),
        termination,
    })
}
