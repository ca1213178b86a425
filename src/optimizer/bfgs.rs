//! Quasi-Newton BFGS with a More-Thuente line search.

use argmin::core::{Executor, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::BFGS;
use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::residuals::WeightedResiduals;

use super::objective::{setup_error, termination_from, EvaluationLog, ScalarObjective};
use super::{AlgorithmOptions, BfgsOutput, DEFAULT_FTOL, DEFAULT_GTOL};

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<BfgsOutput> {
    let n = x0.len();
    let max_iterations = options.max_iterations.unwrap_or(200 * n as u64);

    let log = EvaluationLog::default();
    let objective =
        ScalarObjective::new(residuals, &log).with_max_evaluations(options.max_evaluations);
    let solver = BFGS::new(MoreThuenteLineSearch::new())
        .with_tolerance_grad(options.gtol.unwrap_or(DEFAULT_GTOL))
        .and_then(|solver| solver.with_tolerance_cost(options.ftol.unwrap_or(DEFAULT_FTOL)))
        .map_err(setup_error)?;

    let identity: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let run = Executor::new(objective, solver)
        .configure(|state| {
            state
                .param(x0.to_vec())
                .inv_hessian(identity)
                .max_iters(max_iterations)
        })
        .run();

    let output = match run {
        Ok(result) => {
            let state = result.state();
            let (solution, fmin) = match state.get_best_param() {
                Some(best) => (best.clone(), state.get_best_cost()),
                None => log.best().unwrap_or((x0.to_vec(), f64::INFINITY)),
            };
            BfgsOutput {
                solution: Array1::from(solution),
                fmin,
                gradient: state.get_gradient().map(|g| Array1::from(g.clone())),
                inverse_hessian: state.get_inv_hessian().map(|h| to_matrix(h)),
                func_calls: log.cost_calls(),
                grad_calls: log.gradient_calls(),
                termination: log.settle(termination_from(state.get_termination_status()))?,
            }
        }
        Err(err) => {
            let (solution, fmin, termination) = log.recover(err)?;
            BfgsOutput {
                solution: Array1::from(solution),
                fmin,
                gradient: None,
                inverse_hessian: None,
                func_calls: log.cost_calls(),
                grad_calls: log.gradient_calls(),
                termination,
            }
        }
    };

    Ok(output)
}

fn to_matrix(rows: &[Vec<f64>]) -> Array2<f64> {
    let n = rows.len();
    Array2::from_shape_fn((n, n), |(i, j)| rows[i][j])
}
