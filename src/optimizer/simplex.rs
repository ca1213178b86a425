//! Nelder-Mead downhill simplex.
//!
//! `ftol` bounds the standard deviation of the objective over the vertices.

use argmin::core::{Executor, State};
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;

use crate::error::Result;
use crate::residuals::WeightedResiduals;

use super::objective::{setup_error, termination_from, EvaluationLog, ScalarObjective};
use super::{AlgorithmOptions, SimplexOutput};

/// Relative displacement of the initial vertices.
const INITIAL_STEP: f64 = 0.05;

/// Displacement used for coordinates that start at zero.
const ZERO_STEP: f64 = 0.00025;

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<SimplexOutput> {
    let n = x0.len();
    let max_iterations = options.max_iterations.unwrap_or(200 * n as u64);
    let max_evaluations = options.max_evaluations.unwrap_or(200 * n);

    let log = EvaluationLog::default();
    let objective = ScalarObjective::new(residuals, &log).with_max_evaluations(Some(max_evaluations));
    let vertices = initial_simplex(x0, options.initial_step.unwrap_or(INITIAL_STEP));
    let solver = NelderMead::new(vertices)
        .with_sd_tolerance(options.ftol.unwrap_or(f64::EPSILON))
        .map_err(setup_error)?;

    let run = Executor::new(objective, solver)
        .configure(|state| state.max_iters(max_iterations))
        .run();

    let output = match run {
        Ok(result) => {
            let state = result.state();
            let (solution, fmin) = match state.get_best_param() {
                Some(best) => (best.clone(), state.get_best_cost()),
                None => log.best().unwrap_or((x0.to_vec(), f64::INFINITY)),
            };
            SimplexOutput {
                solution: Array1::from(solution),
                fmin,
                iterations: Some(state.get_iter()),
                func_calls: log.cost_calls(),
                termination: log.settle(termination_from(state.get_termination_status()))?,
            }
        }
        Err(err) => {
            let (solution, fmin, termination) = log.recover(err)?;
            SimplexOutput {
                solution: Array1::from(solution),
                fmin,
                iterations: None,
                func_calls: log.cost_calls(),
                termination,
            }
        }
    };

    Ok(output)
}

/// `x0` plus one vertex per coordinate, displaced by `step` relative to it.
fn initial_simplex(x0: &Array1<f64>, step: f64) -> Vec<Vec<f64>> {
    let mut vertices = vec![x0.to_vec()];
    for i in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * (1.0 + step)
        } else {
            ZERO_STEP
        };
        vertices.push(vertex);
    }
    vertices
}
