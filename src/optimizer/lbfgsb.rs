//! Limited-memory BFGS with box constraints.
//!
//! Each bounded parameter is optimized in an unconstrained internal
//! coordinate (see [`BoundsTransform`]), so every trial point the model sees
//! lies inside its bounds. Parameters without bounds pass through unchanged.

use argmin::core::{Executor, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::Array1;

use crate::error::Result;
use crate::parameters::{Bounds, BoundsTransform};
use crate::residuals::WeightedResiduals;

use super::objective::{setup_error, termination_from, EvaluationLog, ScalarObjective};
use super::{AlgorithmOptions, LbfgsbInfo, LbfgsbOutput, DEFAULT_FTOL, DEFAULT_GTOL};

/// Correction pairs kept when `memory` is not given.
const DEFAULT_MEMORY: usize = 10;

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<LbfgsbOutput> {
    let n = x0.len();
    let max_iterations = options.max_iterations.unwrap_or(200 * n as u64);
    let memory = options.memory.unwrap_or(DEFAULT_MEMORY);

    let transforms: Vec<BoundsTransform> = match &options.bounds {
        Some(bounds) => bounds.iter().copied().map(BoundsTransform::new).collect(),
        None => vec![BoundsTransform::new(Bounds::unbounded()); n],
    };
    let start = x0
        .iter()
        .zip(&transforms)
        .map(|(&x, t)| t.to_internal(x))
        .collect::<std::result::Result<Vec<f64>, _>>()?;

    log::debug!(
        "l-bfgs-b: {} of {} parameters bounded, memory {}",
        transforms
            .iter()
            .filter(|t| t.bounds().has_lower_bound() || t.bounds().has_upper_bound())
            .count(),
        n,
        memory
    );

    let log = EvaluationLog::default();
    let objective = ScalarObjective::new(residuals, &log)
        .with_max_evaluations(options.max_evaluations)
        .with_transforms(&transforms);
    let solver = LBFGS::new(MoreThuenteLineSearch::new(), memory)
        .with_tolerance_grad(options.gtol.unwrap_or(DEFAULT_GTOL))
        .and_then(|solver| solver.with_tolerance_cost(options.ftol.unwrap_or(DEFAULT_FTOL)))
        .map_err(setup_error)?;

    let run = Executor::new(objective, solver)
        .configure(|state| state.param(start.clone()).max_iters(max_iterations))
        .run();

    let (internal, fmin, gradient, iterations, termination) = match run {
        Ok(result) => {
            let state = result.state();
            let (point, cost) = match state.get_best_param() {
                Some(best) => (best.clone(), state.get_best_cost()),
                None => log.best().unwrap_or((start.clone(), f64::INFINITY)),
            };
            (
                point,
                cost,
                state.get_gradient().map(|g| Array1::from(g.clone())),
                Some(state.get_iter()),
                log.settle(termination_from(state.get_termination_status()))?,
            )
        }
        Err(err) => {
            let (point, cost, termination) = log.recover(err)?;
            (point, cost, None, None, termination)
        }
    };

    let solution: Array1<f64> = internal
        .iter()
        .zip(&transforms)
        .map(|(&u, t)| t.to_external(u))
        .collect();

    Ok(LbfgsbOutput {
        solution,
        fmin,
        info: LbfgsbInfo {
            gradient,
            func_calls: log.cost_calls(),
            iterations,
            task: termination.description(),
            warnflag: termination,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arguments, ModelFunction};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_active_upper_bound() {
        // Unconstrained minimum at a = 3
        let model = ModelFunction::single(|p, x| x * p[0]);
        let observed = array![0.0, 3.0, 6.0, 9.0, 12.0];
        let args = Arguments::from(array![0.0, 1.0, 2.0, 3.0, 4.0]);
        let residuals = WeightedResiduals::new(&model, &observed, &args, None, 1).unwrap();

        let options = AlgorithmOptions::new().with_bounds(vec![Bounds::new(0.0, 2.5).unwrap()]);
        let output = minimize(&residuals, &array![1.0], &options).unwrap();

        assert!(output.solution[0] <= 2.5);
        assert_relative_eq!(output.solution[0], 2.5, epsilon = 1e-3);
        assert!(output.info.func_calls > 0);
    }

    #[test]
    fn test_start_outside_bounds_is_rejected() {
        let model = ModelFunction::single(|p, x| x * p[0]);
        let observed = array![0.0, 3.0];
        let args = Arguments::from(array![0.0, 1.0]);
        let residuals = WeightedResiduals::new(&model, &observed, &args, None, 1).unwrap();

        let options = AlgorithmOptions::new().with_bounds(vec![Bounds::min_only(5.0)]);
        let err = minimize(&residuals, &array![1.0], &options).unwrap_err();
        assert!(err.is_configuration());
    }
}
