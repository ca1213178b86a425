use ndarray::Array1;

use crate::error::Result;
use crate::lm::{LevenbergMarquardt, LmConfig, LmResult};
use crate::residuals::WeightedResiduals;

use super::AlgorithmOptions;

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<LmResult> {
    let defaults = LmConfig::default();
    let config = LmConfig {
        max_iterations: options
            .max_iterations
            .map_or(defaults.max_iterations, |n| n as usize),
        max_evaluations: options.max_evaluations,
        xtol: options.xtol.unwrap_or(defaults.xtol),
        ftol: options.ftol.unwrap_or(defaults.ftol),
        gtol: options.gtol.unwrap_or(defaults.gtol),
        decomposition_method: options
            .decomposition
            .unwrap_or(defaults.decomposition_method),
        ..defaults
    };

    let result = LevenbergMarquardt::with_config(config).minimize(residuals, x0.clone())?;
    log::debug!(
        "Levenberg-Marquardt: {} after {} iterations, {} evaluations",
        result.message,
        result.iterations,
        result.func_evals
    );
    Ok(result)
}
