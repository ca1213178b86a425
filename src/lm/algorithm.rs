//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This is the default backend of [`crate::fit`]. It consumes the vector
//! residual directly instead of the scalar chi-squared objective.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FitOptError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;
use crate::utils::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra};

use super::config::{DecompositionMethod, LmConfig};
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of residual evaluations, Jacobian columns included
    pub func_evals: usize,

    /// Why the iteration stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// The Jacobian matrix at the solution (if requested)
    pub jacobian: Option<Array2<f64>>,
}

impl LmResult {
    /// Whether the iteration converged.
    pub fn success(&self) -> bool {
        self.status.is_converged()
    }
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success())?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the maximum number of residual evaluations.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.config.max_evaluations = Some(max_evaluations);
        self
    }

    /// Set the tolerance for relative change in the sum of squares.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for relative change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the method used to solve the damped normal equations.
    pub fn with_decomposition_method(mut self, method: DecompositionMethod) -> Self {
        self.config.decomposition_method = method;
        self
    }

    /// Set whether to return the Jacobian at the solution.
    pub fn with_calc_jacobian(mut self, calc_jacobian: bool) -> Self {
        self.config.calc_jacobian = calc_jacobian;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Running out of iterations, evaluations or damping is not an error; it
    /// is reported through [`LmResult::status`].
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    ///
    /// # Returns
    ///
    /// * `Result<LmResult>` - The result of the optimization
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(FitOptError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let config = &self.config;
        let criteria = ConvergenceCriteria::new(
            config.xtol,
            config.ftol,
            config.gtol,
            config.max_iterations,
        );
        let budget_spent = |evals: usize| config.max_evaluations.is_some_and(|max| evals >= max);
        let jacobian_cost = if problem.has_custom_jacobian() { 0 } else { n_params };

        let mut params = initial_params;
        let mut lambda = config.initial_lambda;
        let mut residuals = problem.eval(&params)?;
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        let mut iterations = 0;

        let status = 'outer: loop {
            if cost == 0.0 {
                break ConvergenceStatus::ZeroResiduals;
            }
            if iterations >= config.max_iterations {
                break ConvergenceStatus::MaxIterationsReached;
            }
            if budget_spent(func_evals + jacobian_cost) {
                break ConvergenceStatus::MaxEvaluationsReached;
            }

            let jacobian = jacobian_at(problem, &params, &residuals)?;
            func_evals += jacobian_cost;

            let gradient = jacobian.t().dot(&residuals);
            let gradient_norm = gradient.dot(&gradient).sqrt();
            if gradient_norm < config.gtol {
                break ConvergenceStatus::GradientConvergence;
            }

            // Raise the damping until a step lowers the cost
            loop {
                if budget_spent(func_evals) {
                    break 'outer ConvergenceStatus::MaxEvaluationsReached;
                }

                let step = match self.calculate_step(&jacobian, &gradient, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= config.lambda_up_factor;
                        if lambda >= config.max_lambda {
                            break 'outer ConvergenceStatus::DampingExhausted;
                        }
                        continue;
                    }
                };

                let new_params = &params + &step;
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                if new_cost.is_finite()
                    && new_cost >= cost
                    && new_cost - cost <= config.ftol * cost
                {
                    // Rounding hides any further decrease
                    break 'outer ConvergenceStatus::FunctionValueConvergence;
                }

                if new_cost.is_finite() && new_cost < cost {
                    iterations += 1;
                    let status = criteria.check(
                        &params,
                        &new_params,
                        cost,
                        new_cost,
                        gradient_norm,
                        iterations,
                    );

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    lambda = (lambda * config.lambda_down_factor).max(config.min_lambda);

                    if status.is_terminated() {
                        break 'outer status;
                    }
                    break;
                }

                lambda *= config.lambda_up_factor;
                if lambda >= config.max_lambda {
                    break 'outer ConvergenceStatus::DampingExhausted;
                }
            }
        };

        let jacobian = if config.calc_jacobian {
            func_evals += jacobian_cost;
            Some(jacobian_at(problem, &params, &residuals)?)
        } else {
            None
        };

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            status,
            message: status.description().to_string(),
            jacobian,
        })
    }

    /// Solve `(J^T J + lambda I) step = -J^T r`.
    ///
    /// Returns `None` if the system could not be solved or the step is not finite.
    fn calculate_step(
        &self,
        jacobian: &Array2<f64>,
        gradient: &Array1<f64>,
        lambda: f64,
    ) -> Option<Array1<f64>> {
        let j = ndarray_to_nalgebra(jacobian);
        let mut a = j.transpose() * &j;
        for i in 0..a.nrows() {
            a[(i, i)] += lambda;
        }
        let rhs = -ndarray_vec_to_nalgebra(gradient);

        let solve_svd = |a: DMatrix<f64>| a.svd(true, true).solve(&rhs, f64::EPSILON).ok();
        let solution = match self.config.decomposition_method {
            DecompositionMethod::Cholesky => a.cholesky().map(|c| c.solve(&rhs)),
            DecompositionMethod::QR => a.qr().solve(&rhs),
            DecompositionMethod::SVD => solve_svd(a),
            DecompositionMethod::Auto => match a.clone().cholesky() {
                Some(c) => Some(c.solve(&rhs)),
                None => solve_svd(a),
            },
        }?;

        if solution.iter().all(|v| v.is_finite()) {
            Some(nalgebra_vec_to_ndarray(&solution))
        } else {
            None
        }
    }
}

/// The problem's own Jacobian, or forward differences around `residuals`.
fn jacobian_at<P: Problem>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
) -> Result<Array2<f64>> {
    if problem.has_custom_jacobian() {
        problem.jacobian(params)
    } else {
        finite_difference::jacobian_from(problem, params, residuals, None)
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.dot(residuals)
}
