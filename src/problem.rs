//! The vector-residual problem interface consumed by the Levenberg-Marquardt
//! backend.

use ndarray::{Array1, Array2};

use crate::error::Result;

/// A nonlinear least-squares problem: a map from a parameter vector to a
/// residual vector whose sum of squares is minimized.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix, `J[i, j] = d residual[i] / d param[j]`.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Whether [`Problem::jacobian`] is overridden with one that does not
    /// evaluate the residuals.
    ///
    /// If false, the optimizer builds a forward-difference Jacobian around
    /// residuals it already holds, saving one evaluation per iteration.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}
