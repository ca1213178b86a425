//! Finite difference methods for numerical differentiation.
//!
//! The scalar routines are generic over the error type so they can be driven
//! both by crate closures and by the argmin cost adapters.

use crate::error::{FitOptError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Relative step for forward-difference Jacobians, `sqrt(f64::EPSILON)`.
pub const JACOBIAN_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

/// Relative step for central-difference gradients, `cbrt(f64::EPSILON)`.
pub const GRADIENT_EPSILON: f64 = 6.055_454_452_393_343e-6;

/// Relative step for central-difference Hessians, `f64::EPSILON^(1/4)`.
pub const HESSIAN_EPSILON: f64 = 1.220_703_125e-4;

/// Step for coordinate `value`: relative for large values, absolute below one.
fn step(value: f64, eps: f64) -> f64 {
    eps * value.abs().max(1.0)
}

/// Compute the Jacobian matrix using forward finite differences.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `epsilon` - The relative step size (optional)
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian matrix, `J[i, j] = d residual[i] / d param[j]`
pub fn jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    jacobian_from(problem, params, &residuals, epsilon)
}

/// Forward-difference Jacobian around residuals already evaluated at `params`.
///
/// Costs exactly one residual evaluation per parameter.
pub fn jacobian_from(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(JACOBIAN_EPSILON);
    let n_residuals = problem.residual_count();
    if residuals.len() != n_residuals {
        return Err(FitOptError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }

    let mut jac = Array2::zeros((n_residuals, params.len()));
    for j in 0..params.len() {
        let h = step(params[j], eps);
        let mut perturbed = params.clone();
        perturbed[j] += h;

        let shifted = problem.eval(&perturbed)?;
        let column = (&shifted - residuals) / h;
        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}

/// Compute the gradient of a scalar function using central finite differences.
///
/// # Arguments
///
/// * `f` - The function to differentiate
/// * `params` - The parameter values at which to evaluate the gradient
/// * `epsilon` - The relative step size (optional, defaults to [`GRADIENT_EPSILON`])
pub fn gradient<F, E>(
    f: F,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> std::result::Result<Array1<f64>, E>
where
    F: Fn(&Array1<f64>) -> std::result::Result<f64, E>,
{
    let eps = epsilon.unwrap_or(GRADIENT_EPSILON);
    let mut grad = Array1::zeros(params.len());

    for j in 0..params.len() {
        let h = step(params[j], eps);

        let mut forward = params.clone();
        forward[j] += h;
        let mut backward = params.clone();
        backward[j] -= h;

        grad[j] = (f(&forward)? - f(&backward)?) / (2.0 * h);
    }

    Ok(grad)
}

/// Compute the Hessian matrix using central finite differences.
///
/// # Arguments
///
/// * `f` - The function to differentiate
/// * `params` - The parameter values at which to evaluate the Hessian
/// * `epsilon` - The relative step size (optional, defaults to [`HESSIAN_EPSILON`])
pub fn hessian<F, E>(
    f: F,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> std::result::Result<Array2<f64>, E>
where
    F: Fn(&Array1<f64>) -> std::result::Result<f64, E>,
{
    let eps = epsilon.unwrap_or(HESSIAN_EPSILON);
    let n = params.len();
    let mut hess = Array2::zeros((n, n));
    let f0 = f(params)?;

    let shifted = |moves: &[(usize, f64)]| {
        let mut p = params.clone();
        for &(k, dx) in moves {
            p[k] += dx;
        }
        f(&p)
    };

    for i in 0..n {
        let hi = step(params[i], eps);
        let f_plus = shifted(&[(i, hi)])?;
        let f_minus = shifted(&[(i, -hi)])?;
        hess[[i, i]] = (f_plus - 2.0 * f0 + f_minus) / (hi * hi);

        for j in 0..i {
            let hj = step(params[j], eps);
            let f_pp = shifted(&[(i, hi), (j, hj)])?;
            let f_pm = shifted(&[(i, hi), (j, -hj)])?;
            let f_mp = shifted(&[(i, -hi), (j, hj)])?;
            let f_mm = shifted(&[(i, -hi), (j, -hj)])?;

            hess[[i, j]] = (f_pp - f_pm - f_mp + f_mm) / (4.0 * hi * hj);
            hess[[j, i]] = hess[[i, j]];
        }
    }

    Ok(hess)
}
