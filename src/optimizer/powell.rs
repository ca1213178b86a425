//! Powell's conjugate direction method.
//!
//! Each iteration minimizes along every direction of the current set in
//! turn, then replaces the direction of largest decrease with the overall
//! displacement when the extrapolation test allows it. Line minimizations
//! bracket the minimum by golden-ratio expansion and refine it with Brent's
//! method. No derivatives are used.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{FitOptError, Result};
use crate::residuals::WeightedResiduals;

use super::{AlgorithmOptions, PowellOutput, Termination, DEFAULT_FTOL, DEFAULT_XTOL};

const GOLDEN: f64 = 1.618_034;
const GOLDEN_SECTION: f64 = 0.381_966_0;
const GROW_LIMIT: f64 = 110.0;
const TINY: f64 = 1e-21;
const BRACKET_MAX_ITERATIONS: usize = 1000;
const BRENT_MAX_ITERATIONS: usize = 500;
const BRENT_MIN_TOLERANCE: f64 = 1e-11;

/// Why a line minimization was cut short.
#[derive(Debug)]
enum Halt {
    /// The evaluation budget ran out.
    Budget,

    /// The bracketing expansion did not find a minimum.
    Unbracketed,

    /// The model failed.
    Model(FitOptError),
}

impl From<FitOptError> for Halt {
    fn from(err: FitOptError) -> Self {
        Halt::Model(err)
    }
}

type Step<T> = std::result::Result<T, Halt>;

/// Counted chi2 evaluations with the best point seen.
struct Evaluator<'a> {
    residuals: &'a WeightedResiduals<'a>,
    max_evaluations: usize,
    calls: usize,
    best: Option<(Array1<f64>, f64)>,
}

impl<'a> Evaluator<'a> {
    fn cost(&mut self, x: &Array1<f64>) -> Step<f64> {
        if self.calls >= self.max_evaluations {
            return Err(Halt::Budget);
        }
        self.calls += 1;

        let cost = self.residuals.chi2(x)?;
        let cost = if cost.is_nan() { f64::INFINITY } else { cost };
        if self.best.as_ref().map_or(true, |(_, lowest)| cost < *lowest) {
            self.best = Some((x.clone(), cost));
        }
        Ok(cost)
    }

    /// Minimize along `direction` from `x`. Returns the step taken and the
    /// objective value at `x + step`.
    fn line_minimize(
        &mut self,
        x: &Array1<f64>,
        direction: ArrayView1<'_, f64>,
        fx: f64,
        tolerance: f64,
    ) -> Step<(Array1<f64>, f64)> {
        if direction.iter().all(|&d| d == 0.0) {
            return Ok((Array1::zeros(x.len()), fx));
        }

        let mut along = |alpha: f64| {
            let point = x + &(&direction * alpha);
            self.cost(&point)
        };
        let (alpha, fmin) = brent(&mut along, tolerance)?;
        Ok((&direction * alpha, fmin))
    }
}

/// Bracket a minimum of `f` starting from the interval `[0, 1]`.
///
/// Returns `(a, b, c, fb)` with `b` between `a` and `c` and `f(b)` no larger
/// than the values at the ends.
fn bracket(f: &mut impl FnMut(f64) -> Step<f64>) -> Step<(f64, f64, f64, f64)> {
    let (mut xa, mut xb) = (0.0, 1.0);
    let mut fa = f(xa)?;
    let mut fb = f(xb)?;
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLDEN * (xb - xa);
    let mut fc = f(xc)?;

    let mut iterations = 0;
    while fc < fb {
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < TINY { 2.0 * TINY } else { 2.0 * val };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + GROW_LIMIT * (xc - xb);

        if iterations > BRACKET_MAX_ITERATIONS {
            return Err(Halt::Unbracketed);
        }
        iterations += 1;

        let mut fw;
        if (w - xc) * (xb - w) > 0.0 {
            fw = f(w)?;
            if fw < fc {
                return Ok(ordered(xb, w, xc, fw));
            } else if fw > fb {
                return Ok(ordered(xa, xb, w, fb));
            }
            w = xc + GOLDEN * (xc - xb);
            fw = f(w)?;
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            w = wlim;
            fw = f(w)?;
        } else if (w - wlim) * (xc - w) > 0.0 {
            fw = f(w)?;
            if fw < fc {
                xb = xc;
                xc = w;
                w = xc + GOLDEN * (xc - xb);
                fb = fc;
                fc = fw;
                fw = f(w)?;
            }
        } else {
            w = xc + GOLDEN * (xc - xb);
            fw = f(w)?;
        }

        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }

    Ok(ordered(xa, xb, xc, fb))
}

fn ordered(a: f64, b: f64, c: f64, fb: f64) -> (f64, f64, f64, f64) {
    (a.min(c), b, a.max(c), fb)
}

/// Brent's method on a bracketed minimum of `f`. Returns `(x, f(x))`.
fn brent(f: &mut impl FnMut(f64) -> Step<f64>, tolerance: f64) -> Step<(f64, f64)> {
    let (mut a, xb, mut b, fb) = bracket(f)?;

    let (mut x, mut w, mut v) = (xb, xb, xb);
    let (mut fx, mut fw, mut fv) = (fb, fb, fb);
    let mut deltax: f64 = 0.0;
    let mut rat: f64 = 0.0;

    for _ in 0..BRENT_MAX_ITERATIONS {
        let tol1 = tolerance * x.abs() + BRENT_MIN_TOLERANCE;
        let tol2 = 2.0 * tol1;
        let xmid = 0.5 * (a + b);
        if (x - xmid).abs() < tol2 - 0.5 * (b - a) {
            break;
        }

        if deltax.abs() <= tol1 {
            deltax = if x >= xmid { a - x } else { b - x };
            rat = GOLDEN_SECTION * deltax;
        } else {
            // Parabolic fit through x, w, v
            let tmp1 = (x - w) * (fx - fv);
            let mut tmp2 = (x - v) * (fx - fw);
            let mut p = (x - v) * tmp2 - (x - w) * tmp1;
            tmp2 = 2.0 * (tmp2 - tmp1);
            if tmp2 > 0.0 {
                p = -p;
            }
            tmp2 = tmp2.abs();
            let previous = deltax;
            deltax = rat;

            if p > tmp2 * (a - x) && p < tmp2 * (b - x) && p.abs() < (0.5 * tmp2 * previous).abs()
            {
                rat = p / tmp2;
                let u = x + rat;
                if (u - a) < tol2 || (b - u) < tol2 {
                    rat = if xmid - x >= 0.0 { tol1 } else { -tol1 };
                }
            } else {
                deltax = if x >= xmid { a - x } else { b - x };
                rat = GOLDEN_SECTION * deltax;
            }
        }

        let u = if rat.abs() < tol1 {
            x + tol1.copysign(rat)
        } else {
            x + rat
        };
        let fu = f(u)?;

        if fu > fx {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        } else {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        }
    }

    Ok((x, fx))
}

pub(super) fn minimize(
    residuals: &WeightedResiduals<'_>,
    x0: &Array1<f64>,
    options: &AlgorithmOptions,
) -> Result<PowellOutput> {
    let n = x0.len();
    let max_iterations = options.max_iterations.unwrap_or(1000 * n as u64);
    let ftol = options.ftol.unwrap_or(DEFAULT_FTOL);
    let line_tolerance = options.xtol.unwrap_or(DEFAULT_XTOL).max(f64::EPSILON.sqrt());

    let mut evaluator = Evaluator {
        residuals,
        max_evaluations: options.max_evaluations.unwrap_or(1000 * n),
        calls: 0,
        best: None,
    };
    let mut direc = Array2::<f64>::eye(n);
    let mut x = x0.clone();
    let mut iterations = 0;

    let run = (|| -> Step<Termination> {
        let mut fval = evaluator.cost(&x)?;
        let mut x1 = x.clone();

        loop {
            let fx = fval;
            let mut biggest = 0;
            let mut delta = 0.0;

            for i in 0..n {
                let before = fval;
                let (step, f) = evaluator.line_minimize(&x, direc.row(i), fval, line_tolerance)?;
                x += &step;
                fval = f;
                if before - fval > delta {
                    delta = before - fval;
                    biggest = i;
                }
            }
            iterations += 1;

            if 2.0 * (fx - fval) <= ftol * (fx.abs() + fval.abs()) + 1e-20 {
                return Ok(Termination::Converged);
            }
            if evaluator.calls >= evaluator.max_evaluations {
                return Ok(Termination::MaxEvaluations);
            }
            if iterations >= max_iterations {
                return Ok(Termination::MaxIterations);
            }

            // Extrapolate along the net displacement of this iteration
            let displacement = &x - &x1;
            let extrapolated = 2.0 * &x - &x1;
            x1 = x.clone();
            let fx2 = evaluator.cost(&extrapolated)?;

            if fx > fx2 {
                let mut t = 2.0 * (fx + fx2 - 2.0 * fval);
                let temp = fx - fval - delta;
                t *= temp * temp;
                let temp = fx - fx2;
                t -= delta * temp * temp;

                if t < 0.0 {
                    let (step, f) =
                        evaluator.line_minimize(&x, displacement.view(), fval, line_tolerance)?;
                    x += &step;
                    fval = f;
                    if step.iter().any(|&s| s != 0.0) {
                        let last = direc.row(n - 1).to_owned();
                        direc.row_mut(biggest).assign(&last);
                        direc.row_mut(n - 1).assign(&step);
                    }
                }
            }
        }
    })();

    let termination = match run {
        Ok(termination) => termination,
        Err(Halt::Model(err)) => return Err(err),
        Err(Halt::Budget) => Termination::MaxEvaluations,
        Err(Halt::Unbracketed) => {
            Termination::StepFailure("line search could not bracket a minimum".to_string())
        }
    };

    let (solution, fmin) = evaluator.best.ok_or_else(|| {
        FitOptError::OptimizationFailure("no objective value was computed".to_string())
    })?;

    log::debug!(
        "powell: {} iterations, {} evaluations, chi2 {:e}",
        iterations,
        evaluator.calls,
        fmin
    );

    Ok(PowellOutput {
        solution,
        fmin,
        direc,
        iterations,
        func_calls: evaluator.calls,
        termination,
    })
}
