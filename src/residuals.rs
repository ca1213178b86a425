//! Weighted residuals and the chi-squared objective.
//!
//! [`WeightedResiduals`] ties a model to its observations. Every trial
//! parameter vector is passed to the model explicitly, so evaluating the
//! objective never touches the caller's [`crate::parameters::Parameter`]s.

use ndarray::Array1;

use crate::error::{FitOptError, Result};
use crate::model::{Arguments, ModelFunction};
use crate::problem::Problem;

/// `(observed - model(p, args)) * weights`, with the pieces it is built from.
#[derive(Debug)]
pub struct WeightedResiduals<'a> {
    model: &'a ModelFunction,
    observed: &'a Array1<f64>,
    arguments: &'a Arguments,
    weights: Array1<f64>,
    n_params: usize,
}

impl<'a> WeightedResiduals<'a> {
    /// Build the residual map, validating the request.
    ///
    /// # Arguments
    ///
    /// * `model` - The model function
    /// * `observed` - One observed value per data point
    /// * `arguments` - Independent variables, matching the model's calling convention
    /// * `weights` - Per-observation weights; all ones if `None`
    /// * `n_params` - Length of the parameter vectors that will be evaluated
    ///
    /// # Errors
    ///
    /// Configuration errors for zero parameters, a weights length that differs
    /// from the observations, or arguments that do not fit the model.
    pub fn new(
        model: &'a ModelFunction,
        observed: &'a Array1<f64>,
        arguments: &'a Arguments,
        weights: Option<&Array1<f64>>,
        n_params: usize,
    ) -> Result<Self> {
        if n_params == 0 {
            return Err(FitOptError::NoParameters);
        }

        let weights = match weights {
            Some(w) if w.len() != observed.len() => {
                return Err(FitOptError::DimensionMismatch(format!(
                    "{} weights given for {} observations",
                    w.len(),
                    observed.len()
                )))
            }
            Some(w) => w.clone(),
            None => Array1::ones(observed.len()),
        };

        model.check_arguments(arguments)?;

        Ok(Self {
            model,
            observed,
            arguments,
            weights,
            n_params,
        })
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn observation_count(&self) -> usize {
        self.observed.len()
    }

    /// `observed - model(params)`, with the model output length checked.
    pub fn unweighted(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != self.n_params {
            return Err(FitOptError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                self.n_params,
                params.len()
            )));
        }

        let predicted = match params.as_slice() {
            Some(slice) => self.model.eval(slice, self.arguments)?,
            None => self.model.eval(&params.to_vec(), self.arguments)?,
        };

        if predicted.len() != self.observed.len() {
            return Err(FitOptError::DimensionMismatch(format!(
                "model returned {} values for {} observations",
                predicted.len(),
                self.observed.len()
            )));
        }

        Ok(self.observed - &predicted)
    }

    /// `(observed - model(params)) * weights`.
    pub fn weighted(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.unweighted(params)? * &self.weights)
    }

    /// Sum of squared weighted residuals.
    pub fn chi2(&self, params: &Array1<f64>) -> Result<f64> {
        self.eval_cost(params)
    }
}

impl Problem for WeightedResiduals<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.weighted(params)
    }

    fn parameter_count(&self) -> usize {
        self.n_params
    }

    fn residual_count(&self) -> usize {
        self.observed.len()
    }
}
