//! User model functions and the independent-variable arguments they take.
//!
//! A model is called with the trial parameter vector and the independent
//! variables, and returns one predicted value per observation. Its calling
//! convention is declared up front: either one bundled argument
//! ([`ModelFunction::single`]) or a fixed number of spread arguments
//! ([`ModelFunction::spread`]).

use ndarray::Array1;
use std::fmt;

use crate::error::{FitOptError, Result};

type SingleFn = dyn Fn(&[f64], &Array1<f64>) -> Result<Array1<f64>> + Send + Sync;
type SpreadFn = dyn Fn(&[f64], &[Array1<f64>]) -> Result<Array1<f64>> + Send + Sync;

/// How a model expects its independent variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    /// One bundled argument.
    Single,

    /// The given number of separate positional arguments.
    Spread(usize),
}

/// Independent variables at which the observations were taken.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// One bundled argument, passed to a [`CallingConvention::Single`] model.
    Single(Array1<f64>),

    /// Separate positional arguments, passed to a [`CallingConvention::Spread`] model.
    Spread(Vec<Array1<f64>>),
}

impl From<Array1<f64>> for Arguments {
    fn from(x: Array1<f64>) -> Self {
        Arguments::Single(x)
    }
}

impl From<Vec<Array1<f64>>> for Arguments {
    fn from(args: Vec<Array1<f64>>) -> Self {
        Arguments::Spread(args)
    }
}

enum Callable {
    Single(Box<SingleFn>),
    Spread(usize, Box<SpreadFn>),
}

/// A model function with a declared calling convention.
///
/// # Examples
///
/// ```
/// use fitopt_rs::model::{Arguments, ModelFunction};
/// use ndarray::array;
///
/// let line = ModelFunction::single(|p, x| x * p[0] + p[1]);
/// let y = line.eval(&[2.0, 1.0], &Arguments::from(array![0.0, 1.0])).unwrap();
/// assert_eq!(y, array![1.0, 3.0]);
/// ```
pub struct ModelFunction {
    callable: Callable,
}

impl ModelFunction {
    /// A model taking one bundled argument.
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&[f64], &Array1<f64>) -> Array1<f64> + Send + Sync + 'static,
    {
        Self::try_single(move |p, x| Ok(f(p, x)))
    }

    /// Fallible form of [`ModelFunction::single`].
    pub fn try_single<F>(f: F) -> Self
    where
        F: Fn(&[f64], &Array1<f64>) -> Result<Array1<f64>> + Send + Sync + 'static,
    {
        Self {
            callable: Callable::Single(Box::new(f)),
        }
    }

    /// A model taking `arity` separate arguments.
    pub fn spread<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&[f64], &[Array1<f64>]) -> Array1<f64> + Send + Sync + 'static,
    {
        Self::try_spread(arity, move |p, args| Ok(f(p, args)))
    }

    /// Fallible form of [`ModelFunction::spread`].
    pub fn try_spread<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&[f64], &[Array1<f64>]) -> Result<Array1<f64>> + Send + Sync + 'static,
    {
        Self {
            callable: Callable::Spread(arity, Box::new(f)),
        }
    }

    pub fn convention(&self) -> CallingConvention {
        match self.callable {
            Callable::Single(_) => CallingConvention::Single,
            Callable::Spread(arity, _) => CallingConvention::Spread(arity),
        }
    }

    /// Check that `arguments` fits this model's calling convention.
    pub fn check_arguments(&self, arguments: &Arguments) -> Result<()> {
        match (&self.callable, arguments) {
            (Callable::Single(_), Arguments::Single(_)) => Ok(()),
            (Callable::Spread(arity, _), Arguments::Spread(args)) if args.len() == *arity => Ok(()),
            _ => Err(self.mismatch(arguments)),
        }
    }

    /// Evaluate the model at `params`.
    pub fn eval(&self, params: &[f64], arguments: &Arguments) -> Result<Array1<f64>> {
        match (&self.callable, arguments) {
            (Callable::Single(f), Arguments::Single(x)) => f(params, x),
            (Callable::Spread(arity, f), Arguments::Spread(args)) if args.len() == *arity => {
                f(params, args)
            }
            _ => Err(self.mismatch(arguments)),
        }
    }

    fn mismatch(&self, arguments: &Arguments) -> FitOptError {
        let expected = match self.convention() {
            CallingConvention::Single => "one bundled argument".to_string(),
            CallingConvention::Spread(arity) => format!("{} spread arguments", arity),
        };
        let got = match arguments {
            Arguments::Single(_) => "one bundled argument".to_string(),
            Arguments::Spread(args) => format!("{} spread arguments", args.len()),
        };
        FitOptError::InvalidConfiguration(format!("model takes {}, got {}", expected, got))
    }
}

impl fmt::Debug for ModelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFunction")
            .field("convention", &self.convention())
            .finish()
    }
}
