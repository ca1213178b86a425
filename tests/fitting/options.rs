//! Algorithm options, raw output and error reporting.

use approx::assert_relative_eq;
use fitopt_rs::optimizer::{AlgorithmOptions, RawOutput};
use fitopt_rs::parameters::Bounds;
use fitopt_rs::{
    fit, Algorithm, Arguments, FitConfig, FitOptError, ModelFunction, Parameter, Termination,
};
use ndarray::{array, Array1};

use crate::test_helpers::{init_logger, proportional};

#[test]
fn test_unknown_algorithm_touches_nothing() {
    assert!(matches!(
        FitConfig::new().with_algorithm_name("levmar"),
        Err(FitOptError::UnknownAlgorithm { .. })
    ));
    assert!(Algorithm::from_name(Some("Nelder-Mead")).unwrap_err().is_configuration());
}

#[test]
fn test_mismatched_inputs_fail_fast() {
    let (model, y, args) = proportional(3.0);
    let mut params = vec![Parameter::new(2.0)];

    let config = FitConfig::new().with_weights(array![1.0, 1.0, 1.0]);
    let err = fit(&model, &mut params, &y, &args, &config).unwrap_err();
    assert!(matches!(err, FitOptError::DimensionMismatch(_)));

    let err = fit(&model, &mut [], &y, &args, &FitConfig::default()).unwrap_err();
    assert!(matches!(err, FitOptError::NoParameters));

    let spread = Arguments::from(vec![Array1::zeros(5), Array1::zeros(5)]);
    let err = fit(&model, &mut params, &y, &spread, &FitConfig::default()).unwrap_err();
    assert!(err.is_configuration());

    assert_eq!(params[0].value(), 2.0);
}

#[test]
fn test_model_output_length_is_checked() {
    let model = ModelFunction::single(|p, _x| array![p[0]]);
    let y = array![1.0, 2.0, 3.0];
    let args = Arguments::from(array![0.0, 1.0, 2.0]);
    let mut params = vec![Parameter::new(1.0)];

    let err = fit(&model, &mut params, &y, &args, &FitConfig::default()).unwrap_err();
    assert!(matches!(err, FitOptError::DimensionMismatch(_)));
}

#[test]
fn test_model_errors_propagate() {
    let model = ModelFunction::try_single(|p, x| {
        if p[0] < 0.0 {
            Err(FitOptError::FunctionEvaluation("negative scale".to_string()))
        } else {
            Ok(x * p[0])
        }
    });
    let y = array![0.0, -1.0, -2.0, -3.0];
    let args = Arguments::from(array![0.0, 1.0, 2.0, 3.0]);

    for algorithm in [Algorithm::LevenbergMarquardt, Algorithm::Powell, Algorithm::Bfgs] {
        let mut params = vec![Parameter::new(1.0)];
        let config = FitConfig::new().with_algorithm(algorithm);
        let err = fit(&model, &mut params, &y, &args, &config).unwrap_err();
        assert!(
            matches!(err, FitOptError::FunctionEvaluation(_)),
            "{}: {}",
            algorithm,
            err
        );
    }
}

#[test]
fn test_raw_output_per_backend() {
    let (model, y, args) = proportional(3.0);

    for algorithm in Algorithm::ALL {
        let mut params = vec![Parameter::new(2.0)];
        let config = FitConfig::new()
            .with_algorithm(algorithm)
            .with_raw_output(true);
        let raw = fit(&model, &mut params, &y, &args, &config)
            .unwrap()
            .into_raw()
            .unwrap();

        let matches_backend = match (&raw, algorithm) {
            (RawOutput::Lm(r), Algorithm::LevenbergMarquardt) => r.func_evals > 0,
            (RawOutput::Simplex(r), Algorithm::Simplex) => r.func_calls > 0,
            (RawOutput::ConjugateGradient(r), Algorithm::ConjugateGradient) => r.grad_calls > 0,
            (RawOutput::Powell(r), Algorithm::Powell) => r.direc.dim() == (1, 1),
            (RawOutput::Bfgs(r), Algorithm::Bfgs) => r.grad_calls > 0,
            (RawOutput::NewtonCg(r), Algorithm::NewtonCg) => r.hess_calls > 0,
            (RawOutput::LBfgsB(r), Algorithm::LBfgsB) => r.info.func_calls > 0,
            _ => false,
        };
        assert!(matches_backend, "{} returned {:?}", algorithm, raw);
        assert_relative_eq!(raw.outcome().solution[0], 3.0, epsilon = 1e-6);

        // Raw mode leaves the parameters alone
        assert_eq!(params[0].value(), 2.0);
    }
}

#[test]
fn test_raw_output_allows_exact_determination() {
    // One observation, one parameter: no degrees of freedom left
    let model = ModelFunction::single(|p, x| x * p[0]);
    let y = array![6.0];
    let args = Arguments::from(array![2.0]);
    let mut params = vec![Parameter::new(1.0)];

    let err = fit(&model, &mut params, &y, &args, &FitConfig::default()).unwrap_err();
    assert!(matches!(err, FitOptError::InsufficientData { .. }));

    let raw = fit(&model, &mut params, &y, &args, &FitConfig::new().with_raw_output(true))
        .unwrap()
        .into_raw()
        .unwrap();
    assert_relative_eq!(raw.outcome().solution[0], 3.0, epsilon = 1e-8);
}

#[test]
fn test_bounds_hold_the_fit_inside() {
    init_logger();
    let (model, y, args) = proportional(3.0);
    let mut params = vec![Parameter::new(1.0)];

    let options = AlgorithmOptions::new().with_bounds(vec![Bounds::new(0.0, 2.0).unwrap()]);
    let config = FitConfig::new()
        .with_algorithm(Algorithm::LBfgsB)
        .with_options(options);
    fit(&model, &mut params, &y, &args, &config).unwrap();

    assert!(params[0].value() <= 2.0);
    assert_relative_eq!(params[0].value(), 2.0, epsilon = 1e-3);
}

#[test]
fn test_zero_width_bounds_fix_a_parameter() {
    // y = 2 x + 3, with the intercept pinned at its true value
    let model = ModelFunction::single(|p, x| x * p[0] + p[1]);
    let x = Array1::linspace(0.0, 4.0, 5);
    let y = &x * 2.0 + 3.0;
    let args = Arguments::from(x);
    let mut params = vec![Parameter::new(1.0), Parameter::new(3.0)];

    let options = AlgorithmOptions::new()
        .with_bounds(vec![Bounds::unbounded(), Bounds::new(3.0, 3.0).unwrap()])
        .with_max_evaluations(5000);
    let config = FitConfig::new()
        .with_algorithm(Algorithm::LBfgsB)
        .with_options(options);
    let result = fit(&model, &mut params, &y, &args, &config)
        .unwrap()
        .into_fitted()
        .unwrap();

    assert_eq!(params[1].value(), 3.0);
    assert_relative_eq!(params[0].value(), 2.0, epsilon = 1e-5);
    assert!(result.minimum_objective.is_finite());
    assert_ne!(result.termination, Termination::MaxEvaluations);
}

#[test]
fn test_evaluation_cap_on_bounded_backend() {
    let (model, y, args) = proportional(3.0);

    for cap in [12, 33] {
        let mut params = vec![Parameter::new(-40.0)];
        let options = AlgorithmOptions::new()
            .with_bounds(vec![Bounds::new(-50.0, 50.0).unwrap()])
            .with_max_evaluations(cap)
            .with_gtol(0.0)
            .with_ftol(0.0);
        let config = FitConfig::new()
            .with_algorithm(Algorithm::LBfgsB)
            .with_options(options);
        let raw = fit(&model, &mut params, &y, &args, &config.with_raw_output(true))
            .unwrap()
            .into_raw()
            .unwrap();

        let RawOutput::LBfgsB(output) = raw else {
            panic!("expected l-bfgs-b output, got {:?}", raw);
        };
        assert!(output.info.func_calls <= cap);
        assert!(
            matches!(
                output.info.warnflag,
                Termination::MaxEvaluations | Termination::Converged
            ),
            "cap {}: {:?}",
            cap,
            output.info.warnflag
        );
    }
}

#[test]
fn test_bounds_rejected_by_unbounded_backends() {
    let (model, y, args) = proportional(3.0);
    let mut params = vec![Parameter::new(1.0)];

    let options = AlgorithmOptions::new().with_bounds(vec![Bounds::min_only(0.0)]);
    let config = FitConfig::new()
        .with_algorithm(Algorithm::Simplex)
        .with_options(options);
    let err = fit(&model, &mut params, &y, &args, &config).unwrap_err();
    assert!(matches!(err, FitOptError::InvalidConfiguration(_)));
}

#[test]
fn test_options_from_json() {
    let (model, y, args) = proportional(3.0);
    let mut params = vec![Parameter::new(2.0)];

    let options = AlgorithmOptions::from_json(r#"{"max_iterations": 2, "ftol": 0.0}"#).unwrap();
    let config = FitConfig::new()
        .with_algorithm(Algorithm::Powell)
        .with_options(options);
    let result = fit(&model, &mut params, &y, &args, &config)
        .unwrap()
        .into_fitted()
        .unwrap();

    // Powell lands on the exact minimum but cannot confirm it within two sweeps
    assert_relative_eq!(params[0].value(), 3.0, epsilon = 1e-6);
    assert!(matches!(
        result.termination,
        Termination::Converged | Termination::MaxIterations
    ));

    assert!(matches!(
        AlgorithmOptions::from_json(r#"{"maxiter": 2}"#),
        Err(FitOptError::JsonError(_))
    ));
}

#[test]
fn test_evaluation_cap_returns_best_point_with_warning() {
    let (model, y, args) = proportional(3.0);

    for algorithm in [
        Algorithm::Simplex,
        Algorithm::Powell,
        Algorithm::Bfgs,
        Algorithm::LBfgsB,
    ] {
        let mut params = vec![Parameter::new(2.0)];
        let config = FitConfig::new()
            .with_algorithm(algorithm)
            .with_options(AlgorithmOptions::new().with_max_evaluations(3));
        let result = fit(&model, &mut params, &y, &args, &config)
            .unwrap()
            .into_fitted()
            .unwrap();

        assert_eq!(result.termination, Termination::MaxEvaluations, "{}", algorithm);
        assert_eq!(result.warnings.len(), 1);
        // Never worse than the starting point
        assert!(result.minimum_objective <= 30.0, "{}", algorithm);
    }
}
