//! Every minimizer on the same fitting problems.

use approx::assert_relative_eq;
use fitopt_rs::{fit, Algorithm, Arguments, FitConfig, ModelFunction, Parameter};
use ndarray::Array1;

use crate::test_helpers::{init_logger, noisy_decay, proportional};

#[test]
fn test_every_algorithm_recovers_slope() {
    init_logger();
    let (model, y, args) = proportional(3.0);

    for algorithm in Algorithm::ALL {
        let mut params = vec![Parameter::new(2.0)];
        let config = FitConfig::new().with_algorithm(algorithm);
        let result = fit(&model, &mut params, &y, &args, &config)
            .unwrap()
            .into_fitted()
            .unwrap();

        assert!(
            (params[0].value() - 3.0).abs() < 1e-6,
            "{} stopped at {} ({:?})",
            algorithm,
            params[0].value(),
            result.termination
        );
        assert_eq!(result.algorithm, algorithm);
        assert!(result.reduced_chi2() < 1e-8, "{}", algorithm);
    }
}

#[test]
fn test_every_algorithm_name_is_accepted() {
    let (model, y, args) = proportional(-1.5);

    for name in ["lm", "simplex", "cg", "conjugate", "powell", "bfgs", "newton", "l-bfgs-b"] {
        let mut params = vec![Parameter::new(2.0)];
        let config = FitConfig::new().with_algorithm_name(name).unwrap();
        fit(&model, &mut params, &y, &args, &config).unwrap();
        assert_relative_eq!(params[0].value(), -1.5, epsilon = 1e-6);
    }
}

#[test]
fn test_noisy_decay_agrees_with_levenberg_marquardt() {
    init_logger();
    let (model, y, args) = noisy_decay(5.0, 1.2, 40, 0.05, 7);

    let mut reference = vec![Parameter::new(4.0), Parameter::new(1.0)];
    let lm = fit(&model, &mut reference, &y, &args, &FitConfig::default())
        .unwrap()
        .into_fitted()
        .unwrap();
    assert!(lm.converged());
    assert_relative_eq!(reference[0].value(), 5.0, epsilon = 0.1);
    assert_relative_eq!(reference[1].value(), 1.2, epsilon = 0.05);

    // sigma = 0.05, so chi2 / dof should be near 0.0025
    assert!(lm.reduced_chi2() > 0.001 && lm.reduced_chi2() < 0.005);

    for algorithm in [
        Algorithm::Simplex,
        Algorithm::Powell,
        Algorithm::Bfgs,
        Algorithm::LBfgsB,
    ] {
        let mut params = vec![Parameter::new(4.0), Parameter::new(1.0)];
        let config = FitConfig::new().with_algorithm(algorithm);
        let result = fit(&model, &mut params, &y, &args, &config)
            .unwrap()
            .into_fitted()
            .unwrap();

        for (fitted, expected) in params.iter().zip(&reference) {
            assert_relative_eq!(fitted.value(), expected.value(), epsilon = 1e-3);
        }
        assert_relative_eq!(result.minimum_objective, lm.minimum_objective, max_relative = 1e-4);
    }
}

#[test]
fn test_spread_arguments() {
    // z = a * x + b * y over a small grid
    let model = ModelFunction::spread(2, |p, args| &args[0] * p[0] + &args[1] * p[1]);
    let x = Array1::from(vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    let y = Array1::from(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let z = &x * 2.0 - &y * 0.5;
    let args = Arguments::from(vec![x, y]);

    for algorithm in [Algorithm::LevenbergMarquardt, Algorithm::Powell] {
        let mut params = vec![Parameter::new(1.0), Parameter::new(1.0)];
        let config = FitConfig::new().with_algorithm(algorithm);
        fit(&model, &mut params, &z, &args, &config).unwrap();

        assert_relative_eq!(params[0].value(), 2.0, epsilon = 1e-6);
        assert_relative_eq!(params[1].value(), -0.5, epsilon = 1e-6);
    }
}
