//! Weighting and goodness-of-fit statistics.

use approx::assert_relative_eq;
use fitopt_rs::{fit, Algorithm, Arguments, FitConfig, ModelFunction, Parameter};
use ndarray::{array, Array1};

use crate::test_helpers::{noisy_decay, proportional};

#[test]
fn test_uniform_weights_do_not_move_the_optimum() {
    let (model, y, args) = noisy_decay(2.0, 0.7, 25, 0.02, 11);

    for algorithm in [Algorithm::LevenbergMarquardt, Algorithm::Powell] {
        let mut unit = vec![Parameter::new(1.5), Parameter::new(0.5)];
        let base = fit(&model, &mut unit, &y, &args, &FitConfig::new().with_algorithm(algorithm))
            .unwrap()
            .into_fitted()
            .unwrap();

        let mut scaled = vec![Parameter::new(1.5), Parameter::new(0.5)];
        let config = FitConfig::new()
            .with_algorithm(algorithm)
            .with_weights(Array1::from_elem(25, 3.0));
        let weighted = fit(&model, &mut scaled, &y, &args, &config)
            .unwrap()
            .into_fitted()
            .unwrap();

        for (a, b) in unit.iter().zip(&scaled) {
            assert_relative_eq!(a.value(), b.value(), epsilon = 1e-5);
        }
        // The objective is weighted, the reported residuals are not
        assert_relative_eq!(
            weighted.minimum_objective,
            9.0 * base.minimum_objective,
            max_relative = 1e-4
        );
        assert_relative_eq!(weighted.rms_error(), base.rms_error(), max_relative = 1e-4);
    }
}

#[test]
fn test_noiseless_fit_statistics() {
    let (model, y, args) = proportional(0.25);
    let mut params = vec![Parameter::new(2.0)];

    let result = fit(&model, &mut params, &y, &args, &FitConfig::default())
        .unwrap()
        .into_fitted()
        .unwrap();

    assert!(result.reduced_chi2() < 1e-12);
    assert!(result.rms_error() < 1e-6);
    assert_eq!(result.residuals().len(), 5);
}

#[test]
fn test_statistics_for_an_imperfect_fit() {
    // A constant model against alternating data leaves residuals of +-1
    let model = ModelFunction::single(|p, x| x.mapv(|_| p[0]));
    let y = array![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
    let args = Arguments::from(Array1::linspace(0.0, 5.0, 6));
    let mut params = vec![Parameter::new(0.3)];

    let result = fit(&model, &mut params, &y, &args, &FitConfig::default())
        .unwrap()
        .into_fitted()
        .unwrap();

    assert_relative_eq!(params[0].value(), 0.0, epsilon = 1e-8);
    assert_relative_eq!(result.minimum_objective, 6.0, epsilon = 1e-8);
    assert_relative_eq!(result.reduced_chi2(), 6.0 / 5.0, epsilon = 1e-8);
    assert_relative_eq!(result.rms_error(), 6.0_f64.sqrt(), epsilon = 1e-8);
}

#[test]
fn test_zero_weight_ignores_an_outlier() {
    let (model, mut y, args) = proportional(2.0);
    y[4] = 100.0;
    let weights = array![1.0, 1.0, 1.0, 1.0, 0.0];
    let mut params = vec![Parameter::new(1.0)];

    let result = fit(&model, &mut params, &y, &args, &FitConfig::new().with_weights(weights))
        .unwrap()
        .into_fitted()
        .unwrap();

    assert_relative_eq!(params[0].value(), 2.0, epsilon = 1e-6);
    // The outlier still shows in the unweighted residuals
    assert_relative_eq!(result.residuals()[4], 92.0, epsilon = 1e-5);
}
