//! Confidence intervals computed from fitted parameters.

use approx::assert_relative_eq;
use fitopt_rs::uncertainty::BoundSide;
use fitopt_rs::{
    confidence_interval, confidence_intervals, fit, Arguments, FitConfig, IntervalConfig,
    ModelFunction, Parameter,
};
use ndarray::{array, Array1};

use crate::test_helpers::{init_logger, noisy_decay, proportional};

#[test]
fn test_interval_brackets_fitted_value() {
    init_logger();
    let (model, y, args) = noisy_decay(5.0, 1.2, 40, 0.05, 3);
    let mut params = vec![Parameter::new(4.0), Parameter::new(1.0)];
    fit(&model, &mut params, &y, &args, &FitConfig::default()).unwrap();
    let fitted: Vec<f64> = params.iter().map(Parameter::value).collect();

    let intervals =
        confidence_intervals(&model, &y, &args, &mut params, &IntervalConfig::default()).unwrap();

    for ((param, interval), value) in params.iter().zip(&intervals).zip(&fitted) {
        assert!(interval.is_bounded(), "{:?}", interval.warnings);
        assert!(interval.lower < *value && *value < interval.upper);
        assert_eq!(param.value(), *value);
        assert_eq!(
            param.confidence_interval(),
            Some((interval.lower, interval.upper))
        );
    }
}

#[test]
fn test_repeated_requests_agree() {
    let (model, y, args) = noisy_decay(2.0, 0.5, 30, 0.02, 21);
    let mut params = vec![Parameter::new(1.0), Parameter::new(1.0)];
    fit(&model, &mut params, &y, &args, &FitConfig::default()).unwrap();
    let config = IntervalConfig::default();

    let first = confidence_interval(&model, &y, &args, &mut params, 1, &config).unwrap();
    let second = confidence_interval(&model, &y, &args, &mut params, 1, &config).unwrap();

    assert_eq!(first, second);
    assert_eq!(params[1].confidence_interval(), Some((second.lower, second.upper)));
    assert_eq!(params[0].confidence_interval(), None);
}

#[test]
fn test_zero_valued_parameter_is_bracketed() {
    // chi2(a) = 30 a^2, so the bracket must be widened away from zero
    let (model, y, args) = proportional(0.0);
    let mut params = vec![Parameter::new(0.0)];

    let ci = confidence_interval(&model, &y, &args, &mut params, 0, &IntervalConfig::default())
        .unwrap();
    let half_width = (4.0_f64 / 30.0).sqrt();
    assert_relative_eq!(ci.lower, -half_width, epsilon = 1e-8);
    assert_relative_eq!(ci.upper, half_width, epsilon = 1e-8);
}

#[test]
fn test_weights_and_minimum_override() {
    let (model, y, args) = proportional(3.0);
    let mut params = vec![Parameter::new(3.0)];

    // Weight 2 multiplies chi2 by 4
    let config = IntervalConfig::new().with_weights(Array1::from_elem(5, 2.0));
    let ci = confidence_interval(&model, &y, &args, &mut params, 0, &config).unwrap();
    assert_relative_eq!(ci.upper - 3.0, (4.0_f64 / 120.0).sqrt(), epsilon = 1e-8);

    // A higher reference minimum widens the interval
    let config = IntervalConfig::new().with_minimum_objective(1.0);
    let ci = confidence_interval(&model, &y, &args, &mut params, 0, &config).unwrap();
    assert_relative_eq!(3.0 - ci.lower, (5.0_f64 / 30.0).sqrt(), epsilon = 1e-8);
}

#[test]
fn test_unreachable_level_reports_both_sides() {
    let (model, y, args) = proportional(3.0);
    let mut params = vec![Parameter::new(3.0)];

    // chi2 never drops to -20 + 4, so neither side has a sign change
    let config = IntervalConfig::new().with_minimum_objective(-20.0);
    let ci = confidence_interval(&model, &y, &args, &mut params, 0, &config).unwrap();

    assert_eq!((ci.lower, ci.upper), (f64::NEG_INFINITY, f64::INFINITY));
    let sides: Vec<BoundSide> = ci.warnings.iter().map(|w| w.side).collect();
    assert_eq!(sides, vec![BoundSide::Upper, BoundSide::Lower]);
    assert!(ci.warnings.iter().all(|w| w.parameter == 0));
    assert_eq!(params[0].confidence_interval(), Some((ci.lower, ci.upper)));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let model = ModelFunction::single(|p, x| x * p[0]);
    let y = array![1.0, 2.0];
    let args = Arguments::from(array![1.0, 2.0]);
    let mut params = vec![Parameter::new(1.0)];

    for config in [
        IntervalConfig::new().with_threshold(0.0),
        IntervalConfig::new().with_tolerance(-1.0),
        IntervalConfig::new().with_weights(array![1.0, 1.0, 1.0]),
    ] {
        let err = confidence_interval(&model, &y, &args, &mut params, 0, &config).unwrap_err();
        assert!(err.is_configuration(), "{}", err);
    }
    assert_eq!(params[0].confidence_interval(), None);
}
