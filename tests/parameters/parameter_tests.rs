//! Integration tests for the Parameter struct

use fitopt_rs::Parameter;

#[test]
fn test_parameter_lifecycle() {
    let mut param = Parameter::new(10.0);
    assert_eq!(param.value(), 10.0);
    assert_eq!(param.confidence_interval(), None);

    param.set(15.0);
    assert_eq!(param.value(), 15.0);

    // Stored sorted, whatever the order given
    param.set_confidence_interval((5.0, -3.0));
    assert_eq!(param.confidence_interval(), Some((-3.0, 5.0)));
    param.set_confidence_interval((-3.0, 5.0));
    assert_eq!(param.confidence_interval(), Some((-3.0, 5.0)));

    // Setting the value keeps the interval
    param.set(1.0);
    assert_eq!(param.confidence_interval(), Some((-3.0, 5.0)));

    param.clear_confidence_interval();
    assert_eq!(param.confidence_interval(), None);
}

#[test]
fn test_parameter_display() {
    let mut param = Parameter::from(0.5);
    assert_eq!(param.to_string(), "0.5");

    param.set(1234.5);
    param.set_confidence_interval((1300.0, -0.00025));
    assert_eq!(
        param.to_string(),
        "1.234500E+03 \t(-2.500000E-04, 1.300000E+03)"
    );
}

#[test]
fn test_parameter_display_with_open_interval() {
    let mut param = Parameter::new(0.0);
    param.set_confidence_interval((f64::INFINITY, f64::NEG_INFINITY));
    assert_eq!(param.to_string(), "0.000000E+00 \t(-inf, inf)");
}

#[test]
fn test_parameter_serialization() {
    let mut param = Parameter::new(2.5);
    param.set_confidence_interval((3.0, 2.0));

    let json = serde_json::to_string(&param).unwrap();
    let restored: Parameter = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, param);

    let bare: Parameter = serde_json::from_str(r#"{"value": 4.0}"#).unwrap();
    assert_eq!(bare.value(), 4.0);
    assert_eq!(bare.confidence_interval(), None);
}
