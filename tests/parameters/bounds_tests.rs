//! Integration tests for Bounds and the bounded-coordinate transform

use approx::assert_relative_eq;
use fitopt_rs::parameters::{Bounds, BoundsError, BoundsTransform};

#[test]
fn test_bounds_construction() {
    let bounds = Bounds::new(-1.0, 1.0).unwrap();
    assert!(bounds.contains(0.0));
    assert!(bounds.contains(1.0));
    assert!(!bounds.contains(1.5));

    assert!(matches!(
        Bounds::new(2.0, 1.0),
        Err(BoundsError::InvalidBounds { .. })
    ));

    let open = Bounds::unbounded();
    assert!(!open.has_lower_bound() && !open.has_upper_bound());
    assert!(Bounds::min_only(0.0).has_lower_bound());
    assert!(Bounds::max_only(0.0).has_upper_bound());
}

#[test]
fn test_transform_round_trip_for_each_kind() {
    let cases = [
        (Bounds::unbounded(), -7.5),
        (Bounds::min_only(1.0), 4.0),
        (Bounds::max_only(1.0), -4.0),
        (Bounds::new(-2.0, 6.0).unwrap(), 0.5),
    ];

    for (bounds, value) in cases {
        let transform = BoundsTransform::new(bounds);
        let internal = transform.to_internal(value).unwrap();
        assert_relative_eq!(transform.to_external(internal), value, epsilon = 1e-12);
    }
}

#[test]
fn test_transform_stays_inside() {
    let transform = BoundsTransform::new(Bounds::new(-2.0, 6.0).unwrap());
    for internal in [-100.0, -1.0, 0.0, 2.0, 1e6] {
        assert!(transform.bounds().contains(transform.to_external(internal)));
    }

    assert!(matches!(
        transform.to_internal(7.0),
        Err(BoundsError::ValueOutsideBounds { .. })
    ));
    assert!(matches!(
        transform.to_internal(f64::NAN),
        Err(BoundsError::InfiniteValue)
    ));
}

#[test]
fn test_bounds_json() {
    let bounds: Bounds = serde_json::from_str(r#"{"min": 0.0}"#).unwrap();
    assert_eq!(bounds, Bounds::min_only(0.0));

    let json = serde_json::to_string(&Bounds::max_only(3.0)).unwrap();
    assert_eq!(json, r#"{"min":null,"max":3.0}"#);

    assert!(serde_json::from_str::<Bounds>(r#"{"min": 1.0, "max": 0.0}"#).is_err());
}
