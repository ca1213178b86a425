//! A single adjustable fit parameter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An adjustable scalar with an optional confidence interval.
///
/// The value is overwritten with the fitted optimum when a fit succeeds.
/// The interval, once set, is always stored in ascending order.
///
/// # Examples
///
/// ```
/// use fitopt_rs::parameters::Parameter;
///
/// let mut amplitude = Parameter::new(2.0);
/// amplitude.set_confidence_interval((5.0, -3.0));
/// assert_eq!(amplitude.confidence_interval(), Some((-3.0, 5.0)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    value: f64,

    #[serde(default, with = "open_interval")]
    interval: Option<(f64, f64)>,
}

impl Parameter {
    /// Create a parameter with the given starting value and no interval.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            interval: None,
        }
    }

    /// Current value of the parameter.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Replace the current value.
    pub fn set(&mut self, value: f64) {
        self.value = value;
    }

    /// Store a confidence interval, sorting the pair ascending.
    pub fn set_confidence_interval(&mut self, (a, b): (f64, f64)) {
        self.interval = Some(sorted_pair(a, b));
    }

    /// The stored interval, or `None` if none has been computed yet.
    pub fn confidence_interval(&self) -> Option<(f64, f64)> {
        self.interval
    }

    pub fn clear_confidence_interval(&mut self) {
        self.interval = None;
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.interval {
            None => write!(f, "{}", self.value),
            Some((lower, upper)) => write!(
                f,
                "{} \t({}, {})",
                scientific(self.value),
                scientific(lower),
                scientific(upper)
            ),
        }
    }
}

pub(crate) fn sorted_pair(a: f64, b: f64) -> (f64, f64) {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}

/// Infinite interval ends travel as `null`, as [`crate::parameters::Bounds`]
/// limits do: a missing lower end is `-inf`, a missing upper end `+inf`.
pub(crate) mod open_interval {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(interval: &Option<(f64, f64)>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        interval
            .map(|(lower, upper)| (finite(lower), finite(upper)))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<(f64, f64)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ends = Option::<(Option<f64>, Option<f64>)>::deserialize(deserializer)?;
        Ok(ends.map(|(lower, upper)| (lower_or_open(lower), upper_or_open(upper))))
    }

    pub(crate) fn finite(value: f64) -> Option<f64> {
        Some(value).filter(|v| v.is_finite())
    }

    pub(crate) fn lower_or_open(value: Option<f64>) -> f64 {
        value.unwrap_or(f64::NEG_INFINITY)
    }

    pub(crate) fn upper_or_open(value: Option<f64>) -> f64 {
        value.unwrap_or(f64::INFINITY)
    }

    /// `#[serde(with)]` form for a lone lower end.
    pub(crate) mod lower {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            super::finite(*value).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            Option::<f64>::deserialize(deserializer).map(super::lower_or_open)
        }
    }

    /// `#[serde(with)]` form for a lone upper end.
    pub(crate) mod upper {
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            super::finite(*value).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            Option::<f64>::deserialize(deserializer).map(super::upper_or_open)
        }
    }
}

/// C-style `%.6E` formatting: `1.234560E+03`, `-5.000000E-07`.
fn scientific(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.6E}", value);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_value() {
        let mut p = Parameter::new(1.5);
        assert_eq!(p.value(), 1.5);
        p.set(-4.0);
        assert_eq!(p.value(), -4.0);
        assert_eq!(p.confidence_interval(), None);
    }

    #[test]
    fn test_confidence_interval_is_sorted() {
        let mut p = Parameter::from(0.0);
        p.set_confidence_interval((5.0, -3.0));
        assert_eq!(p.confidence_interval(), Some((-3.0, 5.0)));

        p.set_confidence_interval((f64::INFINITY, 1.0));
        assert_eq!(p.confidence_interval(), Some((1.0, f64::INFINITY)));

        p.clear_confidence_interval();
        assert_eq!(p.confidence_interval(), None);
    }

    #[test]
    fn test_display() {
        let mut p = Parameter::new(3.0);
        assert_eq!(p.to_string(), "3");

        p.set_confidence_interval((3.25, 2.75));
        assert_eq!(
            p.to_string(),
            "3.000000E+00 \t(2.750000E+00, 3.250000E+00)"
        );

        p.set(-1234.5);
        p.set_confidence_interval((-0.000012, f64::NEG_INFINITY));
        assert_eq!(
            p.to_string(),
            "-1.234500E+03 \t(-inf, -1.200000E-05)"
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let mut p = Parameter::new(0.25);
        p.set_confidence_interval((0.1, 0.4));
        let json = serde_json::to_string(&p).unwrap();
        let back: Parameter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);

        let bare: Parameter = serde_json::from_str(r#"{"value": 2.0}"#).unwrap();
        assert_eq!(bare, Parameter::new(2.0));
    }

    #[test]
    fn test_serde_open_interval() {
        let mut p = Parameter::new(0.0);
        p.set_confidence_interval((f64::INFINITY, f64::NEG_INFINITY));
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"value":0.0,"interval":[null,null]}"#);
        assert_eq!(serde_json::from_str::<Parameter>(&json).unwrap(), p);

        p.set_confidence_interval((-1.5, f64::INFINITY));
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(serde_json::from_str::<Parameter>(&json).unwrap(), p);

        let unset: Parameter = serde_json::from_str(r#"{"value": 1.0, "interval": null}"#).unwrap();
        assert_eq!(unset.confidence_interval(), None);
    }
}
