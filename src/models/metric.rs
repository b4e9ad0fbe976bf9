// Computed metric: a finite value or an explicit "no valid value this cycle".

use serde::{Serialize, Serializer};
use std::fmt;

/// Marker written to the archive for an undefined slot.
pub const UNKNOWN_MARKER: &str = "U";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    /// NaN and infinities become `Undefined`; they never reach the archive as numbers.
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Self::Value(v)
        } else {
            Self::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl From<f64> for Metric {
    fn from(v: f64) -> Self {
        Self::from_f64(v)
    }
}

impl From<u64> for Metric {
    fn from(v: u64) -> Self {
        Self::Value(v as f64)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.6}"),
            Self::Undefined => f.write_str(UNKNOWN_MARKER),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Undefined => serializer.serialize_str(UNKNOWN_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_is_undefined() {
        assert!(Metric::from_f64(f64::NAN).is_undefined());
        assert!(Metric::from_f64(f64::INFINITY).is_undefined());
        assert_eq!(Metric::from_f64(1.5).value(), Some(1.5));
    }

    #[test]
    fn display_uses_six_decimals_and_marker() {
        assert_eq!(Metric::Value(512.0).to_string(), "512.000000");
        assert_eq!(Metric::Undefined.to_string(), "U");
    }

    #[test]
    fn serializes_undefined_as_marker() {
        let row = vec![Metric::Value(2.0), Metric::Undefined];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[2.0,"U"]"#);
    }
}
