use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value as returned by (or sent to) a time-series store.
///
/// Deserializes untagged from JSON so store responses map straight onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Interpret the value as an integer.
    ///
    /// Accepts integers, floats without a fractional part (JSON decoders often
    /// surface `21` as `21.0`) and strings of digits.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Float(v) if v.is_finite() && v.fract() == 0.0 => {
                if *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            Scalar::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_coercion() {
        assert_eq!(Scalar::Int(42).as_integer(), Some(42));
        assert_eq!(Scalar::Float(21.0).as_integer(), Some(21));
        assert_eq!(Scalar::Float(21.5).as_integer(), None);
        assert_eq!(Scalar::from(" 17 ").as_integer(), Some(17));
        assert_eq!(Scalar::from("abc").as_integer(), None);
        assert_eq!(Scalar::Null.as_integer(), None);
        assert_eq!(Scalar::Bool(true).as_integer(), None);
    }

    #[test]
    fn deserializes_untagged_json() {
        let values: Vec<Scalar> =
            serde_json::from_str(r#"[null, true, 12, 1.5, "text"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Int(12),
                Scalar::Float(1.5),
                Scalar::String("text".into()),
            ]
        );
    }
}
