//! Scalar values accepted by filter predicates.

use crate::error::{QueryError, QueryResult};
use serde_json::Value;

/// A scalar predicate operand: string, number or boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// UTF-8 text.
    Text(String),
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer above `i64::MAX`.
    Unsigned(u64),
    /// Floating point number. Must be finite to be used as an operand.
    Float(f64),
    /// Boolean.
    Bool(bool),
}

impl Scalar {
    /// Returns `false` for NaN and infinite floats, which have no JSON form.
    pub fn is_representable(&self) -> bool {
        match self {
            Scalar::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Converts the scalar into its JSON wire form.
    ///
    /// Returns `None` for a non-finite float.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Scalar::Text(s) => Some(Value::String(s.clone())),
            Scalar::Integer(i) => Some(Value::from(*i)),
            Scalar::Unsigned(u) => Some(Value::from(*u)),
            Scalar::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
            Scalar::Bool(b) => Some(Value::Bool(*b)),
        }
    }

    /// Converts the scalar into the operand for a predicate on `path`.
    pub(crate) fn operand(&self, path: &str) -> QueryResult<Value> {
        self.to_json().ok_or_else(|| QueryError::InvalidOperand {
            path: path.to_string(),
            reason: "non-finite number",
        })
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::Text(value.clone())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(f64::from(value))
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Scalar::Integer)
            .unwrap_or(Scalar::Unsigned(value))
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Scalar::from(value as u64)
    }
}
