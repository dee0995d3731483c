//! Scalar values flowing through query execution.
//!
//! This module provides the [`Value`] enum, which represents every value a
//! data source can return and every value a window function can produce.
//!
//! # Example
//!
//! ```
//! use federadb_core::Value;
//!
//! // Create values via From trait
//! let name: Value = "Alice".into();
//! let age: Value = 30i64.into();
//! let score: Value = 95.5f64.into();
//! let active: Value = true.into();
//!
//! // Access typed values
//! assert_eq!(name.as_str(), Some("Alice"));
//! assert_eq!(age.as_int(), Some(30));
//! assert_eq!(score.as_float(), Some(95.5));
//! assert_eq!(active.as_bool(), Some(true));
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A nullable scalar value.
///
/// # Supported Types
///
/// | Variant | Rust Type | Use Case |
/// |---------|-----------|----------|
/// | `Null` | - | Missing/unknown values |
/// | `Bool` | `bool` | Boolean flags and predicates |
/// | `Int` | `i64` | Integers, counts, ranks |
/// | `Float` | `f64` | Measurements, averages, ratios |
/// | `String` | `String` | Text data |
/// | `Bytes` | `Vec<u8>` | Binary data |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns `true` if this value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean value if this is a `Bool`.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value if this is an `Int`.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value if this is a `Float`.
    #[inline]
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string value if this is a `String`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte slice if this is `Bytes`.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value widened to `f64` if it is numeric.
    #[inline]
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns `true` for `Int` and `Float` values.
    #[inline]
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Returns the SQL-facing name of this value's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Rank used to order values of different types.
    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
            Self::Bytes(_) => 4,
        }
    }

    /// Compares two values under a total order.
    ///
    /// `Int` and `Float` compare numerically with each other. Values of
    /// different types order by type (null, boolean, numeric, string, bytes).
    /// NULL compares equal to NULL and less than everything else; use
    /// [`compare_with_nulls`] to control where NULLs land.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Adds two numeric values, propagating NULL.
    ///
    /// Integer addition is checked; overflow is an error rather than a wrap.
    pub fn checked_add(&self, other: &Self) -> CoreResult<Self> {
        self.arithmetic(other, "+", i64::checked_add, |a, b| a + b)
    }

    /// Subtracts `other` from this value, propagating NULL.
    pub fn checked_sub(&self, other: &Self) -> CoreResult<Self> {
        self.arithmetic(other, "-", i64::checked_sub, |a, b| a - b)
    }

    /// Multiplies two numeric values, propagating NULL.
    pub fn checked_mul(&self, other: &Self) -> CoreResult<Self> {
        self.arithmetic(other, "*", i64::checked_mul, |a, b| a * b)
    }

    /// Divides this value by `other`, propagating NULL.
    ///
    /// Integer division truncates toward zero. Dividing by zero is an error
    /// for both integers and floats.
    pub fn checked_div(&self, other: &Self) -> CoreResult<Self> {
        let zero = match other {
            Self::Int(0) => true,
            Self::Float(f) => *f == 0.0,
            _ => false,
        };
        if zero && !self.is_null() {
            return Err(CoreError::DivisionByZero);
        }
        self.arithmetic(other, "/", i64::checked_div, |a, b| a / b)
    }

    /// Negates a numeric value, propagating NULL.
    pub fn checked_neg(&self) -> CoreResult<Self> {
        match self {
            Self::Null => Ok(Self::Null),
            Self::Int(i) => i
                .checked_neg()
                .map(Self::Int)
                .ok_or_else(|| CoreError::Overflow(format!("-({i})"))),
            Self::Float(f) => Ok(Self::Float(-f)),
            other => Err(CoreError::type_mismatch_with_value("numeric", other.type_name(), other)),
        }
    }

    fn arithmetic(
        &self,
        other: &Self,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> CoreResult<Self> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Self::Null),
            (Self::Int(a), Self::Int(b)) => int_op(*a, *b)
                .map(Self::Int)
                .ok_or_else(|| CoreError::Overflow(format!("{a} {op} {b}"))),
            (a, b) => match (a.to_f64(), b.to_f64()) {
                (Some(x), Some(y)) => Ok(Self::Float(float_op(x, y))),
                (None, _) => Err(CoreError::type_mismatch_with_value("numeric", a.type_name(), a)),
                (_, None) => Err(CoreError::type_mismatch_with_value("numeric", b.type_name(), b)),
            },
        }
    }
}

/// Compares two values, placing NULLs first or last.
///
/// Non-null values compare with [`Value::compare`]. The placement applies to
/// the ascending direction; callers reverse the whole result for descending
/// keys and flip `nulls_first` accordingly.
#[must_use]
pub fn compare_with_nulls(a: &Value, b: &Value, nulls_first: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if nulls_first {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if nulls_first {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => a.compare(b),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    #[inline]
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
