use std::cmp::Ordering;
use std::fmt;

use num_traits::{CheckedAdd, CheckedMul, CheckedSub, ToPrimitive, Zero};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CarlaeError, Result};

static INT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer literal pattern"));

static FLOAT_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)([eE][+-]?[0-9]+)?$")
        .expect("float literal pattern")
});

// ============================================================================
// Number
// ============================================================================

/// A Carlae number: an exact integer or an IEEE 754 double.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Primary integer type - promotes to Float on overflow
    Int(i64),
    Float(f64),
}

impl Number {
    /// Recognize an integer or floating-point literal.
    ///
    /// Returns `None` for anything else, including `1.2.3.4`, `-` and `inf`.
    pub fn from_literal(token: &str) -> Option<Number> {
        if INT_LITERAL.is_match(token) {
            return match token.parse::<i64>() {
                Ok(n) => Some(Number::Int(n)),
                // Too wide for i64.
                Err(_) => token.parse::<f64>().ok().map(Number::Float),
            };
        }
        if FLOAT_LITERAL.is_match(token) {
            return token.parse::<f64>().ok().map(Number::Float);
        }
        None
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(n) => n.to_f64().unwrap_or(f64::NAN),
            Number::Float(x) => *x,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => n.is_zero(),
            Number::Float(x) => x.is_zero(),
        }
    }

    /// The value as a list index, if it is a non-negative whole number.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Number::Int(n) => usize::try_from(*n).ok(),
            Number::Float(x) if x.fract() == 0.0 && *x >= 0.0 => x.to_usize(),
            Number::Float(_) => None,
        }
    }

    pub fn add(&self, other: &Number) -> Number {
        self.combine(other, <i64 as CheckedAdd>::checked_add, |a, b| a + b)
    }

    pub fn sub(&self, other: &Number) -> Number {
        self.combine(other, <i64 as CheckedSub>::checked_sub, |a, b| a - b)
    }

    pub fn mul(&self, other: &Number) -> Number {
        self.combine(other, <i64 as CheckedMul>::checked_mul, |a, b| a * b)
    }

    /// Divide, keeping an exact integer quotient as `Int`.
    pub fn div(&self, other: &Number) -> Result<Number> {
        if other.is_zero() {
            return Err(CarlaeError::evaluation("/: division by zero"));
        }
        match (self, other) {
            (Number::Int(a), Number::Int(b)) if a.checked_rem(*b) == Some(0) => Ok(a
                .checked_div(*b)
                .map(Number::Int)
                .unwrap_or_else(|| Number::Float(self.as_f64() / other.as_f64()))),
            _ => Ok(Number::Float(self.as_f64() / other.as_f64())),
        }
    }

    pub fn neg(&self) -> Number {
        match self {
            Number::Int(n) => n
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Float(-(*n as f64))),
            Number::Float(x) => Number::Float(-x),
        }
    }

    fn combine(
        &self,
        other: &Number,
        exact: fn(&i64, &i64) -> Option<i64>,
        inexact: fn(f64, f64) -> f64,
    ) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match exact(a, b) {
                Some(n) => Number::Int(n),
                None => Number::Float(inexact(*a as f64, *b as f64)),
            },
            _ => Number::Float(inexact(self.as_f64(), other.as_f64())),
        }
    }
}

// ============================================================================
// Equality and Comparison
// ============================================================================

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Number::Float(x)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x}.0"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}
