//! Operator alphabet for expression trees.

use serde::{Deserialize, Serialize};
use std::fmt;

const DIVISION_EPSILON: f64 = 1e-6;
const LOG_EPSILON: f64 = 1e-6;

/// Number of operands an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
}

/// Internal node kinds. The serialized form is the operator symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "abs")]
    Abs,
    #[serde(rename = "sin")]
    Sin,
    #[serde(rename = "cos")]
    Cos,
    #[serde(rename = "log_safe")]
    LogSafe,
}

impl Operator {
    /// Operators that never leave the arithmetic/ordering domain.
    pub const ARITHMETIC: &'static [Operator] = &[
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Max,
        Self::Min,
        Self::Abs,
    ];

    /// Arithmetic plus the transcendental operators.
    pub const EXTENDED: &'static [Operator] = &[
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Max,
        Self::Min,
        Self::Abs,
        Self::Sin,
        Self::Cos,
        Self::LogSafe,
    ];

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Abs | Self::Sin | Self::Cos | Self::LogSafe => Arity::Unary,
            _ => Arity::Binary,
        }
    }

    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self.arity(), Arity::Unary)
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Max => "max",
            Self::Min => "min",
            Self::Abs => "abs",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::LogSafe => "log_safe",
        }
    }

    /// Apply the operator. Unary operators ignore `right`.
    ///
    /// Division by a near-zero denominator yields 0 and `log_safe` never sees
    /// a zero argument; other non-finite results are left to the caller.
    #[must_use]
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Sub => left - right,
            Self::Mul => left * right,
            Self::Div => {
                if right.abs() < DIVISION_EPSILON {
                    0.0
                } else {
                    left / right
                }
            }
            Self::Max => left.max(right),
            Self::Min => left.min(right),
            Self::Abs => left.abs(),
            Self::Sin => left.sin(),
            Self::Cos => left.cos(),
            Self::LogSafe => (left.abs() + LOG_EPSILON).ln(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
