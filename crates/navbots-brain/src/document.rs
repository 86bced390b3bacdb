//! Serialized form of trees and policies.

use navbots_core::SensorVariable;
use serde::{Deserialize, Serialize};

use crate::ops::Operator;

/// Nested, self-describing tree node.
///
/// ```json
/// {"kind":"operator","operator":"+",
///  "left":{"kind":"leaf","variable":"goal_angle"},
///  "right":{"kind":"leaf","value":0.5}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeDocument {
    /// Exactly one of `value` or `variable` is expected.
    Leaf {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variable: Option<SensorVariable>,
    },
    Operator {
        operator: Operator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        left: Option<Box<TreeDocument>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right: Option<Box<TreeDocument>>,
    },
}

impl TreeDocument {
    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Self::Leaf {
            value: Some(value),
            variable: None,
        }
    }

    #[must_use]
    pub const fn variable(variable: SensorVariable) -> Self {
        Self::Leaf {
            value: None,
            variable: Some(variable),
        }
    }
}

/// A policy as stored on disk: one tree per actuator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyDocument {
    pub acceleration: TreeDocument,
    pub turn_rate: TreeDocument,
}
