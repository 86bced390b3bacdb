//! Expression-tree policies for NavBots agents.
//!
//! A [`Policy`] owns two [`ExprTree`]s (acceleration and turn rate), each an
//! arena of [`Node`]s evaluated against a [`navbots_core::Observation`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod document;
pub mod ops;
pub mod policy;
pub mod tree;

pub use document::{PolicyDocument, TreeDocument};
pub use ops::{Arity, Operator};
pub use policy::Policy;
pub use tree::{ExprTree, Leaf, Node, NodeId};

/// Errors raised while validating tree settings or loading persisted policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid tree configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("policy document is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("leaf must carry exactly one of `value` or `variable`")]
    InvalidLeaf,
    #[error("leaf constant {0} is not finite")]
    NonFiniteConstant(f64),
}

/// Deepest tree either depth setting may request. Full-method trees double in
/// size with every level.
pub const MAX_TREE_DEPTH: usize = 16;

/// Shape limits used when growing and mutating trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeConfig {
    /// Depth of freshly constructed trees (full method); 0 is a single leaf.
    pub max_depth: usize,
    /// Depth of the subtrees grafted in by mutation, independent of `max_depth`.
    pub mutation_depth: usize,
    /// Include `sin`, `cos`, and `log_safe` in the operator set.
    pub extended_operators: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            mutation_depth: 2,
            extended_operators: true,
        }
    }
}

impl TreeConfig {
    /// Validate depth limits.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_depth > MAX_TREE_DEPTH {
            return Err(PolicyError::InvalidConfig("max_depth exceeds MAX_TREE_DEPTH"));
        }
        if self.mutation_depth > MAX_TREE_DEPTH {
            return Err(PolicyError::InvalidConfig(
                "mutation_depth exceeds MAX_TREE_DEPTH",
            ));
        }
        Ok(())
    }

    /// Operator alphabet selected by this configuration.
    #[must_use]
    pub const fn operators(&self) -> &'static [Operator] {
        if self.extended_operators {
            Operator::EXTENDED
        } else {
            Operator::ARITHMETIC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tree_config_is_valid() {
        let config = TreeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.operators().len(), 10);
    }

    #[test]
    fn shallow_construction_accepts_default_mutation_depth() {
        for max_depth in [0, 1] {
            let config = TreeConfig {
                max_depth,
                ..TreeConfig::default()
            };
            assert!(config.validate().is_ok(), "max_depth {max_depth}");
        }
    }

    #[test]
    fn rejects_depths_past_the_ceiling() {
        let config = TreeConfig {
            max_depth: MAX_TREE_DEPTH + 1,
            ..TreeConfig::default()
        };
        assert!(matches!(config.validate(), Err(PolicyError::InvalidConfig(_))));
        let config = TreeConfig {
            mutation_depth: MAX_TREE_DEPTH + 1,
            ..TreeConfig::default()
        };
        assert!(matches!(config.validate(), Err(PolicyError::InvalidConfig(_))));
    }

    #[test]
    fn arithmetic_only_config_drops_transcendentals() {
        let config = TreeConfig {
            extended_operators: false,
            ..TreeConfig::default()
        };
        assert!(!config.operators().contains(&Operator::Sin));
    }
}
