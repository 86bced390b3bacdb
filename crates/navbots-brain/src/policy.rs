//! Two-tree navigation policy.

use navbots_core::{Actuation, Controller, Observation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::document::PolicyDocument;
use crate::tree::ExprTree;
use crate::{PolicyError, TreeConfig};

/// Independent acceleration and turn-rate trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolicyDocument", into = "PolicyDocument")]
pub struct Policy {
    pub acceleration: ExprTree,
    pub turn_rate: ExprTree,
}

impl Policy {
    /// Identifier reported through [`Controller::kind`].
    pub const KIND: &'static str = "gp.policy";

    #[must_use]
    pub const fn new(acceleration: ExprTree, turn_rate: ExprTree) -> Self {
        Self {
            acceleration,
            turn_rate,
        }
    }

    /// Two freshly grown trees at the configured depth.
    #[must_use]
    pub fn random(rng: &mut dyn RngCore, config: &TreeConfig) -> Self {
        let operators = config.operators();
        let acceleration = ExprTree::random(rng, config.max_depth, operators);
        let turn_rate = ExprTree::random(rng, config.max_depth, operators);
        Self::new(acceleration, turn_rate)
    }

    /// Recombine each tree with its counterpart.
    #[must_use]
    pub fn crossover(&self, other: &Policy, rng: &mut dyn RngCore) -> Policy {
        Self::new(
            ExprTree::crossover(&self.acceleration, &other.acceleration, rng),
            ExprTree::crossover(&self.turn_rate, &other.turn_rate, rng),
        )
    }

    /// Mutate both trees in place.
    pub fn mutate(&mut self, rng: &mut dyn RngCore, probability: f64, config: &TreeConfig) {
        let operators = config.operators();
        self.acceleration
            .mutate(rng, probability, config.mutation_depth, operators);
        self.turn_rate
            .mutate(rng, probability, config.mutation_depth, operators);
    }

    /// Raw tree outputs for one observation.
    #[must_use]
    pub fn evaluate(&self, observation: &Observation) -> Actuation {
        Actuation::new(
            self.acceleration.evaluate(observation),
            self.turn_rate.evaluate(observation),
        )
    }

    /// Tree outputs clamped to the ranges the agent accepts.
    #[must_use]
    pub fn steer(&self, observation: &Observation) -> Actuation {
        self.evaluate(observation).clamped()
    }

    #[must_use]
    pub fn to_document(&self) -> PolicyDocument {
        PolicyDocument {
            acceleration: self.acceleration.to_document(),
            turn_rate: self.turn_rate.to_document(),
        }
    }

    pub fn from_document(document: &PolicyDocument) -> Result<Self, PolicyError> {
        Ok(Self::new(
            ExprTree::from_document(&document.acceleration)?,
            ExprTree::from_document(&document.turn_rate)?,
        ))
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_json::from_str(json)?;
        Self::from_document(&document)
    }
}

impl Controller for Policy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn act(&self, observation: &Observation) -> Actuation {
        self.evaluate(observation)
    }
}

impl From<Policy> for PolicyDocument {
    fn from(policy: Policy) -> Self {
        policy.to_document()
    }
}

impl TryFrom<PolicyDocument> for Policy {
    type Error = PolicyError;

    fn try_from(document: PolicyDocument) -> Result<Self, Self::Error> {
        Self::from_document(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navbots_core::SensorVariable;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn steer_clamps_tree_outputs() {
        let policy = Policy::new(ExprTree::constant(4.0), ExprTree::constant(-3.0));
        let raw = policy.evaluate(&Observation::default());
        assert_eq!(raw, Actuation::new(4.0, -3.0));
        assert_eq!(policy.steer(&Observation::default()), Actuation::new(1.0, -0.5));
    }

    #[test]
    fn trees_read_the_observation_independently() {
        let policy = Policy::new(
            ExprTree::variable(SensorVariable::GoalAngle),
            ExprTree::variable(SensorVariable::ResourceAngle),
        );
        let observation = Observation {
            goal_angle: 0.2,
            resource_angle: -0.1,
            ..Observation::default()
        };
        assert_eq!(policy.steer(&observation), Actuation::new(0.2, -0.1));
    }

    #[test]
    fn json_round_trip() {
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        let policy = Policy::random(&mut rng, &TreeConfig::default());
        let json = policy.to_json().expect("serialize");
        let back = Policy::from_json(&json).expect("deserialize");
        assert_eq!(back, policy);
        assert_eq!(back.to_json().expect("serialize"), json);
    }

    #[test]
    fn from_json_reports_malformed_documents() {
        assert!(matches!(Policy::from_json("{"), Err(PolicyError::Json(_))));
        let missing_turn = r#"{"acceleration":{"kind":"leaf","value":1.0}}"#;
        assert!(matches!(Policy::from_json(missing_turn), Err(PolicyError::Json(_))));
        let bad_leaf = r#"{
            "acceleration": {"kind": "leaf"},
            "turn_rate": {"kind": "leaf", "value": 0.0}
        }"#;
        assert!(matches!(Policy::from_json(bad_leaf), Err(PolicyError::InvalidLeaf)));
    }

    #[test]
    fn mutation_respects_tree_config() {
        let config = TreeConfig {
            max_depth: 3,
            mutation_depth: 1,
            extended_operators: false,
        };
        let mut rng = SmallRng::seed_from_u64(21);
        let mut policy = Policy::random(&mut rng, &config);
        policy.mutate(&mut rng, 1.0, &config);
        assert_eq!(policy.acceleration.depth(), 1);
        assert_eq!(policy.turn_rate.depth(), 1);
    }

    #[test]
    fn controller_reports_kind() {
        let policy = Policy::new(ExprTree::constant(0.0), ExprTree::constant(0.0));
        let controller: &dyn Controller = &policy;
        assert_eq!(controller.kind(), "gp.policy");
    }
}
