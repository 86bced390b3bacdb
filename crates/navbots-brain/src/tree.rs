//! Arena-backed expression trees and their genetic operators.

use navbots_core::{Observation, SensorVariable};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::debug;

use crate::document::TreeDocument;
use crate::ops::Operator;
use crate::PolicyError;

new_key_type! {
    /// Handle to a node inside one tree's arena.
    pub struct NodeId;
}

/// Relative odds of each leaf kind at construction; `None` draws a constant.
const LEAF_WEIGHTS: [(Option<SensorVariable>, u32); 10] = [
    (Some(SensorVariable::ResourceDistance), 10),
    (Some(SensorVariable::ResourceAngle), 10),
    (Some(SensorVariable::GoalDistance), 5),
    (Some(SensorVariable::GoalAngle), 5),
    (Some(SensorVariable::ObstacleDistance), 12),
    (Some(SensorVariable::Energy), 4),
    (Some(SensorVariable::Speed), 4),
    (Some(SensorVariable::GoalReached), 2),
    (Some(SensorVariable::ResourcesRemaining), 3),
    (None, 3),
];

const CONSTANT_RANGE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leaf {
    Constant(f64),
    Variable(SensorVariable),
}

/// One arena slot. Unary operators only use `left`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Operator {
        op: Operator,
        left: Option<NodeId>,
        right: Option<NodeId>,
    },
}

/// Rooted expression tree. The root handle is always present in the arena;
/// children may be missing, in which case they evaluate to 0 until mutation
/// grows a replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TreeDocument", into = "TreeDocument")]
pub struct ExprTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

fn random_leaf(rng: &mut dyn RngCore) -> Leaf {
    let total: u32 = LEAF_WEIGHTS.iter().map(|(_, weight)| weight).sum();
    let mut pick = rng.random_range(0..total);
    for (variable, weight) in LEAF_WEIGHTS {
        if pick < weight {
            return match variable {
                Some(variable) => Leaf::Variable(variable),
                None => Leaf::Constant(rng.random_range(-CONSTANT_RANGE..=CONSTANT_RANGE)),
            };
        }
        pick -= weight;
    }
    Leaf::Constant(0.0)
}

/// Full-method growth: every leaf sits exactly `depth` levels below the new node.
fn grow(
    nodes: &mut SlotMap<NodeId, Node>,
    rng: &mut dyn RngCore,
    depth: usize,
    operators: &[Operator],
) -> NodeId {
    if depth == 0 || operators.is_empty() {
        return nodes.insert(Node::Leaf(random_leaf(rng)));
    }
    let op = operators[rng.random_range(0..operators.len())];
    let left = grow(nodes, rng, depth - 1, operators);
    let right = if op.is_unary() {
        None
    } else {
        Some(grow(nodes, rng, depth - 1, operators))
    };
    nodes.insert(Node::Operator {
        op,
        left: Some(left),
        right,
    })
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

impl ExprTree {
    /// Single constant leaf.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::leaf(Leaf::Constant(value))
    }

    /// Single variable leaf.
    #[must_use]
    pub fn variable(variable: SensorVariable) -> Self {
        Self::leaf(Leaf::Variable(variable))
    }

    fn leaf(leaf: Leaf) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::Leaf(leaf));
        Self { nodes, root }
    }

    /// Grow a full tree of the given depth from `operators`.
    #[must_use]
    pub fn random(rng: &mut dyn RngCore, depth: usize, operators: &[Operator]) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = grow(&mut nodes, rng, depth, operators);
        Self { nodes, root }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Evaluate against an observation. Never returns NaN or an infinity.
    #[must_use]
    pub fn evaluate(&self, observation: &Observation) -> f64 {
        self.evaluate_node(Some(self.root), observation)
    }

    fn evaluate_node(&self, id: Option<NodeId>, observation: &Observation) -> f64 {
        let Some(node) = id.and_then(|id| self.nodes.get(id)) else {
            return 0.0;
        };
        let value = match *node {
            Node::Leaf(Leaf::Constant(value)) => value,
            Node::Leaf(Leaf::Variable(variable)) => observation.get(variable),
            Node::Operator { op, left, right } => {
                let left = self.evaluate_node(left, observation);
                let right = if op.is_unary() {
                    0.0
                } else {
                    self.evaluate_node(right, observation)
                };
                op.apply(left, right)
            }
        };
        sanitize(value)
    }

    /// Number of edges on the longest root-to-leaf path (a lone leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth_of(Some(self.root))
    }

    fn depth_of(&self, id: Option<NodeId>) -> usize {
        match id.and_then(|id| self.nodes.get(id)) {
            Some(Node::Operator { left, right, .. }) => {
                1 + self.depth_of(*left).max(self.depth_of(*right))
            }
            _ => 0,
        }
    }

    /// Number of nodes reachable from the root.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            count += 1;
            if let Node::Operator { left, right, .. } = node {
                stack.extend(left.iter().chain(right.iter()).copied());
            }
        }
        count
    }

    /// Trees always hold at least their root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Every reachable operator has exactly the children its arity requires.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes.get(id) {
                None => return false,
                Some(Node::Leaf(_)) => {}
                Some(Node::Operator { op, left, right }) => {
                    let Some(left) = left else {
                        return false;
                    };
                    stack.push(*left);
                    match (op.is_unary(), right) {
                        (true, None) => {}
                        (false, Some(right)) => stack.push(*right),
                        _ => return false,
                    }
                }
            }
        }
        true
    }

    /// Replace each visited node with probability `probability` by a fresh
    /// full subtree of `subtree_depth`; otherwise descend into its children.
    /// Missing children are always regrown.
    pub fn mutate(
        &mut self,
        rng: &mut dyn RngCore,
        probability: f64,
        subtree_depth: usize,
        operators: &[Operator],
    ) {
        self.root = self.mutate_node(Some(self.root), rng, probability, subtree_depth, operators);
    }

    fn mutate_node(
        &mut self,
        id: Option<NodeId>,
        rng: &mut dyn RngCore,
        probability: f64,
        subtree_depth: usize,
        operators: &[Operator],
    ) -> NodeId {
        let Some(id) = id.filter(|id| self.nodes.contains_key(*id)) else {
            debug!("regrowing missing expression subtree");
            return grow(&mut self.nodes, rng, subtree_depth, operators);
        };
        if rng.random::<f64>() < probability {
            self.remove_subtree(id);
            return grow(&mut self.nodes, rng, subtree_depth, operators);
        }
        if let Some(&Node::Operator { op, left, right }) = self.nodes.get(id) {
            let left = self.mutate_node(left, rng, probability, subtree_depth, operators);
            let right = if op.is_unary() {
                if let Some(stray) = right {
                    self.remove_subtree(stray);
                }
                None
            } else {
                Some(self.mutate_node(right, rng, probability, subtree_depth, operators))
            };
            self.nodes[id] = Node::Operator {
                op,
                left: Some(left),
                right,
            };
        }
        id
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(Node::Operator { left, right, .. }) = self.nodes.remove(id) {
                stack.extend(left.into_iter().chain(right));
            }
        }
    }

    /// Recombine two parents into a fresh tree that shares no storage with either.
    ///
    /// Matching operators are kept and their children recombined pairwise; any
    /// other pairing copies one side chosen uniformly. A side missing a child
    /// yields the other side's subtree.
    #[must_use]
    pub fn crossover(a: &ExprTree, b: &ExprTree, rng: &mut dyn RngCore) -> ExprTree {
        let mut nodes = SlotMap::with_key();
        let root = cross_node(a, Some(a.root), b, Some(b.root), &mut nodes, rng)
            .unwrap_or_else(|| nodes.insert(Node::Leaf(Leaf::Constant(0.0))));
        ExprTree { nodes, root }
    }

    fn copy_subtree(&self, id: Option<NodeId>, out: &mut SlotMap<NodeId, Node>) -> Option<NodeId> {
        let node = *self.nodes.get(id?)?;
        Some(match node {
            Node::Leaf(leaf) => out.insert(Node::Leaf(leaf)),
            Node::Operator { op, left, right } => {
                let left = self.copy_subtree(left, out);
                let right = self.copy_subtree(right, out);
                out.insert(Node::Operator { op, left, right })
            }
        })
    }

    /// Nested document form used for persistence.
    #[must_use]
    pub fn to_document(&self) -> TreeDocument {
        self.document_of(Some(self.root))
            .unwrap_or(TreeDocument::constant(0.0))
    }

    fn document_of(&self, id: Option<NodeId>) -> Option<TreeDocument> {
        Some(match *self.nodes.get(id?)? {
            Node::Leaf(Leaf::Constant(value)) => TreeDocument::constant(value),
            Node::Leaf(Leaf::Variable(variable)) => TreeDocument::variable(variable),
            Node::Operator { op, left, right } => TreeDocument::Operator {
                operator: op,
                left: self.document_of(left).map(Box::new),
                right: self.document_of(right).map(Box::new),
            },
        })
    }

    /// Rebuild a tree from its document form.
    pub fn from_document(document: &TreeDocument) -> Result<Self, PolicyError> {
        let mut nodes = SlotMap::with_key();
        let root = insert_document(&mut nodes, document)?;
        Ok(Self { nodes, root })
    }
}

fn cross_node(
    a: &ExprTree,
    a_id: Option<NodeId>,
    b: &ExprTree,
    b_id: Option<NodeId>,
    out: &mut SlotMap<NodeId, Node>,
    rng: &mut dyn RngCore,
) -> Option<NodeId> {
    let a_node = a_id.and_then(|id| a.nodes.get(id)).copied();
    let b_node = b_id.and_then(|id| b.nodes.get(id)).copied();
    match (a_node, b_node) {
        (None, None) => None,
        (Some(_), None) => a.copy_subtree(a_id, out),
        (None, Some(_)) => b.copy_subtree(b_id, out),
        (
            Some(Node::Operator {
                op,
                left: a_left,
                right: a_right,
            }),
            Some(Node::Operator {
                op: b_op,
                left: b_left,
                right: b_right,
            }),
        ) if op == b_op => {
            let left = cross_node(a, a_left, b, b_left, out, rng);
            let right = if op.is_unary() {
                None
            } else {
                cross_node(a, a_right, b, b_right, out, rng)
            };
            Some(out.insert(Node::Operator { op, left, right }))
        }
        _ => {
            if rng.random::<bool>() {
                a.copy_subtree(a_id, out)
            } else {
                b.copy_subtree(b_id, out)
            }
        }
    }
}

fn insert_document(
    nodes: &mut SlotMap<NodeId, Node>,
    document: &TreeDocument,
) -> Result<NodeId, PolicyError> {
    let node = match document {
        TreeDocument::Leaf {
            value: Some(value),
            variable: None,
        } => {
            if !value.is_finite() {
                return Err(PolicyError::NonFiniteConstant(*value));
            }
            Node::Leaf(Leaf::Constant(*value))
        }
        TreeDocument::Leaf {
            value: None,
            variable: Some(variable),
        } => Node::Leaf(Leaf::Variable(*variable)),
        TreeDocument::Leaf { .. } => return Err(PolicyError::InvalidLeaf),
        TreeDocument::Operator {
            operator,
            left,
            right,
        } => {
            let left = left
                .as_deref()
                .map(|child| insert_document(nodes, child))
                .transpose()?;
            let right = right
                .as_deref()
                .map(|child| insert_document(nodes, child))
                .transpose()?;
            Node::Operator {
                op: *operator,
                left,
                right,
            }
        }
    };
    Ok(nodes.insert(node))
}

impl PartialEq for ExprTree {
    fn eq(&self, other: &Self) -> bool {
        self.to_document() == other.to_document()
    }
}

impl From<ExprTree> for TreeDocument {
    fn from(tree: ExprTree) -> Self {
        tree.to_document()
    }
}

impl TryFrom<TreeDocument> for ExprTree {
    type Error = PolicyError;

    fn try_from(document: TreeDocument) -> Result<Self, Self::Error> {
        Self::from_document(&document)
    }
}
