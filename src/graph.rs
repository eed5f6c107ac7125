use std::iter::zip;
use std::sync::Arc;

// The std HashMap/HashSet provide DOS resistance. In this module hash keys are
// mostly `NodeId`s which we allocate ourselves, so this is not a concern.
// Instead we want faster hashing.
use rustc_hash::FxHashMap;

use rmo_shape_inference::{check_input_ranks, SymShape};

use crate::operator::Operator;

mod infer_error;
mod node;
mod node_id;
mod planner;

pub use infer_error::{InferError, InferErrorKind};
pub use node::{Node, OperatorNode, ValueNode};
pub use node_id::NodeId;
pub use planner::Planner;

/// A graph of operators and the values that flow between them.
///
/// Graphs consist of two types of node, each of which has a numeric ID and
/// an optional name. Value nodes are placeholders for tensors, such as graph
/// inputs or operator outputs, and record the shape of the tensor once it is
/// known. Operator nodes are computation steps which read from and write to
/// value nodes.
///
/// Shape inference propagates shapes from the graph's inputs to the outputs
/// of each operator, see [`Graph::infer_shapes`].
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,

    /// Map of value node name to ID.
    value_ids: FxHashMap<String, NodeId>,

    /// Map of value node ID to the operator which produces it.
    source_ids: FxHashMap<NodeId, NodeId>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Maximum number of nodes a graph can hold.
    pub const MAX_NODES: usize = NodeId::MAX as usize + 1;

    fn next_node_id(&self) -> NodeId {
        let id = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        NodeId::from_u32(id)
    }

    /// Add a value node to the graph.
    ///
    /// `name` is an identifier for this node that is used in debug messages
    /// and for lookups via [`get_node_id`](Graph::get_node_id). `shape` is
    /// the shape of the value, or `None` if it is not yet known.
    ///
    /// Returns the ID of the added node. Panics if the graph already holds
    /// [`MAX_NODES`](Graph::MAX_NODES) nodes.
    pub fn add_value(&mut self, name: Option<&str>, shape: Option<SymShape>) -> NodeId {
        let id = self.next_node_id();
        self.nodes.push(Node::Value(ValueNode::new(name, shape)));
        if let Some(name) = name {
            self.value_ids.insert(name.to_string(), id);
        }
        id
    }

    /// Add an operator node to the graph.
    ///
    /// `inputs` and `outputs` specify the value nodes which are connected to
    /// each of the operator's ports, in order. `None` entries mark optional
    /// ports which are not connected.
    ///
    /// Returns the ID of the operator node. Panics if the graph already holds
    /// [`MAX_NODES`](Graph::MAX_NODES) nodes.
    pub fn add_op(
        &mut self,
        name: Option<&str>,
        op: Arc<dyn Operator + Send + Sync>,
        inputs: &[Option<NodeId>],
        outputs: &[Option<NodeId>],
    ) -> NodeId {
        let op_id = self.next_node_id();
        for output_id in outputs.iter().filter_map(|id| *id) {
            self.source_ids.insert(output_id, op_id);
        }
        self.nodes
            .push(Node::Operator(OperatorNode::new(name, inputs, outputs, op)));
        op_id
    }

    /// Retrieve a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_usize())
    }

    /// Find the ID of a value node given its name.
    pub fn get_node_id(&self, name: &str) -> Option<NodeId> {
        self.value_ids.get(name).copied()
    }

    /// Return the debug name for a node.
    pub fn node_name(&self, id: NodeId) -> String {
        self.get_node(id)
            .and_then(|node| node.name())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("[ID: {}]", id))
    }

    /// Return the known shape of a value node.
    pub fn node_shape(&self, id: NodeId) -> Option<&SymShape> {
        self.get_node(id).and_then(|node| node.shape())
    }

    /// Return the IDs of all operator nodes, in the order they were added.
    pub fn operator_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Operator(_)))
            .map(|(i, _)| NodeId::from_u32(i as u32))
    }

    /// Return the operator node which produces a value, if any.
    pub fn get_source_node(&self, value_id: NodeId) -> Option<(NodeId, &OperatorNode)> {
        let op_id = *self.source_ids.get(&value_id)?;
        let op_node = self.get_node(op_id)?.as_operator()?;
        Some((op_id, op_node))
    }

    /// Return the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Infer the shapes of the outputs of a single operator node.
    ///
    /// The shapes of the operator's inputs are read from the graph and
    /// checked against the minimum ranks that the operator declares before
    /// its shape inference rule is invoked. On success the inferred shapes
    /// are written to the operator's output value nodes. Nothing else in the
    /// graph is modified, so inferring the same node again with unchanged
    /// inputs has no further effect.
    pub fn infer_node(&mut self, op_id: NodeId) -> Result<(), InferError> {
        let name = self.node_name(op_id);
        let op_node = self
            .get_node(op_id)
            .and_then(|node| node.as_operator())
            .ok_or_else(|| {
                InferError::planning(format!("node \"{}\" is not an operator", name))
            })?;
        let operator = op_node.shared_operator();
        let output_ids = op_node.output_ids().to_vec();
        let input_shapes: Vec<Option<SymShape>> = op_node
            .input_ids()
            .iter()
            .map(|id| id.and_then(|id| self.node_shape(id)).cloned())
            .collect();

        let node_error = |kind: InferErrorKind| {
            InferError::new(Some(name.as_str()), Some(operator.name()), kind)
        };

        let rule = operator
            .as_infer_shapes()
            .ok_or_else(|| node_error(InferErrorKind::ShapeRuleUnavailable))?;
        check_input_ranks(rule.min_input_ranks(), &input_shapes)
            .map_err(|err| node_error(InferErrorKind::Shape(err)))?;
        let output_shapes = rule
            .infer_shapes(&input_shapes)
            .map_err(|err| node_error(InferErrorKind::Shape(err)))?;

        if output_shapes.len() != output_ids.len() {
            return Err(node_error(InferErrorKind::OutputCountMismatch {
                expected: output_ids.len(),
                actual: output_shapes.len(),
            }));
        }

        let is_value = |id: NodeId| matches!(self.get_node(id), Some(Node::Value(_)));
        if let Some(output_id) = output_ids.iter().filter_map(|id| *id).find(|id| !is_value(*id)) {
            return Err(node_error(InferErrorKind::Planning(format!(
                "output \"{}\" is not a value node",
                self.node_name(output_id)
            ))));
        }

        tracing::debug!(
            node = %name,
            op_type = operator.name(),
            inputs = %format_shapes(input_shapes.iter().map(|s| s.as_ref())),
            outputs = %format_shapes(output_shapes.iter().map(Some)),
            "inferred output shapes"
        );

        for (output_id, shape) in zip(output_ids, output_shapes) {
            let Some(output_id) = output_id else {
                continue;
            };
            if let Some(Node::Value(value)) = self.nodes.get_mut(output_id.as_usize()) {
                value.set_shape(shape);
            }
        }

        Ok(())
    }

    /// Infer the shapes of all values produced by operators in the graph.
    ///
    /// Operators are visited in topological order, so each operator's inputs
    /// are resolved before it is visited. Inference stops at the first
    /// operator that fails.
    pub fn infer_shapes(&mut self) -> Result<(), InferError> {
        let plan = Planner::with_graph(self).create_plan()?;
        tracing::debug!(operators = plan.len(), "starting shape inference");
        for op_id in plan {
            self.infer_node(op_id)?;
        }
        Ok(())
    }
}

/// Format a list of optional shapes as `[1, 2], ?, [3]`.
pub(crate) fn format_shapes<'a>(shapes: impl Iterator<Item = Option<&'a SymShape>>) -> String {
    shapes
        .map(|shape| match shape {
            Some(shape) => shape.to_string(),
            None => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
