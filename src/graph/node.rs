use std::sync::Arc;

use rmo_shape_inference::SymShape;

use super::NodeId;
use crate::operator::Operator;

/// A node in a [`Graph`](crate::Graph).
#[derive(Debug)]
pub enum Node {
    Operator(OperatorNode),
    Value(ValueNode),
}

impl Node {
    /// Return the name given to this node when it was added, if any.
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            Node::Operator(op) => &op.name,
            Node::Value(val) => &val.name,
        };
        name.as_deref()
    }

    /// Return the shape of a value node, if known. Operators have no shape.
    pub fn shape(&self) -> Option<&SymShape> {
        self.as_value().and_then(|val| val.shape())
    }

    pub fn as_operator(&self) -> Option<&OperatorNode> {
        if let Node::Operator(op) = self {
            Some(op)
        } else {
            None
        }
    }

    pub fn as_value(&self) -> Option<&ValueNode> {
        if let Node::Value(val) = self {
            Some(val)
        } else {
            None
        }
    }
}

/// An operator together with the value nodes connected to its ports.
#[derive(Debug)]
pub struct OperatorNode {
    name: Option<String>,
    operator: Arc<dyn Operator + Send + Sync>,

    /// Value connected to each input port. `None` for unconnected optional
    /// inputs.
    inputs: Box<[Option<NodeId>]>,

    /// Value written by each output port.
    outputs: Box<[Option<NodeId>]>,
}

impl OperatorNode {
    pub fn new(
        name: Option<&str>,
        inputs: &[Option<NodeId>],
        outputs: &[Option<NodeId>],
        operator: Arc<dyn Operator + Send + Sync>,
    ) -> Self {
        OperatorNode {
            name: name.map(String::from),
            operator,
            inputs: inputs.into(),
            outputs: outputs.into(),
        }
    }

    pub fn input_ids(&self) -> &[Option<NodeId>] {
        &self.inputs
    }

    pub fn output_ids(&self) -> &[Option<NodeId>] {
        &self.outputs
    }

    /// Return the IDs of the values connected to input ports, skipping
    /// unconnected ports.
    pub fn connected_inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.iter().filter_map(|id| *id)
    }

    pub fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }

    /// Return the operator type, eg. "ExperimentalDetectronPriorGridGenerator".
    pub fn op_type(&self) -> &str {
        self.operator.name()
    }

    /// Return a shared reference to this node's operator, which can outlive
    /// borrows of the graph.
    pub fn shared_operator(&self) -> Arc<dyn Operator + Send + Sync> {
        Arc::clone(&self.operator)
    }
}

/// A placeholder for a tensor, such as a graph input or an operator output.
#[derive(Debug)]
pub struct ValueNode {
    name: Option<String>,
    shape: Option<SymShape>,
}

impl ValueNode {
    pub fn new(name: Option<&str>, shape: Option<SymShape>) -> Self {
        ValueNode {
            name: name.map(String::from),
            shape,
        }
    }

    /// Return the declared or inferred shape, if known.
    pub fn shape(&self) -> Option<&SymShape> {
        self.shape.as_ref()
    }

    pub(crate) fn set_shape(&mut self, shape: SymShape) {
        self.shape = Some(shape);
    }
}
