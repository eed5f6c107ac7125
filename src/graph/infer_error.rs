use std::error::Error;
use std::fmt::{Display, Formatter};

use rmo_shape_inference::InferShapesError;

/// Errors that occur when inferring the shapes of values in a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct InferError {
    node: Option<String>,
    op_type: Option<String>,
    kind: InferErrorKind,
}

impl InferError {
    pub(crate) fn new(node: Option<&str>, op_type: Option<&str>, kind: InferErrorKind) -> Self {
        InferError {
            node: node.map(|s| s.to_string()),
            op_type: op_type.map(|s| s.to_string()),
            kind,
        }
    }

    pub(crate) fn planning(msg: String) -> Self {
        Self::new(None, None, InferErrorKind::Planning(msg))
    }

    /// Name of the operator node that this error relates to.
    ///
    /// This is `None` if the error does not relate to a particular node.
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Type of the operator that this error relates to, if any.
    pub fn op_type(&self) -> Option<&str> {
        self.op_type.as_deref()
    }

    /// Return the category of error.
    pub fn kind(&self) -> &InferErrorKind {
        &self.kind
    }
}

impl Display for InferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.node, &self.op_type) {
            (Some(node), Some(op_type)) => {
                write!(f, "node \"{}\" ({}): {}", node, op_type, self.kind)
            }
            (Some(node), None) => write!(f, "node \"{}\": {}", node, self.kind),
            (None, _) => self.kind.fmt(f),
        }
    }
}

impl Error for InferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            InferErrorKind::Shape(err) => Some(err),
            _ => None,
        }
    }
}

/// The category of shape inference error. See [`InferError::kind`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum InferErrorKind {
    /// The graph could not be ordered for inference, eg. because it contains
    /// a cycle or an invalid node ID.
    Planning(String),

    /// The operator has no shape inference rule.
    ShapeRuleUnavailable,

    /// The operator's shape inference rule rejected its inputs.
    Shape(InferShapesError),

    /// The rule produced a different number of shapes than the node has
    /// outputs.
    OutputCountMismatch { expected: usize, actual: usize },
}

impl Display for InferErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning(msg) => write!(f, "planning error: {}", msg),
            Self::ShapeRuleUnavailable => write!(f, "operator has no shape inference rule"),
            Self::Shape(err) => write!(f, "shape inference failed: {}", err),
            Self::OutputCountMismatch { expected, actual } => write!(
                f,
                "operator produced {} output shapes but the node has {} outputs",
                actual, expected
            ),
        }
    }
}
