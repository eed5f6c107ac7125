use std::any::Any;
use std::fmt::{self, Debug};

use rmo_shape_inference::InferShapes;

/// Value of an operator attribute that is exposed to backends.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f32),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(val) => write!(f, "{}", val),
            Self::Int(val) => write!(f, "{}", val),
            Self::Float(val) => write!(f, "{:?}", val),
        }
    }
}

/// An operator instance in a model graph.
///
/// Operators are immutable once constructed. Their attributes are fixed when
/// the operator is read from a model description (see
/// [`ReadOp`](crate::ReadOp)).
pub trait Operator: Any + Debug {
    /// Return the operator type, eg. "ExperimentalDetectronPriorGridGenerator".
    fn name(&self) -> &str;

    /// Return the operator set version whose semantics this operator follows.
    fn version(&self) -> &str;

    /// Return the shape inference rule for this operator, if it has one.
    fn as_infer_shapes(&self) -> Option<&dyn InferShapes> {
        None
    }

    /// Return the attributes that are passed through to backends, in
    /// serialization order.
    fn backend_attrs(&self) -> Vec<(&'static str, AttrValue)> {
        Vec::new()
    }
}

impl dyn Operator {
    /// Downcast this operator to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }
}

impl dyn Operator + Send + Sync {
    /// Downcast this operator to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }
}
