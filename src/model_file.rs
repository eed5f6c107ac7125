//! JSON description of a model graph.
//!
//! A graph description lists the graph's input values and its operator
//! nodes. Values produced by operators are declared implicitly by naming
//! them in an operator's `outputs`.
//!
//! ```json
//! {
//!   "inputs": [
//!     { "name": "priors", "shape": [3, 4] },
//!     { "name": "feature_map", "shape": [1, 256, "height", "width"] }
//!   ],
//!   "nodes": [
//!     {
//!       "name": "grid",
//!       "type": "ExperimentalDetectronPriorGridGenerator",
//!       "version": "opset6",
//!       "attrs": { "flatten": true, "stride_x": 16.0, "stride_y": 16.0 },
//!       "inputs": ["priors", "feature_map"],
//!       "outputs": ["anchors"]
//!     }
//!   ]
//! }
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rmo_shape_inference::{SymExpr, SymShape};

/// Top-level graph description.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GraphDef {
    /// Values supplied to the graph.
    pub inputs: Vec<ValueDef>,

    /// Operator nodes. These may be listed in any order.
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
}

/// Description of a graph input.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValueDef {
    pub name: String,

    /// Shape of the value, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<DimDef>>,
}

impl ValueDef {
    /// Convert the declared dimensions into a symbolic shape.
    ///
    /// Returns `Ok(None)` if the value has no declared shape.
    pub fn sym_shape(&self) -> Result<Option<SymShape>, DimSizeError> {
        let Some(dims) = self.shape.as_ref() else {
            return Ok(None);
        };
        dims.iter().map(DimDef::to_sym_expr).collect::<Result<_, _>>().map(Some)
    }
}

/// A dimension in a value's shape.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DimDef {
    /// A dimension with a known size.
    Fixed(usize),

    /// A dimension whose size is identified by name.
    Symbolic(String),
}

impl DimDef {
    /// Convert the dimension into a size expression.
    ///
    /// Fails if a fixed size does not fit in an `i64`.
    pub fn to_sym_expr(&self) -> Result<SymExpr, DimSizeError> {
        match self {
            DimDef::Fixed(size) => i64::try_from(*size)
                .map(SymExpr::Value)
                .map_err(|_| DimSizeError { size: *size }),
            DimDef::Symbolic(name) => Ok(SymExpr::var(name)),
        }
    }
}

/// A fixed dimension size is too large to be used in a shape.
#[derive(Clone, Debug, PartialEq)]
pub struct DimSizeError {
    pub size: usize,
}

impl Display for DimSizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "dimension size {} exceeds the maximum of {}", self.size, i64::MAX)
    }
}

impl Error for DimSizeError {}

/// Description of an operator node.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NodeDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Operator type, eg. `ExperimentalDetectronPriorGridGenerator`.
    #[serde(rename = "type")]
    pub op_type: String,

    /// Operator set version the node was written for. If present this must
    /// match the version of the registered operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,

    /// Names of the values connected to each input port. `null` marks an
    /// unconnected optional input.
    #[serde(default)]
    pub inputs: Vec<Option<String>>,

    /// Names of the values written by each output port.
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl GraphDef {
    /// Parse a graph description from a JSON string.
    ///
    /// Input dimensions are checked to be in range, so that
    /// [`ValueDef::sym_shape`] succeeds for each input of the parsed graph.
    pub fn from_json(json: &str) -> Result<GraphDef, serde_json::Error> {
        use serde::de::Error as _;

        let def: GraphDef = serde_json::from_str(json)?;
        for input in &def.inputs {
            input.sym_shape().map_err(|err| {
                serde_json::Error::custom(format!("input \"{}\": {}", input.name, err))
            })?;
        }
        Ok(def)
    }

    /// Replace symbolic input dimensions with fixed sizes.
    ///
    /// `resolve` is called with the input name and the symbol name of each
    /// symbolic dimension. If it returns a size, the dimension becomes fixed.
    pub fn resolve_dims(&mut self, resolve: impl Fn(&str, &str) -> Option<usize>) {
        for input in &mut self.inputs {
            let Some(shape) = input.shape.as_mut() else {
                continue;
            };
            for dim in shape.iter_mut() {
                if let DimDef::Symbolic(sym_name) = dim {
                    if let Some(size) = resolve(&input.name, sym_name) {
                        *dim = DimDef::Fixed(size);
                    }
                }
            }
        }
    }
}
