//! rmo is a model graph representation with compile-time shape inference.
//!
//! Models are described as a graph of operators connected through value
//! nodes. Loading a model resolves each operator type through an
//! [`OpRegistry`] into a typed operator with fixed attributes. Shape
//! inference then walks the graph in dependency order and computes the
//! shape of every operator output from the shapes of its inputs.
//!
//! ```
//! use rmo::ModelOptions;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let json = r#"{
//!   "inputs": [
//!     {"name": "priors", "shape": [3, 4]},
//!     {"name": "feature_map", "shape": [1, 256, 5, 7]}
//!   ],
//!   "nodes": [{
//!     "name": "grid",
//!     "type": "ExperimentalDetectronPriorGridGenerator",
//!     "attrs": {"flatten": true},
//!     "inputs": ["priors", "feature_map"],
//!     "outputs": ["anchors"]
//!   }]
//! }"#;
//!
//! let mut model = ModelOptions::with_all_ops().load_str(json)?;
//! model.infer_shapes()?;
//!
//! let anchors = model.shape("anchors").unwrap();
//! assert_eq!(anchors.to_fixed(), Some(vec![105, 4]));
//! # Ok(()) }
//! ```
//!
//! Shape inference rules and symbolic dimensions come from the
//! `rmo-shape-inference` crate, which is re-exported as [`shape_inference`].

mod env;
mod graph;
mod model;
mod model_file;
mod op_registry;
mod operator;

pub mod ops;

pub use env::{env_flag, str_as_bool};
pub use graph::{
    Graph, InferError, InferErrorKind, Node, NodeId, OperatorNode, Planner, ValueNode,
};
pub use model::{Model, ModelLoadError, ModelOptions, NodeInfo};
pub use model_file::{DimDef, DimSizeError, GraphDef, NodeDef, ValueDef};
pub use op_registry::{Attrs, OpRegistry, ReadOp, ReadOpError};
pub use operator::{AttrValue, Operator};

pub use rmo_shape_inference as shape_inference;
pub use rmo_shape_inference::{SymExpr, SymShape};
