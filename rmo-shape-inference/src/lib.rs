//! Shape inference for model graph operators.
//!
//! # About shape inference
//!
//! Before a model graph can be lowered for a backend, the shape of every
//! value in the graph must be known. Shapes of graph inputs are declared by
//! the model. Shapes of every other value are derived by walking the graph
//! in dependency order and asking each operator how it transforms the shapes
//! of its inputs into the shapes of its outputs.
//!
//! As an example, the `ExperimentalDetectronPriorGridGenerator` operator
//! tiles a set of prior boxes across every cell of a feature map:
//!
//! ```text
//! priors      = [3, 4]                    // 3 priors with 4 coordinates
//! feature_map = [1, 256, "height", "width"]
//! grid        = PriorGridGenerator<flatten=true>(priors, feature_map)
//!             // [3 * height * width, 4]
//! ```
//!
//! # Crate overview
//!
//! The main export of this crate is the [`InferShapes`] trait, plus types
//! which implement it in [`ops`]. Dimension sizes are [`SymExpr`] values,
//! which may be known integers, named symbols or products of these. A full
//! shape is a [`SymShape`].

mod infer_shapes;
pub mod ops;
mod sym_expr;
mod sym_shape;

pub use infer_shapes::{check_input_ranks, input_dim, input_shape, InferShapes, InferShapesError};
pub use sym_expr::{SymExpr, Symbol};
pub use sym_shape::SymShape;
