//! Operators that can appear in model graphs.
//!
//! Each operator is a struct holding the operator's attributes. Operators
//! implement [`Operator`](crate::Operator) and expose their shape inference
//! rule through [`Operator::as_infer_shapes`](crate::Operator::as_infer_shapes).

mod prior_grid;

pub use prior_grid::ExperimentalDetectronPriorGridGenerator;
