//! Shape inference rules for individual operators.

mod prior_grid;

pub use prior_grid::PriorGridGenerator;
