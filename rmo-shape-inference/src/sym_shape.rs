//! Tensor shapes with symbolic dimensions.

use std::fmt;

use smallvec::SmallVec;

use crate::sym_expr::SymExpr;

/// Shape of a tensor whose dimension sizes may be symbolic.
///
/// ```
/// use rmo_shape_inference::{SymExpr, SymShape};
///
/// let feature_map = SymShape::new([
///     SymExpr::from(1),
///     SymExpr::from(256),
///     SymExpr::from("h"),
///     SymExpr::from("w"),
/// ]);
/// assert_eq!(feature_map.ndim(), 4);
/// assert_eq!(feature_map.dim(2), Some(&SymExpr::from("h")));
/// assert_eq!(feature_map.dim(4), None);
/// assert_eq!(feature_map.to_string(), "[1, 256, h, w]");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymShape(SmallVec<[SymExpr; 4]>);

impl SymShape {
    /// Create a shape from a sequence of dimension sizes.
    pub fn new(dims: impl IntoIterator<Item = SymExpr>) -> Self {
        Self(dims.into_iter().collect())
    }

    /// Create a shape where all dimension sizes are known.
    ///
    /// Panics if a size exceeds `i64::MAX`. See
    /// [`try_from_fixed`](SymShape::try_from_fixed) for a non-panicking
    /// version.
    pub fn from_fixed(dims: &[usize]) -> Self {
        match Self::try_from_fixed(dims) {
            Some(shape) => shape,
            None => panic!("dimension sizes {:?} exceed i64::MAX", dims),
        }
    }

    /// Create a shape where all dimension sizes are known, or `None` if a
    /// size exceeds `i64::MAX`.
    pub fn try_from_fixed(dims: &[usize]) -> Option<Self> {
        dims.iter()
            .map(|&size| i64::try_from(size).ok().map(SymExpr::Value))
            .collect()
    }

    /// Return the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Return the size of the `axis`'th dimension, or `None` if `axis` is
    /// out of bounds.
    pub fn dim(&self, axis: usize) -> Option<&SymExpr> {
        self.0.get(axis)
    }

    pub fn dims(&self) -> &[SymExpr] {
        &self.0
    }

    /// Return the number of elements as a simplified expression.
    pub fn numel(&self) -> SymExpr {
        self.0
            .iter()
            .cloned()
            .reduce(|prod, dim| prod * dim)
            .unwrap_or(SymExpr::Value(1))
            .simplify()
    }

    /// Return the dimension sizes if they are all known and non-negative.
    pub fn to_fixed(&self) -> Option<Vec<usize>> {
        self.0
            .iter()
            .map(|dim| dim.as_value().and_then(|size| size.try_into().ok()))
            .collect()
    }

    /// Simplify the expression for each dimension.
    ///
    /// See [`SymExpr::simplify`].
    pub fn simplify(&self) -> Self {
        Self(self.0.iter().map(|dim| dim.simplify()).collect())
    }
}

impl FromIterator<SymExpr> for SymShape {
    fn from_iter<I: IntoIterator<Item = SymExpr>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for SymShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
pub(crate) use tests::sym_shape;
