//! Traits for shape inference and checked access to input shapes.

use std::error::Error;
use std::fmt;

use crate::sym_expr::SymExpr;
use crate::sym_shape::SymShape;

#[derive(Clone, Debug, PartialEq)]
pub enum InferShapesError {
    /// Too many or too few inputs were provided for this operator.
    IncorrectInputCount,

    /// An input's shape has not been resolved.
    MissingInputShape { input: usize },

    /// An input has fewer dimensions than the operator requires.
    IncorrectRank {
        input: usize,
        min_rank: usize,
        rank: usize,
    },
}

impl fmt::Display for InferShapesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncorrectInputCount => write!(f, "incorrect number of inputs"),
            Self::MissingInputShape { input } => write!(f, "input {} has no shape", input),
            Self::IncorrectRank {
                input,
                min_rank,
                rank,
            } => write!(
                f,
                "input {} has rank {} but at least {} is required",
                input, rank, min_rank
            ),
        }
    }
}

impl Error for InferShapesError {}

/// Infer the shapes of an operator's outputs given the shapes of its inputs.
pub trait InferShapes {
    /// Return the minimum rank required for each input.
    ///
    /// The `i`th entry is the minimum rank of input `i`. Inputs past the end
    /// of the slice have no requirement. Graph drivers use this to reject
    /// malformed graphs before calling [`infer_shapes`](InferShapes::infer_shapes).
    fn min_input_ranks(&self) -> &[usize] {
        &[]
    }

    /// Infer the shapes of an operator's outputs.
    ///
    /// `inputs` has one entry per input port. An entry is `None` if the
    /// shape of that input has not been resolved.
    fn infer_shapes(&self, inputs: &[Option<SymShape>]) -> Result<Vec<SymShape>, InferShapesError>;
}

/// Return the resolved shape of the `index`'th input.
pub fn input_shape(
    inputs: &[Option<SymShape>],
    index: usize,
) -> Result<&SymShape, InferShapesError> {
    inputs
        .get(index)
        .ok_or(InferShapesError::IncorrectInputCount)?
        .as_ref()
        .ok_or(InferShapesError::MissingInputShape { input: index })
}

/// Return the size of dimension `axis` of the `input`'th input's shape.
pub fn input_dim(
    inputs: &[Option<SymShape>],
    input: usize,
    axis: usize,
) -> Result<SymExpr, InferShapesError> {
    let shape = input_shape(inputs, input)?;
    shape
        .dim(axis)
        .cloned()
        .ok_or(InferShapesError::IncorrectRank {
            input,
            min_rank: axis + 1,
            rank: shape.ndim(),
        })
}

/// Check that inputs meet the minimum ranks in `min_ranks`.
///
/// Inputs that are absent, or beyond the end of `min_ranks`, are not
/// checked. An input that is present but has no shape is an error if it
/// has a rank requirement.
pub fn check_input_ranks(
    min_ranks: &[usize],
    inputs: &[Option<SymShape>],
) -> Result<(), InferShapesError> {
    for (input, (&min_rank, shape)) in min_ranks.iter().zip(inputs).enumerate() {
        let shape = shape
            .as_ref()
            .ok_or(InferShapesError::MissingInputShape { input })?;
        if shape.ndim() < min_rank {
            return Err(InferShapesError::IncorrectRank {
                input,
                min_rank,
                rank: shape.ndim(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rmo_testing::TestCases;

    use super::{check_input_ranks, input_dim, input_shape, InferShapesError};
    use crate::sym_expr::SymExpr;
    use crate::sym_shape::{sym_shape, SymShape};

    #[test]
    fn test_input_shape() {
        let inputs = [Some(sym_shape!(3, 4)), None];

        assert_eq!(input_shape(&inputs, 0), Ok(&sym_shape!(3, 4)));
        assert_eq!(
            input_shape(&inputs, 1),
            Err(InferShapesError::MissingInputShape { input: 1 })
        );
        assert_eq!(
            input_shape(&inputs, 2),
            Err(InferShapesError::IncorrectInputCount)
        );
    }

    #[test]
    fn test_input_dim() {
        let inputs = [Some(sym_shape!(1, 2))];

        assert_eq!(input_dim(&inputs, 0, 1), Ok(SymExpr::from(2)));
        assert_eq!(
            input_dim(&inputs, 0, 3),
            Err(InferShapesError::IncorrectRank {
                input: 0,
                min_rank: 4,
                rank: 2,
            })
        );
    }

    #[test]
    fn test_check_input_ranks() {
        #[derive(Debug)]
        struct Case {
            inputs: Vec<Option<SymShape>>,
            expected: Result<(), InferShapesError>,
        }

        let min_ranks = [1, 4];

        let cases = [
            Case {
                inputs: [Some(sym_shape!(3, 4)), Some(sym_shape!(1, 8, 5, 7))].into(),
                expected: Ok(()),
            },
            // Inputs without rank requirements are ignored.
            Case {
                inputs: [Some(sym_shape!(3)), Some(sym_shape!(1, 8, 5, 7)), None].into(),
                expected: Ok(()),
            },
            Case {
                inputs: [Some(sym_shape!(3, 4)), Some(sym_shape!(1, 2))].into(),
                expected: Err(InferShapesError::IncorrectRank {
                    input: 1,
                    min_rank: 4,
                    rank: 2,
                }),
            },
            Case {
                inputs: [Some(SymShape::default()), Some(sym_shape!(1, 8, 5, 7))].into(),
                expected: Err(InferShapesError::IncorrectRank {
                    input: 0,
                    min_rank: 1,
                    rank: 0,
                }),
            },
            Case {
                inputs: [None, Some(sym_shape!(1, 8, 5, 7))].into(),
                expected: Err(InferShapesError::MissingInputShape { input: 0 }),
            },
        ];

        cases.test_each(|case| {
            assert_eq!(check_input_ranks(&min_ranks, &case.inputs), case.expected);
        });
    }

    #[test]
    fn test_error_display() {
        let err = InferShapesError::IncorrectRank {
            input: 1,
            min_rank: 4,
            rank: 2,
        };
        assert_eq!(
            err.to_string(),
            "input 1 has rank 2 but at least 4 is required"
        );
    }
}
