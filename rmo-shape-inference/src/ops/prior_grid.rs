use crate::infer_shapes::{input_dim, InferShapes, InferShapesError};
use crate::sym_expr::SymExpr;
use crate::sym_shape::SymShape;

/// Number of coordinates per generated box (x_min, y_min, x_max, y_max).
const BOX_COORDS: i32 = 4;

/// Shape inference for the ExperimentalDetectronPriorGridGenerator operator.
///
/// Inputs are `priors` with shape `[priors_num, 4]`, a feature map with shape
/// `[N, C, grid_h, grid_w]` and an optional image which does not affect the
/// output shape.
///
/// The output holds one box for every prior at every cell of the feature
/// map. Its shape is `[grid_h * grid_w * priors_num, 4]` if `flatten` is
/// true and `[grid_h, grid_w, priors_num, 4]` otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct PriorGridGenerator {
    pub flatten: bool,
}

impl InferShapes for PriorGridGenerator {
    fn min_input_ranks(&self) -> &[usize] {
        &[1, 4]
    }

    fn infer_shapes(&self, inputs: &[Option<SymShape>]) -> Result<Vec<SymShape>, InferShapesError> {
        if !(2..=3).contains(&inputs.len()) {
            return Err(InferShapesError::IncorrectInputCount);
        }

        let priors_num = input_dim(inputs, 0, 0)?;
        let grid_h = input_dim(inputs, 1, 2)?;
        let grid_w = input_dim(inputs, 1, 3)?;
        let coords = SymExpr::from(BOX_COORDS);

        let out_shape = if self.flatten {
            let num_boxes = (grid_h * grid_w * priors_num).simplify();
            SymShape::new([num_boxes, coords])
        } else {
            SymShape::new([grid_h, grid_w, priors_num, coords])
        };

        Ok([out_shape].into())
    }
}
