use rmo_shape_inference::ops::PriorGridGenerator;
use rmo_shape_inference::{InferShapes, InferShapesError, SymShape};

use crate::operator::{AttrValue, Operator};

/// Generates a grid of prior boxes over the cells of a feature map.
///
/// Inputs are the priors (`[priors_num, 4]`), the feature map
/// (`[N, C, H, W]`) and optionally the image (`[N, C, H_img, W_img]`).
///
/// `h`, `w`, `stride_x` and `stride_y` are carried through to backends
/// unchanged. They do not affect the output shape, which depends only on the
/// input shapes and `flatten`.
///
/// When read from a model description, `flatten` is required and the other
/// attributes default to zero. [`Default`] is for constructing the operator
/// directly and sets `flatten` to `true`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentalDetectronPriorGridGenerator {
    /// Return boxes as a `[H * W * priors_num, 4]` list instead of a
    /// `[H, W, priors_num, 4]` grid.
    pub flatten: bool,

    /// Grid height.
    pub h: i64,

    /// Grid width.
    pub w: i64,

    /// Horizontal step between grid cells.
    pub stride_x: f32,

    /// Vertical step between grid cells.
    pub stride_y: f32,
}

impl ExperimentalDetectronPriorGridGenerator {
    pub const OP_TYPE: &'static str = "ExperimentalDetectronPriorGridGenerator";
    pub const VERSION: &'static str = "opset6";
}

impl Default for ExperimentalDetectronPriorGridGenerator {
    fn default() -> Self {
        Self {
            flatten: true,
            h: 0,
            w: 0,
            stride_x: 0.,
            stride_y: 0.,
        }
    }
}

impl Operator for ExperimentalDetectronPriorGridGenerator {
    fn name(&self) -> &str {
        Self::OP_TYPE
    }

    fn version(&self) -> &str {
        Self::VERSION
    }

    fn as_infer_shapes(&self) -> Option<&dyn InferShapes> {
        Some(self)
    }

    fn backend_attrs(&self) -> Vec<(&'static str, AttrValue)> {
        vec![
            ("flatten", AttrValue::Bool(self.flatten)),
            ("h", AttrValue::Int(self.h)),
            ("w", AttrValue::Int(self.w)),
            ("stride_x", AttrValue::Float(self.stride_x)),
            ("stride_y", AttrValue::Float(self.stride_y)),
        ]
    }
}

impl InferShapes for ExperimentalDetectronPriorGridGenerator {
    fn min_input_ranks(&self) -> &[usize] {
        &[1, 4]
    }

    fn infer_shapes(&self, inputs: &[Option<SymShape>]) -> Result<Vec<SymShape>, InferShapesError> {
        PriorGridGenerator {
            flatten: self.flatten,
        }
        .infer_shapes(inputs)
    }
}
