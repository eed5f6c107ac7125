use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

use rustc_hash::FxHashMap;

use rmo_shape_inference::SymShape;

use crate::graph::{Graph, InferError, Node, NodeId};
use crate::model_file::GraphDef;
use crate::op_registry::{OpRegistry, ReadOpError};
use crate::operator::Operator;

/// A model graph loaded from a graph description.
///
/// Models are loaded using [`ModelOptions`]. After loading, call
/// [`infer_shapes`](Model::infer_shapes) to resolve the shapes of the
/// values produced by each operator.
pub struct Model {
    graph: Graph,
    node_ids: FxHashMap<String, NodeId>,
    input_ids: Vec<NodeId>,
    output_ids: Vec<NodeId>,
}

/// Provides access to metadata about a graph node.
pub struct NodeInfo<'a> {
    node: &'a Node,
}

impl<'a> NodeInfo<'a> {
    /// Return the unique name associated with the node, if present.
    pub fn name(&self) -> Option<&'a str> {
        self.node.name()
    }

    /// Return the shape associated with a value node, if known.
    ///
    /// The shape can be a combination of fixed values and symbolic
    /// expressions.
    pub fn shape(&self) -> Option<&'a SymShape> {
        self.node.shape()
    }

    /// Return the operator of an operator node.
    pub fn operator(&self) -> Option<&'a dyn Operator> {
        self.node.as_operator().map(|op| op.operator())
    }

    /// Return the IDs of the values connected to an operator node's inputs.
    pub fn input_ids(&self) -> &'a [Option<NodeId>] {
        self.node
            .as_operator()
            .map(|op| op.input_ids())
            .unwrap_or_default()
    }

    /// Return the IDs of the values written by an operator node's outputs.
    pub fn output_ids(&self) -> &'a [Option<NodeId>] {
        self.node
            .as_operator()
            .map(|op| op.output_ids())
            .unwrap_or_default()
    }
}

/// Options which customize how a model is loaded.
///
/// This can be used to load a model with only a subset of operators
/// available, or with custom operators registered.
pub struct ModelOptions {
    registry: OpRegistry,
}

impl ModelOptions {
    /// Create a set of options with all operators enabled.
    pub fn with_all_ops() -> ModelOptions {
        Self::with_ops(OpRegistry::with_all_ops())
    }

    /// Create a set of options with a custom set of operators enabled.
    pub fn with_ops(ops: OpRegistry) -> ModelOptions {
        ModelOptions { registry: ops }
    }

    /// Load a model from a JSON graph description file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Model, ModelLoadError> {
        let json = std::fs::read_to_string(path).map_err(ModelLoadError::ReadFailed)?;
        self.load_str(&json)
    }

    /// Load a model from a JSON graph description.
    pub fn load_str(&self, json: &str) -> Result<Model, ModelLoadError> {
        let def = GraphDef::from_json(json).map_err(ModelLoadError::ParseFailed)?;
        self.load_def(&def)
    }

    /// Load a model from a parsed graph description.
    pub fn load_def(&self, def: &GraphDef) -> Result<Model, ModelLoadError> {
        Model::load_impl(def, &self.registry)
    }
}

impl Model {
    /// Load a model from a JSON graph description file, with all operators
    /// enabled.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Model, ModelLoadError> {
        ModelOptions::with_all_ops().load_file(path)
    }

    fn load_impl(def: &GraphDef, registry: &OpRegistry) -> Result<Model, ModelLoadError> {
        let output_count: usize = def.nodes.iter().map(|node| node.outputs.len()).sum();
        check_node_count(def.inputs.len() + output_count + def.nodes.len())?;

        let mut graph = Graph::new();

        // Map of value name to graph node ID
        let mut node_ids: FxHashMap<String, NodeId> = FxHashMap::default();
        let mut input_ids = Vec::with_capacity(def.inputs.len());

        for input in &def.inputs {
            if node_ids.contains_key(&input.name) {
                return Err(ModelLoadError::GraphError(format!(
                    "duplicate value name \"{}\"",
                    input.name
                )));
            }
            let shape = input.sym_shape().map_err(|err| {
                ModelLoadError::GraphError(format!("input \"{}\": {}", input.name, err))
            })?;
            let id = graph.add_value(Some(input.name.as_str()), shape);
            node_ids.insert(input.name.clone(), id);
            input_ids.push(id);
        }

        // Declare the values produced by operators before connecting inputs,
        // so that nodes can be listed in any order.
        let mut output_ids = Vec::new();
        for node in &def.nodes {
            for output in &node.outputs {
                if node_ids.contains_key(output) {
                    return Err(ModelLoadError::GraphError(format!(
                        "value \"{}\" is produced more than once",
                        output
                    )));
                }
                let id = graph.add_value(Some(output.as_str()), None);
                node_ids.insert(output.clone(), id);
                output_ids.push(id);
            }
        }

        for (index, node) in def.nodes.iter().enumerate() {
            let node_name = node
                .name
                .clone()
                .unwrap_or_else(|| format!("[node {}]", index));

            let op = registry
                .read_op(&node.op_type, node.version.as_deref(), &node.attrs)
                .map_err(|error| ModelLoadError::OperatorInvalid {
                    node: node_name.clone(),
                    error,
                })?;

            let inputs = node
                .inputs
                .iter()
                .map(|input| match input {
                    Some(name) => node_ids.get(name).copied().map(Some).ok_or_else(|| {
                        ModelLoadError::GraphError(format!(
                            "node \"{}\" reads unknown value \"{}\"",
                            node_name, name
                        ))
                    }),
                    None => Ok(None),
                })
                .collect::<Result<Vec<_>, _>>()?;

            let outputs: Vec<Option<NodeId>> = node
                .outputs
                .iter()
                .map(|output| node_ids.get(output).copied())
                .collect();

            graph.add_op(node.name.as_deref(), op, &inputs, &outputs);
        }

        tracing::debug!(
            inputs = input_ids.len(),
            operators = def.nodes.len(),
            "loaded model graph"
        );

        Ok(Model {
            graph,
            node_ids,
            input_ids,
            output_ids,
        })
    }

    /// Infer the shapes of all values produced by operators in the graph.
    ///
    /// This can be called repeatedly. Shapes that have already been inferred
    /// are recomputed and, if the graph inputs are unchanged, will be the
    /// same.
    pub fn infer_shapes(&mut self) -> Result<(), InferError> {
        self.graph.infer_shapes()
    }

    /// Find a value node in the model's graph given its name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_ids.get(name).copied()
    }

    /// Return the shape of a named value, if known.
    pub fn shape(&self, name: &str) -> Option<&SymShape> {
        self.find_node(name)
            .and_then(|id| self.graph.node_shape(id))
    }

    /// Return the IDs of the model's input values.
    pub fn input_ids(&self) -> &[NodeId] {
        &self.input_ids
    }

    /// Return the IDs of the values produced by operators.
    pub fn output_ids(&self) -> &[NodeId] {
        &self.output_ids
    }

    /// Return the IDs of operator nodes, in the order they were listed.
    pub fn operator_ids(&self) -> Vec<NodeId> {
        self.graph.operator_ids().collect()
    }

    /// Return metadata about a node in the model's graph.
    pub fn node_info(&self, id: NodeId) -> Option<NodeInfo<'_>> {
        self.graph.get_node(id).map(|node| NodeInfo { node })
    }

    /// Return the debug name for a node.
    pub fn node_name(&self, id: NodeId) -> String {
        self.graph.node_name(id)
    }

    /// Return the model's graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

fn check_node_count(count: usize) -> Result<(), ModelLoadError> {
    if count > Graph::MAX_NODES {
        return Err(ModelLoadError::GraphError(format!(
            "graph has {} nodes, more than the maximum of {}",
            count,
            Graph::MAX_NODES
        )));
    }
    Ok(())
}

/// Errors reported when loading a model.
#[derive(Debug)]
pub enum ModelLoadError {
    /// An error occurred reading the file from disk.
    ReadFailed(std::io::Error),

    /// The graph description is not valid JSON or does not match the
    /// expected structure.
    ParseFailed(serde_json::Error),

    /// An operator could not be created from its description.
    OperatorInvalid { node: String, error: ReadOpError },

    /// An error occurred while connecting nodes in the graph, such as a
    /// reference to an unknown value.
    GraphError(String),
}

impl Display for ModelLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelLoadError::ReadFailed(e) => write!(f, "read error: {}", e),
            ModelLoadError::ParseFailed(e) => write!(f, "parse error: {}", e),
            ModelLoadError::OperatorInvalid { node, error } => {
                write!(f, "operator error in node \"{}\": {}", node, error)
            }
            ModelLoadError::GraphError(e) => write!(f, "graph error: {}", e),
        }
    }
}

impl Error for ModelLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelLoadError::ReadFailed(e) => Some(e),
            ModelLoadError::ParseFailed(e) => Some(e),
            ModelLoadError::OperatorInvalid { error, .. } => Some(error),
            ModelLoadError::GraphError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rmo_shape_inference::{InferShapesError, SymShape};
    use rmo_testing::TestCases;

    use super::{check_node_count, Model, ModelLoadError, ModelOptions};
    use crate::graph::{Graph, InferErrorKind};
    use crate::model_file::GraphDef;
    use crate::op_registry::{OpRegistry, ReadOpError};
    use crate::ops::ExperimentalDetectronPriorGridGenerator;

    fn grid_model_json(feature_map_shape: &str, flatten: bool) -> String {
        format!(
            r#"{{
              "inputs": [
                {{ "name": "priors", "shape": [3, 4] }},
                {{ "name": "feature_map", "shape": {} }}
              ],
              "nodes": [
                {{
                  "name": "grid",
                  "type": "ExperimentalDetectronPriorGridGenerator",
                  "version": "opset6",
                  "attrs": {{ "flatten": {}, "h": 0, "w": 0, "stride_x": 16.0, "stride_y": 16.0 }},
                  "inputs": ["priors", "feature_map"],
                  "outputs": ["anchors"]
                }}
              ]
            }}"#,
            feature_map_shape, flatten
        )
    }

    #[test]
    fn test_load_and_infer() {
        #[derive(Debug)]
        struct Case {
            feature_map_shape: &'static str,
            flatten: bool,
            expected: &'static str,
        }

        let cases = [
            Case {
                feature_map_shape: "[1, 256, 5, 7]",
                flatten: true,
                expected: "[105, 4]",
            },
            Case {
                feature_map_shape: "[1, 256, 5, 7]",
                flatten: false,
                expected: "[5, 7, 3, 4]",
            },
            Case {
                feature_map_shape: r#"[1, 256, "height", "width"]"#,
                flatten: true,
                expected: "[3 * height * width, 4]",
            },
            Case {
                feature_map_shape: r#"[1, 256, "height", "width"]"#,
                flatten: false,
                expected: "[height, width, 3, 4]",
            },
        ];

        cases.test_each(|case| {
            let json = grid_model_json(case.feature_map_shape, case.flatten);
            let mut model = ModelOptions::with_all_ops().load_str(&json).unwrap();

            assert_eq!(model.shape("anchors"), None);
            model.infer_shapes().unwrap();
            assert_eq!(model.shape("anchors").unwrap().to_string(), case.expected);
        })
    }

    #[test]
    fn test_model_accessors() {
        let json = grid_model_json("[1, 256, 5, 7]", true);
        let model = ModelOptions::with_all_ops().load_str(&json).unwrap();

        assert_eq!(model.input_ids().len(), 2);
        assert_eq!(model.output_ids(), [model.find_node("anchors").unwrap()]);
        assert_eq!(model.find_node("missing"), None);
        assert_eq!(
            model.shape("priors"),
            Some(&SymShape::from_fixed(&[3, 4]))
        );

        let op_ids = model.operator_ids();
        assert_eq!(op_ids.len(), 1);
        assert_eq!(model.node_name(op_ids[0]), "grid");

        let info = model.node_info(op_ids[0]).unwrap();
        assert_eq!(info.name(), Some("grid"));
        assert_eq!(info.shape(), None);
        assert_eq!(info.input_ids().len(), 2);
        assert_eq!(info.output_ids(), [model.find_node("anchors")]);

        let op = info
            .operator()
            .unwrap()
            .downcast_ref::<ExperimentalDetectronPriorGridGenerator>()
            .unwrap();
        assert_eq!(op.stride_x, 16.);
        assert!(op.flatten);

        let input_info = model.node_info(model.input_ids()[0]).unwrap();
        assert!(input_info.operator().is_none());
        assert!(input_info.input_ids().is_empty());
    }

    #[test]
    fn test_nodes_in_any_order() {
        let json = r#"{
          "inputs": [
            { "name": "priors", "shape": [3, 4] },
            { "name": "feature_map", "shape": [1, 8, 2, 2] }
          ],
          "nodes": [
            {
              "type": "ExperimentalDetectronPriorGridGenerator",
              "attrs": { "flatten": true },
              "inputs": ["grid", "feature_map"],
              "outputs": ["anchors"]
            },
            {
              "type": "ExperimentalDetectronPriorGridGenerator",
              "attrs": { "flatten": true },
              "inputs": ["priors", "feature_map"],
              "outputs": ["grid"]
            }
          ]
        }"#;
        let mut model = Model::load_impl(
            &GraphDef::from_json(json).unwrap(),
            &OpRegistry::with_all_ops(),
        )
        .unwrap();
        model.infer_shapes().unwrap();
        assert_eq!(model.shape("grid"), Some(&SymShape::from_fixed(&[12, 4])));
        assert_eq!(
            model.shape("anchors"),
            Some(&SymShape::from_fixed(&[48, 4]))
        );
    }

    #[test]
    fn test_infer_errors() {
        // Feature map has too few dimensions.
        let json = grid_model_json("[1, 2]", true);
        let mut model = ModelOptions::with_all_ops().load_str(&json).unwrap();
        let err = model.infer_shapes().unwrap_err();
        assert_eq!(err.node(), Some("grid"));
        assert_eq!(
            err.kind(),
            &InferErrorKind::Shape(InferShapesError::IncorrectRank {
                input: 1,
                min_rank: 4,
                rank: 2
            })
        );
        assert_eq!(model.shape("anchors"), None);

        // Feature map has no shape.
        let json = r#"{
          "inputs": [{ "name": "priors", "shape": [3, 4] }, { "name": "feature_map" }],
          "nodes": [{
            "name": "grid",
            "type": "ExperimentalDetectronPriorGridGenerator",
            "attrs": { "flatten": true },
            "inputs": ["priors", "feature_map"],
            "outputs": ["anchors"]
          }]
        }"#;
        let mut model = ModelOptions::with_all_ops().load_str(json).unwrap();
        let err = model.infer_shapes().unwrap_err();
        assert_eq!(
            err.kind(),
            &InferErrorKind::Shape(InferShapesError::MissingInputShape { input: 1 })
        );
    }

    #[test]
    fn test_load_errors() {
        #[derive(Debug)]
        struct Case {
            json: &'static str,
            expected: &'static str,
        }

        let cases = [
            Case {
                json: "not json",
                expected: "parse error",
            },
            Case {
                json: r#"{"inputs": [{"name": "x"}, {"name": "x"}]}"#,
                expected: "graph error: duplicate value name \"x\"",
            },
            Case {
                json: r#"{"inputs": [{"name": "x"}], "nodes": [
                    {"name": "op", "type": "ExperimentalDetectronPriorGridGenerator",
                     "attrs": {"flatten": true}, "inputs": ["x", "y"], "outputs": ["z"]}
                ]}"#,
                expected: "graph error: node \"op\" reads unknown value \"y\"",
            },
            Case {
                json: r#"{"inputs": [{"name": "x"}], "nodes": [
                    {"type": "ExperimentalDetectronPriorGridGenerator",
                     "attrs": {"flatten": true}, "inputs": ["x", "x"], "outputs": ["x"]}
                ]}"#,
                expected: "graph error: value \"x\" is produced more than once",
            },
            Case {
                json: r#"{"inputs": [], "nodes": [{"type": "Conv", "outputs": ["y"]}]}"#,
                expected: "operator error in node \"[node 0]\": Conv operator not supported",
            },
        ];

        cases.test_each(|case| {
            let err = match ModelOptions::with_all_ops().load_str(case.json) {
                Ok(_) => panic!("expected load to fail"),
                Err(err) => err,
            };
            assert!(
                err.to_string().starts_with(case.expected),
                "unexpected error {}",
                err
            );
        })
    }

    #[test]
    fn test_operator_invalid() {
        #[derive(Debug)]
        struct Case {
            attrs: &'static str,
            error: &'static str,
        }

        let cases = [
            Case {
                attrs: r#"{ "flatten": "maybe" }"#,
                error: "expected a boolean",
            },
            // Grid attributes alone do not make `flatten` optional.
            Case {
                attrs: r#"{ "h": 0, "w": 0, "stride_x": 16.0, "stride_y": 16.0 }"#,
                error: "required attribute missing",
            },
            Case {
                attrs: "{}",
                error: "required attribute missing",
            },
        ];

        cases.test_each(|case| {
            let json = format!(
                r#"{{
                  "inputs": [
                    {{ "name": "priors", "shape": [3, 4] }},
                    {{ "name": "feature_map", "shape": [1, 256, 5, 7] }}
                  ],
                  "nodes": [{{
                    "name": "grid",
                    "type": "ExperimentalDetectronPriorGridGenerator",
                    "attrs": {},
                    "inputs": ["priors", "feature_map"],
                    "outputs": ["anchors"]
                  }}]
                }}"#,
                case.attrs
            );
            let result = ModelOptions::with_ops(OpRegistry::with_all_ops()).load_str(&json);
            match result {
                Err(ModelLoadError::OperatorInvalid { node, error }) => {
                    assert_eq!(node, "grid");
                    assert_eq!(
                        error,
                        ReadOpError::AttrError {
                            attr: "flatten".into(),
                            error: case.error.into(),
                        }
                    );
                }
                Err(err) => panic!("unexpected error {}", err),
                Ok(_) => panic!("expected operator error"),
            }
        })
    }

    #[test]
    fn test_missing_flatten_has_no_default() {
        let json = r#"{
          "inputs": [
            { "name": "priors", "shape": [3, 4] },
            { "name": "feature_map", "shape": [1, 256, 5, 7] }
          ],
          "nodes": [{
            "name": "grid",
            "type": "ExperimentalDetectronPriorGridGenerator",
            "inputs": ["priors", "feature_map"],
            "outputs": ["anchors"]
          }]
        }"#;
        let err = match ModelOptions::with_all_ops().load_str(json) {
            Ok(_) => panic!("expected load to fail"),
            Err(err) => err,
        };
        assert_eq!(
            err.to_string(),
            "operator error in node \"grid\": error in attribute \"flatten\": \
             required attribute missing"
        );
    }

    #[test]
    fn test_dim_size_out_of_range() {
        let json = grid_model_json(r#"[1, 256, "height", 7]"#, true);
        let mut def = GraphDef::from_json(&json).unwrap();
        def.resolve_dims(|_, _| Some(usize::MAX));

        let err = match ModelOptions::with_all_ops().load_def(&def) {
            Ok(_) => panic!("expected load to fail"),
            Err(err) => err,
        };
        assert!(matches!(err, ModelLoadError::GraphError(_)));
        assert_eq!(
            err.to_string(),
            format!(
                "graph error: input \"feature_map\": dimension size {} exceeds the maximum of {}",
                usize::MAX,
                i64::MAX
            )
        );
    }

    #[test]
    fn test_check_node_count() {
        assert!(check_node_count(0).is_ok());
        assert!(check_node_count(Graph::MAX_NODES).is_ok());
        let err = check_node_count(Graph::MAX_NODES + 1).unwrap_err();
        assert!(matches!(err, ModelLoadError::GraphError(_)));
    }

    #[test]
    fn test_load_file_missing() {
        let result = Model::load_file("does-not-exist.json");
        assert!(matches!(result, Err(ModelLoadError::ReadFailed(_))));
    }
}
