use rustc_hash::FxHashSet;

use super::{Graph, InferError, NodeId, OperatorNode};

/// Planner determines the order in which a graph's operators are visited
/// during shape inference.
///
/// An operator is ordered after all operators that produce its inputs.
pub struct Planner<'a> {
    graph: &'a Graph,
}

impl<'a> Planner<'a> {
    /// Create a planner for a graph.
    pub fn with_graph(graph: &'a Graph) -> Self {
        Planner { graph }
    }

    /// Return the IDs of all operators in the graph in topological order.
    ///
    /// Operators with no dependency between them are ordered by node ID.
    /// Fails if the graph contains a cycle.
    pub fn create_plan(&self) -> Result<Vec<NodeId>, InferError> {
        // Build the plan via a depth first traversal of the graph. A helper
        // struct is used as recursive closures are not supported in Rust.
        struct PlanBuilder<'a> {
            graph: &'a Graph,
            visited: FxHashSet<NodeId>,
            in_progress: FxHashSet<NodeId>,
            plan: Vec<NodeId>,
        }

        impl<'a> PlanBuilder<'a> {
            /// Add all the transitive dependencies of `op_node` to the plan,
            /// followed by `op_node`.
            fn visit(
                &mut self,
                op_id: NodeId,
                op_node: &'a OperatorNode,
            ) -> Result<(), InferError> {
                if self.visited.contains(&op_id) {
                    return Ok(());
                }
                if !self.in_progress.insert(op_id) {
                    return Err(InferError::planning(format!(
                        "graph contains a cycle through operator \"{}\"",
                        self.graph.node_name(op_id)
                    )));
                }

                for input_id in op_node.connected_inputs() {
                    if let Some((source_id, source_node)) = self.graph.get_source_node(input_id) {
                        self.visit(source_id, source_node)?;
                    }
                }

                self.in_progress.remove(&op_id);
                self.visited.insert(op_id);
                self.plan.push(op_id);
                Ok(())
            }
        }

        let mut builder = PlanBuilder {
            graph: self.graph,
            visited: FxHashSet::default(),
            in_progress: FxHashSet::default(),
            plan: Vec::new(),
        };

        for op_id in self.graph.operator_ids() {
            let Some(op_node) = self.graph.get_node(op_id).and_then(|n| n.as_operator()) else {
                continue;
            };
            builder.visit(op_id, op_node)?;
        }

        Ok(builder.plan)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Planner;
    use crate::graph::{Graph, InferErrorKind};
    use crate::ops::ExperimentalDetectronPriorGridGenerator;

    fn grid_op() -> Arc<ExperimentalDetectronPriorGridGenerator> {
        Arc::new(ExperimentalDetectronPriorGridGenerator::default())
    }

    #[test]
    fn test_plan_orders_producers_first() {
        let mut g = Graph::new();
        let a = g.add_value(Some("a"), None);
        let b = g.add_value(Some("b"), None);
        let c = g.add_value(Some("c"), None);

        // Add the consumer before the producer.
        let consumer = g.add_op(Some("consumer"), grid_op(), &[Some(b), Some(b)], &[Some(c)]);
        let producer = g.add_op(Some("producer"), grid_op(), &[Some(a), Some(a)], &[Some(b)]);

        let plan = Planner::with_graph(&g).create_plan().unwrap();
        assert_eq!(plan, [producer, consumer]);
    }

    #[test]
    fn test_plan_detects_cycle() {
        let mut g = Graph::new();
        let a = g.add_value(Some("a"), None);
        let b = g.add_value(Some("b"), None);
        g.add_op(Some("op_a"), grid_op(), &[Some(b), None], &[Some(a)]);
        g.add_op(Some("op_b"), grid_op(), &[Some(a), None], &[Some(b)]);

        let err = Planner::with_graph(&g).create_plan().unwrap_err();
        assert!(matches!(err.kind(), InferErrorKind::Planning(_)));
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_plan_empty_graph() {
        let g = Graph::new();
        assert!(Planner::with_graph(&g).create_plan().unwrap().is_empty());
    }
}
