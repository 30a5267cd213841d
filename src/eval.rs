//! Pull-based evaluation: walks the output map and connections from a
//! root node and reduces the graph to a JSON value. Nothing is cached;
//! every call re-reads the live model.

use crate::error::EvaluationError;
use crate::graph::{CompoundKind, CompoundState, Graph, Node, NodeId, NodeState, ScalarKind, ScalarState};
use ahash::AHashSet;
use serde_json::Value;

pub struct DocumentEvaluator<'a> {
    graph: &'a Graph,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }

    /// Evaluates the subgraph rooted at `node_id` to a JSON value.
    ///
    /// The UI only wires root-to-leaf, so the graph should be acyclic; a
    /// visited set on the recursion path guards against a cycle slipping
    /// through rather than recursing unboundedly.
    pub fn evaluate(&self, node_id: NodeId) -> Result<Value, EvaluationError> {
        let mut path = AHashSet::new();
        self.eval_node(node_id, &mut path)
    }

    fn eval_node(&self, node_id: NodeId, path: &mut AHashSet<NodeId>) -> Result<Value, EvaluationError> {
        if !path.insert(node_id) {
            return Err(EvaluationError::CyclicGraph { node_id });
        }
        let node = self
            .graph
            .node(node_id)
            .map_err(|_| EvaluationError::NodeNotFound { node_id })?;

        let value = match &node.state {
            NodeState::Scalar(state) => self.eval_scalar(node, state),
            NodeState::Compound(state) => self.eval_compound(node, state, path)?,
        };
        path.remove(&node_id);
        Ok(value)
    }

    fn eval_scalar(&self, node: &Node, state: &ScalarState) -> Value {
        let Some(data_key) = &state.data_key else {
            return Value::Null;
        };
        let Some(control) = node.control(data_key) else {
            return Value::Null;
        };
        match state.kind {
            // The boolean widget stores the "True"/"False" string sentinel.
            ScalarKind::Boolean => Value::Bool(control.value.as_str() == Some("True")),
            ScalarKind::None => Value::Null,
            _ => control.value.clone(),
        }
    }

    fn eval_compound(
        &self,
        node: &Node,
        state: &CompoundState,
        path: &mut AHashSet<NodeId>,
    ) -> Result<Value, EvaluationError> {
        match state.kind {
            CompoundKind::Object => {
                let mut object = serde_json::Map::new();
                for entry in &state.entries {
                    let key = entry
                        .name_value
                        .clone()
                        .unwrap_or_else(|| entry.display_name());
                    object.insert(key, self.eval_entry_value(node, entry, path)?);
                }
                Ok(Value::Object(object))
            }
            CompoundKind::Array => {
                let mut items = Vec::with_capacity(state.entries.len());
                // Entry order is the JSON output order.
                for entry in &state.entries {
                    items.push(self.eval_entry_value(node, entry, path)?);
                }
                Ok(Value::Array(items))
            }
        }
    }

    fn eval_entry_value(
        &self,
        node: &Node,
        entry: &crate::output_map::MappedOutputEntry,
        path: &mut AHashSet<NodeId>,
    ) -> Result<Value, EvaluationError> {
        if let Some(output_key) = &entry.output_key {
            if let Some(connection) = self.graph.connection_from(node.id, output_key) {
                return self.eval_node(connection.target, path);
            }
        }
        if entry.is_nulled {
            return Ok(Value::Null);
        }
        Ok(entry.data_value.clone().unwrap_or(Value::Null))
    }
}
