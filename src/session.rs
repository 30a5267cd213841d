//! The editor session: one schema document, one socket registry, one
//! graph. Everything the UI does flows through this object as an explicit
//! command, and every mutation answers with the set of nodes to refresh.

use crate::error::{EvaluationError, GraphError, RegistryError, SchemaError};
use crate::eval::DocumentEvaluator;
use crate::graph::{
    CompoundKind, CompoundState, Connection, Control, Graph, Node, NodeId, NodeState, ScalarKind,
    ScalarState,
};
use crate::output_map::{
    MappedOutputEntry, Operation, OperationOutcome, apply_operation, excel_name, materialize_entry,
    widget_value,
};
use crate::propagation;
use crate::schema::{AdditionalForm, ItemsForm, SchemaDocument, SchemaFragment};
use crate::socket::registry::SocketRegistry;
use crate::socket::resolver::resolve_socket;

pub struct Session {
    registry: SocketRegistry,
    graph: Graph,
    document: SchemaDocument,
}

impl Session {
    /// Opens a session for a schema document: seeds the primitive sockets
    /// and registers one socket per definition, in declaration order.
    pub fn new(document: SchemaDocument) -> Result<Self, RegistryError> {
        let mut registry = SocketRegistry::with_defaults()?;
        for name in document.definition_names() {
            registry.register(name, None)?;
        }
        Ok(Self {
            registry,
            graph: Graph::new(),
            document,
        })
    }

    /// A session over an empty document, for free-form graphs.
    pub fn empty() -> Result<Self, RegistryError> {
        Self::new(SchemaDocument::default())
    }

    pub fn registry(&self) -> &SocketRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    pub fn node(&self, node_id: NodeId) -> Result<&Node, GraphError> {
        self.graph.node(node_id)
    }

    pub fn entry(&self, node_id: NodeId, index: usize) -> Result<&MappedOutputEntry, GraphError> {
        self.graph
            .node(node_id)?
            .entries()
            .get(index)
            .ok_or(GraphError::EntryNotFound { node_id, index })
    }

    // ---- node construction ----------------------------------------------

    pub fn add_scalar_node(&mut self, kind: ScalarKind) -> NodeId {
        self.insert_scalar(kind, None)
    }

    /// Builds the node for the document's root schema. A root that is a
    /// bare reference builds its definition's node.
    pub fn add_root_node(&mut self) -> Result<NodeId, GraphError> {
        let schema = self.document.root.clone();
        let title = schema.title.clone().unwrap_or_else(|| "Document".to_string());
        if schema.reference.is_some() {
            return self.add_node_for_schema(&title, &schema);
        }
        let socket = if schema.is_object() && schema.properties.is_some() {
            // The root object is its own anonymous definition.
            self.registry.ensure(&title).name.clone()
        } else {
            resolve_socket(&mut self.registry, Some(&schema))?
        };
        self.build_node(title, socket, &schema)
    }

    /// Builds a node for a named definition of the root schema. The node's
    /// `parent` port carries the definition's own socket.
    pub fn add_definition_node(&mut self, name: &str) -> Result<NodeId, GraphError> {
        let schema = self
            .document
            .definition(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownDefinition {
                name: name.to_string(),
            })?;
        let socket = self.registry.ensure(name).name.clone();
        self.build_node(name.to_string(), socket, &schema)
    }

    /// Builds a node for an arbitrary schema fragment. References are
    /// routed to their definition; the socket comes from the resolver.
    pub fn add_node_for_schema(
        &mut self,
        title: &str,
        schema: &SchemaFragment,
    ) -> Result<NodeId, GraphError> {
        if let Some(reference) = &schema.reference {
            let name = reference
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SchemaError::InvalidReference {
                    reference: reference.clone(),
                })?
                .to_string();
            return self.add_definition_node(&name);
        }
        let socket = resolve_socket(&mut self.registry, Some(schema))?;
        self.build_node(title.to_string(), socket, schema)
    }

    fn build_node(
        &mut self,
        title: String,
        parent_socket: String,
        schema: &SchemaFragment,
    ) -> Result<NodeId, GraphError> {
        match schema.schema_type.as_deref() {
            Some("object") => self.insert_compound(title, parent_socket, CompoundKind::Object, schema),
            Some("array") => self.insert_compound(title, parent_socket, CompoundKind::Array, schema),
            Some("string") => Ok(self.insert_scalar(ScalarKind::Text, Some(schema.clone()))),
            Some("integer") | Some("number") => {
                Ok(self.insert_scalar(ScalarKind::Number, Some(schema.clone())))
            }
            Some("boolean") => Ok(self.insert_scalar(ScalarKind::Boolean, Some(schema.clone()))),
            Some("null") => Ok(self.insert_scalar(ScalarKind::None, Some(schema.clone()))),
            _ => Err(SchemaError::UnsupportedSchema {
                location: schema.location(),
                message: "cannot build a node for this schema; expected a typed fragment"
                    .to_string(),
            }
            .into()),
        }
    }

    fn insert_scalar(&mut self, kind: ScalarKind, schema: Option<SchemaFragment>) -> NodeId {
        let mut controls = Vec::new();
        let data_key = kind.control_kind().map(|control_kind| {
            let initial = schema
                .as_ref()
                .and_then(|s| s.const_value.clone().or_else(|| s.default.clone()));
            controls.push(Control::new(
                "value",
                control_kind,
                widget_value(control_kind, initial),
            ));
            "value".to_string()
        });
        self.graph.insert(Node {
            id: 0,
            title: kind.title().to_string(),
            parent_socket: kind.socket_name().to_string(),
            outputs: Vec::new(),
            controls,
            state: NodeState::Scalar(ScalarState {
                kind,
                schema,
                data_key,
            }),
        })
    }

    fn insert_compound(
        &mut self,
        title: String,
        parent_socket: String,
        kind: CompoundKind,
        schema: &SchemaFragment,
    ) -> Result<NodeId, GraphError> {
        let mut entries = Vec::new();
        let mut counter = 0u32;
        if let Some(properties) = &schema.properties {
            for (name, property_schema) in properties {
                counter += 1;
                entries.push(MappedOutputEntry::fixed_property(
                    &mut self.registry,
                    excel_name(counter),
                    name,
                    property_schema.clone(),
                    schema.required.contains(name),
                )?);
            }
        }

        let element_schema = match kind {
            CompoundKind::Object => match &schema.additional_properties {
                Some(AdditionalForm::Schema(inner)) => Some((**inner).clone()),
                _ => None,
            },
            CompoundKind::Array => match &schema.items {
                Some(ItemsForm::Single(inner)) => Some((**inner).clone()),
                Some(ItemsForm::Tuple(_)) => {
                    return Err(SchemaError::UnsupportedSchema {
                        location: schema.location(),
                        message: "tuple-form 'items' is not supported".to_string(),
                    }
                    .into());
                }
                None => None,
            },
        };
        let selected = resolve_socket(&mut self.registry, element_schema.as_ref())?;

        let entry_count = entries.len();
        let node_id = self.graph.insert(Node {
            id: 0,
            title,
            parent_socket,
            outputs: Vec::new(),
            controls: Vec::new(),
            state: NodeState::Compound(CompoundState {
                kind,
                schema: Some(schema.clone()),
                entries,
                next_output_index: counter,
                element_schema,
                alternatives: Vec::new(),
                selected,
            }),
        });

        // Materialize the seeded entries. Any failure rolls the node back
        // so construction never leaves partial ports or controls behind.
        for index in 0..entry_count {
            if let Err(error) = materialize_entry(&mut self.registry, &mut self.graph, node_id, index)
            {
                self.graph.remove_node(node_id);
                return Err(error);
            }
        }
        Ok(node_id)
    }

    /// Removes a node and every connection touching it, resetting type
    /// propagation on children that were wired to its ports.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<OperationOutcome, GraphError> {
        let Some((_, dropped)) = self.graph.remove_node(node_id) else {
            return Err(GraphError::NodeNotFound { node_id });
        };
        let mut affected = Vec::new();
        for connection in &dropped {
            affected.extend(propagation::on_connection_removed(
                &mut self.registry,
                &mut self.graph,
                connection,
            )?);
            if connection.source != node_id {
                affected.push(connection.source);
            }
            if connection.target != node_id && self.graph.contains(connection.target) {
                affected.push(connection.target);
            }
        }
        Ok(OperationOutcome::applied(node_id, affected))
    }

    // ---- wiring ----------------------------------------------------------

    /// Wires an output port to a node's `parent` input. Checks socket
    /// compatibility against the registry, then runs type propagation on
    /// the child.
    pub fn connect(
        &mut self,
        source: NodeId,
        output: &str,
        target: NodeId,
    ) -> Result<OperationOutcome, GraphError> {
        let source_socket = self
            .graph
            .node(source)?
            .output(output)
            .ok_or_else(|| GraphError::PortNotFound {
                node_id: source,
                key: output.to_string(),
            })?
            .socket
            .clone();
        let target_socket = self.graph.node(target)?.parent_socket.clone();
        if !self.registry.compatible(&source_socket, &target_socket) {
            return Err(GraphError::IncompatibleSockets {
                source: source_socket,
                target: target_socket,
            });
        }

        let connection = Connection::new(source, output, target);
        self.graph.add_connection(connection.clone())?;
        let mut affected =
            propagation::on_connection_created(&mut self.registry, &mut self.graph, &connection)?;
        affected.push(target);
        Ok(OperationOutcome::applied(source, affected))
    }

    pub fn disconnect(
        &mut self,
        source: NodeId,
        output: &str,
        target: NodeId,
    ) -> Result<OperationOutcome, GraphError> {
        let connection = self
            .graph
            .remove_connection(source, output, target)
            .ok_or_else(|| GraphError::ConnectionNotFound {
                source,
                output: output.to_string(),
                target,
            })?;
        let mut affected =
            propagation::on_connection_removed(&mut self.registry, &mut self.graph, &connection)?;
        affected.push(target);
        Ok(OperationOutcome::applied(source, affected))
    }

    // ---- output-map operations ------------------------------------------

    /// Applies an output-map operation (add / remove / move) to a node.
    pub fn apply(
        &mut self,
        node_id: NodeId,
        operation: Operation,
    ) -> Result<OperationOutcome, GraphError> {
        apply_operation(&mut self.registry, &mut self.graph, node_id, operation)
    }

    // ---- control edits ---------------------------------------------------

    /// Edits the value control of a scalar node.
    pub fn set_scalar_value(
        &mut self,
        node_id: NodeId,
        value: serde_json::Value,
    ) -> Result<(), GraphError> {
        let node = self.graph.node_mut(node_id)?;
        let NodeState::Scalar(state) = &node.state else {
            return Err(GraphError::NotAScalarNode { node_id });
        };
        let kind = state.kind;
        let Some(data_key) = state.data_key.clone() else {
            return Ok(());
        };
        if let Some(control_kind) = kind.control_kind() {
            if let Some(control) = node.control_mut(&data_key) {
                control.value = widget_value(control_kind, Some(value));
            }
        }
        Ok(())
    }

    /// Edits an entry's literal value, keeping the widget in sync.
    pub fn set_data_value(
        &mut self,
        node_id: NodeId,
        index: usize,
        value: serde_json::Value,
    ) -> Result<(), GraphError> {
        let node = self.graph.node_mut(node_id)?;
        let state = node
            .compound_mut()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        let entry = state
            .entries
            .get_mut(index)
            .ok_or(GraphError::EntryNotFound { node_id, index })?;
        let Some(control_kind) = entry.data_control_kind() else {
            return Err(GraphError::NoDataControl { node_id, index });
        };
        entry.data_value = Some(value.clone());
        let data_key = entry.derived_data_key();
        if let Some(control) = node.control_mut(&data_key) {
            control.value = widget_value(control_kind, Some(value));
        }
        Ok(())
    }

    /// Marks a nullable entry's value as explicitly absent (or present).
    pub fn set_null(
        &mut self,
        node_id: NodeId,
        index: usize,
        nulled: bool,
    ) -> Result<(), GraphError> {
        let node = self.graph.node_mut(node_id)?;
        let state = node
            .compound_mut()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        let entry = state
            .entries
            .get_mut(index)
            .ok_or(GraphError::EntryNotFound { node_id, index })?;
        if !entry.is_nullable {
            return Err(GraphError::NotNullable {
                node_id,
                name: entry.core_name.clone(),
            });
        }
        entry.is_nulled = nulled;
        Ok(())
    }

    /// Renames a dynamically-added object member.
    pub fn set_entry_name(
        &mut self,
        node_id: NodeId,
        index: usize,
        name: &str,
    ) -> Result<(), GraphError> {
        let node = self.graph.node_mut(node_id)?;
        let state = node
            .compound_mut()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        let entry = state
            .entries
            .get_mut(index)
            .ok_or(GraphError::EntryNotFound { node_id, index })?;
        if entry.has_fixed_name {
            return Err(GraphError::FixedEntryName {
                node_id,
                name: entry.core_name.clone(),
            });
        }
        entry.name_value = Some(name.to_string());
        let name_key = entry.derived_name_key();
        if let Some(control) = node.control_mut(&name_key) {
            control.value = serde_json::Value::String(name.to_string());
        }
        Ok(())
    }

    /// Switches an entry to another of its union alternatives. The entry's
    /// port is rebuilt when the resolved socket changes, which severs any
    /// stale downstream connection.
    pub fn select_entry_alternative(
        &mut self,
        node_id: NodeId,
        index: usize,
        name: &str,
    ) -> Result<OperationOutcome, GraphError> {
        {
            let node = self.graph.node_mut(node_id)?;
            let state = node
                .compound_mut()
                .ok_or(GraphError::NotACompoundNode { node_id })?;
            let entry = state
                .entries
                .get_mut(index)
                .ok_or(GraphError::EntryNotFound { node_id, index })?;
            if !entry.schema_map.iter().any(|(n, _)| n == name) {
                return Err(GraphError::UnknownAlternative {
                    node_id,
                    name: name.to_string(),
                });
            }
            entry.select_value = Some(name.to_string());
        }
        let affected = materialize_entry(&mut self.registry, &mut self.graph, node_id, index)?;
        Ok(OperationOutcome::applied(node_id, affected))
    }

    /// Selects a node-level type alternative (propagated or default list)
    /// and runs the rebind cascade over the dynamic entries.
    pub fn select_type(
        &mut self,
        node_id: NodeId,
        name: &str,
    ) -> Result<OperationOutcome, GraphError> {
        let affected =
            propagation::apply_type_selection(&mut self.registry, &mut self.graph, node_id, name)?;
        Ok(OperationOutcome::applied(node_id, affected))
    }

    // ---- evaluation ------------------------------------------------------

    /// Pulls the JSON value of the subgraph rooted at `node_id`.
    pub fn evaluate(&self, node_id: NodeId) -> Result<serde_json::Value, EvaluationError> {
        DocumentEvaluator::new(&self.graph).evaluate(node_id)
    }
}

