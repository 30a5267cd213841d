//! Connection-type propagation: when a compound node's `parent` port is
//! wired, the parent-side schema restricts which element types the child
//! may offer. Wiring it off restores the full default type list.

use crate::error::{GraphError, SchemaError};
use crate::graph::{CompoundKind, Connection, Control, Graph, NodeId, PARENT_PORT, TYPE_SELECT_KEY};
use crate::output_map::rebind_dynamic_entries;
use crate::schema::{AnyOfForm, SchemaFragment};
use crate::socket::registry::{ANY, DEFAULT_TYPE_OPTIONS, SocketRegistry};
use crate::socket::resolver::resolve_socket;

/// Reacts to a new connection. Only the `parent` port of the input side
/// triggers propagation; scalar children have no type selection and are
/// left alone.
pub(crate) fn on_connection_created(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    connection: &Connection,
) -> Result<Vec<NodeId>, GraphError> {
    if connection.target_input != PARENT_PORT {
        return Ok(Vec::new());
    }
    let Some(kind) = graph.node(connection.target)?.compound().map(|s| s.kind) else {
        return Ok(Vec::new());
    };

    let parent_schema = {
        let source = graph.node(connection.source)?;
        source
            .entries()
            .iter()
            .find(|e| e.output_key.as_deref() == Some(connection.source_output.as_str()))
            .and_then(|e| e.effective_schema().cloned())
    };

    let alternatives = derive_alternatives(registry, parent_schema.as_ref(), kind)?;
    let selection = alternatives
        .first()
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| ANY.to_string());

    let node = graph.node_mut(connection.target)?;
    if let Some(state) = node.compound_mut() {
        state.alternatives = alternatives;
    }
    log::debug!(
        "propagated type alternatives to node {} (selected '{}')",
        connection.target,
        selection
    );
    apply_type_selection(registry, graph, connection.target, &selection)
}

/// Reacts to a removed connection: clears the propagated alternatives,
/// restores the default type list and re-applies `Any` through the same
/// cascade a user selection takes.
pub(crate) fn on_connection_removed(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    connection: &Connection,
) -> Result<Vec<NodeId>, GraphError> {
    if connection.target_input != PARENT_PORT || !graph.contains(connection.target) {
        return Ok(Vec::new());
    }
    let node = graph.node_mut(connection.target)?;
    let Some(state) = node.compound_mut() else {
        return Ok(Vec::new());
    };
    state.alternatives.clear();
    apply_type_selection(registry, graph, connection.target, ANY)
}

/// Derives the alternative-name -> sub-schema map a child of `kind` may
/// select from, given the schema bound to the parent-side entry.
///
/// A schema that directly matches the kind yields a single alternative
/// named after its inner schema's socket; an `anyOf` contributes one
/// alternative per matching branch; anything else yields an empty map.
pub fn derive_alternatives(
    registry: &mut SocketRegistry,
    schema: Option<&SchemaFragment>,
    kind: CompoundKind,
) -> Result<Vec<(String, SchemaFragment)>, SchemaError> {
    let Some(schema) = schema else {
        return Ok(Vec::new());
    };

    if kind_matches(schema, kind) {
        let inner = schema.inner_schema();
        let name = resolve_socket(registry, inner)?;
        return Ok(vec![(name, inner.cloned().unwrap_or_default())]);
    }

    if let Some(AnyOfForm::Branches(branches)) = &schema.any_of {
        let mut alternatives: Vec<(String, SchemaFragment)> = Vec::new();
        for branch in branches.iter().filter(|b| kind_matches(b, kind)) {
            let inner = branch.inner_schema();
            let name = resolve_socket(registry, inner)?;
            if !alternatives.iter().any(|(n, _)| n == &name) {
                alternatives.push((name, inner.cloned().unwrap_or_default()));
            }
        }
        return Ok(alternatives);
    }

    Ok(Vec::new())
}

fn kind_matches(schema: &SchemaFragment, kind: CompoundKind) -> bool {
    match kind {
        CompoundKind::Array => schema.is_array(),
        CompoundKind::Object => schema.is_object(),
    }
}

/// Selects a type alternative on a compound node and runs the full
/// cascade: rebind the element schema, repopulate the type control, then
/// rebind and re-materialize every dynamic entry (which invalidates
/// connections on ports whose socket changed).
pub(crate) fn apply_type_selection(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    selection: &str,
) -> Result<Vec<NodeId>, GraphError> {
    let (element_schema, options) = {
        let node = graph.node(node_id)?;
        let state = node
            .compound()
            .ok_or(GraphError::NotACompoundNode { node_id })?;

        if state.alternatives.is_empty() {
            if !DEFAULT_TYPE_OPTIONS.contains(&selection) {
                return Err(GraphError::UnknownAlternative {
                    node_id,
                    name: selection.to_string(),
                });
            }
            let options: Vec<String> =
                DEFAULT_TYPE_OPTIONS.iter().map(|s| s.to_string()).collect();
            (fragment_for_primitive(selection), options)
        } else {
            let element = state
                .alternatives
                .iter()
                .find(|(name, _)| name == selection)
                .map(|(_, schema)| schema.clone());
            let Some(element) = element else {
                return Err(GraphError::UnknownAlternative {
                    node_id,
                    name: selection.to_string(),
                });
            };
            let options = state
                .alternatives
                .iter()
                .map(|(name, _)| name.clone())
                .collect();
            (Some(element), options)
        }
    };

    let node = graph.node_mut(node_id)?;
    match node.control_mut(TYPE_SELECT_KEY) {
        Some(control) => {
            control.options = options;
            control.value = serde_json::Value::String(selection.to_string());
        }
        None => {
            node.controls
                .push(Control::select(TYPE_SELECT_KEY, options, selection));
        }
    }
    if let Some(state) = node.compound_mut() {
        state.selected = selection.to_string();
        state.element_schema = element_schema.clone();
    }

    rebind_dynamic_entries(registry, graph, node_id, element_schema.as_ref())
}

/// The element schema implied by picking a primitive from the default
/// type list on an unrestricted node. `Any` maps to no schema at all.
fn fragment_for_primitive(name: &str) -> Option<SchemaFragment> {
    let type_name = match name {
        "Text" => "string",
        "Number" => "number",
        "Boolean" => "boolean",
        "None" => "null",
        "List" => "array",
        "Dictionary" => "object",
        _ => return None,
    };
    Some(SchemaFragment {
        schema_type: Some(type_name.to_string()),
        ..SchemaFragment::default()
    })
}
