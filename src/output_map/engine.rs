use super::entry::{MappedOutputEntry, excel_name};
use crate::error::GraphError;
use crate::graph::{CompoundKind, Connection, Control, ControlKind, Graph, NodeId, OutputPort};
use crate::propagation::on_connection_removed;
use crate::schema::SchemaFragment;
use crate::socket::registry::SocketRegistry;
use crate::socket::resolver::resolve_socket;
use itertools::Itertools;

/// A user-driven mutation of a node's output map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Insert a new entry immediately after `after` (at the top when `None`).
    Add { after: Option<usize> },
    Remove { index: usize },
    MoveUp { index: usize },
    MoveDown { index: usize },
}

/// What a mutation did. `Applied` carries every node whose view must be
/// refreshed and whose value may have changed - the caller reacts to this
/// instead of listening for events. `Rejected` is the recoverable
/// user-error path: the model was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied { affected: Vec<NodeId> },
    Rejected { reason: String },
}

impl OperationOutcome {
    pub(crate) fn applied(node_id: NodeId, affected: Vec<NodeId>) -> Self {
        let affected = std::iter::once(node_id).chain(affected).unique().collect();
        OperationOutcome::Applied { affected }
    }

    fn rejected(reason: String) -> Self {
        log::warn!("operation rejected: {reason}");
        OperationOutcome::Rejected { reason }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, OperationOutcome::Applied { .. })
    }
}

/// Applies one output-map operation to a compound node.
///
/// Every applied operation ends the same way: the returned `affected` set
/// names the mutated node plus every peer whose connection was touched,
/// exactly once.
pub fn apply_operation(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    operation: Operation,
) -> Result<OperationOutcome, GraphError> {
    match operation {
        Operation::Add { after } => add_entry(registry, graph, node_id, after),
        Operation::Remove { index } => remove_entry(registry, graph, node_id, index),
        Operation::MoveUp { index } => move_entry(graph, node_id, index, Direction::Up),
        Operation::MoveDown { index } => move_entry(graph, node_id, index, Direction::Down),
    }
}

fn add_entry(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    after: Option<usize>,
) -> Result<OperationOutcome, GraphError> {
    let (kind, element_schema, core_name, insert_at) = {
        let node = graph.node_mut(node_id)?;
        let state = node
            .compound_mut()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        // The counter only ever goes up, even across removals, so a new
        // entry can never collide with connections referencing a removed one.
        state.next_output_index += 1;
        let core_name = excel_name(state.next_output_index);
        let position = match after {
            Some(index) => index + 1,
            None => 0,
        };
        // Dynamic entries never land inside the fixed prefix.
        let insert_at = position
            .max(state.fixed_prefix_len())
            .min(state.entries.len());
        (state.kind, state.element_schema.clone(), core_name, insert_at)
    };

    let entry = match kind {
        CompoundKind::Object => MappedOutputEntry::dynamic_member(registry, core_name, element_schema)?,
        CompoundKind::Array => MappedOutputEntry::dynamic_element(registry, core_name, element_schema)?,
    };

    let node = graph.node_mut(node_id)?;
    let state = node
        .compound_mut()
        .ok_or(GraphError::NotACompoundNode { node_id })?;
    state.entries.insert(insert_at, entry);

    let affected = materialize_entry(registry, graph, node_id, insert_at)?;
    Ok(OperationOutcome::applied(node_id, affected))
}

fn remove_entry(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    index: usize,
) -> Result<OperationOutcome, GraphError> {
    {
        let node = graph.node(node_id)?;
        let state = node
            .compound()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        match state.entries.get(index) {
            None => {
                return Ok(OperationOutcome::rejected(format!(
                    "remove index {index} is out of range on node {node_id}"
                )));
            }
            Some(entry) if !entry.removable => {
                return Ok(OperationOutcome::rejected(format!(
                    "entry '{}' is schema-fixed and cannot be removed",
                    entry.core_name
                )));
            }
            Some(_) => {}
        }
    }

    let affected = dematerialize_entry(registry, graph, node_id, index)?;
    let node = graph.node_mut(node_id)?;
    let state = node
        .compound_mut()
        .ok_or(GraphError::NotACompoundNode { node_id })?;
    state.entries.remove(index);
    Ok(OperationOutcome::applied(node_id, affected))
}

enum Direction {
    Up,
    Down,
}

fn move_entry(
    graph: &mut Graph,
    node_id: NodeId,
    index: usize,
    direction: Direction,
) -> Result<OperationOutcome, GraphError> {
    let node = graph.node_mut(node_id)?;
    let state = node
        .compound_mut()
        .ok_or(GraphError::NotACompoundNode { node_id })?;

    let Some(entry) = state.entries.get(index) else {
        return Ok(OperationOutcome::rejected(format!(
            "move index {index} is out of range on node {node_id}"
        )));
    };
    if !entry.can_move {
        return Ok(OperationOutcome::rejected(format!(
            "entry '{}' is schema-fixed and cannot move",
            entry.core_name
        )));
    }

    match direction {
        Direction::Up => {
            if index == 0 {
                return Ok(OperationOutcome::rejected(
                    "entry is already at the top".to_string(),
                ));
            }
            // The non-movable entries form a contiguous prefix; nothing may
            // be moved above them.
            if !state.entries[index - 1].can_move {
                return Ok(OperationOutcome::rejected(
                    "cannot move an entry above the schema-fixed block".to_string(),
                ));
            }
            state.entries.swap(index, index - 1);
        }
        Direction::Down => {
            if index + 1 == state.entries.len() {
                return Ok(OperationOutcome::rejected(
                    "entry is already at the bottom".to_string(),
                ));
            }
            state.entries.swap(index, index + 1);
        }
    }
    Ok(OperationOutcome::applied(node_id, Vec::new()))
}

/// Everything materialization needs to know about one entry, captured up
/// front so reconciliation can mutate the node freely.
struct EntrySnapshot {
    effective_schema: Option<SchemaFragment>,
    name_key: String,
    data_key: String,
    select_key: String,
    output_key: String,
    has_name: bool,
    name_value: Option<String>,
    data_kind: Option<ControlKind>,
    data_value: Option<serde_json::Value>,
    select_options: Vec<String>,
    select_value: Option<String>,
    has_output: bool,
}

/// Reconciles one entry's controls and output port against its flags.
///
/// Returns the peers whose connections were severed, which happens in
/// exactly one case: the entry's resolved socket changed (or its port
/// disappeared), so the existing port and everything wired to it is torn
/// down before the port is recreated.
pub(crate) fn materialize_entry(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    index: usize,
) -> Result<Vec<NodeId>, GraphError> {
    let snapshot = {
        let node = graph.node(node_id)?;
        let state = node
            .compound()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        let entry = state
            .entries
            .get(index)
            .ok_or(GraphError::EntryNotFound { node_id, index })?;
        EntrySnapshot {
            effective_schema: entry.effective_schema().cloned(),
            name_key: entry.derived_name_key(),
            data_key: entry.derived_data_key(),
            select_key: entry.derived_select_key(),
            output_key: entry.derived_output_key(),
            has_name: entry.has_name_control(),
            name_value: entry.name_value.clone(),
            data_kind: entry.data_control_kind(),
            data_value: entry.data_value.clone(),
            select_options: entry.schema_map.iter().map(|(n, _)| n.clone()).collect(),
            select_value: entry.select_value.clone(),
            has_output: entry.has_output(),
        }
    };

    let desired_socket = if snapshot.has_output {
        Some(resolve_socket(registry, snapshot.effective_schema.as_ref())?)
    } else {
        None
    };

    let mut severed: Vec<Connection> = Vec::new();

    // Output port first, because tearing one down cascades into the
    // connection list.
    let existing_socket = graph
        .node(node_id)?
        .output(&snapshot.output_key)
        .map(|p| p.socket.clone());
    let port_exists = match (&desired_socket, existing_socket) {
        (Some(socket), Some(existing)) if existing == *socket => true,
        (Some(socket), existing) => {
            if existing.is_some() {
                severed.extend(graph.remove_connections_on_output(node_id, &snapshot.output_key));
                graph.node_mut(node_id)?.remove_output(&snapshot.output_key);
            }
            graph.node_mut(node_id)?.outputs.push(OutputPort {
                key: snapshot.output_key.clone(),
                socket: socket.clone(),
            });
            true
        }
        (None, Some(_)) => {
            severed.extend(graph.remove_connections_on_output(node_id, &snapshot.output_key));
            graph.node_mut(node_id)?.remove_output(&snapshot.output_key);
            false
        }
        (None, None) => false,
    };

    let node = graph.node_mut(node_id)?;

    // Name control.
    if snapshot.has_name && node.control(&snapshot.name_key).is_none() {
        node.controls.push(Control::new(
            &snapshot.name_key,
            ControlKind::Name,
            serde_json::Value::String(snapshot.name_value.clone().unwrap_or_default()),
        ));
    } else if !snapshot.has_name {
        node.remove_control(&snapshot.name_key);
    }

    // Data control. A kind mismatch is the only path that swaps a
    // control's underlying kind after creation: destroy and rebuild.
    let existing_data_kind = node.control(&snapshot.data_key).map(|c| c.kind);
    let mut reset_data_value = false;
    match (snapshot.data_kind, existing_data_kind) {
        (Some(desired), Some(existing)) if desired == existing => {}
        (Some(desired), existing) => {
            if existing.is_some() {
                node.remove_control(&snapshot.data_key);
                reset_data_value = true;
            }
            let initial = if reset_data_value {
                None
            } else {
                snapshot.data_value.clone()
            };
            node.controls.push(Control::new(
                &snapshot.data_key,
                desired,
                widget_value(desired, initial),
            ));
        }
        (None, Some(_)) => {
            node.remove_control(&snapshot.data_key);
        }
        (None, None) => {}
    }

    // Select control, repopulated in place when it already exists.
    let select_exists = !snapshot.select_options.is_empty();
    if select_exists {
        let options = snapshot.select_options.clone();
        let value = snapshot.select_value.clone().unwrap_or_default();
        match node.control_mut(&snapshot.select_key) {
            Some(control) => {
                control.options = options;
                control.value = serde_json::Value::String(value);
            }
            None => {
                node.controls
                    .push(Control::select(&snapshot.select_key, options, &value));
            }
        }
    } else {
        node.remove_control(&snapshot.select_key);
    }

    // Mirror what is now materialized back onto the entry.
    let data_exists = snapshot.data_kind.is_some();
    let name_exists = snapshot.has_name;
    let state = node
        .compound_mut()
        .ok_or(GraphError::NotACompoundNode { node_id })?;
    if let Some(entry) = state.entries.get_mut(index) {
        entry.output_key = port_exists.then(|| snapshot.output_key.clone());
        entry.name_key = name_exists.then(|| snapshot.name_key.clone());
        entry.data_key = data_exists.then(|| snapshot.data_key.clone());
        entry.select_key = select_exists.then(|| snapshot.select_key.clone());
        if reset_data_value {
            entry.data_value = None;
        }
        if !data_exists {
            entry.data_key = None;
        }
    }

    // Disconnected children fall back to the default type list.
    let mut affected = Vec::new();
    for connection in severed {
        affected.push(connection.target);
        affected.extend(on_connection_removed(registry, graph, &connection)?);
    }

    Ok(affected)
}

/// The literal inverse of materialization: destroys the entry's controls
/// and port unconditionally, cascading connection removal. Returns the
/// disconnected peers.
pub(crate) fn dematerialize_entry(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    index: usize,
) -> Result<Vec<NodeId>, GraphError> {
    let (name_key, data_key, select_key, output_key) = {
        let node = graph.node(node_id)?;
        let state = node
            .compound()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        let entry = state
            .entries
            .get(index)
            .ok_or(GraphError::EntryNotFound { node_id, index })?;
        (
            entry.derived_name_key(),
            entry.derived_data_key(),
            entry.derived_select_key(),
            entry.derived_output_key(),
        )
    };

    let severed = graph.remove_connections_on_output(node_id, &output_key);

    let node = graph.node_mut(node_id)?;
    node.remove_output(&output_key);
    node.remove_control(&name_key);
    node.remove_control(&data_key);
    node.remove_control(&select_key);

    let state = node
        .compound_mut()
        .ok_or(GraphError::NotACompoundNode { node_id })?;
    if let Some(entry) = state.entries.get_mut(index) {
        entry.output_key = None;
        entry.name_key = None;
        entry.data_key = None;
        entry.select_key = None;
    }

    let mut affected = Vec::new();
    for connection in severed {
        affected.push(connection.target);
        affected.extend(on_connection_removed(registry, graph, &connection)?);
    }
    Ok(affected)
}

/// Rebinds every dynamic entry of a compound node to a new element schema
/// and re-materializes each one. Fixed entries are untouched.
pub(crate) fn rebind_dynamic_entries(
    registry: &mut SocketRegistry,
    graph: &mut Graph,
    node_id: NodeId,
    element_schema: Option<&SchemaFragment>,
) -> Result<Vec<NodeId>, GraphError> {
    let dynamic_indices: Vec<usize> = {
        let node = graph.node(node_id)?;
        let state = node
            .compound()
            .ok_or(GraphError::NotACompoundNode { node_id })?;
        state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.can_move)
            .map(|(i, _)| i)
            .collect()
    };

    let mut affected = Vec::new();
    for index in dynamic_indices {
        {
            let node = graph.node_mut(node_id)?;
            let state = node
                .compound_mut()
                .ok_or(GraphError::NotACompoundNode { node_id })?;
            if let Some(entry) = state.entries.get_mut(index) {
                entry.rebind_schema(registry, element_schema.cloned())?;
            }
        }
        affected.extend(materialize_entry(registry, graph, node_id, index)?);
    }
    Ok(affected)
}

/// What the widget actually stores for a given JSON value; the boolean
/// widget keeps the "True"/"False" string sentinel.
pub(crate) fn widget_value(kind: ControlKind, value: Option<serde_json::Value>) -> serde_json::Value {
    match kind {
        ControlKind::Boolean => {
            let truthy = match &value {
                Some(serde_json::Value::Bool(b)) => *b,
                Some(serde_json::Value::String(s)) => s == "True",
                _ => false,
            };
            serde_json::Value::String(if truthy { "True" } else { "False" }.to_string())
        }
        ControlKind::Text => value.unwrap_or_else(|| serde_json::Value::String(String::new())),
        _ => value.unwrap_or(serde_json::Value::Null),
    }
}
