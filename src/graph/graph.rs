use super::node::{Node, NodeId, PARENT_PORT};
use crate::error::GraphError;
use ahash::AHashMap;

/// A directed edge from an output port to a node's `parent` input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    pub source_output: String,
    pub target: NodeId,
    pub target_input: String,
}

impl Connection {
    pub fn new(source: NodeId, source_output: impl Into<String>, target: NodeId) -> Self {
        Self {
            source,
            source_output: source_output.into(),
            target,
            target_input: PARENT_PORT.to_string(),
        }
    }
}

/// The editor's node graph: nodes by id plus the connection list.
///
/// Structural rules enforced here: connected ports must exist, a node
/// cannot connect to itself, and every port holds at most one connection.
/// Socket compatibility is checked by the session, which owns the registry.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: AHashMap<NodeId, Node>,
    connections: Vec<Connection>,
    next_node_id: NodeId,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, mut node: Node) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        node.id = id;
        self.nodes.insert(id, node);
        id
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(&id)
            .ok_or(GraphError::NodeNotFound { node_id: id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound { node_id: id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// The single connection leaving an output port, if any.
    pub fn connection_from(&self, source: NodeId, output: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.source == source && c.source_output == output)
    }

    /// The single connection entering a node's `parent` port, if any.
    pub fn connection_into(&self, target: NodeId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.target == target)
    }

    pub(crate) fn add_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        if connection.source == connection.target {
            return Err(GraphError::SelfConnection);
        }
        let source = self.node(connection.source)?;
        if source.output(&connection.source_output).is_none() {
            return Err(GraphError::PortNotFound {
                node_id: connection.source,
                key: connection.source_output.clone(),
            });
        }
        self.node(connection.target)?;
        if self.connection_into(connection.target).is_some() {
            return Err(GraphError::PortOccupied {
                node_id: connection.target,
                key: connection.target_input.clone(),
            });
        }
        if self
            .connection_from(connection.source, &connection.source_output)
            .is_some()
        {
            return Err(GraphError::PortOccupied {
                node_id: connection.source,
                key: connection.source_output.clone(),
            });
        }
        self.connections.push(connection);
        Ok(())
    }

    pub(crate) fn remove_connection(
        &mut self,
        source: NodeId,
        output: &str,
        target: NodeId,
    ) -> Option<Connection> {
        let index = self
            .connections
            .iter()
            .position(|c| c.source == source && c.source_output == output && c.target == target)?;
        Some(self.connections.remove(index))
    }

    /// Drops every connection on one output port, returning the removed
    /// edges so callers can notify the peers.
    pub(crate) fn remove_connections_on_output(
        &mut self,
        source: NodeId,
        output: &str,
    ) -> Vec<Connection> {
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.source == source && c.source_output == output);
        self.connections = kept;
        dropped
    }

    /// Removes a node together with every connection touching it.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<(Node, Vec<Connection>)> {
        let node = self.nodes.remove(&id)?;
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.source == id || c.target == id);
        self.connections = kept;
        Some((node, dropped))
    }
}
