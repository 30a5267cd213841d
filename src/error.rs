use crate::graph::NodeId;
use thiserror::Error;

/// Errors raised while translating a JSON Schema fragment into a socket.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unsupported schema construct in '{location}': {message}")]
    UnsupportedSchema { location: String, message: String },

    #[error("Could not extract a definition name from reference '{reference}'")]
    InvalidReference { reference: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by the socket registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("A socket named '{name}' is already registered")]
    DuplicateSocket { name: String },

    #[error("Socket '{name}' is not registered")]
    UnknownSocket { name: String },
}

/// Errors raised while building or mutating the node graph.
///
/// These are programmer or schema-authoring errors and always propagate.
/// Recoverable user actions (a move past a boundary, a remove with a stale
/// index) never produce a `GraphError`; they come back as
/// [`OperationOutcome::Rejected`](crate::output_map::OperationOutcome).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {node_id} does not exist")]
    NodeNotFound { node_id: NodeId },

    #[error("Node {node_id} has no port with key '{key}'")]
    PortNotFound { node_id: NodeId, key: String },

    #[error("The '{key}' port of node {node_id} already has a connection")]
    PortOccupied { node_id: NodeId, key: String },

    #[error("No connection from node {source} ('{output}') to node {target}")]
    ConnectionNotFound {
        // `r#` keeps thiserror from treating this field as the error source.
        r#source: NodeId,
        output: String,
        target: NodeId,
    },

    #[error("A node cannot be connected to itself")]
    SelfConnection,

    #[error("Socket '{source}' cannot be connected to socket '{target}'")]
    IncompatibleSockets { r#source: String, target: String },

    #[error("Node {node_id} is not an object or array node")]
    NotACompoundNode { node_id: NodeId },

    #[error("Node {node_id} is not a scalar node")]
    NotAScalarNode { node_id: NodeId },

    #[error("Node {node_id} has no mapped output entry at index {index}")]
    EntryNotFound { node_id: NodeId, index: usize },

    #[error("Entry at index {index} of node {node_id} has no literal value control")]
    NoDataControl { node_id: NodeId, index: usize },

    #[error("Entry '{name}' of node {node_id} has a schema-fixed name")]
    FixedEntryName { node_id: NodeId, name: String },

    #[error("Entry '{name}' of node {node_id} is not nullable")]
    NotNullable { node_id: NodeId, name: String },

    #[error("'{name}' is not a selectable alternative on node {node_id}")]
    UnknownAlternative { node_id: NodeId, name: String },

    #[error("The root schema has no definition named '{name}'")]
    UnknownDefinition { name: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised while pulling a JSON value out of the graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Node {node_id} does not exist")]
    NodeNotFound { node_id: NodeId },

    #[error("Evaluation revisited node {node_id}: the graph contains a cycle")]
    CyclicGraph { node_id: NodeId },
}
