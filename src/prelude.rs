//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types so host applications can pull
//! in the whole editing surface with one `use`.

// Session and evaluation
pub use crate::eval::DocumentEvaluator;
pub use crate::session::Session;

// Schema model
pub use crate::schema::{AdditionalForm, AnyOfForm, ItemsForm, SchemaDocument, SchemaFragment};

// Sockets
pub use crate::socket::registry::{DEFAULT_TYPE_OPTIONS, Socket, SocketRegistry};
pub use crate::socket::resolver::resolve_socket;

// Graph model
pub use crate::graph::{
    CompoundKind, Connection, Control, ControlKind, Graph, Node, NodeId, PARENT_PORT, ScalarKind,
};

// Output map
pub use crate::output_map::{MappedOutputEntry, Operation, OperationOutcome, excel_name};

// Error types
pub use crate::error::{EvaluationError, GraphError, RegistryError, SchemaError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
