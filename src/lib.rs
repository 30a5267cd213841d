//! # Kumiko - Schema-Driven Node-Graph Document Engine
//!
//! **Kumiko** is the headless core of a visual node-graph editor for
//! constructing JSON documents that conform to a JSON Schema. Users drag in
//! typed nodes (strings, numbers, booleans, objects, arrays, and
//! schema-defined definition types), wire them together, and the graph is
//! evaluated into a JSON value tree. Rendering, drag-and-drop and widget
//! painting belong to a host application; this crate owns the type system
//! and the graph-shape rules:
//!
//! - a **socket registry** of named compatibility types, with composite
//!   sockets synthesized for container and union schemas,
//! - a **schema resolver** translating JSON Schema fragments into sockets,
//! - the **output map**: the per-node ordered list of dynamic ports and
//!   controls, with add/remove/move operations that keep the materialized
//!   widgets in exact correspondence,
//! - **connection-type propagation**, restricting a child node's
//!   selectable element types to what the parent's schema allows, and
//! - pull-based **evaluation** of the graph into a `serde_json::Value`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use kumiko::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let document = SchemaDocument::from_json(
//!         r#"{
//!             "title": "Config",
//!             "type": "object",
//!             "properties": {
//!                 "name": {"type": "string"},
//!                 "retries": {"type": "integer"}
//!             },
//!             "required": ["name", "retries"]
//!         }"#,
//!     )?;
//!
//!     let mut session = Session::new(document)?;
//!     let root = session.add_root_node()?;
//!
//!     // The fixed properties are seeded as entries 0 and 1.
//!     session.set_data_value(root, 0, serde_json::json!("primary"))?;
//!     session.set_data_value(root, 1, serde_json::json!(3))?;
//!
//!     let value = session.evaluate(root)?;
//!     assert_eq!(value, serde_json::json!({"name": "primary", "retries": 3}));
//!     Ok(())
//! }
//! ```
//!
//! Every mutation goes through [`Session`](session::Session) as an explicit
//! command and answers with an
//! [`OperationOutcome`](output_map::OperationOutcome): either the set of
//! nodes whose views need refreshing, or a recoverable rejection that left
//! the model untouched.

pub mod error;
pub mod eval;
pub mod graph;
pub mod output_map;
pub mod prelude;
pub mod propagation;
pub mod schema;
pub mod session;
pub mod socket;
