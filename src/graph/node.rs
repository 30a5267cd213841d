use crate::output_map::MappedOutputEntry;
use crate::schema::SchemaFragment;
use crate::socket::registry::{BOOLEAN, NONE, NUMBER, TEXT};

pub type NodeId = u32;

/// Key of the single input port every node owns. Connection-type
/// propagation only ever fires for this port.
pub const PARENT_PORT: &str = "parent";

/// Key of the node-level type-selection control on compound nodes.
pub const TYPE_SELECT_KEY: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Number,
    Boolean,
    None,
}

impl ScalarKind {
    pub fn socket_name(&self) -> &'static str {
        match self {
            ScalarKind::Text => TEXT,
            ScalarKind::Number => NUMBER,
            ScalarKind::Boolean => BOOLEAN,
            ScalarKind::None => NONE,
        }
    }

    pub fn title(&self) -> &'static str {
        self.socket_name()
    }

    /// The None kind carries no editable value.
    pub fn control_kind(&self) -> Option<ControlKind> {
        match self {
            ScalarKind::Text => Some(ControlKind::Text),
            ScalarKind::Number => Some(ControlKind::Number),
            ScalarKind::Boolean => Some(ControlKind::Boolean),
            ScalarKind::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Number,
    Boolean,
    Name,
    Select,
}

/// The data contract of a rendered widget: a keyed, settable value plus
/// (for selects) the list of offered options. Rendering happens elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub key: String,
    pub kind: ControlKind,
    pub value: serde_json::Value,
    pub options: Vec<String>,
}

impl Control {
    pub fn new(key: impl Into<String>, kind: ControlKind, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            kind,
            value,
            options: Vec::new(),
        }
    }

    pub fn select(key: impl Into<String>, options: Vec<String>, value: &str) -> Self {
        Self {
            key: key.into(),
            kind: ControlKind::Select,
            value: serde_json::Value::String(value.to_string()),
            options,
        }
    }
}

/// A connectable output port, typed by a socket name.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPort {
    pub key: String,
    pub socket: String,
}

/// Per-kind node state, built once when the node is constructed.
#[derive(Debug)]
pub enum NodeState {
    Scalar(ScalarState),
    Compound(CompoundState),
}

#[derive(Debug)]
pub struct ScalarState {
    pub kind: ScalarKind,
    pub schema: Option<SchemaFragment>,
    /// Key of the value control; `None` for the None kind.
    pub data_key: Option<String>,
}

#[derive(Debug)]
pub struct CompoundState {
    pub kind: CompoundKind,
    pub schema: Option<SchemaFragment>,
    /// The single source of truth for the node's dynamic ports, in
    /// user-visible (and JSON-output) order. Non-movable entries always
    /// form a contiguous prefix.
    pub entries: Vec<MappedOutputEntry>,
    /// Monotone counter behind entry core names. Never decremented, so a
    /// removed-then-readded element can never collide with a stale name.
    pub next_output_index: u32,
    /// Schema governing entries created by the Add operation.
    pub element_schema: Option<SchemaFragment>,
    /// Type alternatives propagated from a parent connection, in encounter
    /// order. Empty when the node is unconnected.
    pub alternatives: Vec<(String, SchemaFragment)>,
    /// Currently selected type alternative (a socket name).
    pub selected: String,
}

impl CompoundState {
    /// Number of leading non-movable entries.
    pub fn fixed_prefix_len(&self) -> usize {
        self.entries.iter().take_while(|e| !e.can_move).count()
    }
}

/// A node in the editor graph: one `parent` input port, zero or more
/// output ports, zero or more controls, and its kind-specific state.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    /// Socket typing the `parent` input port.
    pub parent_socket: String,
    pub outputs: Vec<OutputPort>,
    pub controls: Vec<Control>,
    pub state: NodeState,
}

impl Node {
    pub fn output(&self, key: &str) -> Option<&OutputPort> {
        self.outputs.iter().find(|p| p.key == key)
    }

    pub fn control(&self, key: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.key == key)
    }

    pub fn control_mut(&mut self, key: &str) -> Option<&mut Control> {
        self.controls.iter_mut().find(|c| c.key == key)
    }

    pub(crate) fn remove_control(&mut self, key: &str) -> Option<Control> {
        let index = self.controls.iter().position(|c| c.key == key)?;
        Some(self.controls.remove(index))
    }

    pub(crate) fn remove_output(&mut self, key: &str) -> Option<OutputPort> {
        let index = self.outputs.iter().position(|p| p.key == key)?;
        Some(self.outputs.remove(index))
    }

    pub fn compound(&self) -> Option<&CompoundState> {
        match &self.state {
            NodeState::Compound(state) => Some(state),
            NodeState::Scalar(_) => None,
        }
    }

    pub fn compound_mut(&mut self) -> Option<&mut CompoundState> {
        match &mut self.state {
            NodeState::Compound(state) => Some(state),
            NodeState::Scalar(_) => None,
        }
    }

    pub fn entries(&self) -> &[MappedOutputEntry] {
        self.compound().map(|c| c.entries.as_slice()).unwrap_or(&[])
    }
}
