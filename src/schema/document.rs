use super::fragment::SchemaFragment;
use indexmap::IndexMap;
use serde::Deserialize;

/// The root schema supplied by the host application, with its shared
/// definitions. Definition order is preserved because each definition is
/// registered as a socket in declaration order at session startup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchemaDocument {
    #[serde(flatten)]
    pub root: SchemaFragment,

    #[serde(default, alias = "$defs")]
    pub definitions: IndexMap<String, SchemaFragment>,
}

impl SchemaDocument {
    /// Parses a schema document from JSON text.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Parses a schema document from an already-loaded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn definition(&self, name: &str) -> Option<&SchemaFragment> {
        self.definitions.get(name)
    }

    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}
