use indexmap::IndexMap;
use serde::Deserialize;

/// The subset of JSON Schema the engine understands.
///
/// Everything is optional; an empty fragment means "any value". Unknown
/// keywords are ignored on deserialization so real-world schemas with
/// `format`, `pattern` and friends still load — those keywords are simply
/// not enforced.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SchemaFragment {
    #[serde(rename = "type")]
    pub schema_type: Option<String>,

    #[serde(rename = "$ref")]
    pub reference: Option<String>,

    pub title: Option<String>,

    pub properties: Option<IndexMap<String, SchemaFragment>>,

    #[serde(default)]
    pub required: Vec<String>,

    pub items: Option<ItemsForm>,

    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalForm>,

    #[serde(rename = "anyOf")]
    pub any_of: Option<AnyOfForm>,

    #[serde(rename = "const")]
    pub const_value: Option<serde_json::Value>,

    pub default: Option<serde_json::Value>,
}

/// The `items` keyword: a single schema, or the (unsupported) tuple form.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ItemsForm {
    Single(Box<SchemaFragment>),
    Tuple(Vec<SchemaFragment>),
}

/// The `additionalProperties` keyword: a blanket boolean or a schema.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AdditionalForm {
    Allowed(bool),
    Schema(Box<SchemaFragment>),
}

/// The `anyOf` keyword. The malformed (non-array) form is kept around so
/// the resolver can report it instead of silently falling back to Any.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnyOfForm {
    Branches(Vec<SchemaFragment>),
    Malformed(serde_json::Value),
}

impl SchemaFragment {
    pub fn is_type(&self, name: &str) -> bool {
        self.schema_type.as_deref() == Some(name)
    }

    pub fn is_object(&self) -> bool {
        self.is_type("object")
    }

    pub fn is_array(&self) -> bool {
        self.is_type("array")
    }

    /// A `const`-valued fragment has no UI surface at all; its value is fixed.
    pub fn is_const_only(&self) -> bool {
        self.const_value.is_some()
    }

    /// Whether the fragment itself admits `null`, either directly or through
    /// a `{"type": "null"}` branch of `anyOf`.
    pub fn allows_null(&self) -> bool {
        if self.is_type("null") {
            return true;
        }
        match &self.any_of {
            Some(AnyOfForm::Branches(branches)) => branches.iter().any(|b| b.is_type("null")),
            _ => false,
        }
    }

    /// The inner schema of a container fragment: `items` for arrays,
    /// `additionalProperties` for objects. `None` means "any value".
    pub fn inner_schema(&self) -> Option<&SchemaFragment> {
        if self.is_array() {
            if let Some(ItemsForm::Single(inner)) = &self.items {
                return Some(inner);
            }
        } else if self.is_object() {
            if let Some(AdditionalForm::Schema(inner)) = &self.additional_properties {
                return Some(inner);
            }
        }
        None
    }

    /// A label for error messages, preferring the authored `title`.
    pub(crate) fn location(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.schema_type.clone())
            .unwrap_or_else(|| "schema".to_string())
    }
}
