use crate::error::SchemaError;
use crate::graph::ControlKind;
use crate::schema::{AnyOfForm, SchemaFragment};
use crate::socket::registry::SocketRegistry;
use crate::socket::resolver::resolve_socket;

/// Renders a 1-based index as an Excel-style column name: 1 -> "A",
/// 2 -> "B", 27 -> "AA". Entry core names are generated this way from a
/// per-node counter.
pub fn excel_name(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push(b'A' + (index % 26) as u8);
        index /= 26;
    }
    letters.into_iter().rev().map(char::from).collect()
}

/// A schema fragment reduced to what one entry needs: the bound schema
/// with null branches folded into a nullability flag, and the named union
/// alternatives when more than one non-null branch remains.
pub(crate) struct ClassifiedSchema {
    pub schema: Option<SchemaFragment>,
    pub schema_map: Vec<(String, SchemaFragment)>,
    pub is_nullable: bool,
}

pub(crate) fn classify_schema(
    registry: &mut SocketRegistry,
    schema: Option<SchemaFragment>,
) -> Result<ClassifiedSchema, SchemaError> {
    let Some(schema) = schema else {
        return Ok(ClassifiedSchema {
            schema: None,
            schema_map: Vec::new(),
            is_nullable: false,
        });
    };

    match &schema.any_of {
        None => Ok(ClassifiedSchema {
            schema: Some(schema),
            schema_map: Vec::new(),
            is_nullable: false,
        }),
        Some(AnyOfForm::Malformed(_)) => Err(SchemaError::UnsupportedSchema {
            location: schema.location(),
            message: "'anyOf' must be an array of schemas".to_string(),
        }),
        Some(AnyOfForm::Branches(branches)) => {
            let is_nullable = branches.iter().any(|b| b.is_type("null"));
            let concrete: Vec<&SchemaFragment> =
                branches.iter().filter(|b| !b.is_type("null")).collect();
            match concrete.len() {
                // Only null branches: the value is permanently absent.
                0 => Ok(ClassifiedSchema {
                    schema: branches.first().cloned(),
                    schema_map: Vec::new(),
                    is_nullable,
                }),
                1 => Ok(ClassifiedSchema {
                    schema: Some(concrete[0].clone()),
                    schema_map: Vec::new(),
                    is_nullable,
                }),
                _ => {
                    let mut schema_map: Vec<(String, SchemaFragment)> = Vec::new();
                    for branch in concrete {
                        let name = resolve_socket(registry, Some(branch))?;
                        if !schema_map.iter().any(|(n, _)| n == &name) {
                            schema_map.push((name, branch.clone()));
                        }
                    }
                    Ok(ClassifiedSchema {
                        schema: Some(schema),
                        schema_map,
                        is_nullable,
                    })
                }
            }
        }
    }
}

/// One dynamic element of a compound node's output map.
///
/// The entry list on the node is authoritative: the engine keeps
/// materialized controls and the output port in exact correspondence with
/// these fields, and the key fields below mirror what is currently
/// materialized (`None` when the control or port does not exist).
#[derive(Debug, Clone, PartialEq)]
pub struct MappedOutputEntry {
    /// Stable identity, generated by [`excel_name`] from the node counter.
    pub core_name: String,
    pub schema: Option<SchemaFragment>,

    pub data_key: Option<String>,
    pub data_value: Option<serde_json::Value>,

    pub output_key: Option<String>,

    pub name_key: Option<String>,
    pub name_value: Option<String>,
    pub has_fixed_name: bool,

    pub is_nullable: bool,
    pub is_nulled: bool,

    /// Fixed, schema-declared entries do not move; dynamically-added ones do.
    pub can_move: bool,
    pub removable: bool,

    /// Named union alternatives when the governing schema is an `anyOf`
    /// with several concrete branches, keyed by socket name.
    pub schema_map: Vec<(String, SchemaFragment)>,
    pub select_key: Option<String>,
    pub select_value: Option<String>,

    /// True for `const`-only fragments: no controls, no port, fixed value.
    pub hide: bool,
}

impl MappedOutputEntry {
    fn from_classified(core_name: String, classified: ClassifiedSchema) -> Self {
        let select_value = classified.schema_map.first().map(|(name, _)| name.clone());
        let mut entry = Self {
            core_name,
            schema: classified.schema,
            data_key: None,
            data_value: None,
            output_key: None,
            name_key: None,
            name_value: None,
            has_fixed_name: false,
            is_nullable: classified.is_nullable,
            is_nulled: false,
            can_move: true,
            removable: true,
            schema_map: classified.schema_map,
            select_key: None,
            select_value,
            hide: false,
        };
        entry.hide = entry
            .effective_schema()
            .is_some_and(SchemaFragment::is_const_only);
        entry.data_value = entry.effective_schema().and_then(|s| {
            s.const_value.clone().or_else(|| s.default.clone())
        });
        entry
    }

    /// A schema-declared property of an object definition. Seeded once at
    /// node build time; never movable, never removable.
    pub(crate) fn fixed_property(
        registry: &mut SocketRegistry,
        core_name: String,
        name: &str,
        schema: SchemaFragment,
        required: bool,
    ) -> Result<Self, SchemaError> {
        let classified = classify_schema(registry, Some(schema))?;
        let mut entry = Self::from_classified(core_name, classified);
        entry.name_value = Some(name.to_string());
        entry.has_fixed_name = true;
        entry.can_move = false;
        entry.removable = false;
        entry.is_nullable = entry.is_nullable || !required;
        entry.is_nulled = entry.is_nullable && entry.data_value.is_none();
        Ok(entry)
    }

    /// A dynamically-added member of an object-kind node: editable name,
    /// movable, removable.
    pub(crate) fn dynamic_member(
        registry: &mut SocketRegistry,
        core_name: String,
        schema: Option<SchemaFragment>,
    ) -> Result<Self, SchemaError> {
        let classified = classify_schema(registry, schema)?;
        let mut entry = Self::from_classified(core_name, classified);
        entry.name_value = Some(entry.display_name());
        Ok(entry)
    }

    /// A dynamically-added element of an array-kind node: no name, movable,
    /// removable.
    pub(crate) fn dynamic_element(
        registry: &mut SocketRegistry,
        core_name: String,
        schema: Option<SchemaFragment>,
    ) -> Result<Self, SchemaError> {
        let classified = classify_schema(registry, schema)?;
        Ok(Self::from_classified(core_name, classified))
    }

    /// Rebinds the entry to a new governing schema, keeping its identity
    /// and position. The caller re-materializes afterwards.
    pub(crate) fn rebind_schema(
        &mut self,
        registry: &mut SocketRegistry,
        schema: Option<SchemaFragment>,
    ) -> Result<(), SchemaError> {
        let classified = classify_schema(registry, schema)?;
        self.schema = classified.schema;
        self.schema_map = classified.schema_map;
        self.select_value = self.schema_map.first().map(|(name, _)| name.clone());
        self.is_nullable = classified.is_nullable || (!self.has_fixed_name && self.is_nullable);
        self.hide = self
            .effective_schema()
            .is_some_and(SchemaFragment::is_const_only);
        Ok(())
    }

    pub fn display_name(&self) -> String {
        format!("Item {}", self.core_name)
    }

    /// The schema currently governing the entry's value: the selected
    /// union alternative when one exists, otherwise the bound schema.
    pub fn effective_schema(&self) -> Option<&SchemaFragment> {
        if let (false, Some(selected)) = (self.schema_map.is_empty(), &self.select_value) {
            return self
                .schema_map
                .iter()
                .find(|(name, _)| name == selected)
                .map(|(_, schema)| schema);
        }
        self.schema.as_ref()
    }

    /// Kind of the literal-value control, when the governing schema calls
    /// for one. `null` and `const` fragments never get a data control.
    pub fn data_control_kind(&self) -> Option<ControlKind> {
        if self.hide {
            return None;
        }
        match self.effective_schema()?.schema_type.as_deref()? {
            "string" => Some(ControlKind::Text),
            "integer" | "number" => Some(ControlKind::Number),
            "boolean" => Some(ControlKind::Boolean),
            _ => None,
        }
    }

    pub fn has_data_control(&self) -> bool {
        self.data_control_kind().is_some()
    }

    pub fn has_name_control(&self) -> bool {
        self.name_value.is_some() && !self.has_fixed_name
    }

    pub fn has_select_control(&self) -> bool {
        !self.schema_map.is_empty()
    }

    /// Whether the entry exposes a connectable port. Almost every entry
    /// does - a connected child node always takes precedence over the
    /// inline literal - except const fragments (value is fixed) and pure
    /// null fragments (value is permanently absent).
    pub fn has_output(&self) -> bool {
        if self.hide {
            return false;
        }
        match self.effective_schema() {
            None => true,
            Some(schema) => !schema.is_type("null"),
        }
    }

    pub(crate) fn derived_name_key(&self) -> String {
        format!("name-{}", self.core_name)
    }

    pub(crate) fn derived_data_key(&self) -> String {
        format!("data-{}", self.core_name)
    }

    pub(crate) fn derived_select_key(&self) -> String {
        format!("select-{}", self.core_name)
    }

    pub(crate) fn derived_output_key(&self) -> String {
        format!("output-{}", self.core_name)
    }
}
