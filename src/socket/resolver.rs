use super::registry::{ANY, BOOLEAN, DICTIONARY, LIST, NONE, NUMBER, SocketRegistry, TEXT};
use crate::error::SchemaError;
use crate::schema::{AdditionalForm, AnyOfForm, ItemsForm, SchemaFragment};
use itertools::Itertools;

/// Resolves a schema fragment to the name of the socket that types its
/// ports, creating composite sockets through the registry on demand.
///
/// Match order, first hit wins:
///
/// 1. no schema: `Any`
/// 2. `$ref`: the final path segment of the reference
/// 3. primitive `type`: the fixed mapping to `Text` / `Number` / `Boolean` / `None`
/// 4. `type: array`: `List[<items>]`
/// 5. `type: object`: `Dictionary[<additionalProperties>]`
/// 6. `anyOf`: the members' sockets joined with `" | "`
/// 7. anything else: `Any`
pub fn resolve_socket(
    registry: &mut SocketRegistry,
    schema: Option<&SchemaFragment>,
) -> Result<String, SchemaError> {
    let Some(schema) = schema else {
        return Ok(ANY.to_string());
    };

    if let Some(reference) = &schema.reference {
        let name = reference
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| SchemaError::InvalidReference {
                reference: reference.clone(),
            })?;
        // Definition sockets are registered ahead of any node referencing
        // them and carry no compatibility union of their own.
        return Ok(registry.ensure(name).name.clone());
    }

    if let Some(type_name) = schema.schema_type.as_deref() {
        match type_name {
            "string" => return Ok(TEXT.to_string()),
            "integer" | "number" => return Ok(NUMBER.to_string()),
            "boolean" => return Ok(BOOLEAN.to_string()),
            "null" => return Ok(NONE.to_string()),
            "array" => return resolve_array(registry, schema),
            "object" => return resolve_object(registry, schema),
            _ => {}
        }
    }

    if let Some(any_of) = &schema.any_of {
        return resolve_union(registry, schema, any_of);
    }

    Ok(ANY.to_string())
}

fn resolve_array(
    registry: &mut SocketRegistry,
    schema: &SchemaFragment,
) -> Result<String, SchemaError> {
    match &schema.items {
        None => container(registry, LIST, ANY),
        Some(ItemsForm::Tuple(_)) => Err(SchemaError::UnsupportedSchema {
            location: schema.location(),
            message: "tuple-form 'items' is not supported".to_string(),
        }),
        Some(ItemsForm::Single(inner)) => {
            let inner_name = resolve_socket(registry, Some(inner))?;
            container(registry, LIST, &inner_name)
        }
    }
}

fn resolve_object(
    registry: &mut SocketRegistry,
    schema: &SchemaFragment,
) -> Result<String, SchemaError> {
    if schema.properties.is_some() {
        // An object with fixed properties must be a named definition so its
        // socket carries the definition name.
        return Err(SchemaError::UnsupportedSchema {
            location: schema.location(),
            message: "inline object with 'properties' must be a named definition".to_string(),
        });
    }
    match &schema.additional_properties {
        Some(AdditionalForm::Schema(inner)) => {
            let inner_name = resolve_socket(registry, Some(inner))?;
            container(registry, DICTIONARY, &inner_name)
        }
        _ => container(registry, DICTIONARY, ANY),
    }
}

fn resolve_union(
    registry: &mut SocketRegistry,
    schema: &SchemaFragment,
    any_of: &AnyOfForm,
) -> Result<String, SchemaError> {
    let AnyOfForm::Branches(branches) = any_of else {
        return Err(SchemaError::UnsupportedSchema {
            location: schema.location(),
            message: "'anyOf' must be an array of schemas".to_string(),
        });
    };

    let names: Vec<String> = branches
        .iter()
        .map(|branch| resolve_socket(registry, Some(branch)))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unique()
        .collect();

    if names.is_empty() {
        return Ok(ANY.to_string());
    }
    Ok(registry.resolve_or_create_composite(&names, None)?)
}

/// A parameterized container socket such as `List[Text]`. Compatibility
/// comes from the base container socket alone; the inner name only
/// disambiguates the composite.
fn container(
    registry: &mut SocketRegistry,
    base: &str,
    inner: &str,
) -> Result<String, SchemaError> {
    let name = format!("{base}[{inner}]");
    Ok(registry.resolve_or_create_composite(&[base.to_string()], Some(&name))?)
}
