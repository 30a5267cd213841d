//! End-to-end tests: schema in, graph edits, JSON document out.
mod common;
use common::*;
use kumiko::prelude::*;
use serde_json::json;

fn applied(outcome: OperationOutcome) -> Vec<NodeId> {
    match outcome {
        OperationOutcome::Applied { affected } => affected,
        OperationOutcome::Rejected { reason } => panic!("unexpected rejection: {reason}"),
    }
}

#[test]
fn test_session_registers_definition_sockets() {
    let session = Session::new(station_document()).unwrap();
    assert!(session.registry().contains("Sensor"));
    for name in DEFAULT_TYPE_OPTIONS {
        assert!(session.registry().contains(name));
    }
}

#[test]
fn test_full_station_document() {
    let (mut session, root) = station_session();

    session.set_data_value(root, 0, json!("base")).unwrap();
    session.set_data_value(root, 2, json!(true)).unwrap();

    // Wire up the tags list and fill in two elements.
    let tags = session
        .add_node_for_schema(
            "Tags",
            &fragment(json!({ "type": "array", "items": { "type": "string" } })),
        )
        .unwrap();
    applied(session.connect(root, "output-E", tags).unwrap());
    applied(session.apply(tags, Operation::Add { after: None }).unwrap());
    applied(session.apply(tags, Operation::Add { after: Some(0) }).unwrap());
    session.set_data_value(tags, 0, json!("north")).unwrap();
    session.set_data_value(tags, 1, json!("ridge")).unwrap();

    // Wire up the referenced Sensor definition.
    let sensor = session.add_definition_node("Sensor").unwrap();
    applied(session.connect(root, "output-F", sensor).unwrap());
    session.set_data_value(sensor, 0, json!(7)).unwrap();

    assert_eq!(
        session.evaluate(root).unwrap(),
        json!({
            "name": "base",
            "elevation": 120.5,
            "active": true,
            "comment": null,
            "tags": ["north", "ridge"],
            "sensor": { "id": 7, "unit": "celsius" }
        })
    );
}

#[test]
fn test_definition_nodes_carry_their_own_socket() {
    let mut session = Session::new(station_document()).unwrap();
    let sensor = session.add_definition_node("Sensor").unwrap();
    assert_eq!(session.node(sensor).unwrap().parent_socket, "Sensor");
    assert_eq!(session.node(sensor).unwrap().title, "Sensor");

    let err = session.add_definition_node("Thermostat").unwrap_err();
    assert!(matches!(err, GraphError::UnknownDefinition { .. }));
}

#[test]
fn test_reference_fragments_route_to_their_definition() {
    let mut session = Session::new(station_document()).unwrap();
    let sensor = session
        .add_node_for_schema("ignored", &fragment(json!({ "$ref": "#/definitions/Sensor" })))
        .unwrap();
    // The definition wins over the caller-supplied title.
    assert_eq!(session.node(sensor).unwrap().title, "Sensor");
    assert_eq!(session.node(sensor).unwrap().entries().len(), 2);
}

#[test]
fn test_reference_root_builds_its_definition() {
    let mut session = Session::new(
        SchemaDocument::from_json(
            r##"{
                "$ref": "#/definitions/Sensor",
                "definitions": {
                    "Sensor": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "unit": { "const": "celsius" }
                        },
                        "required": ["id", "unit"]
                    }
                }
            }"##,
        )
        .unwrap(),
    )
    .unwrap();

    let root = session.add_root_node().unwrap();
    assert_eq!(session.node(root).unwrap().title, "Sensor");
    assert_eq!(session.node(root).unwrap().parent_socket, "Sensor");
    assert_eq!(session.node(root).unwrap().entries().len(), 2);

    session.set_data_value(root, 0, json!(7)).unwrap();
    assert_eq!(
        session.evaluate(root).unwrap(),
        json!({ "id": 7, "unit": "celsius" })
    );
}

#[test]
fn test_untyped_fragments_cannot_become_nodes() {
    let mut session = Session::empty().unwrap();
    let err = session
        .add_node_for_schema("Opaque", &fragment(json!({ "title": "anything" })))
        .unwrap_err();
    assert!(matches!(err, GraphError::Schema(SchemaError::UnsupportedSchema { .. })));
}

#[test]
fn test_removing_a_connected_child_leaves_a_null_hole() {
    let (mut session, root) = station_session();
    let tags = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();
    applied(session.connect(root, "output-E", tags).unwrap());

    let affected = applied(session.remove_node(tags).unwrap());
    assert!(affected.contains(&root));
    assert!(!session.graph().contains(tags));
    assert!(session.graph().connections().is_empty());
    assert_eq!(session.evaluate(root).unwrap()["tags"], json!(null));
}

#[test]
fn test_removing_a_parent_resets_the_child() {
    let (mut session, root) = station_session();
    let tags = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();
    applied(session.connect(root, "output-E", tags).unwrap());
    assert_eq!(
        session.node(tags).unwrap().compound().unwrap().selected,
        "Text"
    );

    applied(session.remove_node(root).unwrap());
    let state = session.node(tags).unwrap().compound().unwrap();
    assert_eq!(state.selected, "Any");
    assert!(state.alternatives.is_empty());
}

#[test]
fn test_scalar_nodes_for_every_kind() {
    let mut session = Session::empty().unwrap();
    let cases = [
        (ScalarKind::Text, json!("hi"), json!("hi")),
        (ScalarKind::Number, json!(2.5), json!(2.5)),
        (ScalarKind::Boolean, json!(true), json!(true)),
    ];
    for (kind, input, expected) in cases {
        let node = session.add_scalar_node(kind);
        session.set_scalar_value(node, input).unwrap();
        assert_eq!(session.evaluate(node).unwrap(), expected);
    }
}

#[test]
fn test_scalar_edits_reject_compound_nodes() {
    let (mut session, root) = station_session();
    let err = session.set_scalar_value(root, json!(1)).unwrap_err();
    assert!(matches!(err, GraphError::NotAScalarNode { .. }));

    let text = session.add_scalar_node(ScalarKind::Text);
    let err = session
        .apply(text, Operation::Add { after: None })
        .unwrap_err();
    assert!(matches!(err, GraphError::NotACompoundNode { .. }));
}

#[test]
fn test_node_for_scalar_schema_keeps_its_default() {
    let mut session = Session::empty().unwrap();
    let node = session
        .add_node_for_schema(
            "Port",
            &fragment(json!({ "type": "integer", "default": 8080 })),
        )
        .unwrap();
    assert_eq!(session.evaluate(node).unwrap(), json!(8080));
}
