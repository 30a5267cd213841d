//! Tests for wiring rules and connection-type propagation.
mod common;
use common::*;
use kumiko::graph::TYPE_SELECT_KEY;
use kumiko::prelude::*;
use serde_json::json;

fn applied(outcome: OperationOutcome) -> Vec<NodeId> {
    match outcome {
        OperationOutcome::Applied { affected } => affected,
        OperationOutcome::Rejected { reason } => panic!("unexpected rejection: {reason}"),
    }
}

fn type_options(session: &Session, node: NodeId) -> Vec<String> {
    session
        .node(node)
        .unwrap()
        .control(TYPE_SELECT_KEY)
        .map(|c| c.options.clone())
        .unwrap_or_default()
}

#[test]
fn test_incompatible_sockets_are_rejected() {
    let (mut session, root) = station_session();
    let text = session.add_scalar_node(ScalarKind::Text);
    // tags carries List[Text]; a bare Text node cannot satisfy it.
    let err = session.connect(root, "output-E", text).unwrap_err();
    assert!(matches!(err, GraphError::IncompatibleSockets { .. }));
    assert!(session.graph().connections().is_empty());
}

#[test]
fn test_ports_hold_at_most_one_connection() {
    let (mut session, root) = station_session();
    let first = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();
    let second = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();

    applied(session.connect(root, "output-E", first).unwrap());
    let err = session.connect(root, "output-E", second).unwrap_err();
    assert!(matches!(err, GraphError::PortOccupied { .. }));
}

#[test]
fn test_self_connection_is_rejected() {
    let mut session = Session::empty().unwrap();
    let dict = session
        .add_node_for_schema("Loop", &fragment(json!({ "type": "object" })))
        .unwrap();
    applied(session.apply(dict, Operation::Add { after: None }).unwrap());
    let err = session.connect(dict, "output-A", dict).unwrap_err();
    assert!(matches!(err, GraphError::SelfConnection));
}

#[test]
fn test_connection_restricts_the_child_type_list() {
    let (mut session, root) = station_session();
    let tags = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();
    // Unconnected nodes have no type control yet.
    assert!(session.node(tags).unwrap().control(TYPE_SELECT_KEY).is_none());

    let affected = applied(session.connect(root, "output-E", tags).unwrap());
    assert!(affected.contains(&tags));

    // tags is declared as array-of-string, so the child may only offer Text.
    assert_eq!(type_options(&session, tags), ["Text"]);
    let state = session.node(tags).unwrap().compound().unwrap();
    assert_eq!(state.selected, "Text");
    assert!(state.element_schema.as_ref().unwrap().is_type("string"));
}

#[test]
fn test_unrestricted_connection_keeps_the_default_type_list() {
    let mut session = Session::empty().unwrap();
    let dict = session
        .add_node_for_schema("Outer", &fragment(json!({ "type": "object" })))
        .unwrap();
    let child = session
        .add_node_for_schema("Inner", &fragment(json!({ "type": "array" })))
        .unwrap();
    applied(session.apply(dict, Operation::Add { after: None }).unwrap());
    applied(session.connect(dict, "output-A", child).unwrap());

    assert_eq!(type_options(&session, child), DEFAULT_TYPE_OPTIONS);
    assert_eq!(session.node(child).unwrap().compound().unwrap().selected, "Any");
}

#[test]
fn test_disconnect_restores_the_default_type_list() {
    let (mut session, root) = station_session();
    let tags = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();
    applied(session.connect(root, "output-E", tags).unwrap());
    assert_eq!(type_options(&session, tags), ["Text"]);

    let affected = applied(session.disconnect(root, "output-E", tags).unwrap());
    assert!(affected.contains(&tags));
    assert_eq!(type_options(&session, tags), DEFAULT_TYPE_OPTIONS);
    let state = session.node(tags).unwrap().compound().unwrap();
    assert_eq!(state.selected, "Any");
    assert!(state.alternatives.is_empty());
}

#[test]
fn test_disconnect_without_a_connection_fails() {
    let (mut session, root) = station_session();
    let tags = session
        .add_node_for_schema("Tags", &fragment(json!({ "type": "array" })))
        .unwrap();
    let err = session.disconnect(root, "output-E", tags).unwrap_err();
    assert!(matches!(err, GraphError::ConnectionNotFound { .. }));
}

#[test]
fn test_type_selection_rebinds_dynamic_entries() {
    let mut session = Session::empty().unwrap();
    let list = session
        .add_node_for_schema("Free", &fragment(json!({ "type": "array" })))
        .unwrap();
    applied(session.select_type(list, "Text").unwrap());
    applied(session.apply(list, Operation::Add { after: None }).unwrap());

    let node = session.node(list).unwrap();
    assert_eq!(node.control("data-A").map(|c| c.kind), Some(ControlKind::Text));
    assert_eq!(node.output("output-A").map(|p| p.socket.as_str()), Some("Text"));

    // Switching the element type swaps the control kind and resets the value.
    session.set_data_value(list, 0, json!("stale")).unwrap();
    applied(session.select_type(list, "Number").unwrap());
    let node = session.node(list).unwrap();
    assert_eq!(node.control("data-A").map(|c| c.kind), Some(ControlKind::Number));
    assert_eq!(node.output("output-A").map(|p| p.socket.as_str()), Some("Number"));
    assert_eq!(session.entry(list, 0).unwrap().data_value, None);
}

#[test]
fn test_unknown_type_selection_fails() {
    let mut session = Session::empty().unwrap();
    let list = session
        .add_node_for_schema("Free", &fragment(json!({ "type": "array" })))
        .unwrap();
    let err = session.select_type(list, "Rocket").unwrap_err();
    assert!(matches!(err, GraphError::UnknownAlternative { .. }));
}

#[test]
fn test_type_selection_severs_connections_on_retype() {
    let mut session = Session::empty().unwrap();
    let list = session
        .add_node_for_schema("Free", &fragment(json!({ "type": "array" })))
        .unwrap();
    applied(session.select_type(list, "Text").unwrap());
    applied(session.apply(list, Operation::Add { after: None }).unwrap());

    let text = session.add_scalar_node(ScalarKind::Text);
    applied(session.connect(list, "output-A", text).unwrap());
    session.set_scalar_value(text, json!("hello")).unwrap();
    assert_eq!(session.evaluate(list).unwrap(), json!(["hello"]));

    let affected = applied(session.select_type(list, "Number").unwrap());
    assert!(affected.contains(&text));
    assert!(session.graph().connection_into(text).is_none());
    assert!(session.graph().connections().is_empty());
    assert_eq!(session.evaluate(list).unwrap(), json!([null]));
}

#[test]
fn test_union_entry_offers_named_alternatives() {
    let mut session = Session::new(
        SchemaDocument::from_json(
            r#"{
                "title": "Holder",
                "type": "object",
                "properties": {
                    "values": {
                        "anyOf": [
                            { "type": "array", "items": { "type": "string" } },
                            { "type": "array", "items": { "type": "number" } }
                        ]
                    }
                }
            }"#,
        )
        .unwrap(),
    )
    .unwrap();
    let root = session.add_root_node().unwrap();

    let entry = session.entry(root, 0).unwrap();
    assert_eq!(entry.select_value.as_deref(), Some("List[Text]"));
    let alternatives: Vec<&str> = entry.schema_map.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(alternatives, ["List[Text]", "List[Number]"]);

    let node = session.node(root).unwrap();
    assert_eq!(node.control("select-A").map(|c| c.kind), Some(ControlKind::Select));
    assert_eq!(node.output("output-A").map(|p| p.socket.as_str()), Some("List[Text]"));
}

#[test]
fn test_reselecting_a_union_alternative_severs_stale_connections() {
    let mut session = Session::new(
        SchemaDocument::from_json(
            r#"{
                "title": "Holder",
                "type": "object",
                "properties": {
                    "values": {
                        "anyOf": [
                            { "type": "array", "items": { "type": "string" } },
                            { "type": "array", "items": { "type": "number" } }
                        ]
                    }
                }
            }"#,
        )
        .unwrap(),
    )
    .unwrap();
    let root = session.add_root_node().unwrap();
    let child = session
        .add_node_for_schema("Values", &fragment(json!({ "type": "array" })))
        .unwrap();

    applied(session.connect(root, "output-A", child).unwrap());
    assert_eq!(type_options(&session, child), ["Text"]);

    let affected = applied(
        session
            .select_entry_alternative(root, 0, "List[Number]")
            .unwrap(),
    );
    assert!(affected.contains(&child));

    // The stale connection is gone and the child is unrestricted again.
    assert!(session.graph().connection_from(root, "output-A").is_none());
    assert!(session.graph().connection_into(child).is_none());
    assert_eq!(type_options(&session, child), DEFAULT_TYPE_OPTIONS);
    assert_eq!(
        session
            .node(root)
            .unwrap()
            .output("output-A")
            .map(|p| p.socket.as_str()),
        Some("List[Number]")
    );
}

#[test]
fn test_unknown_union_alternative_fails() {
    let (mut session, root) = station_session();
    // comment collapses to a plain string entry; it has no alternatives.
    let err = session
        .select_entry_alternative(root, 3, "Number")
        .unwrap_err();
    assert!(matches!(err, GraphError::UnknownAlternative { .. }));
}
