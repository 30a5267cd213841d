//! Common test utilities: schema documents and sessions used across the
//! integration tests.
use kumiko::prelude::*;

/// Installs the test logger so rejected operations and socket creation
/// show up under `RUST_LOG`. Safe to call repeatedly.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A weather-station document exercising most schema constructs.
///
/// Root entry layout (core name / property):
/// A `name` (string, required), B `elevation` (number, default 120.5),
/// C `active` (boolean, required), D `comment` (string | null),
/// E `tags` (array of string, required), F `sensor` ($ref Sensor).
#[allow(dead_code)]
pub fn station_document() -> SchemaDocument {
    SchemaDocument::from_json(
        r##"{
            "title": "Station",
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "elevation": { "type": "number", "default": 120.5 },
                "active": { "type": "boolean" },
                "comment": { "anyOf": [{ "type": "string" }, { "type": "null" }] },
                "tags": { "type": "array", "items": { "type": "string" } },
                "sensor": { "$ref": "#/definitions/Sensor" }
            },
            "required": ["name", "active", "tags"],
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
    .expect("station schema parses")
}

/// A session over the station document with the root node already built.
#[allow(dead_code)]
pub fn station_session() -> (Session, NodeId) {
    init_logging();
    let mut session = Session::new(station_document()).expect("session opens");
    let root = session.add_root_node().expect("root node builds");
    (session, root)
}

/// Parses a schema fragment from inline JSON.
#[allow(dead_code)]
pub fn fragment(value: serde_json::Value) -> SchemaFragment {
    serde_json::from_value(value).expect("fragment parses")
}
