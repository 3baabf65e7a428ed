//! Structural JSON-Schema inference for decoded payloads.

use serde_json::{Map, Value, json};

pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Key under which every emitted schema records where it came from.
pub const ANNOTATION_KEY: &str = "x-treecast";

/// Schema describing the shape of `value`.
///
/// Object properties are sorted and all required; array items are the
/// merged schema of the elements.
pub fn infer_json_schema(value: &Value) -> Value {
    match value {
        Value::Null => json!({"type": "null"}),
        Value::Bool(_) => json!({"type": "boolean"}),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({"type": "integer"}),
        Value::Number(_) => json!({"type": "number"}),
        Value::String(_) => json!({"type": "string"}),
        Value::Array(items) => {
            let mut schema = Map::new();
            schema.insert("type".into(), "array".into());
            if !items.is_empty() {
                schema.insert("items".into(), merge_schemas(items.iter().map(infer_json_schema)));
            }
            Value::Object(schema)
        }
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut schema = Map::new();
            schema.insert("type".into(), "object".into());
            if !keys.is_empty() {
                let properties: Map<String, Value> = keys
                    .iter()
                    .map(|key| ((*key).clone(), infer_json_schema(&object[key.as_str()])))
                    .collect();
                let required: Vec<Value> = keys.iter().map(|key| (*key).clone().into()).collect();
                schema.insert("properties".into(), Value::Object(properties));
                schema.insert("required".into(), Value::Array(required));
            }
            Value::Object(schema)
        }
    }
}

/// De-duplicates `schemas`: nothing gives `{}`, one distinct schema is
/// returned as is, several become an `anyOf` in first-seen order.
pub fn merge_schemas(schemas: impl IntoIterator<Item = Value>) -> Value {
    let mut unique: Vec<Value> = Vec::new();
    for schema in schemas {
        if !unique.contains(&schema) {
            unique.push(schema);
        }
    }
    match unique.len() {
        0 => Value::Object(Map::new()),
        1 => unique.remove(0),
        _ => json!({"anyOf": unique}),
    }
}

/// Schema for a JSON-Lines payload: an array of the merged row schemas.
pub fn jsonl_schema(rows: &[Value]) -> Value {
    json!({
        "type": "array",
        "items": merge_schemas(rows.iter().map(infer_json_schema)),
    })
}
