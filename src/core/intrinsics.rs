//! Template intrinsic functions and logical-id derivation.

use super::hasher;
use serde_json::{json, Value};

/// `{"Ref": id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// The `index`-th availability zone of the deployment region.
pub fn select_az(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

/// Logical ids a template value points at through `Ref` or `Fn::GetAtt`.
///
/// Pseudo parameters (`AWS::Region`, ...) are skipped.
pub fn referenced_ids(value: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    collect_refs(value, &mut ids);
    ids.sort();
    ids.dedup();
    ids
}

fn collect_refs(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                if !id.starts_with("AWS::") {
                    ids.push(id.clone());
                }
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(id)) = parts.first() {
                    ids.push(id.clone());
                }
            }
            for v in map.values() {
                collect_refs(v, ids);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_refs(v, ids);
            }
        }
        _ => {}
    }
}

/// Stable logical id for a construct path.
///
/// A single-segment path is used verbatim. Longer paths concatenate their
/// alphanumeric characters (skipping `Resource` segments) and append an
/// 8-digit hash of the full path, so renaming any segment yields a new id.
pub fn logical_id(path: &[&str]) -> String {
    let human: String = path
        .iter()
        .filter(|seg| path.len() <= 1 || **seg != "Resource")
        .flat_map(|seg| seg.chars())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if path.len() <= 1 {
        return human;
    }
    format!("{}{}", human, hasher::path_suffix(path))
}
