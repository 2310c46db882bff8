//! Incremental merge of extracted information into a stored profile.

use serde_json::{Map, Value};

/// Sections whose fields merge one by one instead of being replaced.
const PROFILE_SECTIONS: [&str; 2] = ["preferences", "background"];

/// Merge `updates` into `base` in place.
///
/// - `updated_at` is never taken from `updates`.
/// - Keys missing from `base` are inserted as-is.
/// - Inside `preferences`/`background`, lists grow by ordered union, and a
///   string is only replaced by a non-blank string.
/// - Other nested objects merge recursively; everything else is replaced.
pub fn deep_merge(base: &mut Map<String, Value>, updates: &Map<String, Value>) {
    for (key, incoming) in updates {
        if key == "updated_at" {
            continue;
        }

        let Some(existing) = base.get_mut(key) else {
            base.insert(key.clone(), incoming.clone());
            continue;
        };

        match (existing, incoming) {
            (Value::Object(section), Value::Object(fields))
                if PROFILE_SECTIONS.contains(&key.as_str()) =>
            {
                merge_section(section, fields)
            }
            (Value::Object(nested), Value::Object(fields)) => deep_merge(nested, fields),
            (existing, incoming) => *existing = incoming.clone(),
        }
    }
}

fn merge_section(section: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, incoming) in fields {
        match section.get_mut(key) {
            Some(Value::Array(list)) => match incoming {
                Value::Array(items) => {
                    let combined: Vec<Value> =
                        list.drain(..).chain(items.iter().cloned()).collect();
                    *list = union(combined);
                }
                scalar if is_present(scalar) => {
                    if !list.contains(scalar) {
                        list.push(scalar.clone());
                    }
                }
                _ => {}
            },
            Some(Value::String(current)) => {
                if let Value::String(s) = incoming {
                    if !s.trim().is_empty() {
                        *current = s.clone();
                    }
                }
            }
            _ => {
                section.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Order-preserving de-duplication of JSON values.
fn union(values: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Whether a scalar carries something worth appending to a list.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Object(o) => !o.is_empty(),
        Value::Array(_) => false,
    }
}
