//! Structured-document deep merge.
//!
//! Recursive object merge: source keys win on scalar and object
//! conflicts, new source keys are added, target-only keys are preserved.
//! Arrays follow the entry's [`ArrayStrategy`]: `replace` takes the
//! source array wholesale; `union` keeps existing elements in their
//! existing order and appends source elements not already present.
//! Output keys are sorted so repeated merges diff cleanly.

use serde_json::{Map, Value};

use rigup_core::jsonc;
use rigup_core::manifest::ArrayStrategy;

/// Merge source JSON(C) into existing target content.
///
/// With no existing content, the result is the source itself (keys
/// sorted). Both inputs tolerate comments and trailing commas; the
/// output is plain, pretty-printed JSON with a trailing newline.
pub fn merge_json(
    source: &str,
    existing: Option<&str>,
    arrays: ArrayStrategy,
) -> anyhow::Result<String> {
    let source_value: Value = jsonc::from_str(source)
        .map_err(|e| anyhow::anyhow!("Invalid JSON source: {}", e))?;

    let merged = match existing {
        None => source_value,
        Some(content) => {
            let target_value: Value = jsonc::from_str(content)
                .map_err(|e| anyhow::anyhow!("Invalid JSON in existing target: {}", e))?;
            merge_value(target_value, source_value, arrays)
        }
    };

    let sorted = sort_keys(merged);
    Ok(format!("{}\n", serde_json::to_string_pretty(&sorted)?))
}

/// Merge `source` into `target`, source winning conflicts.
fn merge_value(target: Value, source: Value, arrays: ArrayStrategy) -> Value {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            let mut out = target_map;
            for (key, source_val) in source_map {
                let merged = match out.remove(&key) {
                    Some(target_val) => merge_value(target_val, source_val, arrays),
                    None => source_val,
                };
                out.insert(key, merged);
            }
            Value::Object(out)
        }
        (Value::Array(existing), Value::Array(incoming)) => match arrays {
            ArrayStrategy::Replace => Value::Array(incoming),
            ArrayStrategy::Union => Value::Array(union(existing, incoming)),
        },
        // Scalar or mixed-type conflict: source wins
        (_, source_val) => source_val,
    }
}

/// Deterministic ordered union: existing elements first, then source
/// elements not already present, by value equality.
fn union(existing: Vec<Value>, incoming: Vec<Value>) -> Vec<Value> {
    let mut out = existing;
    for item in incoming {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Recursively rebuild objects with sorted keys.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map.into_iter().collect();
            sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut out = Map::new();
            for (key, val) in sorted {
                out.insert(key, sort_keys(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
