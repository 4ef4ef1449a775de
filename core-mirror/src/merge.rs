//! In-place structural replacement.
//!
//! The cache updates entities by swapping the *contents* of an existing
//! container rather than the container itself, so every alias of that
//! container observes the new logical value without re-fetching the
//! reference. Replacement is clear-then-copy: keys or elements absent from
//! the source are removed from the target, not merged around.

use serde_json::{Map, Value};

/// Replace every key of `target` with the keys of `source`.
///
/// This is a REPLACE, not a merge: keys present in `target` but absent from
/// `source` are deleted.
pub fn replace_map(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    target.clear();
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Replace the contents of one JSON container with another's, in place.
///
/// - A sequence target is cleared, then extended with the source's elements
///   when the source is itself a sequence; otherwise it stays empty.
/// - A keyed target is cleared, then copied from the source's keys when the
///   source is itself keyed; otherwise it stays empty.
/// - Replacement is defined for containers only; a scalar target keeps its
///   value.
pub fn replace_value(target: &mut Value, source: &Value) {
    match target {
        Value::Array(items) => {
            items.clear();
            if let Value::Array(incoming) = source {
                items.extend(incoming.iter().cloned());
            }
        }
        Value::Object(fields) => {
            fields.clear();
            if let Value::Object(incoming) = source {
                replace_map(fields, incoming);
            }
        }
        _ => {}
    }
}
