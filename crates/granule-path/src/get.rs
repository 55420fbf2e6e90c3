use serde_json::Value;

use crate::{parse_index, SEPARATOR};

/// Get a value from a JSON tree by dot path.
///
/// Numeric segments index arrays; every other segment is an object key.
/// Returns `None` if any step is missing or lands on a primitive.
pub fn get<'a>(val: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(val);
    }
    let mut current = val;
    for step in path.split(SEPARATOR) {
        current = match current {
            Value::Array(arr) => arr.get(parse_index(step)?)?,
            Value::Object(map) => map.get(step)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Get a mutable reference to a value in a JSON tree by dot path.
pub fn get_mut<'a>(val: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    if path.is_empty() {
        return Some(val);
    }
    let mut current = val;
    for step in path.split(SEPARATOR) {
        current = match current {
            Value::Array(arr) => arr.get_mut(parse_index(step)?)?,
            Value::Object(map) => map.get_mut(step)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Same as [`get`] for an already split path.
pub fn get_segments<'a, S: AsRef<str>>(val: &'a Value, segments: &[S]) -> Option<&'a Value> {
    let mut current = val;
    for step in segments {
        let step = step.as_ref();
        current = match current {
            Value::Array(arr) => arr.get(parse_index(step)?)?,
            Value::Object(map) => map.get(step)?,
            _ => return None,
        };
    }
    Some(current)
}
