//! Bounded-depth search over untrusted JSON
//!
//! Embedded page models nest the same fact at different depths depending on
//! the site revision, and under different key spellings. [`find_map`] walks
//! the tree **breadth-first**: every node at depth `d` is inspected before any
//! node at depth `d + 1`. Within one object, candidate keys are tried in the
//! order given; sibling objects are visited in document order (the crate
//! enables `serde_json/preserve_order`). The first candidate whose value
//! converts successfully wins, so a shallow match always beats a deeper one.

use crate::extract::normalize::clean_text;
use serde_json::Value;
use std::collections::VecDeque;

/// Default depth budget for walks over page models
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Finds the first value stored under any of `keys` that `convert` accepts
///
/// Objects deeper than `max_depth` levels below `root` are not inspected.
pub fn find_map<'a, T, F>(root: &'a Value, keys: &[&str], max_depth: usize, mut convert: F) -> Option<T>
where
    F: FnMut(&'a Value) -> Option<T>,
{
    let mut queue: VecDeque<(&'a Value, usize)> = VecDeque::new();
    queue.push_back((root, 0));

    while let Some((node, depth)) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                for key in keys {
                    if let Some(found) = map.get(*key).and_then(&mut convert) {
                        return Some(found);
                    }
                }
                if depth < max_depth {
                    queue.extend(
                        map.values()
                            .filter(|child| child.is_object() || child.is_array())
                            .map(|child| (child, depth + 1)),
                    );
                }
            }
            Value::Array(items) if depth < max_depth => {
                queue.extend(
                    items
                        .iter()
                        .filter(|child| child.is_object() || child.is_array())
                        .map(|child| (child, depth + 1)),
                );
            }
            _ => {}
        }
    }

    None
}

/// Finds the first nested object stored under any of `keys`
pub fn find_object<'a>(root: &'a Value, keys: &[&str], max_depth: usize) -> Option<&'a Value> {
    find_map(root, keys, max_depth, |v| v.is_object().then_some(v))
}

/// Finds the first non-empty text under any of `keys`
pub fn find_text(root: &Value, keys: &[&str], max_depth: usize) -> Option<String> {
    find_map(root, keys, max_depth, as_text)
}

/// Reads a scalar as display text
///
/// Strings are whitespace-normalized, numbers are printed, and objects
/// carrying a `name`, `value` or `label` string are unwrapped.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["name", "value", "label"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()).and_then(clean_text)),
        _ => None,
    }
}

/// Reads a non-negative integer, parsing strings with `parse`
pub fn as_u64(value: &Value, parse: fn(&str) -> Option<u64>) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => parse(s),
        Value::Object(map) => ["value", "amount"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| as_u64(v, parse))),
        _ => None,
    }
}

/// Reads a boolean flag, accepting `"true"`/`"false"` strings
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Reads a list of display strings from an array of strings or named objects
pub fn as_text_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let list: Vec<String> = items.iter().filter_map(as_text).collect();
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}
