//! Dot-path access into `serde_json::Value` records.
//!
//! # Lookup rules
//!
//! | Current node          | Segment        | Result                        |
//! |-----------------------|----------------|-------------------------------|
//! | falsy (`null`, `false`, `0`, `""`) | any | the falsy node itself, walk stops |
//! | object                | key            | member, or missing            |
//! | array                 | decimal index  | element, or missing           |
//! | anything else         | any            | missing                       |
//!
//! The falsy short-circuit means `get_path({"a": 0}, "a.b")` yields `0`
//! rather than a miss. Records that use falsy sentinels rely on it, so it is
//! kept even though it reads like an accident of truthy chaining.

use serde_json::{Map, Value};

use crate::error::{DeserializeError, Result};

/// Default path separator
pub const SEPARATOR: &str = ".";

/// Resolve a dot-separated path against a record. Never fails; `None` means
/// the path is absent.
pub fn get_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    get_path_with(record, path, SEPARATOR)
}

/// [`get_path`] with a caller-chosen separator.
///
/// An empty separator treats every character of `path` as its own segment,
/// so `get_path_with(record, "ab", "")` reads `record.a.b`.
pub fn get_path_with<'a>(record: &'a Value, path: &str, separator: &str) -> Option<&'a Value> {
    if separator.is_empty() {
        let chars = path
            .char_indices()
            .map(|(i, c)| &path[i..i + c.len_utf8()]);
        return walk(record, chars);
    }
    walk(record, path.split(separator))
}

fn walk<'a, 'p>(record: &'a Value, segments: impl Iterator<Item = &'p str>) -> Option<&'a Value> {
    let mut current = record;
    for segment in segments {
        if !is_truthy(current) {
            return Some(current);
        }
        current = child(current, segment)?;
    }
    Some(current)
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// JavaScript truthiness over JSON values. Empty arrays and objects are truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Assign `value` at `path` inside `target`.
///
/// Intermediate objects are created when missing (or `null`); `None` removes
/// the leaf key, which is how an undefined property renders in JSON.
pub fn set_path(target: &mut Value, path: &str, value: Option<Value>) -> Result<()> {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(DeserializeError::assignment(path, "empty path"));
    };

    let mut current = target;
    for (depth, segment) in parents.iter().enumerate() {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = array_index(path, segment, items.len())?;
                &mut items[index]
            }
            other => {
                let prefix = segments[..=depth].join(SEPARATOR);
                return Err(DeserializeError::assignment(
                    path,
                    format!("`{}` is {}", prefix, kind_name(other)),
                ));
            }
        };
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            match value {
                Some(v) => {
                    map.insert(leaf.to_string(), v);
                }
                None => {
                    map.remove(*leaf);
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(path, leaf, items.len())?;
            items[index] = value.unwrap_or(Value::Null);
            Ok(())
        }
        other if parents.is_empty() => Err(DeserializeError::assignment(
            path,
            format!("target is {}", kind_name(other)),
        )),
        other => Err(DeserializeError::assignment(
            path,
            format!("`{}` is {}", parents.join(SEPARATOR), kind_name(other)),
        )),
    }
}

fn array_index(path: &str, segment: &str, len: usize) -> Result<usize> {
    match segment.parse::<usize>() {
        Ok(index) if index < len => Ok(index),
        Ok(index) => Err(DeserializeError::assignment(
            path,
            format!("index {} out of range for array of length {}", index, len),
        )),
        Err(_) => Err(DeserializeError::assignment(
            path,
            format!("`{}` is not an array index", segment),
        )),
    }
}

/// Render a possibly-missing value for diagnostics.
pub fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "undefined".to_string(),
    }
}

/// JSON type name, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check that a path is non-empty and has no empty segments.
pub fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(DeserializeError::config("path must not be empty"));
    }
    if path.split(SEPARATOR).any(str::is_empty) {
        return Err(DeserializeError::config(format!(
            "path `{}` contains an empty segment",
            path
        )));
    }
    Ok(())
}
