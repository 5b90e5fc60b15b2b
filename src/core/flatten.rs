//! Flattening of nested API records into single-level rows.
//!
//! Nested objects become dotted keys (`parent.child`). Lists of scalars are
//! joined into one comma-separated cell; lists holding objects or lists are
//! expanded with their index (`field.0.x`, `field.1.x`).

use serde_json::{Map, Value};
use tracing::warn;

use crate::api::types::Record;


/// A flattened record: dotted path to scalar value, in record order.
pub type FlatRow = Map<String, Value>;

/// Deepest path expanded; anything nested further is kept as JSON text.
pub const MAX_DEPTH: usize = 32;

/// Separator for joined scalar lists.
pub const LIST_SEPARATOR: &str = ",";

/// Marks the numbered copy of a key that was already taken (`a.b#2`).
pub const DUPLICATE_MARKER: char = '#';

/// Flatten `record` into a [`FlatRow`].
///
/// # Examples
///
/// ```rust
/// use doge_export::core::flatten::flatten;
/// use serde_json::json;
///
/// let record = json!({"a": 1, "b": {"c": 2}, "tags": ["x", "y"]});
/// let row = flatten(record.as_object().unwrap());
///
/// assert_eq!(row["a"], 1);
/// assert_eq!(row["b.c"], 2);
/// assert_eq!(row["tags"], "x,y");
/// ```
///
/// A literal dotted key and a nested path can name the same column
/// (`{"a.b": 1, "a": {"b": 2}}`). The later value is stored under `a.b#2`.
pub fn flatten(record: &Record) -> FlatRow {
    let mut row = FlatRow::new();
    for (key, value) in record {
        flatten_value(&mut row, key.clone(), value, 1);
    }
    row
}

fn flatten_value(row: &mut FlatRow, path: String, value: &Value, depth: usize) {
    match value {
        Value::Object(map) if map.is_empty() => {
            insert_cell(row, path, Value::String(String::new()));
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            insert_cell(row, path, Value::String(join_scalars(items)));
        }
        Value::Object(_) | Value::Array(_) if depth >= MAX_DEPTH => {
            insert_cell(row, path, Value::String(value.to_string()));
        }
        Value::Object(map) => {
            for (key, child) in map {
                flatten_value(row, format!("{}.{}", path, key), child, depth + 1);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_value(row, format!("{}.{}", path, i), child, depth + 1);
            }
        }
        scalar => {
            insert_cell(row, path, scalar.clone());
        }
    }
}

/// Insert without overwriting: a taken key gets the first free `#n` suffix.
fn insert_cell(row: &mut FlatRow, path: String, value: Value) {
    if !row.contains_key(&path) {
        row.insert(path, value);
        return;
    }

    let mut n = 2;
    let key = loop {
        let candidate = format!("{}{}{}", path, DUPLICATE_MARKER, n);
        if !row.contains_key(&candidate) {
            break candidate;
        }
        n += 1;
    };
    warn!(key = %path, renamed = %key, "duplicate flattened key, keeping both values");
    row.insert(key, value);
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn join_scalars(items: &[Value]) -> String {
    items
        .iter()
        .map(scalar_text)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Text form of a cell value: strings verbatim, null empty, anything else as
/// JSON text.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
