//! Folding of per-row completion arguments into one aggregate.
//!
//! Completion arguments are positional lists of JSON values. Two lists merge
//! position by position, and each value falls into one of three shapes.

use serde_json::Map;
use serde_json::Value;

/// Nested records deeper than this keep the newer value instead of recursing.
pub const MAX_MERGE_DEPTH: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Array,
    Record,
    Scalar,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Array(_) => Shape::Array,
            Value::Object(_) => Shape::Record,
            _ => Shape::Scalar,
        }
    }
}

/// Follows JSON truthiness: `false`, `0`, `""` and `null` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Merges the argument list of a later row into `existing`.
pub fn merge_arguments(existing: &mut Vec<Value>, incoming: Vec<Value>) {
    for (index, value) in incoming.into_iter().enumerate() {
        match existing.get_mut(index) {
            Some(slot) => merge_value(slot, value, 0),
            None => existing.push(value),
        }
    }
}

/// Merges `incoming` into `existing`; `incoming` is the newer of the two.
pub fn merge_value(existing: &mut Value, incoming: Value, depth: usize) {
    match (Shape::of(existing), Shape::of(&incoming)) {
        (Shape::Array, _) => {
            if let Value::Array(items) = existing {
                match incoming {
                    Value::Array(more) => items.extend(more),
                    other => items.push(other),
                }
            }
        }
        (_, Shape::Array) => *existing = incoming,
        (Shape::Record, Shape::Record) => {
            if depth >= MAX_MERGE_DEPTH {
                *existing = incoming;
                return;
            }
            if let (Value::Object(target), Value::Object(source)) = (existing, incoming) {
                merge_records(target, source, depth + 1);
            }
        }
        _ => {
            if existing.is_null() || is_truthy(&incoming) {
                *existing = incoming;
            }
        }
    }
}

fn merge_records(target: &mut Map<String, Value>, source: Map<String, Value>, depth: usize) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(slot) => merge_value(slot, value, depth),
            None => {
                target.insert(key, value);
            }
        }
    }
}
