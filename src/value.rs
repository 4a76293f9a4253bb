//! Decoded literal values produced by the `value` grammar production.
//!
//! A [`Value`] owns every string it holds: parse-tree borrows never escape
//! the parser, so a compiled [`Filter`](crate::model::Filter) outlives the
//! input buffer it was built from.

use serde::{Serialize, Serializer};

/// A single decoded literal, or a homogeneous ordered sequence of literals.
///
/// `Value::EmptyList` is a distinct variant from `Value::List(vec![])`: the
/// grammar recognizes `[]` only on the right-hand side of `=`, and it is
/// never produced by `list_value` (which always has a `(...)` shell).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A string literal whose shape was recognized as ISO-8601.
    DateTime(String),
    List(Vec<Value>),
    EmptyList,
}

impl Value {
    /// True for `Value::DateTime` only; used by the mapper's range dispatch.
    pub fn is_datetime(&self) -> bool {
        matches!(self, Value::DateTime(_))
    }

    /// Flatten a `List`/`EmptyList` into its elements; a scalar flattens to
    /// a single-element vector.
    pub fn flatten(self) -> Vec<Value> {
        match self {
            Value::List(items) => items,
            Value::EmptyList => Vec::new(),
            other => vec![other],
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Str(s) | Value::DateTime(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::EmptyList => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

/// Decode a single-quoted string literal's body, resolving the two
/// recognized escape sequences: `\'` -> `'` and `\\` -> `\`.
pub fn decode_string_escapes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\'') => {
                    out.push('\'');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode a number literal's text into `Int` or `Float`, matching the
/// grammar's `number := '-'? digits ('.' digits)?` production: presence of
/// a decimal point selects floating point.
pub fn decode_number(text: &str) -> Option<Value> {
    if text.contains('.') {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    }
}
