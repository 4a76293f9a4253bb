//! The compiler's output data model: typed conditions and the backend's
//! three-bucket [`Filter`] shape, plus the `Serialize` impls that produce
//! the backend's wire contract.
//!
//! Every node here is immutable once built: the [`normalize`](crate::normalize)
//! pass constructs new `Filter`s rather than mutating accumulator lists in
//! place, so structural equality is enough to test it.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::value::Value;

/// A dotted field path, preserved verbatim — opaque to the compiler beyond
/// the grammar's `ident` production.
pub type Key = String;

/// A range's bounds. At least one of the four is always `Some` whenever a
/// `Bounds` is constructed by the mapper.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bounds {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl Bounds {
    pub fn single(op: CompareOp, value: Value) -> Self {
        let mut bounds = Bounds::default();
        match op {
            CompareOp::Gt => bounds.gt = Some(value),
            CompareOp::Gte => bounds.gte = Some(value),
            CompareOp::Lt => bounds.lt = Some(value),
            CompareOp::Lte => bounds.lte = Some(value),
        }
        bounds
    }

    pub fn between(low: Value, high: Value) -> Self {
        Bounds {
            gte: Some(low),
            lte: Some(high),
            ..Default::default()
        }
    }
}

/// Which bound a single-sided comparison operator maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Bounds for [`Condition::ValuesCount`], restricted to non-negative
/// integers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountBounds {
    pub gt: Option<i64>,
    pub gte: Option<i64>,
    pub lt: Option<i64>,
    pub lte: Option<i64>,
}

impl CountBounds {
    pub fn single(op: CompareOp, n: i64) -> Self {
        let mut bounds = CountBounds::default();
        match op {
            CompareOp::Gt => bounds.gt = Some(n),
            CompareOp::Gte => bounds.gte = Some(n),
            CompareOp::Lt => bounds.lt = Some(n),
            CompareOp::Lte => bounds.lte = Some(n),
        }
        bounds
    }

    pub fn between(low: i64, high: i64) -> Self {
        CountBounds {
            gte: Some(low),
            lte: Some(high),
            ..Default::default()
        }
    }
}

/// A leaf predicate: one of the ten condition kinds the compiler emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    MatchValue { key: Key, value: Value },
    MatchAny { key: Key, values: Vec<Value> },
    MatchExcept { key: Key, values: Vec<Value> },
    MatchText { key: Key, text: String },
    Range { key: Key, bounds: Bounds },
    DatetimeRange { key: Key, bounds: Bounds },
    ValuesCount { key: Key, bounds: CountBounds },
    IsNull { key: Key },
    IsEmpty { key: Key },
    HasId { ids: Vec<Value> },
}

/// An entry of a [`Filter`]'s bucket: either a leaf condition or a nested
/// filter, preserved whole where flattening it would change semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition(Condition),
    Filter(Filter),
}

impl From<Condition> for Node {
    fn from(condition: Condition) -> Self {
        Node::Condition(condition)
    }
}

impl From<Filter> for Node {
    fn from(filter: Filter) -> Self {
        Node::Filter(filter)
    }
}

/// The backend's boolean composition node. A record matches iff every
/// `must` entry matches, every `must_not` entry does not match, and — when
/// `should` is non-empty — at least one `should` entry matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub must: Vec<Node>,
    pub should: Vec<Node>,
    pub must_not: Vec<Node>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_must(nodes: Vec<Node>) -> Self {
        Filter {
            must: nodes,
            ..Default::default()
        }
    }

    pub fn with_must_not(nodes: Vec<Node>) -> Self {
        Filter {
            must_not: nodes,
            ..Default::default()
        }
    }

    pub fn with_should(nodes: Vec<Node>) -> Self {
        Filter {
            should: nodes,
            ..Default::default()
        }
    }

    /// True when `should` is the only non-empty bucket — the shape that
    /// makes a filter eligible for OR-flattening or for preservation as a
    /// nested disjunction under `AND`.
    pub fn is_pure_should(&self) -> bool {
        !self.should.is_empty() && self.must.is_empty() && self.must_not.is_empty()
    }

    /// True when `must_not` is the only non-empty bucket — the shape
    /// produced by a single `NOT`, used to detect double negation.
    pub fn is_pure_must_not(&self) -> bool {
        !self.must_not.is_empty() && self.must.is_empty() && self.should.is_empty()
    }

    /// Total number of leaf conditions in this tree, counting nested
    /// filters recursively. Used only by tests and diagnostics.
    pub fn condition_count(&self) -> usize {
        fn count_nodes(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    Node::Condition(_) => 1,
                    Node::Filter(f) => f.condition_count(),
                })
                .sum()
        }
        count_nodes(&self.must) + count_nodes(&self.should) + count_nodes(&self.must_not)
    }

    /// Serialize to the backend's JSON wire shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("Filter serialization is infallible")
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Condition(c) => c.serialize(serializer),
            Node::Filter(f) => f.serialize(serializer),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = [!self.must.is_empty(), !self.should.is_empty(), !self.must_not.is_empty()]
            .iter()
            .filter(|b| **b)
            .count();
        let mut state = serializer.serialize_struct("Filter", len)?;
        if !self.must.is_empty() {
            state.serialize_field("must", &self.must)?;
        }
        if !self.should.is_empty() {
            state.serialize_field("should", &self.should)?;
        }
        if !self.must_not.is_empty() {
            state.serialize_field("must_not", &self.must_not)?;
        }
        state.end()
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Condition::MatchValue { key, value } => {
                serialize_field_condition(serializer, key, Some(MatchShape::Value(value)), None, None)
            }
            Condition::MatchAny { key, values } => {
                serialize_field_condition(serializer, key, Some(MatchShape::Any(values)), None, None)
            }
            Condition::MatchExcept { key, values } => {
                serialize_field_condition(serializer, key, Some(MatchShape::Except(values)), None, None)
            }
            Condition::MatchText { key, text } => {
                serialize_field_condition(serializer, key, Some(MatchShape::Text(text)), None, None)
            }
            Condition::Range { key, bounds } | Condition::DatetimeRange { key, bounds } => {
                serialize_field_condition(serializer, key, None, Some(bounds), None)
            }
            Condition::ValuesCount { key, bounds } => {
                serialize_field_condition(serializer, key, None, None, Some(bounds))
            }
            Condition::IsNull { key } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("is_null", &KeyOnly { key })?;
                map.end()
            }
            Condition::IsEmpty { key } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("is_empty", &KeyOnly { key })?;
                map.end()
            }
            Condition::HasId { ids } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("has_id", ids)?;
                map.end()
            }
        }
    }
}

struct KeyOnly<'a> {
    key: &'a str,
}

impl Serialize for KeyOnly<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("KeyOnly", 1)?;
        state.serialize_field("key", self.key)?;
        state.end()
    }
}

enum MatchShape<'a> {
    Value(&'a Value),
    Any(&'a [Value]),
    Except(&'a [Value]),
    Text(&'a str),
}

impl Serialize for MatchShape<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MatchShape::Value(v) => {
                let mut state = serializer.serialize_struct("Match", 1)?;
                state.serialize_field("value", v)?;
                state.end()
            }
            MatchShape::Any(values) => {
                let mut state = serializer.serialize_struct("Match", 1)?;
                state.serialize_field("any", values)?;
                state.end()
            }
            MatchShape::Except(values) => {
                let mut state = serializer.serialize_struct("Match", 1)?;
                state.serialize_field("except", values)?;
                state.end()
            }
            MatchShape::Text(text) => {
                let mut state = serializer.serialize_struct("Match", 1)?;
                state.serialize_field("text", text)?;
                state.end()
            }
        }
    }
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = [&self.gt, &self.gte, &self.lt, &self.lte]
            .iter()
            .filter(|b| b.is_some())
            .count();
        let mut state = serializer.serialize_struct("Range", len)?;
        if let Some(v) = &self.gt {
            state.serialize_field("gt", v)?;
        }
        if let Some(v) = &self.gte {
            state.serialize_field("gte", v)?;
        }
        if let Some(v) = &self.lt {
            state.serialize_field("lt", v)?;
        }
        if let Some(v) = &self.lte {
            state.serialize_field("lte", v)?;
        }
        state.end()
    }
}

impl Serialize for CountBounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = [self.gt, self.gte, self.lt, self.lte]
            .iter()
            .filter(|b| b.is_some())
            .count();
        let mut state = serializer.serialize_struct("Count", len)?;
        if let Some(v) = self.gt {
            state.serialize_field("gt", &v)?;
        }
        if let Some(v) = self.gte {
            state.serialize_field("gte", &v)?;
        }
        if let Some(v) = self.lt {
            state.serialize_field("lt", &v)?;
        }
        if let Some(v) = self.lte {
            state.serialize_field("lte", &v)?;
        }
        state.end()
    }
}

fn serialize_field_condition<S>(
    serializer: S,
    key: &str,
    m: Option<MatchShape>,
    range: Option<&Bounds>,
    count: Option<&CountBounds>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let fields = 1 + [m.is_some(), range.is_some(), count.is_some()]
        .iter()
        .filter(|b| **b)
        .count();
    let mut state = serializer.serialize_struct("FieldCondition", fields)?;
    state.serialize_field("key", key)?;
    if let Some(m) = m {
        state.serialize_field("match", &m)?;
    }
    if let Some(range) = range {
        state.serialize_field("range", range)?;
    }
    if let Some(count) = count {
        state.serialize_field("values_count", count)?;
    }
    state.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn match_value_serializes_with_match_shape() {
        let c = Condition::MatchValue {
            key: "city".into(),
            value: Value::Str("London".into()),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json, serde_json::json!({"key": "city", "match": {"value": "London"}}));
    }

    #[test]
    fn empty_buckets_are_omitted() {
        let filter = Filter::with_must(vec![Node::Condition(Condition::IsEmpty {
            key: "tags".into(),
        })]);
        let json = filter.to_json();
        assert_eq!(
            json,
            serde_json::json!({"must": [{"is_empty": {"key": "tags"}}]})
        );
        assert!(json.get("should").is_none());
        assert!(json.get("must_not").is_none());
    }

    #[test]
    fn has_id_preserves_value_types() {
        let c = Condition::HasId {
            ids: vec![Value::Int(1), Value::Str("uuid-1".into())],
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json, serde_json::json!({"has_id": [1, "uuid-1"]}));
    }
}
