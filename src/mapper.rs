//! Semantic mapper: walks the parse tree bottom-up, decoding raw literals
//! and dispatching each `condition` production to the `Condition` variant
//! its operator names, then hands composition off to [`crate::normalize`].

use tracing::debug;

use crate::error::CompileError;
use crate::grammar::ast::{CmpOp, ConditionExpr, Expr, Factor, LogicalOp, RawValue};
use crate::model::{Bounds, CompareOp, Condition, CountBounds, Filter, Node};
use crate::normalize::{apply_not, merge_and, merge_or};
use crate::utils::datetime::{looks_like_datetime, parse_iso8601};
use crate::value::{decode_number, decode_string_escapes, Value};

/// Visit a full `expression` production, folding `rest` onto `first` one
/// `(operator, factor)` pair at a time.
pub fn compile_expr(expr: &Expr) -> Result<Filter, CompileError> {
    let mut acc = visit_factor(&expr.first)?;
    for (op, factor) in &expr.rest {
        let next = visit_factor(factor)?;
        acc = match op {
            LogicalOp::And => merge_and(acc, next),
            LogicalOp::Or => merge_or(acc, next),
        };
    }
    Ok(acc)
}

fn visit_factor(factor: &Factor) -> Result<Filter, CompileError> {
    match factor {
        Factor::Negated(inner) => {
            let term = visit_factor(inner)?;
            Ok(apply_not(term))
        }
        Factor::Grouped(expr) => compile_expr(expr),
        Factor::Condition(condition) => visit_condition(condition),
    }
}

fn visit_condition(condition: &ConditionExpr) -> Result<Filter, CompileError> {
    match condition {
        ConditionExpr::Comparison { field, op, value, upper } => {
            visit_comparison(field, *op, value.clone(), upper.clone())
        }
        ConditionExpr::IsNull { field, negated } => {
            debug!("is_null condition on field '{}' (negated: {})", field, negated);
            let node = Node::from(Condition::IsNull { key: field.clone() });
            Ok(if *negated {
                Filter::with_must_not(vec![node])
            } else {
                Filter::with_must(vec![node])
            })
        }
        ConditionExpr::IsEmpty { field } => {
            debug!("is_empty condition on field '{}'", field);
            Ok(Filter::with_must(vec![Node::from(Condition::IsEmpty { key: field.clone() })]))
        }
        ConditionExpr::HasId { op, value } => visit_has_id(*op, value.clone()),
        ConditionExpr::ValuesCount { field, op, value, upper } => {
            visit_values_count(field, *op, value.clone(), upper.clone())
        }
    }
}

fn visit_comparison(
    field: &str,
    op: CmpOp,
    value: RawValue,
    upper: Option<RawValue>,
) -> Result<Filter, CompileError> {
    debug!("comparison condition on field '{}': {:?}", field, op);
    match op {
        CmpOp::Eq => {
            let v = require_value(value, field)?;
            Ok(Filter::with_must(vec![Node::from(Condition::MatchValue { key: field.into(), value: v })]))
        }
        CmpOp::Ne => {
            let v = require_value(value, field)?;
            Ok(Filter::with_must_not(vec![Node::from(Condition::MatchValue { key: field.into(), value: v })]))
        }
        CmpOp::In => {
            let v = require_value(value, field)?;
            Ok(Filter::with_must(vec![Node::from(Condition::MatchAny { key: field.into(), values: v.flatten() })]))
        }
        CmpOp::NotIn => {
            let v = require_value(value, field)?;
            Ok(Filter::with_must(vec![Node::from(Condition::MatchExcept { key: field.into(), values: v.flatten() })]))
        }
        CmpOp::Like => {
            let v = require_value(value, field)?;
            Ok(Filter::with_must(vec![Node::from(Condition::MatchText { key: field.into(), text: value_as_text(v) })]))
        }
        CmpOp::Ge | CmpOp::Le | CmpOp::Gt | CmpOp::Lt => {
            let v = require_value(value, field)?;
            let compare_op = match op {
                CmpOp::Ge => CompareOp::Gte,
                CmpOp::Le => CompareOp::Lte,
                CmpOp::Gt => CompareOp::Gt,
                CmpOp::Lt => CompareOp::Lt,
                _ => unreachable!("outer match already narrowed to these four variants"),
            };
            Ok(Filter::with_must(vec![dispatch_single_range(field, compare_op, v)]))
        }
        CmpOp::Between => {
            let low = require_value(value, field)?;
            let high = require_value(upper_or_missing(upper), field)?;
            Ok(Filter::with_must(vec![dispatch_range_between(field, low, high)]))
        }
        CmpOp::NotBetween => {
            let low = require_value(value, field)?;
            let high = require_value(upper_or_missing(upper), field)?;
            Ok(Filter::with_must_not(vec![dispatch_range_between(field, low, high)]))
        }
    }
}

/// `LIKE`'s right-hand side is ordinarily a string literal; non-string
/// operands are rendered to their plain textual form rather than rejected,
/// since no type restriction applies to `LIKE`.
fn value_as_text(value: Value) -> String {
    match value {
        Value::Str(s) | Value::DateTime(s) => s,
        Value::Int(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => items.into_iter().map(value_as_text).collect::<Vec<_>>().join(","),
        Value::EmptyList => String::new(),
    }
}

fn upper_or_missing(upper: Option<RawValue>) -> RawValue {
    upper.unwrap_or(RawValue::Missing)
}

/// Choose `Range` vs `DatetimeRange` for a one-sided bound.
fn dispatch_single_range(field: &str, op: CompareOp, value: Value) -> Node {
    let bounds = match as_datetime(&value) {
        Some(dt) => return Node::from(Condition::DatetimeRange { key: field.into(), bounds: Bounds::single(op, dt) }),
        None => Bounds::single(op, value),
    };
    Node::from(Condition::Range { key: field.into(), bounds })
}

/// Choose `Range` vs `DatetimeRange` for `BETWEEN`/`NOT BETWEEN`: both bounds
/// must independently look like a datetime for the pair to be treated as
/// one — a range where only one side parses as a datetime is left a plain
/// string-valued `Range`, not split or rejected.
fn dispatch_range_between(field: &str, low: Value, high: Value) -> Node {
    match (as_datetime(&low), as_datetime(&high)) {
        (Some(low), Some(high)) => {
            Node::from(Condition::DatetimeRange { key: field.into(), bounds: Bounds::between(low, high) })
        }
        _ => Node::from(Condition::Range { key: field.into(), bounds: Bounds::between(low, high) }),
    }
}

fn as_datetime(value: &Value) -> Option<Value> {
    match value {
        Value::Str(s) if looks_like_datetime(s) => {
            Some(Value::DateTime(parse_iso8601(s).unwrap_or_else(|| s.clone())))
        }
        _ => None,
    }
}

fn visit_has_id(op: CmpOp, value: RawValue) -> Result<Filter, CompileError> {
    let v = require_value(value, "id")?;
    let ids = v.flatten();
    let node = Node::from(Condition::HasId { ids });
    match op {
        CmpOp::Eq | CmpOp::In => Ok(Filter::with_must(vec![node])),
        CmpOp::Ne | CmpOp::NotIn => Ok(Filter::with_must_not(vec![node])),
        _ => Err(CompileError::invalid("malformed 'id' condition: unsupported operator")),
    }
}

fn visit_values_count(
    field: &str,
    op: CmpOp,
    value: RawValue,
    upper: Option<RawValue>,
) -> Result<Filter, CompileError> {
    let v = require_value(value, field)?;
    let n = require_count(&v, field)?;
    let bounds = match op {
        CmpOp::Eq => CountBounds { gte: Some(n), lte: Some(n), ..Default::default() },
        CmpOp::Ge => CountBounds::single(CompareOp::Gte, n),
        CmpOp::Le => CountBounds::single(CompareOp::Lte, n),
        CmpOp::Gt => CountBounds::single(CompareOp::Gt, n),
        CmpOp::Lt => CountBounds::single(CompareOp::Lt, n),
        CmpOp::Between => {
            let high_value = require_value(upper_or_missing(upper), field)?;
            let high = require_count(&high_value, field)?;
            CountBounds::between(n, high)
        }
        _ => return Err(CompileError::invalid(format!("unsupported COUNT operator on field '{field}'"))),
    };
    Ok(Filter::with_must(vec![Node::from(Condition::ValuesCount { key: field.into(), bounds })]))
}

fn require_count(value: &Value, field: &str) -> Result<i64, CompileError> {
    match value {
        Value::Int(n) if *n >= 0 => Ok(*n),
        _ => Err(CompileError::invalid(format!("COUNT({field}) requires a non-negative integer"))),
    }
}

/// Resolve a `RawValue` into a decoded [`Value`], routing a missing value to
/// `CompileError::Invalid` naming `field`.
fn require_value(raw: RawValue, field: &str) -> Result<Value, CompileError> {
    if matches!(raw, RawValue::Missing) {
        return Err(CompileError::missing_value(field));
    }
    Ok(decode_raw_value(raw))
}

fn decode_raw_value(raw: RawValue) -> Value {
    match raw {
        RawValue::Str(body) => Value::Str(decode_string_escapes(&body)),
        RawValue::Number(text) => decode_number(&text)
            .unwrap_or_else(|| Value::Float(text.parse::<f64>().unwrap_or(0.0))),
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::List(items) => Value::List(items.into_iter().map(decode_raw_value).collect()),
        RawValue::EmptyList => Value::EmptyList,
        RawValue::Missing => unreachable!("require_value intercepts Missing before decoding"),
    }
}
