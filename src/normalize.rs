//! Boolean normalizer: merges adjacent filter subtrees under
//! `AND`/`OR`/`NOT` into the backend's `must`/`should`/`must_not` shape,
//! flattening conjunctive/disjunctive chains and eliminating double
//! negation.
//!
//! Every function here builds new [`Filter`]s; none mutates an existing one
//! in place — this is what makes the merge rules testable by plain
//! structural equality.

use crate::model::{Filter, Node};

/// AND-merge two already-visited operands.
pub fn merge_and(left: Filter, right: Filter) -> Filter {
    let mut acc = Filter::new();
    fold_and_operand(&mut acc, left);
    fold_and_operand(&mut acc, right);
    dedupe(acc)
}

fn fold_and_operand(acc: &mut Filter, operand: Filter) {
    if operand.should.is_empty() {
        // Pure must/must_not (or empty): splice directly so conjunctive
        // chains flatten into one list instead of nesting.
        acc.must.extend(operand.must);
        acc.must_not.extend(operand.must_not);
    } else {
        // Pure disjunctive, or should mixed with must/must_not: cannot be
        // flattened into `must` without changing semantics, so it is kept
        // whole as a nested filter.
        acc.must.push(Node::Filter(operand));
    }
}

/// OR-merge two already-visited operands.
pub fn merge_or(left: Filter, right: Filter) -> Filter {
    let mut acc = Filter::new();
    fold_or_operand(&mut acc, left);
    fold_or_operand(&mut acc, right);
    dedupe(acc)
}

fn fold_or_operand(acc: &mut Filter, operand: Filter) {
    if operand.is_pure_should() {
        // Pure disjunctive: flatten its should entries directly.
        acc.should.extend(operand.should);
    } else if operand.must.len() == 1 && operand.should.is_empty() && operand.must_not.is_empty() {
        // A single positive predicate: push it bare, so "a = 1 OR b = 2"
        // produces two leaf conditions in `should`, not two one-entry
        // nested filters.
        acc.should.push(operand.must.into_iter().next().expect("len checked above"));
    } else {
        // Composite (an AND of conditions) or anything carrying a must_not:
        // kept whole, since should has no way to represent negation on its
        // own.
        acc.should.push(Node::Filter(operand));
    }
}

/// Apply a `NOT` prefix to an already-visited factor.
pub fn apply_not(term: Filter) -> Filter {
    if term.is_pure_must_not() {
        // `term` was itself a negation: NOT(NOT x) == x.
        return Filter::with_must(term.must_not);
    }
    let wrapped = match single_entry(&term) {
        Some(node) => node,
        None => Node::Filter(term),
    };
    Filter::with_must_not(vec![wrapped])
}

/// If `filter` has exactly one entry in exactly one bucket, return that
/// entry; used only by [`apply_not`] to avoid wrapping a trivial filter
/// one level deeper than necessary.
fn single_entry(filter: &Filter) -> Option<Node> {
    let buckets = [&filter.must, &filter.should, &filter.must_not];
    let mut nonempty = buckets.iter().filter(|b| !b.is_empty());
    let only = nonempty.next()?;
    if nonempty.next().is_some() || only.len() != 1 {
        return None;
    }
    Some(only[0].clone())
}

/// Deduplicate each bucket by structural identity, preserving order.
/// Empty buckets already serialize as absent, so no separate "strip empty"
/// step is needed once this runs.
fn dedupe(mut filter: Filter) -> Filter {
    filter.must = dedupe_nodes(filter.must);
    filter.should = dedupe_nodes(filter.should);
    filter.must_not = dedupe_nodes(filter.must_not);
    filter
}

fn dedupe_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !out.contains(&node) {
            out.push(node);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use crate::value::Value;

    fn match_value(key: &str, value: &str) -> Filter {
        Filter::with_must(vec![Node::Condition(Condition::MatchValue {
            key: key.into(),
            value: Value::Str(value.into()),
        })])
    }

    #[test]
    fn and_flattens_conjunctive_chain() {
        let acc = merge_and(merge_and(match_value("a", "1"), match_value("b", "2")), match_value("c", "3"));
        assert_eq!(acc.must.len(), 3);
        assert!(acc.should.is_empty());
        assert!(acc.must_not.is_empty());
    }

    #[test]
    fn or_flattens_disjunctive_chain() {
        let left = merge_or(match_value("a", "1"), match_value("b", "2"));
        let acc = merge_or(left, match_value("c", "3"));
        assert_eq!(acc.should.len(), 3);
        assert!(acc.must.is_empty());
    }

    #[test]
    fn and_preserves_pure_should_as_nested_filter() {
        let should = merge_or(match_value("country", "US"), match_value("country", "CA"));
        let acc = merge_and(should.clone(), match_value("verified", "false"));
        assert_eq!(acc.must.len(), 2);
        assert_eq!(acc.must[0], Node::Filter(should));
    }

    #[test]
    fn double_negation_is_eliminated() {
        let base = match_value("a", "1");
        let once = apply_not(base.clone());
        let twice = apply_not(once);
        assert_eq!(twice, base);
    }

    #[test]
    fn not_wraps_single_condition_unwrapped() {
        let wrapped = apply_not(match_value("a", "1"));
        assert_eq!(wrapped.must_not.len(), 1);
        assert_eq!(
            wrapped.must_not[0],
            Node::Condition(Condition::MatchValue { key: "a".into(), value: Value::Str("1".into()) })
        );
    }

    #[test]
    fn not_wraps_composite_filter_whole() {
        let composite = merge_or(match_value("a", "1"), match_value("b", "2"));
        let wrapped = apply_not(composite.clone());
        assert_eq!(wrapped.must_not, vec![Node::Filter(composite)]);
    }
}
