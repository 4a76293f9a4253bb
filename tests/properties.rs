//! Property tests over arbitrary-length conjunctive/disjunctive chains,
//! left-associative OR flattening, and `BETWEEN`/two-sided-comparison
//! agreement.

use proptest::prelude::*;
use where_compiler::{compile, Condition, Filter, Node};

/// Collect every numeric bound touched by `must` into one `(gt, gte, lt,
/// lte)` tuple, so two differently-shaped filters (a `BETWEEN` producing one
/// two-bound `Range` node vs. two `>=`/`<=` comparisons producing two
/// one-bound `Range` nodes) can be compared by the bounds they express
/// rather than by node-for-node structural equality.
fn collect_numeric_bounds(filter: &Filter) -> (Option<i64>, Option<i64>, Option<i64>, Option<i64>) {
    let mut acc = (None, None, None, None);
    for node in &filter.must {
        if let Node::Condition(Condition::Range { bounds, .. }) = node {
            let as_i64 = |v: &where_compiler::Value| match v {
                where_compiler::Value::Int(n) => Some(*n),
                _ => None,
            };
            acc.0 = acc.0.or(bounds.gt.as_ref().and_then(as_i64));
            acc.1 = acc.1.or(bounds.gte.as_ref().and_then(as_i64));
            acc.2 = acc.2.or(bounds.lt.as_ref().and_then(as_i64));
            acc.3 = acc.3.or(bounds.lte.as_ref().and_then(as_i64));
        }
    }
    acc
}

fn field_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(|s| s.to_string())
}

fn small_int() -> impl Strategy<Value = i64> {
    0i64..1000
}

fn condition_clause() -> impl Strategy<Value = String> {
    (field_name(), small_int()).prop_map(|(field, n)| format!("{field} = {n}"))
}

proptest! {
    /// An AND-chain of N conditions produces exactly those N
    /// conditions in `must`, in input order, with `should`/`must_not` empty.
    #[test]
    fn and_chain_preserves_order_and_bucket(clauses in prop::collection::vec(condition_clause(), 1..8)) {
        let joined = clauses.join(" AND ");
        let filter = compile(&joined).unwrap();

        prop_assert!(filter.should.is_empty());
        prop_assert!(filter.must_not.is_empty());
        prop_assert_eq!(filter.must.len(), clauses.len());

        for (node, clause) in filter.must.iter().zip(clauses.iter()) {
            let expected_field = clause.split(" = ").next().unwrap();
            match node {
                Node::Condition(Condition::MatchValue { key, .. }) => prop_assert_eq!(key, expected_field),
                other => prop_assert!(false, "expected a leaf MatchValue, got {:?}", other),
            }
        }
    }

    /// An OR-chain of N conditions with no AND/NOT produces
    /// exactly those N conditions in `should`, in input order.
    #[test]
    fn or_chain_preserves_order_and_bucket(clauses in prop::collection::vec(condition_clause(), 1..8)) {
        let joined = clauses.join(" OR ");
        let filter = compile(&joined).unwrap();

        prop_assert!(filter.must.is_empty());
        prop_assert!(filter.must_not.is_empty());
        prop_assert_eq!(filter.should.len(), clauses.len());
    }

    /// Left-associative flattening means explicit grouping of
    /// a pure-OR chain does not change the compiled shape.
    #[test]
    fn or_chain_flattening_is_grouping_independent(a in condition_clause(), b in condition_clause(), c in condition_clause()) {
        let ungrouped = compile(&format!("{a} OR {b} OR {c}")).unwrap();
        let right_grouped = compile(&format!("{a} OR ({b} OR {c})")).unwrap();
        let left_grouped = compile(&format!("({a} OR {b}) OR {c}")).unwrap();

        prop_assert_eq!(&ungrouped, &right_grouped);
        prop_assert_eq!(&ungrouped, &left_grouped);
    }

    /// `x >= n AND x <= n` and `x BETWEEN n AND n` both express a
    /// `Range(gte=n, lte=n)` inside `must` — a `BETWEEN` emits one two-bound
    /// node while two comparisons emit two one-bound nodes, with no rule to
    /// merge separately-parsed comparisons into one range, so the two forms
    /// are compared by the bounds they carry rather than by node count.
    #[test]
    fn between_and_two_sided_comparison_agree(n in small_int()) {
        let from_between = compile(&format!("x BETWEEN {n} AND {n}")).unwrap();
        let from_comparisons = compile(&format!("x >= {n} AND x <= {n}")).unwrap();
        prop_assert_eq!(collect_numeric_bounds(&from_between), (None, Some(n), None, Some(n)));
        prop_assert_eq!(collect_numeric_bounds(&from_comparisons), (None, Some(n), None, Some(n)));
    }
}
