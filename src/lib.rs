//! Compiles a SQL-like `WHERE`-clause string into the `must`/`should`/
//! `must_not` filter tree a downstream vector-database backend expects.
//!
//! ```
//! let filter = where_compiler::compile("age >= 18 AND country IN ('US', 'CA')").unwrap();
//! let json = filter.to_json();
//! assert!(json.get("must").is_some());
//! ```
//!
//! The pipeline is three stages, each a module here, run in order with no
//! back-edges: [`grammar`] (lex + parse into a concrete tree), [`mapper`]
//! (decode literals, dispatch each condition production), [`normalize`]
//! (fold `AND`/`OR`/`NOT` into the backend's tri-bucket shape). [`model`]
//! holds the output data types and their wire `Serialize` impls; [`value`]
//! the decoded literal type; [`error`] the single error enum both parsing
//! and mapping can raise; [`utils::datetime`] the ISO-8601 shape heuristic
//! the mapper's range dispatch needs.

pub mod error;
pub mod grammar;
pub mod mapper;
pub mod model;
pub mod normalize;
pub mod utils;
pub mod value;

pub use error::CompileError;
pub use model::{Bounds, CompareOp, Condition, CountBounds, Filter, Key, Node};
pub use value::Value;

/// Compile a `WHERE`-clause string into a normalized [`Filter`].
///
/// Synchronous and side-effect free: either a complete [`Filter`] comes
/// back, or a [`CompileError`] naming exactly where parsing failed or why
/// the query is semantically invalid. There are no partial results.
pub fn compile(where_clause: &str) -> Result<Filter, CompileError> {
    let tree = grammar::parse(where_clause)?;
    mapper::compile_expr(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_simple_equality() {
        let filter = compile("city = 'London'").unwrap();
        assert_eq!(filter.to_json(), serde_json::json!({"must": [{"key": "city", "match": {"value": "London"}}]}));
    }

    #[test]
    fn reports_parse_errors_with_location() {
        let err = compile("city == 'London'").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn reports_invalid_queries_for_missing_values() {
        let err = compile("age =").unwrap_err();
        assert_eq!(err.to_string(), "invalid query: missing value for field 'age'");
    }

    #[test]
    fn end_to_end_scenario_negated_disjunction() {
        let filter = compile("NOT (score < 50 OR attempts > 5)").unwrap();
        let json = filter.to_json();
        assert_eq!(
            json,
            serde_json::json!({
                "must_not": [{
                    "should": [
                        {"key": "score", "range": {"lt": 50}},
                        {"key": "attempts", "range": {"gt": 5}}
                    ]
                }]
            })
        );
    }
}
