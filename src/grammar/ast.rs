//! The concrete parse tree produced by [`super::parser`].
//!
//! This is deliberately "raw": string bodies keep their escape sequences
//! undecoded and numbers keep their source text, because literal decoding
//! is the semantic mapper's job, not the parser's. The parser
//! only owns the *shape* of the input.

/// An undecoded literal from the `value` production.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Raw body of a single-quoted string, escapes not yet resolved.
    Str(String),
    /// Raw source text of a number literal.
    Number(String),
    Bool(bool),
    List(Vec<RawValue>),
    EmptyList,
    /// No value token was present where one was expected. Not a parse
    /// failure by itself — the mapper routes this to `InvalidQuery`, naming
    /// the field it was missing for.
    Missing,
}

/// The operator of a `comparison_op` production, and of `has_id` /
/// `values_count`, which reuse the same small operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
    In,
    NotIn,
    Like,
    Between,
    NotBetween,
}

/// A `condition` production: `is_null`, `is_empty`/`is_empty_array`,
/// `values_count`, `has_id`, or a generic `comparison`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Comparison {
        field: String,
        op: CmpOp,
        value: RawValue,
        /// Present only for `BETWEEN`/`NOT BETWEEN`'s second bound.
        upper: Option<RawValue>,
    },
    IsNull {
        field: String,
        negated: bool,
    },
    /// Covers both `ident IS EMPTY` and `ident = []`; both produce
    /// identical output.
    IsEmpty {
        field: String,
    },
    HasId {
        op: CmpOp,
        value: RawValue,
    },
    ValuesCount {
        field: String,
        op: CmpOp,
        value: RawValue,
        upper: Option<RawValue>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A `factor` production: an optionally-negated condition or parenthesized
/// sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Factor {
    Negated(Box<Factor>),
    Grouped(Box<Expr>),
    Condition(ConditionExpr),
}

/// An `expression` production: a first factor followed by zero or more
/// `(logical operator, factor)` pairs, left-to-right, `AND`/`OR` at equal
/// precedence. The mapper folds this flat sequence one pair at a time
/// rather than the parser pre-grouping by operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub first: Factor,
    pub rest: Vec<(LogicalOp, Factor)>,
}
