//! Recursive-descent parser: one function per grammar production, a
//! hand-written tokenizer feeding a hand-written descent rather than an
//! external PEG crate.
//!
//! `NOT IN` is checked before `IN`, and `NOT BETWEEN` before `BETWEEN`,
//! inside [`parse_comparison`] — the ordering a greedy, non-backtracking
//! ordered-choice alternation requires.

use tracing::trace;

use crate::error::CompileError;

use super::ast::{CmpOp, ConditionExpr, Expr, Factor, LogicalOp, RawValue};
use super::token::{tokenize, Spanned, Token};

/// Parse a WHERE-clause string into a concrete [`Expr`] tree.
pub fn parse(input: &str) -> Result<Expr, CompileError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CompileError::parse_at(input, 0));
    }
    let mut pos = 0usize;
    let expr = parse_expression(input, &tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(CompileError::parse_at(input, tokens[pos].offset));
    }
    Ok(expr)
}

fn fail_at(input: &str, tokens: &[Spanned], pos: usize) -> CompileError {
    let offset = tokens.get(pos).map(|s| s.offset).unwrap_or(input.len());
    CompileError::parse_at(input, offset)
}

fn parse_expression(input: &str, tokens: &[Spanned], pos: &mut usize) -> Result<Expr, CompileError> {
    let first = parse_factor(input, tokens, pos)?;
    let mut rest = Vec::new();
    loop {
        let op = match tokens.get(*pos).map(|s| &s.token) {
            Some(Token::And) => LogicalOp::And,
            Some(Token::Or) => LogicalOp::Or,
            _ => break,
        };
        *pos += 1;
        let next = parse_factor(input, tokens, pos)?;
        rest.push((op, next));
    }
    Ok(Expr { first, rest })
}

fn parse_factor(input: &str, tokens: &[Spanned], pos: &mut usize) -> Result<Factor, CompileError> {
    match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::Not) => {
            *pos += 1;
            let inner = parse_factor(input, tokens, pos)?;
            Ok(Factor::Negated(Box::new(inner)))
        }
        Some(Token::LParen) => {
            *pos += 1;
            let expr = parse_expression(input, tokens, pos)?;
            match tokens.get(*pos).map(|s| &s.token) {
                Some(Token::RParen) => {
                    *pos += 1;
                    Ok(Factor::Grouped(Box::new(expr)))
                }
                _ => Err(fail_at(input, tokens, *pos)),
            }
        }
        _ => Ok(Factor::Condition(parse_condition(input, tokens, pos)?)),
    }
}

fn parse_condition(input: &str, tokens: &[Spanned], pos: &mut usize) -> Result<ConditionExpr, CompileError> {
    if matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::Count)) {
        return parse_values_count(input, tokens, pos);
    }

    let field = expect_ident(input, tokens, pos)?;

    if matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::Is)) {
        return parse_is(input, tokens, pos, field);
    }

    // `is_empty_array` is tried ahead of `has_id` and of a generic
    // comparison: `id = []` must parse as `IsEmpty`, not as `HasId` with an
    // empty id list.
    if matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::Eq))
        && matches!(tokens.get(*pos + 1).map(|s| &s.token), Some(Token::EmptyList))
    {
        *pos += 2;
        return Ok(ConditionExpr::IsEmpty { field });
    }

    if field == "id" {
        if let Some(has_id) = try_parse_has_id_op(input, tokens, pos)? {
            return Ok(has_id);
        }
        // Operator doesn't match the has_id set: fall through and treat
        // `id` as an ordinary field in a generic comparison, mirroring
        // ordered-choice backtracking from `has_id` to `comparison`.
    }

    parse_comparison(input, tokens, pos, field)
}

fn parse_is(
    input: &str,
    tokens: &[Spanned],
    pos: &mut usize,
    field: String,
) -> Result<ConditionExpr, CompileError> {
    *pos += 1; // consume IS
    let negated = matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::Not));
    if negated {
        *pos += 1;
    }
    match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::Null) => {
            *pos += 1;
            Ok(ConditionExpr::IsNull { field, negated })
        }
        Some(Token::Empty) if !negated => {
            *pos += 1;
            Ok(ConditionExpr::IsEmpty { field })
        }
        _ => Err(fail_at(input, tokens, *pos)),
    }
}

fn try_parse_has_id_op(
    input: &str,
    tokens: &[Spanned],
    pos: &mut usize,
) -> Result<Option<ConditionExpr>, CompileError> {
    let op = match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::Eq) => CmpOp::Eq,
        Some(Token::Ne) => CmpOp::Ne,
        Some(Token::In) => CmpOp::In,
        Some(Token::Not) if matches!(tokens.get(*pos + 1).map(|s| &s.token), Some(Token::In)) => {
            *pos += 1;
            CmpOp::NotIn
        }
        _ => return Ok(None),
    };
    *pos += 1;
    let value = parse_value(input, tokens, pos)?;
    trace!("parsed has_id condition: {:?}", op);
    Ok(Some(ConditionExpr::HasId { op, value }))
}

fn parse_comparison(
    input: &str,
    tokens: &[Spanned],
    pos: &mut usize,
    field: String,
) -> Result<ConditionExpr, CompileError> {
    let (op, upper_required) = match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::Not) if matches!(tokens.get(*pos + 1).map(|s| &s.token), Some(Token::In)) => {
            *pos += 2;
            (CmpOp::NotIn, false)
        }
        Some(Token::Not) if matches!(tokens.get(*pos + 1).map(|s| &s.token), Some(Token::Between)) => {
            *pos += 2;
            (CmpOp::NotBetween, true)
        }
        Some(Token::Ge) => {
            *pos += 1;
            (CmpOp::Ge, false)
        }
        Some(Token::Le) => {
            *pos += 1;
            (CmpOp::Le, false)
        }
        Some(Token::Gt) => {
            *pos += 1;
            (CmpOp::Gt, false)
        }
        Some(Token::Lt) => {
            *pos += 1;
            (CmpOp::Lt, false)
        }
        Some(Token::Eq) => {
            *pos += 1;
            (CmpOp::Eq, false)
        }
        Some(Token::Ne) => {
            *pos += 1;
            (CmpOp::Ne, false)
        }
        Some(Token::In) => {
            *pos += 1;
            (CmpOp::In, false)
        }
        Some(Token::Like) => {
            *pos += 1;
            (CmpOp::Like, false)
        }
        Some(Token::Between) => {
            *pos += 1;
            (CmpOp::Between, true)
        }
        _ => return Err(fail_at(input, tokens, *pos)),
    };

    let value = parse_value(input, tokens, pos)?;
    let upper = if upper_required {
        expect(input, tokens, pos, &Token::And)?;
        Some(parse_value(input, tokens, pos)?)
    } else {
        None
    };
    Ok(ConditionExpr::Comparison { field, op, value, upper })
}

fn parse_values_count(input: &str, tokens: &[Spanned], pos: &mut usize) -> Result<ConditionExpr, CompileError> {
    *pos += 1; // consume COUNT
    expect(input, tokens, pos, &Token::LParen)?;
    let field = expect_ident(input, tokens, pos)?;
    expect(input, tokens, pos, &Token::RParen)?;

    let (op, upper_required) = match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::Eq) => {
            *pos += 1;
            (CmpOp::Eq, false)
        }
        Some(Token::Ge) => {
            *pos += 1;
            (CmpOp::Ge, false)
        }
        Some(Token::Le) => {
            *pos += 1;
            (CmpOp::Le, false)
        }
        Some(Token::Gt) => {
            *pos += 1;
            (CmpOp::Gt, false)
        }
        Some(Token::Lt) => {
            *pos += 1;
            (CmpOp::Lt, false)
        }
        Some(Token::Between) => {
            *pos += 1;
            (CmpOp::Between, true)
        }
        _ => return Err(fail_at(input, tokens, *pos)),
    };

    let value = parse_value(input, tokens, pos)?;
    let upper = if upper_required {
        expect(input, tokens, pos, &Token::And)?;
        Some(parse_value(input, tokens, pos)?)
    } else {
        None
    };
    Ok(ConditionExpr::ValuesCount { field, op, value, upper })
}

/// `value := list_value | '[]' | string | number | boolean`. Returns
/// `RawValue::Missing` without consuming a token when none of these start
/// at the current position — the mapper turns that into `InvalidQuery`.
fn parse_value(input: &str, tokens: &[Spanned], pos: &mut usize) -> Result<RawValue, CompileError> {
    match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::EmptyList) => {
            *pos += 1;
            Ok(RawValue::EmptyList)
        }
        Some(Token::LParen) => {
            *pos += 1;
            let mut items = Vec::new();
            if !matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::RParen)) {
                loop {
                    let item = parse_value(input, tokens, pos)?;
                    if matches!(item, RawValue::Missing) {
                        return Err(fail_at(input, tokens, *pos));
                    }
                    items.push(item);
                    if matches!(tokens.get(*pos).map(|s| &s.token), Some(Token::Comma)) {
                        *pos += 1;
                        continue;
                    }
                    break;
                }
            }
            expect(input, tokens, pos, &Token::RParen)?;
            Ok(RawValue::List(items))
        }
        Some(Token::Str(s)) => {
            let s = s.clone();
            *pos += 1;
            Ok(RawValue::Str(s))
        }
        Some(Token::Number(n)) => {
            let n = n.clone();
            *pos += 1;
            Ok(RawValue::Number(n))
        }
        Some(Token::True) => {
            *pos += 1;
            Ok(RawValue::Bool(true))
        }
        Some(Token::False) => {
            *pos += 1;
            Ok(RawValue::Bool(false))
        }
        _ => Ok(RawValue::Missing),
    }
}

fn expect_ident(input: &str, tokens: &[Spanned], pos: &mut usize) -> Result<String, CompileError> {
    match tokens.get(*pos).map(|s| &s.token) {
        Some(Token::Ident(name)) => {
            let name = name.clone();
            *pos += 1;
            Ok(name)
        }
        _ => Err(fail_at(input, tokens, *pos)),
    }
}

fn expect(input: &str, tokens: &[Spanned], pos: &mut usize, expected: &Token) -> Result<(), CompileError> {
    if tokens.get(*pos).map(|s| &s.token) == Some(expected) {
        *pos += 1;
        Ok(())
    } else {
        Err(fail_at(input, tokens, *pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(parse("").is_err());
    }

    #[test]
    fn left_folds_mixed_and_or_without_sql_precedence() {
        let expr = parse("a = 1 AND b = 2 OR c = 3").unwrap();
        assert_eq!(expr.rest.len(), 2);
        assert_eq!(expr.rest[0].0, LogicalOp::And);
        assert_eq!(expr.rest[1].0, LogicalOp::Or);
    }

    #[test]
    fn not_in_is_distinct_from_not_wrapping_in() {
        let not_in = parse("a NOT IN (1)").unwrap();
        match not_in.first {
            Factor::Condition(ConditionExpr::Comparison { op: CmpOp::NotIn, .. }) => {}
            other => panic!("expected NotIn comparison, got {other:?}"),
        }

        let negated_in = parse("NOT a IN (1)").unwrap();
        match negated_in.first {
            Factor::Negated(inner) => match *inner {
                Factor::Condition(ConditionExpr::Comparison { op: CmpOp::In, .. }) => {}
                other => panic!("expected In comparison inside negation, got {other:?}"),
            },
            other => panic!("expected Negated factor, got {other:?}"),
        }
    }

    #[test]
    fn in_with_empty_list_parses_without_error() {
        let expr = parse("a IN ()").unwrap();
        match expr.first {
            Factor::Condition(ConditionExpr::Comparison { value: RawValue::List(items), .. }) => {
                assert!(items.is_empty())
            }
            other => panic!("expected empty list comparison, got {other:?}"),
        }
    }

    #[test]
    fn is_empty_array_and_is_empty_both_parse() {
        assert!(matches!(
            parse("tags = []").unwrap().first,
            Factor::Condition(ConditionExpr::IsEmpty { .. })
        ));
        assert!(matches!(
            parse("tags IS EMPTY").unwrap().first,
            Factor::Condition(ConditionExpr::IsEmpty { .. })
        ));
    }

    #[test]
    fn is_empty_array_wins_over_has_id_for_the_id_field() {
        match parse("id = []").unwrap().first {
            Factor::Condition(ConditionExpr::IsEmpty { field }) => assert_eq!(field, "id"),
            other => panic!("expected IsEmpty on field 'id', got {other:?}"),
        }
    }

    #[test]
    fn missing_value_does_not_abort_parsing() {
        let expr = parse("a =").unwrap();
        assert!(matches!(
            expr.first,
            Factor::Condition(ConditionExpr::Comparison { value: RawValue::Missing, .. })
        ));
    }

    #[test]
    fn id_with_unsupported_operator_falls_back_to_plain_comparison() {
        let expr = parse("id > 5").unwrap();
        match expr.first {
            Factor::Condition(ConditionExpr::Comparison { field, op: CmpOp::Gt, .. }) => {
                assert_eq!(field, "id");
            }
            other => panic!("expected plain comparison on field 'id', got {other:?}"),
        }
    }

    #[test]
    fn values_count_between() {
        let expr = parse("COUNT(tags) BETWEEN 2 AND 5").unwrap();
        assert!(matches!(
            expr.first,
            Factor::Condition(ConditionExpr::ValuesCount { op: CmpOp::Between, .. })
        ));
    }

    #[test]
    fn nested_grouping_parses() {
        let expr = parse("(country = 'US' OR country = 'CA') AND verified = FALSE").unwrap();
        assert!(matches!(expr.first, Factor::Grouped(_)));
        assert_eq!(expr.rest.len(), 1);
    }
}
