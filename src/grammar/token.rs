//! Lexer for the WHERE-clause surface syntax.
//!
//! Keywords are matched case-insensitively against an entire identifier-like
//! run, never a prefix, which gives the trailing word-boundary a keyword
//! needs for free: `android` scans as one run, compares unequal to `and`,
//! and is emitted as a plain identifier.

use tracing::trace;

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(String),
    /// Raw body between the quotes, escapes not yet decoded.
    Str(String),
    LParen,
    RParen,
    Comma,
    EmptyList,
    And,
    Or,
    Not,
    In,
    Is,
    Null,
    Empty,
    True,
    False,
    Between,
    Like,
    Count,
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

/// A token together with the byte offset it started at, for error
/// reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, CompileError> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut pos = 0usize;
    let mut tokens = Vec::new();

    while pos < len {
        let c = input[pos..].chars().next().unwrap();

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        let start = pos;
        match c {
            '(' => {
                tokens.push(Spanned { token: Token::LParen, offset: start });
                pos += 1;
            }
            ')' => {
                tokens.push(Spanned { token: Token::RParen, offset: start });
                pos += 1;
            }
            ',' => {
                tokens.push(Spanned { token: Token::Comma, offset: start });
                pos += 1;
            }
            '\'' => {
                let (body, next) = scan_string(input, pos)?;
                tokens.push(Spanned { token: Token::Str(body), offset: start });
                pos = next;
            }
            '[' => {
                if input[pos..].starts_with("[]") {
                    tokens.push(Spanned { token: Token::EmptyList, offset: start });
                    pos += 2;
                } else {
                    return Err(CompileError::parse_at(input, pos));
                }
            }
            '>' => {
                if input[pos..].starts_with(">=") {
                    tokens.push(Spanned { token: Token::Ge, offset: start });
                    pos += 2;
                } else {
                    tokens.push(Spanned { token: Token::Gt, offset: start });
                    pos += 1;
                }
            }
            '<' => {
                if input[pos..].starts_with("<=") {
                    tokens.push(Spanned { token: Token::Le, offset: start });
                    pos += 2;
                } else if input[pos..].starts_with("<>") {
                    tokens.push(Spanned { token: Token::Ne, offset: start });
                    pos += 2;
                } else {
                    tokens.push(Spanned { token: Token::Lt, offset: start });
                    pos += 1;
                }
            }
            '=' => {
                tokens.push(Spanned { token: Token::Eq, offset: start });
                pos += 1;
            }
            '!' => {
                if input[pos..].starts_with("!=") {
                    tokens.push(Spanned { token: Token::Ne, offset: start });
                    pos += 2;
                } else {
                    return Err(CompileError::parse_at(input, pos));
                }
            }
            '-' | '0'..='9' => {
                let next = scan_number(input, pos)?;
                tokens.push(Spanned { token: Token::Number(input[start..next].to_string()), offset: start });
                pos = next;
            }
            c if is_ident_start(c) => {
                let next = scan_run(input, pos, is_ident_continue);
                let word = &input[start..next];
                tokens.push(Spanned { token: keyword_or_ident(word), offset: start });
                pos = next;
            }
            _ => return Err(CompileError::parse_at(input, pos)),
        }
    }

    trace!("tokenized {} bytes into {} tokens", len, tokens.len());
    Ok(tokens)
}

fn scan_run(input: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = from;
    for c in input[from..].chars() {
        if pred(c) {
            end += c.len_utf8();
        } else {
            break;
        }
    }
    end
}

fn scan_number(input: &str, from: usize) -> Result<usize, CompileError> {
    let after_sign = if input[from..].starts_with('-') { from + 1 } else { from };
    let mut end = scan_run(input, after_sign, |c| c.is_ascii_digit());
    if end == after_sign {
        return Err(CompileError::parse_at(input, from));
    }
    if input[end..].starts_with('.') {
        let after_dot = end + 1;
        let frac_end = scan_run(input, after_dot, |c| c.is_ascii_digit());
        if frac_end == after_dot {
            return Err(CompileError::parse_at(input, from));
        }
        end = frac_end;
    }
    Ok(end)
}

fn scan_string(input: &str, from: usize) -> Result<(String, usize), CompileError> {
    debug_assert!(input[from..].starts_with('\''));
    let rest = &input[from + 1..];
    let mut body = String::new();
    let mut iter = rest.char_indices();
    loop {
        match iter.next() {
            None => return Err(CompileError::parse_at(input, from)),
            Some((i, '\'')) => {
                let end = from + 1 + i + 1;
                return Ok((body, end));
            }
            Some((_, '\\')) => match iter.next() {
                Some((_, next_c @ ('\'' | '\\'))) => {
                    body.push('\\');
                    body.push(next_c);
                }
                Some((_, other)) => {
                    body.push('\\');
                    body.push(other);
                }
                None => return Err(CompileError::parse_at(input, from)),
            },
            Some((_, c)) => body.push(c),
        }
    }
}

fn keyword_or_ident(word: &str) -> Token {
    match word.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "IN" => Token::In,
        "IS" => Token::Is,
        "NULL" => Token::Null,
        "EMPTY" => Token::Empty,
        "TRUE" => Token::True,
        "FALSE" => Token::False,
        "BETWEEN" => Token::Between,
        "LIKE" => Token::Like,
        "COUNT" => Token::Count,
        _ => Token::Ident(word.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn keyword_prefix_is_not_mistaken_for_keyword() {
        assert_eq!(
            kinds("android = 1"),
            vec![Token::Ident("android".into()), Token::Eq, Token::Number("1".into())]
        );
    }

    #[test]
    fn and_keyword_is_case_insensitive() {
        assert_eq!(kinds("a = 1 and b = 2")[3], Token::And);
        assert_eq!(kinds("a = 1 AND b = 2")[3], Token::And);
    }

    #[test]
    fn string_with_escapes_is_captured_raw() {
        assert_eq!(kinds(r"'it\'s'"), vec![Token::Str("it\\'s".to_string())]);
    }

    #[test]
    fn empty_list_is_a_single_token() {
        assert_eq!(kinds("tags = []"), vec![Token::Ident("tags".into()), Token::Eq, Token::EmptyList]);
    }

    #[test]
    fn dotted_bracketed_identifier_stays_one_token() {
        assert_eq!(
            kinds("user.addresses[].city = 'x'"),
            vec![
                Token::Ident("user.addresses[].city".into()),
                Token::Eq,
                Token::Str("x".into())
            ]
        );
    }

    #[test]
    fn negative_and_decimal_numbers() {
        assert_eq!(kinds("-3"), vec![Token::Number("-3".into())]);
        assert_eq!(kinds("3.5"), vec![Token::Number("3.5".into())]);
    }

    #[test]
    fn unmatched_quote_is_a_parse_error() {
        assert!(tokenize("a = 'unterminated").is_err());
    }
}
