//! Error types produced by the WHERE-clause compiler.
//!
//! Compilation is synchronous and has no partial results: a call either
//! returns a [`Filter`](crate::model::Filter) or one of the two errors
//! below. Neither is retried internally.

use thiserror::Error;

/// Top-level compiler error.
///
/// This enum uses `thiserror` to provide `Display`/`std::error::Error`
/// implementations and keeps the two failure modes the grammar and mapper
/// can produce clearly separated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The input does not match the grammar.
    #[error("parse error at byte {offset} (line {line}, column {column}): unexpected input near '{fragment}'")]
    Parse {
        /// Byte offset into the input where parsing failed.
        offset: usize,
        /// 1-based line number at `offset`.
        line: usize,
        /// 1-based column number at `offset`.
        column: usize,
        /// A short fragment of the surrounding text, for diagnostics.
        fragment: String,
    },

    /// The input parses but violates a semantic rule of the compiler
    /// (missing value, unrecognized operator after normalization, malformed
    /// `id` condition structure).
    #[error("invalid query: {message}")]
    Invalid { message: String },
}

impl CompileError {
    /// Build a [`CompileError::Parse`] from an input string and the byte
    /// offset where the grammar failed to match.
    pub fn parse_at(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let (line, column) = line_column(input, offset);
        let fragment = surrounding_fragment(input, offset);
        Self::Parse {
            offset,
            line,
            column,
            fragment,
        }
    }

    /// Build a [`CompileError::Invalid`] with a custom message.
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Build an [`CompileError::Invalid`] naming the field whose value is
    /// missing.
    pub fn missing_value<S: Into<String>>(field: S) -> Self {
        Self::invalid(format!("missing value for field '{}'", field.into()))
    }
}

fn line_column(input: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for ch in input[..offset].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn surrounding_fragment(input: &str, offset: usize) -> String {
    const RADIUS: usize = 12;
    let start = input[..offset]
        .char_indices()
        .rev()
        .nth(RADIUS)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = input[offset..]
        .char_indices()
        .nth(RADIUS)
        .map(|(i, _)| offset + i)
        .unwrap_or(input.len());
    input[start..end].to_string()
}
