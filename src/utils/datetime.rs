//! Datetime-shape detection used by the semantic mapper's range dispatch.
//!
//! Scoped down from the application's general-purpose `DateTimeParser` to
//! the single heuristic the compiler's contract needs: attempt an
//! ISO-8601/RFC3339 parse, rewriting a trailing `Z` to `+00:00` first, the
//! same way the source's `fromisoformat` shim behaves. A string that fails
//! this parse is not a datetime as far as the compiler is concerned — it
//! flows through unchanged as a plain string-valued `Range` operand (see
//! `mapper::dispatch_range`). This is preserved as-is even though it is
//! semantically awkward downstream; it is not "fixed" here.

use chrono::{DateTime, NaiveDateTime};

/// True iff `text` parses as an ISO-8601/RFC3339 datetime under the
/// `Z` -> `+00:00` rewrite.
pub fn looks_like_datetime(text: &str) -> bool {
    parse_iso8601(text).is_some()
}

/// Parse `text` as ISO-8601, rewriting a trailing `Z` to `+00:00` first.
/// Mirrors Python's `fromisoformat`: an explicit UTC offset is accepted,
/// but one is not required — a naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` is also
/// a datetime. Returns the (possibly rewritten) text on success, for
/// embedding verbatim in a `DatetimeRange` bound.
pub fn parse_iso8601(text: &str) -> Option<String> {
    let rewritten = match text.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => text.to_string(),
    };
    if DateTime::parse_from_rfc3339(&rewritten).is_ok() {
        return Some(rewritten);
    }
    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];
    for format in NAIVE_FORMATS {
        if NaiveDateTime::parse_from_str(&rewritten, format).is_ok() {
            return Some(rewritten);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_trailing_z() {
        assert!(looks_like_datetime("2023-01-01T00:00:00Z"));
    }

    #[test]
    fn recognizes_explicit_offset() {
        assert!(looks_like_datetime("2023-01-01T00:00:00+02:00"));
    }

    #[test]
    fn recognizes_naive_datetime() {
        assert!(looks_like_datetime("2023-01-01T00:00:00"));
    }

    #[test]
    fn rejects_non_datetime_strings() {
        assert!(!looks_like_datetime("red"));
        assert!(!looks_like_datetime("17"));
        assert!(!looks_like_datetime("2023-01-01"));
    }

    #[test]
    fn rewrite_is_embedded_in_output() {
        let out = parse_iso8601("2023-01-01T00:00:00Z").unwrap();
        assert_eq!(out, "2023-01-01T00:00:00+00:00");
    }
}
