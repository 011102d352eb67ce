//! Parser for the delimited flat-file record format.
//!
//! A record is a list of `Key: value` fields separated by a line holding only
//! `----`:
//!
//! ```text
//! Title: Hello
//!
//! ----
//!
//! Text: Multi-line
//! body text
//!
//! ----
//!
//! Hidden: 1
//! ```
//!
//! Keys are lowercased. Values are trimmed; a value that is empty after
//! trimming becomes `null`. Parsing is best-effort and never fails: a field
//! without a colon becomes a key with a `null` value, blank fields are dropped,
//! and a repeated key keeps its first position with the last value.

use crate::types::{Attributes, FieldValue};
use regex::Regex;
use std::sync::LazyLock;

/// `----` on its own line. Trailing spaces and the blank lines after it belong
/// to the separator.
static FIELD_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n----[ \t\r]*(?:\n|\z)\s*").expect("separator pattern is valid")
});

/// Parse one record into an ordered attribute map.
pub fn parse(raw: &str) -> Attributes {
    let mut attributes = Attributes::new();
    for field in FIELD_SEPARATOR.split(raw) {
        if let Some((key, value)) = parse_field(field) {
            attributes.insert(key, value);
        }
    }
    attributes
}

fn parse_field(field: &str) -> Option<(String, FieldValue)> {
    let (key, value) = match field.split_once(':') {
        Some((key, rest)) => (key, parse_value(rest)),
        None => (field, None),
    };
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        if field.trim().is_empty() {
            return None;
        }
        tracing::debug!(field = %field.trim(), "field has an empty key");
    }
    Some((key, FieldValue::from(value)))
}

fn parse_value(rest: &str) -> Option<String> {
    if rest == "\n" {
        return None;
    }
    let trimmed = rest.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
