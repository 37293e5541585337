//! Cell values and raw-text inference.
//!
//! Source files carry no declared column types. Every present cell is kept as
//! a [`Field`]: the text exactly as read plus a tagged [`Value`] inferred from
//! it. The text is what gets written back out and what keys are built from;
//! the value is a typed view. An absent cell is `None`; empty text and the
//! common placeholder tokens (`NA`, `null`, ...) both map to absent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tokens treated as an absent value when they make up a whole cell.
pub const PLACEHOLDER_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// A present cell: its source text and the value inferred from that text.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    text: String,
    value: Value,
}

impl Field {
    /// The cell text as it appeared in the source.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Comparison form of this cell when it sits in the key column.
    pub fn key(&self) -> String {
        normalize_key(&self.text)
    }
}

impl From<&str> for Field {
    fn from(raw: &str) -> Self {
        Self {
            text: raw.to_string(),
            value: infer_value(raw),
        }
    }
}

impl From<String> for Field {
    fn from(raw: String) -> Self {
        let value = infer_value(&raw);
        Self { text: raw, value }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_TOKENS.contains(&value)
}

/// Reads one cell. Blank text and placeholder tokens are absent.
pub fn parse_cell(raw: &str) -> Option<Field> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return None;
    }
    Some(Field::from(raw))
}

/// Infers the typed value of non-blank cell text.
pub fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if is_canonical_integer(trimmed) {
        if let Ok(parsed) = trimmed.parse::<i64>() {
            return Value::Integer(parsed);
        }
    }
    if looks_like_float(trimmed) {
        if let Ok(parsed) = trimmed.parse::<f64>() {
            if parsed.is_finite() {
                return Value::Float(parsed);
            }
        }
    }
    Value::String(raw.to_string())
}

/// Renders a cell the way it is written back out: absent becomes empty text.
pub fn render_cell(cell: Option<&Field>) -> &str {
    cell.map_or("", Field::text)
}

/// Normalized comparison form of a key cell. Absent keys have no identity.
pub fn key_string(cell: Option<&Field>) -> Option<String> {
    cell.map(Field::key)
}

/// Comparison form of key text.
///
/// Keys are compared as trimmed text. The one numeric equivalence kept is a
/// canonical integer followed by an all-zero fraction (`1.0`, `-3.00`), which
/// names the same key as the bare integer. Other float spellings (`1.10`,
/// `1e3`) stay distinct text.
pub fn normalize_key(text: &str) -> String {
    let trimmed = text.trim();
    if let Some((whole, fraction)) = trimmed.split_once('.') {
        if is_canonical_integer(whole)
            && !fraction.is_empty()
            && fraction.bytes().all(|b| b == b'0')
        {
            return whole.to_string();
        }
    }
    trimmed.to_string()
}

// Leading zeros, an explicit `+` and negative zero mark identifiers such as
// zip codes, which must keep their text.
fn is_canonical_integer(value: &str) -> bool {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value),
    };
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && ((digits == "0" && !negative) || !digits.starts_with('0'))
}

fn looks_like_float(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let starts_well = digits
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || b == b'.');
    starts_well
        && digits.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'))
        && digits
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'-' | b'+'))
}
