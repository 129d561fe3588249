//! Core tabular data model.
//!
//! This module contains the data structures shared by every pipeline stage:
//!
//! - [`Value`] - A single cell: number, text, or the distinguished absent value
//! - [`ColumnType`] - Inferred type of a column (numeric or text)
//! - [`Dataset`] - A named, typed table in original file order
//! - [`KeyValue`] - Canonical representation of an alignment key
//!
//! A [`Dataset`] is created once by the normalizer and never mutated
//! afterwards; every downstream stage borrows it.

use serde::{Deserialize, Serialize};

/// Cell values treated as absent during normalization.
///
/// Mirrors the standard NA markers of common tabular tooling.
const NULL_MARKERS: &[&str] = &["", "NA", "N/A", "n/a", "null", "NULL", "NaN", "nan"];

// =============================================================================
// Cell Values
// =============================================================================

/// A single cell value.
///
/// There is no implicit coercion between the three cases anywhere in the
/// engine: an absent cell is never read as zero or as an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Numeric cell.
    Number(f64),
    /// Text cell, stored verbatim.
    Text(String),
    /// Missing cell.
    Absent,
}

impl Value {
    /// Build a cell value for a column of the given type.
    ///
    /// Absent markers become [`Value::Absent`] regardless of column type.
    /// In a numeric column every non-absent cell parses by the inference
    /// invariant; a value that still fails to parse is kept as text rather
    /// than dropped.
    pub fn typed(raw: &str, column_type: ColumnType) -> Self {
        let trimmed = raw.trim();
        if is_absent_marker(trimmed) {
            return Value::Absent;
        }
        match column_type {
            ColumnType::Numeric => match parse_number(trimmed) {
                Some(n) => Value::Number(n),
                None => Value::Text(trimmed.to_string()),
            },
            ColumnType::Text => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Get the numeric value if present.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the text value if present.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", canonical_number(*n)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Absent => Ok(()),
        }
    }
}

/// Whether a trimmed cell counts as absent.
pub fn is_absent_marker(trimmed: &str) -> bool {
    NULL_MARKERS.contains(&trimmed)
}

/// Parse a numeric literal: optional sign, digits with at most one decimal
/// point, optional exponent. Rejects `inf`, `nan` and hex forms that
/// `f64::from_str` would otherwise accept.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let mut i = 0;
    if bytes[i] == b'+' || bytes[i] == b'-' {
        i += 1;
    }
    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut exp_digits = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            exp_digits += 1;
        }
        if exp_digits == 0 {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }

    s.parse::<f64>().ok()
}

/// Canonical display form of a number: integral values without a trailing
/// `.0`, everything else in shortest round-trip form.
pub fn canonical_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Column Types
// =============================================================================

/// Inferred type of a column.
///
/// A column is numeric when every non-absent value in it parses as a
/// number; otherwise it is text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
}

// =============================================================================
// Dataset
// =============================================================================

/// A named, typed table.
///
/// Rows preserve original file order. `columns` and `types` are parallel;
/// column names are unique (the normalizer rejects duplicate headers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Source file name.
    pub name: String,
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Inferred type per column, parallel to `columns`.
    pub types: Vec<ColumnType>,
    /// Row-major cell values, each row parallel to `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Inferred type of a column by name.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|i| self.types[i])
    }

    /// Whether a column exists and inferred numeric.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.column_type(name) == Some(ColumnType::Numeric)
    }

    /// Cell at (row, column name), if both exist.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Numeric columns other than the given key column, in column order.
    pub fn comparable_columns(&self, key: &str) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.types)
            .filter(|(name, ty)| name.as_str() != key && **ty == ColumnType::Numeric)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

// =============================================================================
// Alignment Keys
// =============================================================================

/// Canonical form of a key cell, used for equality-based row alignment.
///
/// Numeric cells render in canonical trimmed form so that a file whose key
/// column inferred numeric and a file where the same column stayed text
/// still align on equal digits (`1`, `1.0` and `01` all become `1`).
/// Numeric-ness of the key affects display only, never join correctness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValue(String);

impl KeyValue {
    /// Canonical key for a cell; `None` for absent cells.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(KeyValue(canonical_number(*n))),
            Value::Text(s) => {
                // Digit-bearing text canonicalizes like a number so it can
                // match a numerically-typed key column in another file.
                match parse_number(s) {
                    Some(n) => Some(KeyValue(canonical_number(n))),
                    None => Some(KeyValue(s.clone())),
                }
            }
            Value::Absent => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
