//! Error and warning types for the comparison pipeline.
//!
//! Two severities flow through the pipeline:
//!
//! - **Errors** are fatal to one file or file pair, never to the whole run.
//!   [`ParseError`] covers ingestion, [`ValidationError`] covers key-column
//!   checks, [`ServerError`] covers the HTTP layer.
//! - **Warnings** are informational, accumulate on the report model, and
//!   never abort processing. They are structured values ([`Warning`]), not
//!   transport-formatted strings.
//!
//! Error conversion is automatic via `From` implementations, allowing `?`
//! to work across stage boundaries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while normalizing raw bytes into a dataset.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Null bytes in the leading chunk.
    #[error("File appears to be binary (null bytes found), not parseable as CSV")]
    BinaryContent,

    /// No content at all.
    #[error("File is empty")]
    EmptyFile,

    /// No candidate delimiter produced more than one column.
    #[error("No delimiter detected")]
    NoDelimiter,

    /// Header contains the same column name twice.
    #[error("Duplicate column name: '{0}'")]
    DuplicateColumn(String),

    /// Malformed CSV content.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Fatal per-file problems with the operation (key) column.
///
/// A validation failure excludes the file from comparisons but not from the
/// report's per-file sheets; the rest of the run continues.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Operation column is not present in the dataset.
    #[error("Operation column '{column}' not found in '{file}'")]
    MissingKeyColumn { file: String, column: String },

    /// Operation column contains absent cells, making alignment ambiguous.
    #[error("Operation column '{column}' in '{file}' contains {count} absent value(s); rows cannot be aligned")]
    AbsentKeyValues {
        file: String,
        column: String,
        count: usize,
    },
}

// =============================================================================
// Warnings
// =============================================================================

/// Non-fatal findings attached to the report model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Key column inferred as text; alignment still works on raw equality.
    NonNumericKey { file: String, column: String },

    /// Duplicate key values within one file; first occurrence wins.
    DuplicateKeys {
        file: String,
        column: String,
        /// Sample of the discarded keys (bounded).
        keys: Vec<String>,
        /// Number of rows discarded by the tie-break.
        discarded_rows: usize,
    },

    /// Keys present in the reference file but not in the other file.
    UnmatchedReferenceKeys {
        reference_file: String,
        other_file: String,
        count: usize,
        sample: Vec<String>,
    },

    /// Keys present in the other file but not in the reference file.
    UnmatchedOtherKeys {
        reference_file: String,
        other_file: String,
        count: usize,
        sample: Vec<String>,
    },

    /// No key aligned between the two files; the pair is skipped.
    NoAlignedRows {
        reference_file: String,
        other_file: String,
    },

    /// Column comparable in the reference file is missing from the other file.
    MissingComparableColumn {
        column: String,
        reference_file: String,
        other_file: String,
    },

    /// Column is numeric in the reference file but text in the other file.
    TypeMismatch {
        column: String,
        reference_file: String,
        other_file: String,
    },

    /// Absent cells excluded rows from a column comparison.
    AbsentCells {
        column: String,
        reference_file: String,
        other_file: String,
        excluded_rows: usize,
    },

    /// Every aligned row was excluded; the comparison is omitted.
    EmptyComparison {
        column: String,
        reference_file: String,
        other_file: String,
    },

    /// Dataset has no numeric columns besides the key; nothing to compare.
    NoComparableColumns { file: String },

    /// Fewer than two datasets survived validation.
    NotEnoughFiles { available: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NonNumericKey { file, column } => write!(
                f,
                "Operation column '{column}' in '{file}' is not numeric; rows align on raw values"
            ),
            Warning::DuplicateKeys {
                file,
                column,
                keys,
                discarded_rows,
            } => write!(
                f,
                "'{file}' has duplicate values in '{column}' (e.g. {}); {discarded_rows} later row(s) ignored for alignment",
                keys.join(", ")
            ),
            Warning::UnmatchedReferenceKeys {
                reference_file,
                other_file,
                count,
                sample,
            } => write!(
                f,
                "{count} key(s) of '{reference_file}' not found in '{other_file}' (e.g. {})",
                sample.join(", ")
            ),
            Warning::UnmatchedOtherKeys {
                reference_file,
                other_file,
                count,
                sample,
            } => write!(
                f,
                "{count} key(s) of '{other_file}' not found in '{reference_file}' (e.g. {})",
                sample.join(", ")
            ),
            Warning::NoAlignedRows {
                reference_file,
                other_file,
            } => write!(
                f,
                "No common keys between '{reference_file}' and '{other_file}'; pair skipped"
            ),
            Warning::MissingComparableColumn {
                column,
                reference_file,
                other_file,
            } => write!(
                f,
                "Column '{column}' from '{reference_file}' has no counterpart in '{other_file}'"
            ),
            Warning::TypeMismatch {
                column,
                reference_file,
                other_file,
            } => write!(
                f,
                "Column '{column}' is numeric in '{reference_file}' but not in '{other_file}'; skipped"
            ),
            Warning::AbsentCells {
                column,
                reference_file,
                other_file,
                excluded_rows,
            } => write!(
                f,
                "Column '{column}': {excluded_rows} aligned row(s) between '{reference_file}' and '{other_file}' excluded due to absent cells"
            ),
            Warning::EmptyComparison {
                column,
                reference_file,
                other_file,
            } => write!(
                f,
                "Column '{column}': no comparable values remain between '{reference_file}' and '{other_file}'"
            ),
            Warning::NoComparableColumns { file } => write!(
                f,
                "'{file}' has no numeric columns to compare besides the operation column"
            ),
            Warning::NotEnoughFiles { available } => write!(
                f,
                "At least two readable datasets are required for comparison, got {available}"
            ),
        }
    }
}

// =============================================================================
// Report Error Entries
// =============================================================================

/// A fatal per-file issue as it appears on the report model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIssue {
    pub file: String,
    pub message: String,
}

impl FileIssue {
    pub fn parse(file: impl Into<String>, err: &ParseError) -> Self {
        Self {
            file: file.into(),
            message: err.to_string(),
        }
    }

    pub fn validation(file: impl Into<String>, err: &ValidationError) -> Self {
        Self {
            file: file.into(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error while handling uploads or reports.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for normalizer operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for key-column validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_file_and_column() {
        let err = ValidationError::MissingKeyColumn {
            file: "a.csv".into(),
            column: "ID".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.csv"));
        assert!(msg.contains("ID"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = Warning::NoAlignedRows {
            reference_file: "a.csv".into(),
            other_file: "b.csv".into(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "no_aligned_rows");
        assert_eq!(json["reference_file"], "a.csv");
    }

    #[test]
    fn test_file_issue_from_parse_error() {
        let issue = FileIssue::parse("bad.csv", &ParseError::NoDelimiter);
        assert_eq!(issue.file, "bad.csv");
        assert!(issue.message.contains("delimiter"));
    }

    #[test]
    fn test_duplicate_keys_display_names_key() {
        let warning = Warning::DuplicateKeys {
            file: "a.csv".into(),
            column: "ID".into(),
            keys: vec!["X".into()],
            discarded_rows: 1,
        };
        let msg = warning.to_string();
        assert!(msg.contains('X'));
        assert!(msg.contains("a.csv"));
    }
}
