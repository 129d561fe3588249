//! # Sheetdiff - CSV comparison with threshold-based highlighting
//!
//! Sheetdiff aligns rows across CSV files by a shared key column, computes
//! per-column numeric differences between the reference file and each other
//! file, and flags every row whose difference exceeds a threshold. The
//! result is a report model rendered into an XLSX workbook.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌─────────┐   ┌─────────────┐   ┌─────────┐
//! │ CSV Files │──▶│ Normalizer │──▶│ Validate│──▶│ Align/Diff/ │──▶│ Report  │
//! │ (raw)     │   │ (auto-enc) │   │ (key)   │   │ Highlight   │   │ (XLSX)  │
//! └───────────┘   └────────────┘   └─────────┘   └─────────────┘   └─────────┘
//! ```
//!
//! Each stage returns partial results plus accumulated warnings; a fatal
//! error in one file never aborts the others. The whole pipeline is a pure
//! function over its inputs, so independent runs are trivially parallel.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetdiff::{run_files, CompareOptions};
//!
//! let report = run_files(
//!     &["reference.csv", "other.csv"],
//!     &CompareOptions { operation_column: "ID".into(), threshold: 1.5 },
//! );
//! println!("{}: {} comparison(s)", report.status, report.comparisons.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error and warning types
//! - [`dataset`] - Typed tabular data model
//! - [`parser`] - CSV normalization with auto-detection
//! - [`compare`] - Validation, alignment, diffing, classification
//! - [`report`] - Report model and XLSX writer
//! - [`storage`] - Upload/report directories
//! - [`api`] - HTTP API server

// Core modules
pub mod dataset;
pub mod error;

// Parsing
pub mod parser;

// Comparison engine
pub mod compare;

// Report model and writer
pub mod report;

// Storage
pub mod storage;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{FileIssue, ParseError, ServerError, ValidationError, Warning};

// =============================================================================
// Re-exports - Data model
// =============================================================================

pub use dataset::{ColumnType, Dataset, KeyValue, Value};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{normalize_bytes, normalize_file, NormalizedFile};

// =============================================================================
// Re-exports - Comparison engine
// =============================================================================

pub use compare::{
    align, apply_threshold, compare_pair, run_comparison, run_files, validate_key, AlignedPair,
    AlignedPairSet, ColumnComparison, CompareOptions, HighlightSet, KeyIndex, KeyValidation,
    SourceFile,
};

// =============================================================================
// Re-exports - Report
// =============================================================================

pub use report::xlsx::{report_filename, write_report};
pub use report::{FileSheet, ReportModel, RunStatus, RunSummary};

// =============================================================================
// Re-exports - Storage
// =============================================================================

pub use storage::UploadStore;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{
    error_response, ComparisonSummary, FileSummary, ProcessRequest, ProcessResponse,
    UploadResponse,
};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
