//! Report model: the structure handed to the spreadsheet writer.
//!
//! Built once per processing request, consumed immediately, never
//! persisted by the engine.

pub mod xlsx;

use serde::{Deserialize, Serialize};

use crate::compare::{ColumnComparison, HighlightSet};
use crate::dataset::Dataset;
use crate::error::{FileIssue, Warning};

/// Overall outcome of a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No errors and at least one comparison produced.
    Success,
    /// Some files failed or nothing could be compared, but the run finished.
    PartialSuccessWithIssues,
    /// No dataset could be validated for comparison at all.
    Failed,
}

impl RunStatus {
    /// Derive the run status from what survived each stage.
    pub fn derive(validated: usize, has_comparisons: bool, has_errors: bool) -> Self {
        if validated == 0 {
            RunStatus::Failed
        } else if !has_errors && has_comparisons {
            RunStatus::Success
        } else {
            RunStatus::PartialSuccessWithIssues
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::PartialSuccessWithIssues => "partial_success_with_issues",
            RunStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Run parameters echoed back on the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub operation_column: String,
    pub threshold: f64,
    /// All input file names, in upload order.
    pub files: Vec<String>,
}

/// One input dataset plus its flagged rows, ready to render as a sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSheet {
    pub dataset: Dataset,
    /// Row indices to highlight, empty when nothing exceeded the threshold.
    pub highlighted_rows: HighlightSet,
}

/// The complete result of one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportModel {
    pub status: RunStatus,
    pub summary: RunSummary,
    /// One sheet per successfully parsed input, in upload order. Files that
    /// failed validation (but parsed) still appear here, unhighlighted.
    pub sheets: Vec<FileSheet>,
    pub comparisons: Vec<ColumnComparison>,
    pub warnings: Vec<Warning>,
    pub errors: Vec<FileIssue>,
}

impl ReportModel {
    /// Fold externally detected per-file errors (e.g. unreadable uploads)
    /// into the model, ahead of pipeline errors, demoting a success.
    pub fn record_file_errors(&mut self, issues: Vec<FileIssue>) {
        if issues.is_empty() {
            return;
        }
        let mut all = issues;
        all.append(&mut self.errors);
        self.errors = all;
        if self.status == RunStatus::Success {
            self.status = RunStatus::PartialSuccessWithIssues;
        }
    }

    /// Distinct compared column names, sorted.
    pub fn compared_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self
            .comparisons
            .iter()
            .map(|c| c.compared_column.as_str())
            .collect();
        columns.sort_unstable();
        columns.dedup();
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(RunStatus::derive(0, false, true), RunStatus::Failed);
        assert_eq!(RunStatus::derive(2, true, false), RunStatus::Success);
        assert_eq!(
            RunStatus::derive(2, true, true),
            RunStatus::PartialSuccessWithIssues
        );
        assert_eq!(
            RunStatus::derive(1, false, false),
            RunStatus::PartialSuccessWithIssues
        );
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(RunStatus::PartialSuccessWithIssues).unwrap();
        assert_eq!(json, "partial_success_with_issues");
    }
}
