//! REST API types for frontend integration.
//!
//! JSON payloads are camelCase on the wire. The comparison summary keeps
//! the aggregate statistics and drops the raw difference sequences, which
//! only the spreadsheet report needs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{FileIssue, Warning};
use crate::report::{ReportModel, RunStatus};

/// Response after a multipart CSV upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// "success", "partial_success" or "failed"
    pub status: String,

    /// Names the files were stored under.
    pub uploaded_files: Vec<String>,

    /// Per-file upload problems.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<FileIssue>,
}

/// Body of a processing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// Previously uploaded files, first one is the reference dataset.
    pub file_names: Vec<String>,
    /// Column used to align rows.
    pub operation_column: String,
    /// Highlight threshold.
    pub threshold_value: f64,
}

/// Aggregate statistics for one column comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub compared_column: String,
    pub reference_file: String,
    pub other_file: String,
    pub rows_compared: usize,
    pub mean_difference: f64,
    pub std_difference: f64,
    pub min_difference: f64,
    pub max_difference: f64,
}

/// Shape of one processed file as seen by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub filename: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub highlighted_rows: usize,
}

/// Full processing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// Unique job identifier
    pub job_id: String,

    pub status: RunStatus,

    pub message: String,

    /// Per-file shapes, in upload order (parse failures excluded).
    pub files: Vec<FileSummary>,

    pub comparison_summary: Vec<ComparisonSummary>,

    /// Name of the generated XLSX report, if one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excel_report_filename: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<Warning>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<FileIssue>,

    pub operation_column: String,

    pub threshold_value: f64,
}

impl ProcessResponse {
    /// Flatten a report model into the wire format.
    pub fn from_report(report: &ReportModel, excel_report_filename: Option<String>) -> Self {
        let files = report
            .sheets
            .iter()
            .map(|sheet| FileSummary {
                filename: sheet.dataset.name.clone(),
                rows: sheet.dataset.row_count(),
                columns: sheet.dataset.columns.clone(),
                highlighted_rows: sheet.highlighted_rows.len(),
            })
            .collect();

        let comparison_summary = report
            .comparisons
            .iter()
            .map(|c| ComparisonSummary {
                compared_column: c.compared_column.clone(),
                reference_file: c.reference_file.clone(),
                other_file: c.other_file.clone(),
                rows_compared: c.rows_compared,
                mean_difference: c.mean,
                std_difference: c.std,
                min_difference: c.min,
                max_difference: c.max,
            })
            .collect();

        let message = match report.status {
            RunStatus::Success => "Processing pipeline completed".to_string(),
            RunStatus::PartialSuccessWithIssues => {
                "Processing pipeline completed with issues".to_string()
            }
            RunStatus::Failed => "No dataset could be validated for comparison".to_string(),
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: report.status,
            message,
            files,
            comparison_summary,
            excel_report_filename,
            warnings: report.warnings.clone(),
            errors: report.errors.clone(),
            operation_column: report.summary.operation_column.clone(),
            threshold_value: report.summary.threshold,
        }
    }
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
