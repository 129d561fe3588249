//! Processing pipeline: normalize, validate, align, diff, classify, report.
//!
//! The pipeline is a pure function from (file bytes + parameters) to a
//! [`ReportModel`]. Every stage returns its partial results plus its
//! accumulated warnings and errors; no file's failure aborts processing of
//! other files, and only the final assembly decides the overall status.

use std::collections::BTreeMap;
use std::path::Path;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::compare::align::{align, KeyIndex};
use crate::compare::diff::compare_pair;
use crate::compare::highlight::{apply_threshold, HighlightSet};
use crate::compare::validate::{validate_key, KeyValidation};
use crate::error::{FileIssue, ParseError, Warning};
use crate::parser::{normalize_bytes, NormalizedFile};
use crate::report::{FileSheet, ReportModel, RunStatus, RunSummary};

/// Per-run parameters.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Column used to align rows across datasets.
    pub operation_column: String,
    /// Differences strictly above this value flag the row.
    pub threshold: f64,
}

/// One input file: stable raw bytes plus the name used in the report.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Run the full comparison pipeline over in-memory sources.
///
/// The first source that parses and validates is the reference dataset;
/// every comparison is reference-vs-other.
pub fn run_comparison(sources: &[SourceFile], options: &CompareOptions) -> ReportModel {
    let mut warnings: Vec<Warning> = Vec::new();
    let mut errors: Vec<FileIssue> = Vec::new();

    // Stage 1: normalize every file.
    log_info(format!("📖 Reading {} file(s)...", sources.len()));
    let mut parsed: Vec<NormalizedFile> = Vec::new();
    for source in sources {
        match normalize_bytes(&source.name, &source.bytes) {
            Ok(file) => {
                log_success(format!(
                    "Parsed '{}': {} rows, {} columns (encoding {}, delimiter '{}')",
                    source.name,
                    file.dataset.row_count(),
                    file.dataset.columns.len(),
                    file.encoding,
                    format_delimiter(file.delimiter),
                ));
                parsed.push(file);
            }
            Err(err) => {
                log_error(format!("'{}': {}", source.name, err));
                errors.push(FileIssue::parse(&source.name, &err));
            }
        }
    }

    // Stage 2: validate the operation column per dataset.
    log_info(format!(
        "✔️  Validating operation column '{}'...",
        options.operation_column
    ));
    let mut keyed: Vec<(usize, KeyIndex)> = Vec::new();
    for (idx, file) in parsed.iter().enumerate() {
        match validate_key(&file.dataset, &options.operation_column) {
            Ok(KeyValidation {
                index,
                warnings: file_warnings,
            }) => {
                for warning in &file_warnings {
                    log_warning(warning.to_string());
                }
                warnings.extend(file_warnings);
                keyed.push((idx, index));
            }
            Err(err) => {
                log_error(err.to_string());
                errors.push(FileIssue::validation(&file.dataset.name, &err));
            }
        }
    }

    if keyed.len() < 2 {
        let warning = Warning::NotEnoughFiles {
            available: keyed.len(),
        };
        log_warning(warning.to_string());
        warnings.push(warning);
    }

    // Stages 3-5: align, diff and classify each (reference, other) pair.
    let mut comparisons = Vec::new();
    let mut highlights: BTreeMap<String, HighlightSet> = BTreeMap::new();
    if let Some(((reference_idx, reference_index), others)) = keyed.split_first() {
        let reference = &parsed[*reference_idx].dataset;
        for (other_idx, other_index) in others {
            let other = &parsed[*other_idx].dataset;
            log_info(format!(
                "🔍 Comparing '{}' vs '{}'...",
                reference.name, other.name
            ));

            let (aligned, align_warnings) = align(reference, reference_index, other, other_index);
            for warning in &align_warnings {
                log_warning(warning.to_string());
            }
            warnings.extend(align_warnings);
            if aligned.pairs.is_empty() {
                continue;
            }
            log_success(format!("{} aligned row pair(s)", aligned.pairs.len()));

            let (pair_comparisons, diff_warnings) =
                compare_pair(reference, other, &aligned, &options.operation_column);
            for warning in &diff_warnings {
                log_warning(warning.to_string());
            }
            warnings.extend(diff_warnings);
            log_success(format!("{} column comparison(s)", pair_comparisons.len()));

            apply_threshold(&pair_comparisons, options.threshold, &mut highlights);
            comparisons.extend(pair_comparisons);
        }
    }

    // Stage 6: assemble the report model.
    let status = RunStatus::derive(keyed.len(), !comparisons.is_empty(), !errors.is_empty());
    let sheets: Vec<FileSheet> = parsed
        .into_iter()
        .map(|file| {
            let highlighted_rows = highlights.remove(&file.dataset.name).unwrap_or_default();
            FileSheet {
                dataset: file.dataset,
                highlighted_rows,
            }
        })
        .collect();

    let flagged: usize = sheets.iter().map(|s| s.highlighted_rows.len()).sum();
    log_success(format!(
        "Run finished: {status}, {} comparison(s), {flagged} highlighted row(s)",
        comparisons.len()
    ));

    ReportModel {
        status,
        summary: RunSummary {
            operation_column: options.operation_column.clone(),
            threshold: options.threshold,
            files: sources.iter().map(|s| s.name.clone()).collect(),
        },
        sheets,
        comparisons,
        warnings,
        errors,
    }
}

/// Run the pipeline over files on disk.
///
/// Unreadable files become per-file errors, exactly like unparseable ones.
pub fn run_files<P: AsRef<Path>>(paths: &[P], options: &CompareOptions) -> ReportModel {
    let mut sources = Vec::new();
    let mut read_errors = Vec::new();
    let mut names = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        names.push(name.clone());
        match std::fs::read(path) {
            Ok(bytes) => sources.push(SourceFile { name, bytes }),
            Err(err) => {
                log_error(format!("'{}': {}", name, err));
                read_errors.push(FileIssue::parse(name, &ParseError::Io(err)));
            }
        }
    }

    let mut report = run_comparison(&sources, options);
    report.summary.files = names;
    report.record_file_errors(read_errors);
    report
}

fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn source(name: &str, csv: &[u8]) -> SourceFile {
        SourceFile {
            name: name.into(),
            bytes: csv.to_vec(),
        }
    }

    fn options(key: &str, threshold: f64) -> CompareOptions {
        CompareOptions {
            operation_column: key.into(),
            threshold,
        }
    }

    #[test]
    fn test_reference_scenario_end_to_end() {
        let sources = vec![
            source("a.csv", b"ID,score\n1,10\n2,20"),
            source("b.csv", b"ID,score\n1,12\n2,15"),
        ];
        let report = run_comparison(&sources, &options("ID", 1.5));

        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.comparisons.len(), 1);
        let c = &report.comparisons[0];
        assert_eq!(c.compared_column, "score");
        assert_eq!(c.rows_compared, 2);
        assert_eq!(c.differences, vec![2.0, 5.0]);
        assert_eq!(c.mean, 3.5);
        assert_eq!(c.min, 2.0);
        assert_eq!(c.max, 5.0);

        // 2 > 1.5 and 5 > 1.5: both rows flagged in both files.
        assert_eq!(report.sheets[0].highlighted_rows, BTreeSet::from([0, 1]));
        assert_eq!(report.sheets[1].highlighted_rows, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_determinism() {
        let sources = vec![
            source("a.csv", b"ID,x,y\n1,10,1\n2,20,2\n3,30,3"),
            source("b.csv", b"ID,x,y\n3,31,0\n1,12,9\n4,1,1"),
            source("c.csv", b"ID,x\n2,25\n1,10"),
        ];
        let opts = options("ID", 1.0);
        let first = serde_json::to_string(&run_comparison(&sources, &opts)).unwrap();
        let second = serde_json::to_string(&run_comparison(&sources, &opts)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unmatched_reference_key_scenario() {
        let sources = vec![
            source("a.csv", b"ID,score\n1,10\n2,20\n3,30"),
            source("b.csv", b"ID,score\n1,10\n2,20"),
        ];
        let report = run_comparison(&sources, &options("ID", 0.5));

        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::UnmatchedReferenceKeys { count: 1, .. })));
        // Row for key 3 is on its sheet, unhighlighted; no difference
        // exceeded the threshold anywhere.
        assert_eq!(report.sheets[0].dataset.row_count(), 3);
        assert!(report.sheets[0].highlighted_rows.is_empty());
        assert_eq!(report.comparisons[0].rows_compared, 2);
    }

    #[test]
    fn test_threshold_above_all_differences_is_still_success() {
        let sources = vec![
            source("a.csv", b"ID,score\n1,10\n2,20"),
            source("b.csv", b"ID,score\n1,12\n2,15"),
        ];
        let report = run_comparison(&sources, &options("ID", 100.0));

        assert_eq!(report.status, RunStatus::Success);
        assert!(report.sheets.iter().all(|s| s.highlighted_rows.is_empty()));
    }

    #[test]
    fn test_file_failures_are_isolated() {
        let sources = vec![
            source("a.csv", b"ID,score\n1,10\n2,20"),
            source("broken.csv", b"ID,score\nID2\x00,"),
            source("nokey.csv", b"foo,bar\n1,2"),
            source("b.csv", b"ID,score\n1,13\n2,20"),
        ];
        let report = run_comparison(&sources, &options("ID", 1.5));

        assert_eq!(report.status, RunStatus::PartialSuccessWithIssues);
        assert_eq!(report.errors.len(), 2);
        // The parse failure never produced a sheet; the validation failure
        // still shows its parsed data.
        assert_eq!(report.sheets.len(), 3);
        assert!(report.sheets.iter().any(|s| s.dataset.name == "nokey.csv"));
        // a-vs-b still compared: 3 > 1.5 flags the first pair only.
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.sheets[0].highlighted_rows, BTreeSet::from([0]));
    }

    #[test]
    fn test_no_validated_dataset_fails() {
        let sources = vec![
            source("a.csv", b"foo,bar\n1,2"),
            source("b.csv", b"foo,bar\n3,4"),
        ];
        let report = run_comparison(&sources, &options("ID", 1.0));

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.errors.len(), 2);
        assert!(report.comparisons.is_empty());
        // Parsed data still ships on the sheets.
        assert_eq!(report.sheets.len(), 2);
    }

    #[test]
    fn test_single_file_warns_not_enough() {
        let sources = vec![source("a.csv", b"ID,score\n1,10")];
        let report = run_comparison(&sources, &options("ID", 1.0));

        assert_eq!(report.status, RunStatus::PartialSuccessWithIssues);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::NotEnoughFiles { available: 1 })));
    }

    #[test]
    fn test_duplicate_key_uses_first_row_end_to_end() {
        let sources = vec![
            source("a.csv", b"ID,score\nX,10\nX,99\nY,20"),
            source("b.csv", b"ID,score\nX,11\nY,20"),
        ];
        let report = run_comparison(&sources, &options("ID", 0.5));

        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::DuplicateKeys { .. })));
        // First occurrence (score 10) is compared: |11-10| = 1, not |11-99|.
        assert_eq!(report.comparisons[0].differences, vec![1.0, 0.0]);
        // Only the first X row is flagged on the reference sheet.
        assert_eq!(report.sheets[0].highlighted_rows, BTreeSet::from([0]));
    }

    #[test]
    fn test_zero_aligned_pair_skips_comparison_but_continues() {
        let sources = vec![
            source("a.csv", b"ID,score\n1,10\n2,20"),
            source("b.csv", b"ID,score\n7,1"),
            source("c.csv", b"ID,score\n1,11"),
        ];
        let report = run_comparison(&sources, &options("ID", 0.5));

        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::NoAlignedRows { .. })));
        // a-vs-c still produced a comparison.
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.comparisons[0].other_file, "c.csv");
        assert_eq!(report.status, RunStatus::Success);
    }

    #[test]
    fn test_run_files_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.csv");
        std::fs::write(&good, b"ID,score\n1,10").unwrap();
        let missing = dir.path().join("nope.csv");

        let report = run_files(&[good, missing], &options("ID", 1.0));
        assert_eq!(report.summary.files, vec!["a.csv", "nope.csv"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].file, "nope.csv");
    }
}
