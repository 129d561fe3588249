//! XLSX rendering of a [`ReportModel`].
//!
//! Layout: a Summary sheet (run parameters, highlight counts, comparison
//! statistics), a Warnings sheet, then one sheet per input dataset in
//! original row order with flagged rows filled yellow.
//!
//! Text cells are written with `write_string`, which stores literal
//! strings; a cell value starting with `=` can never become a formula.

use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use crate::dataset::{Dataset, Value};
use crate::report::ReportModel;

/// Excel's sheet name limit.
const MAX_SHEET_NAME: usize = 31;

/// Write the workbook for a finished run.
pub fn write_report(report: &ReportModel, path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let highlight = Format::new().set_background_color(Color::Yellow);

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_summary_sheet(sheet, report, &header)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Warnings")?;
        write_warnings_sheet(sheet, report, &header)?;
    }

    let mut used_names = vec!["Summary".to_string(), "Warnings".to_string()];
    for file_sheet in &report.sheets {
        let name = unique_sheet_name(&file_sheet.dataset.name, &used_names);
        used_names.push(name.clone());

        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_dataset_sheet(
            sheet,
            &file_sheet.dataset,
            &file_sheet.highlighted_rows,
            &header,
            &highlight,
        )?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Timestamped report file name, unique per second within a directory.
pub fn report_filename(base: &str) -> String {
    format!("{}_{}.xlsx", base, Local::now().format("%Y%m%d_%H%M%S"))
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    report: &ReportModel,
    header: &Format,
) -> Result<(), XlsxError> {
    let mut row = 0;

    sheet.write_string_with_format(row, 0, "Input Files", header)?;
    sheet.write_string(row, 1, report.summary.files.join(", "))?;
    row += 1;

    sheet.write_string_with_format(row, 0, "Operation Column", header)?;
    sheet.write_string(row, 1, &report.summary.operation_column)?;
    row += 1;

    sheet.write_string_with_format(row, 0, "Threshold Value", header)?;
    sheet.write_number(row, 1, report.summary.threshold)?;
    row += 1;

    sheet.write_string_with_format(row, 0, "Status", header)?;
    sheet.write_string(row, 1, report.status.to_string())?;
    row += 1;

    sheet.write_string_with_format(row, 0, "Total Highlighted Rows per File", header)?;
    let counts: Vec<String> = report
        .sheets
        .iter()
        .map(|s| format!("{}: {}", s.dataset.name, s.highlighted_rows.len()))
        .collect();
    sheet.write_string(row, 1, counts.join("; "))?;
    row += 1;

    sheet.write_string_with_format(row, 0, "Compared Columns", header)?;
    let compared = report.compared_columns();
    if compared.is_empty() {
        sheet.write_string(row, 1, "N/A")?;
    } else {
        sheet.write_string(row, 1, compared.join(", "))?;
    }
    row += 1;

    // Comparison statistics table.
    row += 1;
    let titles = [
        "Column",
        "Reference File",
        "Other File",
        "Rows Compared",
        "Mean",
        "Std",
        "Min",
        "Max",
    ];
    for (col, title) in titles.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *title, header)?;
    }
    row += 1;

    for comparison in &report.comparisons {
        sheet.write_string(row, 0, &comparison.compared_column)?;
        sheet.write_string(row, 1, &comparison.reference_file)?;
        sheet.write_string(row, 2, &comparison.other_file)?;
        sheet.write_number(row, 3, comparison.rows_compared as f64)?;
        sheet.write_number(row, 4, comparison.mean)?;
        sheet.write_number(row, 5, comparison.std)?;
        sheet.write_number(row, 6, comparison.min)?;
        sheet.write_number(row, 7, comparison.max)?;
        row += 1;
    }

    Ok(())
}

fn write_warnings_sheet(
    sheet: &mut Worksheet,
    report: &ReportModel,
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(0, 0, "Severity", header)?;
    sheet.write_string_with_format(0, 1, "Message", header)?;

    let mut row = 1;
    for issue in &report.errors {
        sheet.write_string(row, 0, "error")?;
        sheet.write_string(row, 1, format!("{}: {}", issue.file, issue.message))?;
        row += 1;
    }
    for warning in &report.warnings {
        sheet.write_string(row, 0, "warning")?;
        sheet.write_string(row, 1, warning.to_string())?;
        row += 1;
    }
    Ok(())
}

fn write_dataset_sheet(
    sheet: &mut Worksheet,
    dataset: &Dataset,
    highlighted: &std::collections::BTreeSet<usize>,
    header: &Format,
    highlight: &Format,
) -> Result<(), XlsxError> {
    for (col, name) in dataset.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, header)?;
    }

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let flagged = highlighted.contains(&row_idx);
        let out_row = row_idx as u32 + 1;
        for (col_idx, value) in row.iter().enumerate() {
            let col = col_idx as u16;
            match (value, flagged) {
                (Value::Number(n), true) => {
                    sheet.write_number_with_format(out_row, col, *n, highlight)?;
                }
                (Value::Number(n), false) => {
                    sheet.write_number(out_row, col, *n)?;
                }
                (Value::Text(s), true) => {
                    sheet.write_string_with_format(out_row, col, s, highlight)?;
                }
                (Value::Text(s), false) => {
                    sheet.write_string(out_row, col, s)?;
                }
                (Value::Absent, true) => {
                    sheet.write_blank(out_row, col, highlight)?;
                }
                (Value::Absent, false) => {}
            }
        }
    }
    Ok(())
}

/// Sheet-safe version of a file name: non-alphanumerics become `_`, long
/// names truncate with an `_etc` marker.
fn sanitize_sheet_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if safe.chars().count() > MAX_SHEET_NAME {
        let mut truncated: String = safe.chars().take(MAX_SHEET_NAME - 4).collect();
        truncated.push_str("_etc");
        truncated
    } else {
        safe
    }
}

fn unique_sheet_name(name: &str, used: &[String]) -> String {
    let base = sanitize_sheet_name(name);
    if !used.contains(&base) {
        return base;
    }
    let mut counter = 2;
    loop {
        let suffix = format!("_{counter}");
        let mut candidate: String = base
            .chars()
            .take(MAX_SHEET_NAME - suffix.len())
            .collect();
        candidate.push_str(&suffix);
        if !used.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{run_comparison, CompareOptions, SourceFile};

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("data.csv"), "data_csv");
        assert_eq!(sanitize_sheet_name("a b/c"), "a_b_c");
        let long = "x".repeat(40);
        let sanitized = sanitize_sheet_name(&long);
        assert_eq!(sanitized.len(), MAX_SHEET_NAME);
        assert!(sanitized.ends_with("_etc"));
    }

    #[test]
    fn test_unique_sheet_name_suffixes_collisions() {
        let used = vec!["data_csv".to_string()];
        assert_eq!(unique_sheet_name("data.csv", &used), "data_csv_2");
    }

    #[test]
    fn test_report_filename_shape() {
        let name = report_filename("comparison_report");
        assert!(name.starts_with("comparison_report_"));
        assert!(name.ends_with(".xlsx"));
    }

    #[test]
    fn test_write_report_produces_workbook() {
        let sources = vec![
            SourceFile {
                name: "a.csv".into(),
                bytes: b"ID,score,note\n1,10,ok\n2,20,".to_vec(),
            },
            SourceFile {
                name: "b.csv".into(),
                bytes: b"ID,score\n1,12\n2,15".to_vec(),
            },
        ];
        let report = run_comparison(
            &sources,
            &CompareOptions {
                operation_column: "ID".into(),
                threshold: 1.5,
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        write_report(&report, &path).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);
    }
}
