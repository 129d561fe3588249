//! Per-column difference computation over aligned row pairs.
//!
//! A column is eligible when it is numeric in both datasets, present in
//! both, and is not the operation column. Differences are absolute values
//! of (other − reference). Absent cells exclude a row from that column's
//! sequence; they never coerce to zero.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::Warning;

use super::align::AlignedPairSet;

/// Differences and summary statistics for one column of one file pair.
///
/// Invariant: `rows_compared == differences.len()`, and statistics are
/// computed over exactly `differences` — a comparison with zero remaining
/// values is omitted upstream rather than reported with NaN statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnComparison {
    pub compared_column: String,
    pub reference_file: String,
    pub other_file: String,
    pub rows_compared: usize,
    /// One absolute difference per surviving aligned row, in pair order.
    pub differences: Vec<f64>,
    /// (reference row, other row) per difference; internal to the
    /// classifier, not part of the serialized report.
    #[serde(skip)]
    pub pair_rows: Vec<(usize, usize)>,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute a [`ColumnComparison`] per eligible column of a file pair.
pub fn compare_pair(
    reference: &Dataset,
    other: &Dataset,
    aligned: &AlignedPairSet,
    key: &str,
) -> (Vec<ColumnComparison>, Vec<Warning>) {
    let mut comparisons = Vec::new();
    let mut warnings = Vec::new();

    for column in reference.comparable_columns(key) {
        if other.column_index(column).is_none() {
            warnings.push(Warning::MissingComparableColumn {
                column: column.to_string(),
                reference_file: reference.name.clone(),
                other_file: other.name.clone(),
            });
            continue;
        }
        if !other.is_numeric(column) {
            warnings.push(Warning::TypeMismatch {
                column: column.to_string(),
                reference_file: reference.name.clone(),
                other_file: other.name.clone(),
            });
            continue;
        }

        let mut differences = Vec::with_capacity(aligned.pairs.len());
        let mut pair_rows = Vec::with_capacity(aligned.pairs.len());
        for pair in &aligned.pairs {
            let reference_value = reference
                .cell(pair.reference_row, column)
                .and_then(|v| v.as_number());
            let other_value = other.cell(pair.other_row, column).and_then(|v| v.as_number());
            if let (Some(r), Some(o)) = (reference_value, other_value) {
                differences.push((o - r).abs());
                pair_rows.push((pair.reference_row, pair.other_row));
            }
        }

        let excluded = aligned.pairs.len() - differences.len();
        if excluded > 0 {
            warnings.push(Warning::AbsentCells {
                column: column.to_string(),
                reference_file: reference.name.clone(),
                other_file: other.name.clone(),
                excluded_rows: excluded,
            });
        }
        if differences.is_empty() {
            warnings.push(Warning::EmptyComparison {
                column: column.to_string(),
                reference_file: reference.name.clone(),
                other_file: other.name.clone(),
            });
            continue;
        }

        let (mean, std, min, max) = summarize(&differences);
        comparisons.push(ColumnComparison {
            compared_column: column.to_string(),
            reference_file: reference.name.clone(),
            other_file: other.name.clone(),
            rows_compared: differences.len(),
            differences,
            pair_rows,
            mean,
            std,
            min,
            max,
        });
    }

    (comparisons, warnings)
}

/// Mean, sample standard deviation, min and max over a non-empty slice.
///
/// The n−1 divisor matches the statistics of the reports this engine
/// replaces; with a single value the deviation is 0, never NaN.
fn summarize(values: &[f64]) -> (f64, f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (mean, std, min, max)
}
