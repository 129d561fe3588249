//! Threshold-based row classification.
//!
//! A row is significant when any compared column's absolute difference for
//! one of its aligned pairs strictly exceeds the threshold. Both rows of
//! the pair are flagged, in their own dataset's highlight set. Sets
//! accumulate across every file pair of the run, so a reference row flagged
//! against any one comparison file stays flagged.

use std::collections::{BTreeMap, BTreeSet};

use super::diff::ColumnComparison;

/// Row indices flagged within one dataset. Ordered for deterministic
/// iteration all the way into the rendered report.
pub type HighlightSet = BTreeSet<usize>;

/// Fold one file pair's comparisons into the per-file highlight sets.
///
/// The comparison is strict: a difference exactly equal to the threshold is
/// never flagged. This boundary is relied upon by downstream reports.
pub fn apply_threshold(
    comparisons: &[ColumnComparison],
    threshold: f64,
    highlights: &mut BTreeMap<String, HighlightSet>,
) {
    for comparison in comparisons {
        for (difference, (reference_row, other_row)) in
            comparison.differences.iter().zip(&comparison.pair_rows)
        {
            if *difference > threshold {
                highlights
                    .entry(comparison.reference_file.clone())
                    .or_default()
                    .insert(*reference_row);
                highlights
                    .entry(comparison.other_file.clone())
                    .or_default()
                    .insert(*other_row);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(differences: Vec<f64>) -> ColumnComparison {
        let pair_rows = (0..differences.len()).map(|i| (i, i)).collect();
        ColumnComparison {
            compared_column: "score".into(),
            reference_file: "a.csv".into(),
            other_file: "b.csv".into(),
            rows_compared: differences.len(),
            differences,
            pair_rows,
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
        }
    }

    #[test]
    fn test_threshold_boundary_is_strict() {
        let mut highlights = BTreeMap::new();
        apply_threshold(&[comparison(vec![1.5])], 1.5, &mut highlights);
        assert!(highlights.is_empty());

        apply_threshold(&[comparison(vec![1.5 + 1e-9])], 1.5, &mut highlights);
        assert_eq!(highlights["a.csv"], BTreeSet::from([0]));
        assert_eq!(highlights["b.csv"], BTreeSet::from([0]));
    }

    #[test]
    fn test_both_rows_of_a_pair_are_flagged() {
        let mut c = comparison(vec![10.0]);
        c.pair_rows = vec![(3, 7)];
        let mut highlights = BTreeMap::new();
        apply_threshold(&[c], 1.0, &mut highlights);
        assert_eq!(highlights["a.csv"], BTreeSet::from([3]));
        assert_eq!(highlights["b.csv"], BTreeSet::from([7]));
    }

    #[test]
    fn test_highlights_accumulate_across_pairs() {
        let mut highlights = BTreeMap::new();
        apply_threshold(&[comparison(vec![5.0, 0.0])], 1.0, &mut highlights);

        let mut second = comparison(vec![0.0, 5.0]);
        second.other_file = "c.csv".into();
        apply_threshold(&[second], 1.0, &mut highlights);

        // Reference rows from both pairs stay flagged.
        assert_eq!(highlights["a.csv"], BTreeSet::from([0, 1]));
        assert_eq!(highlights["b.csv"], BTreeSet::from([0]));
        assert_eq!(highlights["c.csv"], BTreeSet::from([1]));
    }

    #[test]
    fn test_threshold_above_all_differences_flags_nothing() {
        let mut highlights = BTreeMap::new();
        apply_threshold(&[comparison(vec![2.0, 5.0])], 100.0, &mut highlights);
        assert!(highlights.is_empty());
    }
}
