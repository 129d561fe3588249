//! Row alignment between a reference dataset and one other dataset.
//!
//! Alignment is an equality join on the operation column. Each dataset gets
//! a first-occurrence key index; pairs come out in the reference dataset's
//! row order, an invariant consumed by the report and the spreadsheet
//! writer downstream.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, KeyValue};
use crate::error::Warning;

/// Keys quoted verbatim in alignment warnings before truncating to counts.
const KEY_SAMPLE_LIMIT: usize = 5;

// =============================================================================
// Key Index
// =============================================================================

/// First-occurrence mapping from key value to row index for one dataset.
///
/// Duplicate keys keep the earliest row in file order; later occurrences
/// are recorded so the validator can surface them. A deliberate tie-break,
/// not an error.
#[derive(Debug, Clone)]
pub struct KeyIndex {
    map: HashMap<KeyValue, usize>,
    /// First-occurrence keys in original row order.
    keys_in_order: Vec<KeyValue>,
    /// Distinct duplicated keys, in order of first duplication.
    duplicate_keys: Vec<KeyValue>,
    /// Rows discarded by the first-occurrence tie-break.
    discarded_rows: usize,
}

impl KeyIndex {
    /// Build the index over the given key column position.
    ///
    /// Rows with an absent key are skipped; the validator rejects datasets
    /// containing them before alignment.
    pub fn build(dataset: &Dataset, key_column: usize) -> Self {
        let mut map = HashMap::new();
        let mut keys_in_order = Vec::new();
        let mut duplicate_keys: Vec<KeyValue> = Vec::new();
        let mut discarded_rows = 0;

        for (row_idx, row) in dataset.rows.iter().enumerate() {
            let Some(key) = KeyValue::from_value(&row[key_column]) else {
                continue;
            };
            match map.entry(key.clone()) {
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(row_idx);
                    keys_in_order.push(key);
                }
                std::collections::hash_map::Entry::Occupied(_) => {
                    discarded_rows += 1;
                    if !duplicate_keys.contains(&key) {
                        duplicate_keys.push(key);
                    }
                }
            }
        }

        Self {
            map,
            keys_in_order,
            duplicate_keys,
            discarded_rows,
        }
    }

    /// Row index holding the first occurrence of `key`.
    pub fn row_of(&self, key: &KeyValue) -> Option<usize> {
        self.map.get(key).copied()
    }

    pub fn contains(&self, key: &KeyValue) -> bool {
        self.map.contains_key(key)
    }

    /// First-occurrence keys in original row order.
    pub fn keys(&self) -> &[KeyValue] {
        &self.keys_in_order
    }

    pub fn len(&self) -> usize {
        self.keys_in_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_in_order.is_empty()
    }

    pub fn discarded_rows(&self) -> usize {
        self.discarded_rows
    }

    /// Bounded sample of duplicated keys for warning messages.
    pub fn duplicate_sample(&self) -> Vec<String> {
        self.duplicate_keys
            .iter()
            .take(KEY_SAMPLE_LIMIT)
            .map(|k| k.to_string())
            .collect()
    }
}

// =============================================================================
// Aligned Pairs
// =============================================================================

/// One aligned (reference row, other row) pair sharing an equal key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub key: KeyValue,
    pub reference_row: usize,
    pub other_row: usize,
}

/// Alignment result for one (reference, other) dataset pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedPairSet {
    pub reference_file: String,
    pub other_file: String,
    /// Pairs in the reference dataset's row order.
    pub pairs: Vec<AlignedPair>,
    /// Keys only in the reference dataset, in its row order.
    pub unmatched_reference_keys: Vec<KeyValue>,
    /// Keys only in the other dataset, in its row order.
    pub unmatched_other_keys: Vec<KeyValue>,
}

/// Align two datasets on their prebuilt key indexes.
///
/// Unmatched keys on either side are not errors; they surface as warnings
/// summarizing counts with a bounded sample.
pub fn align(
    reference: &Dataset,
    reference_index: &KeyIndex,
    other: &Dataset,
    other_index: &KeyIndex,
) -> (AlignedPairSet, Vec<Warning>) {
    let mut pairs = Vec::new();
    let mut unmatched_reference_keys = Vec::new();

    for key in reference_index.keys() {
        match (reference_index.row_of(key), other_index.row_of(key)) {
            (Some(reference_row), Some(other_row)) => pairs.push(AlignedPair {
                key: key.clone(),
                reference_row,
                other_row,
            }),
            _ => unmatched_reference_keys.push(key.clone()),
        }
    }

    let unmatched_other_keys: Vec<KeyValue> = other_index
        .keys()
        .iter()
        .filter(|key| !reference_index.contains(key))
        .cloned()
        .collect();

    let mut warnings = Vec::new();
    if !unmatched_reference_keys.is_empty() {
        warnings.push(Warning::UnmatchedReferenceKeys {
            reference_file: reference.name.clone(),
            other_file: other.name.clone(),
            count: unmatched_reference_keys.len(),
            sample: key_sample(&unmatched_reference_keys),
        });
    }
    if !unmatched_other_keys.is_empty() {
        warnings.push(Warning::UnmatchedOtherKeys {
            reference_file: reference.name.clone(),
            other_file: other.name.clone(),
            count: unmatched_other_keys.len(),
            sample: key_sample(&unmatched_other_keys),
        });
    }
    if pairs.is_empty() {
        warnings.push(Warning::NoAlignedRows {
            reference_file: reference.name.clone(),
            other_file: other.name.clone(),
        });
    }

    let aligned = AlignedPairSet {
        reference_file: reference.name.clone(),
        other_file: other.name.clone(),
        pairs,
        unmatched_reference_keys,
        unmatched_other_keys,
    };
    (aligned, warnings)
}

fn key_sample(keys: &[KeyValue]) -> Vec<String> {
    keys.iter()
        .take(KEY_SAMPLE_LIMIT)
        .map(|k| k.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize_bytes;

    fn dataset(name: &str, csv: &[u8]) -> Dataset {
        normalize_bytes(name, csv).unwrap().dataset
    }

    fn index(ds: &Dataset, key: &str) -> KeyIndex {
        KeyIndex::build(ds, ds.column_index(key).unwrap())
    }

    #[test]
    fn test_alignment_completeness_and_order() {
        let a = dataset("a.csv", b"ID,v\n3,1\n1,2\n2,3");
        let b = dataset("b.csv", b"ID,v\n1,9\n3,8\n4,7");
        let (aligned, _) = align(&a, &index(&a, "ID"), &b, &index(&b, "ID"));

        // Pairs follow reference row order, each common key exactly once.
        let keys: Vec<String> = aligned.pairs.iter().map(|p| p.key.to_string()).collect();
        assert_eq!(keys, vec!["3", "1"]);
        assert_eq!(aligned.pairs[0].reference_row, 0);
        assert_eq!(aligned.pairs[0].other_row, 1);
    }

    #[test]
    fn test_unmatched_keys_on_both_sides() {
        let a = dataset("a.csv", b"ID,v\n1,1\n2,2\n3,3");
        let b = dataset("b.csv", b"ID,v\n2,9\n5,8");
        let (aligned, warnings) = align(&a, &index(&a, "ID"), &b, &index(&b, "ID"));

        let reference_only: Vec<String> = aligned
            .unmatched_reference_keys
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(reference_only, vec!["1", "3"]);
        let other_only: Vec<String> = aligned
            .unmatched_other_keys
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(other_only, vec!["5"]);

        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::UnmatchedReferenceKeys { count: 2, .. })));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::UnmatchedOtherKeys { count: 1, .. })));
    }

    #[test]
    fn test_duplicate_keys_keep_first_occurrence() {
        let a = dataset("a.csv", b"ID,v\nX,1\nX,2\nY,3");
        let idx = index(&a, "ID");

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.discarded_rows(), 1);
        assert_eq!(idx.duplicate_sample(), vec!["X"]);
        // First row in file order wins.
        let x = KeyValue::from_value(&crate::dataset::Value::Text("X".into())).unwrap();
        assert_eq!(idx.row_of(&x), Some(0));
    }

    #[test]
    fn test_zero_alignment_warns() {
        let a = dataset("a.csv", b"ID,v\n1,1");
        let b = dataset("b.csv", b"ID,v\n2,2");
        let (aligned, warnings) = align(&a, &index(&a, "ID"), &b, &index(&b, "ID"));

        assert!(aligned.pairs.is_empty());
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::NoAlignedRows { .. })));
    }

    #[test]
    fn test_numeric_and_text_keys_align() {
        // Key column numeric in one file, text in the other (trailing label).
        let a = dataset("a.csv", b"ID,v\n1,10\n2,20");
        let b = dataset("b.csv", b"ID,v\n1,11\nx,12");
        let (aligned, _) = align(&a, &index(&a, "ID"), &b, &index(&b, "ID"));

        assert_eq!(aligned.pairs.len(), 1);
        assert_eq!(aligned.pairs[0].key.to_string(), "1");
    }
}
