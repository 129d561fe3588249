//! Operation-column validation.
//!
//! Confirms, per dataset, that the operation column can serve as an
//! alignment key. A missing column or absent key cells are fatal for that
//! file only; a non-numeric or duplicated key degrades to a warning and
//! alignment proceeds on raw equality.

use crate::dataset::{ColumnType, Dataset};
use crate::error::{ValidationError, ValidationResult, Warning};

use super::align::KeyIndex;

/// Outcome of validating one dataset's operation column.
#[derive(Debug, Clone)]
pub struct KeyValidation {
    /// First-occurrence key index, ready for alignment.
    pub index: KeyIndex,
    /// Non-fatal findings (non-numeric key, duplicates, nothing to compare).
    pub warnings: Vec<Warning>,
}

/// Validate the operation column of one dataset and build its key index.
pub fn validate_key(dataset: &Dataset, key: &str) -> ValidationResult<KeyValidation> {
    let column = dataset
        .column_index(key)
        .ok_or_else(|| ValidationError::MissingKeyColumn {
            file: dataset.name.clone(),
            column: key.to_string(),
        })?;

    let absent = dataset
        .rows
        .iter()
        .filter(|row| row[column].is_absent())
        .count();
    if absent > 0 {
        return Err(ValidationError::AbsentKeyValues {
            file: dataset.name.clone(),
            column: key.to_string(),
            count: absent,
        });
    }

    let mut warnings = Vec::new();

    if dataset.types[column] != ColumnType::Numeric {
        warnings.push(Warning::NonNumericKey {
            file: dataset.name.clone(),
            column: key.to_string(),
        });
    }

    let index = KeyIndex::build(dataset, column);
    if index.discarded_rows() > 0 {
        warnings.push(Warning::DuplicateKeys {
            file: dataset.name.clone(),
            column: key.to_string(),
            keys: index.duplicate_sample(),
            discarded_rows: index.discarded_rows(),
        });
    }

    if dataset.comparable_columns(key).is_empty() {
        warnings.push(Warning::NoComparableColumns {
            file: dataset.name.clone(),
        });
    }

    Ok(KeyValidation { index, warnings })
}
