#![forbid(unsafe_code)]

use crate::codec::read_mutation_set;
use crate::error::CodecErrors;
use mom_core::equivalence::{ComparisonPolicy, compare_with};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("failed to read expected mutations: {0}")]
    Expected(CodecErrors),
    #[error("failed to read actual mutations: {0}")]
    Actual(CodecErrors),
}

/// Reads both trees and compares them. Differences are returned in report
/// order; an empty list means the trees are equivalent.
pub fn compare_directories(
    expected_root: &Path,
    actual_root: &Path,
    policy: &dyn ComparisonPolicy,
) -> Result<Vec<String>, CompareError> {
    let actual = read_mutation_set(actual_root).map_err(CompareError::Actual)?;
    let expected = read_mutation_set(expected_root).map_err(CompareError::Expected)?;
    let differences = compare_with(&expected, &actual, policy);
    tracing::debug!(
        expected = %expected_root.display(),
        actual = %actual_root.display(),
        differences = differences.len(),
        "compared mutation directories"
    );
    Ok(differences)
}
