//! Site path and ATT&CK ID formatting for tour steps.

use crate::model::Matrix;

const MATRICES_PREFIX: &str = "matrices/";
const TECHNIQUES_PREFIX: &str = "techniques/";

/// `matrices/<path>` for a registry entry.
pub fn matrix_path(matrix: &Matrix) -> String {
    format!("{}{}", MATRICES_PREFIX, matrix.path)
}

/// `techniques/<attack id>`.
pub fn technique_path(attack_id: &str) -> String {
    format!("{}{}", TECHNIQUES_PREFIX, attack_id)
}

/// Inverse of [`technique_path`].
pub fn parse_technique_path(path: &str) -> Option<&str> {
    path.strip_prefix(TECHNIQUES_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// `<technique path>/<suffix>`.
pub fn subtechnique_path(technique_path: &str, suffix: &str) -> String {
    format!("{}/{}", technique_path, suffix)
}

/// Portion of a sub-technique ID after the first `.`: "T1055.001" → "001".
pub fn subtechnique_suffix(attack_id: &str) -> Option<&str> {
    attack_id
        .split_once('.')
        .map(|(_, suffix)| suffix)
        .filter(|suffix| !suffix.is_empty())
}
