//! Read STIX bundles from disk and append the tour settings fragment.

use crate::model::{KnowledgeBase, Matrix, Tour};
use crate::stix;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Placeholder in the settings template replaced by the serialized tour.
pub const TOUR_STEPS_PLACEHOLDER: &str = "${tour_steps}";

/// Errors from rendering the settings fragment.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings template is missing the ${{tour_steps}} placeholder")]
    MissingPlaceholder,
    #[error("failed to serialize tour steps: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Get the path to the STIX bundle of a matrix.
pub fn bundle_file(stix_dir: &Path, matrix_id: &str) -> PathBuf {
    stix_dir.join(format!("{}.json", matrix_id))
}

/// Load and parse one STIX bundle.
pub fn load_bundle(stix_dir: &Path, matrix_id: &str) -> Result<stix::Bundle> {
    let path = bundle_file(stix_dir, matrix_id);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read STIX bundle from {}", path.display()))?;
    stix::from_json(&json).with_context(|| format!("invalid STIX bundle {}", path.display()))
}

/// Build the knowledge base from the bundles of every internal matrix.
///
/// External matrices are skipped without touching the filesystem.
pub fn load_knowledge_base(stix_dir: &Path, matrices: &[Matrix]) -> Result<KnowledgeBase> {
    let mut kb = KnowledgeBase::new();
    for matrix in matrices.iter().filter(|m| !m.is_external()) {
        let bundle = load_bundle(stix_dir, &matrix.id)?;
        stix::ingest_bundle(&mut kb, &matrix.id, &bundle);
    }
    Ok(kb)
}

/// Substitute the serialized tour into the settings template.
pub fn render_tour_settings(template: &str, tour: &Tour) -> Result<String, SettingsError> {
    if !template.contains(TOUR_STEPS_PLACEHOLDER) {
        return Err(SettingsError::MissingPlaceholder);
    }
    let steps = serde_json::to_string(tour)?;
    Ok(template.replace(TOUR_STEPS_PLACEHOLDER, &steps))
}

/// Append the rendered tour fragment to `<javascript_dir>/<file_name>`,
/// creating the directory and file if needed. Returns the file written.
pub fn append_tour_settings(
    javascript_dir: &Path,
    file_name: &str,
    template: &str,
    tour: &Tour,
) -> Result<PathBuf> {
    let fragment = render_tour_settings(template, tour)?;

    fs::create_dir_all(javascript_dir).with_context(|| {
        format!(
            "failed to create javascript directory {}",
            javascript_dir.display()
        )
    })?;

    let path = javascript_dir.join(file_name);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(fragment.as_bytes())
        .with_context(|| format!("failed to write tour steps to {}", path.display()))?;

    Ok(path)
}
