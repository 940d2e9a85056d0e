//! Configuration for tour generation.
//!
//! Load order: `.tour/config.toml` → environment variables → defaults.

use crate::model::{Matrix, MatrixKind};
use crate::storage::TOUR_STEPS_PLACEHOLDER;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default number of sub-techniques a technique must exceed to be picked without
/// scanning the rest of the matrix.
pub const DEFAULT_EARLY_EXIT: usize = 3;

/// Top-level tour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    pub site: SiteConfig,
    pub selection: SelectionConfig,
    /// Matrix registry, scanned in order.
    pub matrices: Vec<Matrix>,
}

/// Where the knowledge base is read from and where the settings fragment goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory holding one `<matrix id>.json` STIX bundle per internal matrix.
    pub stix_dir: PathBuf,
    /// Output directory of the site's JavaScript assets.
    pub javascript_path: PathBuf,
    pub settings_file: String,
    /// Fragment appended to the settings file. Must contain `${tour_steps}`.
    pub tour_template: String,
}

/// Technique selection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// A technique with more sub-techniques than this ends the scan early.
    pub early_exit_subtechniques: usize,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            selection: SelectionConfig::default(),
            matrices: default_matrices(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            stix_dir: PathBuf::from("data/stix"),
            javascript_path: PathBuf::from("site/theme/scripts"),
            settings_file: "settings.js".to_string(),
            tour_template: format!(
                "\nmodule.exports.tour_steps = {};\n",
                TOUR_STEPS_PLACEHOLDER
            ),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            early_exit_subtechniques: DEFAULT_EARLY_EXIT,
        }
    }
}

fn default_matrices() -> Vec<Matrix> {
    [
        ("enterprise-attack", "Enterprise", "enterprise"),
        ("mobile-attack", "Mobile", "mobile"),
        ("ics-attack", "ICS", "ics"),
    ]
    .into_iter()
    .map(|(id, name, path)| Matrix {
        id: id.to_string(),
        name: name.to_string(),
        path: path.to_string(),
        kind: MatrixKind::Internal,
    })
    .collect()
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl TourConfig {
    /// Load config from `.tour/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".tour").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?
        } else {
            Self::default()
        };

        env_override("TOUR_STIX_DIR", &mut config.site.stix_dir);
        env_override("TOUR_JAVASCRIPT_PATH", &mut config.site.javascript_path);
        env_override(
            "TOUR_EARLY_EXIT",
            &mut config.selection.early_exit_subtechniques,
        );

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.site.tour_template.contains(TOUR_STEPS_PLACEHOLDER) {
            anyhow::bail!(
                "tour_template must contain the {} placeholder",
                TOUR_STEPS_PLACEHOLDER
            );
        }
        let mut seen = HashSet::new();
        for matrix in &self.matrices {
            if !seen.insert(matrix.id.as_str()) {
                anyhow::bail!("duplicate matrix id in registry: {}", matrix.id);
            }
        }
        Ok(())
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(project_root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        }
    }

    pub fn internal_matrices(&self) -> impl Iterator<Item = &Matrix> {
        self.matrices.iter().filter(|m| !m.is_external())
    }
}
