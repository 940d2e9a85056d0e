//! Tour step selection over the knowledge base.
//!
//! Provides the technique chooser, the per-matrix tour builder, and the
//! selector that keeps the richest tour across all matrices.

pub mod chooser;
pub mod select;
pub mod steps;

use tour_core::config::{DEFAULT_EARLY_EXIT, SelectionConfig};

/// Tuning shared by the builder and the selector.
#[derive(Debug, Clone, Copy)]
pub struct TourOptions {
    /// A technique with more sub-techniques than this is chosen without
    /// scanning further.
    pub early_exit: usize,
}

impl Default for TourOptions {
    fn default() -> Self {
        Self {
            early_exit: DEFAULT_EARLY_EXIT,
        }
    }
}

impl From<&SelectionConfig> for TourOptions {
    fn from(config: &SelectionConfig) -> Self {
        Self {
            early_exit: config.early_exit_subtechniques,
        }
    }
}
