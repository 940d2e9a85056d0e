//! Derive the {matrix, technique, sub-technique} steps for a single matrix.

use crate::TourOptions;
use crate::chooser::choose_technique;
use tour_core::model::{EntityAccessor, Matrix, Tour, top_level, with_subtechniques};
use tour_core::paths;

/// Build the tour of one matrix.
///
/// Returns [`Tour::empty`] when the matrix has no technique with sub-techniques,
/// or when no step path can be derived for the chosen technique.
pub fn build_tour<A>(matrix: &Matrix, accessor: &A, options: &TourOptions) -> Tour
where
    A: EntityAccessor + ?Sized,
{
    let techniques = accessor.techniques(matrix);
    let index = accessor.subtechnique_index();

    let top_level_techniques = top_level(techniques);
    let techniques_with_subtechniques = with_subtechniques(techniques, index);

    if techniques_with_subtechniques.is_empty() {
        tracing::debug!("{}: no technique has sub-techniques", matrix.id);
        return Tour::empty();
    }

    let matrix_step = paths::matrix_path(matrix);

    // The chooser sees every top-level technique, not only those with children.
    let Some(technique) = choose_technique(top_level_techniques, index, options.early_exit)
    else {
        tracing::debug!(
            "{}: no top-level technique has sub-techniques",
            matrix.id
        );
        return Tour::empty();
    };

    let Some(attack_id) = technique.attack_id.as_deref() else {
        tracing::debug!("{}: {} has no ATT&CK ID", matrix.id, technique.stix_id);
        return Tour::empty();
    };

    let Some(first) = index.first(technique) else {
        tracing::debug!(
            "{}: {} has no registered sub-technique",
            matrix.id,
            attack_id
        );
        return Tour::empty();
    };

    let Some(suffix) = first
        .technique
        .attack_id
        .as_deref()
        .and_then(paths::subtechnique_suffix)
    else {
        tracing::debug!(
            "{}: first sub-technique {} of {} has no ID suffix",
            matrix.id,
            first.technique.stix_id,
            attack_id
        );
        return Tour::empty();
    };

    let technique_step = paths::technique_path(attack_id);
    let subtechnique_step = paths::subtechnique_path(&technique_step, suffix);

    Tour::new(matrix_step, technique_step, subtechnique_step)
}
