//! Pick the technique that best demonstrates sub-techniques.

use std::ops::ControlFlow;
use tour_core::model::{SubtechniqueIndex, Technique};

/// Choose one technique to feature as the drill-down example.
///
/// Scans in input order. The first technique with more than `early_exit`
/// sub-techniques wins immediately; otherwise the technique with the strictly
/// highest count seen wins, so ties keep the earliest. Techniques without a
/// registered sub-technique group are skipped. Returns `None` when no technique
/// has any sub-technique.
pub fn choose_technique<'a, I>(
    techniques: I,
    index: &SubtechniqueIndex,
    early_exit: usize,
) -> Option<&'a Technique>
where
    I: IntoIterator<Item = &'a Technique>,
{
    let scan = techniques.into_iter().try_fold(
        (0usize, None::<&'a Technique>),
        |(best_count, best), technique| {
            let Some(group) = index.get(&technique.stix_id) else {
                return ControlFlow::Continue((best_count, best));
            };
            let count = group.len();
            if count > early_exit {
                ControlFlow::Break(technique)
            } else if count > best_count {
                ControlFlow::Continue((count, Some(technique)))
            } else {
                ControlFlow::Continue((best_count, best))
            }
        },
    );

    match scan {
        ControlFlow::Break(technique) => Some(technique),
        ControlFlow::Continue((_, best)) => best,
    }
}
