//! Build a tour per matrix and keep the longest one.

use crate::TourOptions;
use crate::steps::build_tour;
use tour_core::model::{EntityAccessor, Matrix, Tour};

/// Tours of every internal matrix, in registry order.
///
/// External matrices are dropped before any technique lookup.
pub fn build_tours<'m, A>(
    matrices: &'m [Matrix],
    accessor: &A,
    options: &TourOptions,
) -> Vec<(&'m Matrix, Tour)>
where
    A: EntityAccessor + ?Sized,
{
    matrices
        .iter()
        .filter(|matrix| {
            if matrix.is_external() {
                tracing::debug!("{}: external matrix, skipped", matrix.id);
                return false;
            }
            true
        })
        .map(|matrix| (matrix, build_tour(matrix, accessor, options)))
        .collect()
}

/// The tour with the most populated steps. Ties keep the earliest.
pub fn longest_tour<I>(tours: I) -> Tour
where
    I: IntoIterator<Item = Tour>,
{
    tours.into_iter().fold(Tour::empty(), |longest, tour| {
        if tour.step_count() > longest.step_count() {
            tour
        } else {
            longest
        }
    })
}

/// Select the tour handed to the settings output.
pub fn select_tour<A>(matrices: &[Matrix], accessor: &A, options: &TourOptions) -> Tour
where
    A: EntityAccessor + ?Sized,
{
    let tours = build_tours(matrices, accessor, options);
    let scanned = tours.len();
    let tour = longest_tour(tours.into_iter().map(|(_, tour)| tour));

    match tour.matrix() {
        Some(matrix) => tracing::info!(
            "selected tour from {} ({} matrices scanned)",
            matrix,
            scanned
        ),
        None => tracing::info!("no tour steps found ({} matrices scanned)", scanned),
    }
    tour
}
