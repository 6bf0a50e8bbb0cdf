//! Nearest-neighbor alignment score.
//!
//! For a query `q` and a catalogued spectrum `S`:
//!
//! ```text
//! score(q, S) = Σ_i  min_j |q_i - S_j|
//! ```
//!
//! Lower is better; 0 means every query shift lands exactly on a catalogued
//! shift. A catalogued shift may be the nearest neighbor of several query
//! shifts. Shifts in `S` that no query shift lands near cost nothing.

use crate::core::spectrum::ShiftSet;

/// Distance from `target` to the closest value of the ascending slice `shifts`
///
/// Returns `None` when `shifts` is empty.
#[must_use]
pub fn nearest_distance(shifts: &[f64], target: f64) -> Option<f64> {
    let upper = shifts.partition_point(|&s| s < target);
    let above = shifts.get(upper).map(|&s| s - target);
    let below = upper.checked_sub(1).map(|i| target - shifts[i]);
    match (below, above) {
        (Some(b), Some(a)) => Some(b.min(a)),
        (b, a) => b.or(a),
    }
}

/// Alignment score of `query` against one spectrum; 0 for an empty query
#[must_use]
pub fn alignment_score(query: &[f64], shifts: &ShiftSet) -> f64 {
    query
        .iter()
        .map(|&q| nearest_distance(shifts.as_slice(), q).unwrap_or(f64::INFINITY))
        .sum()
}
