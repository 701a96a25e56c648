//! Decide whether a system has come apart.
//!
//! This asks a different question than [`cluster`](crate::cluster): not how many fragments there
//! are, but whether any two atoms have drifted further apart than the breakup threshold. The scan
//! stops at the first such pair.
use glam::DVec3;

/// Returns the first pair `(i, j)`, `i < j`, whose distance exceeds `threshold`.
///
/// Pairs are visited in lexicographic order.
pub fn breakup_pair(coords: &[DVec3], threshold: f64) -> Option<(usize, usize)> {
    let limit2 = threshold.max(0.0).powi(2);
    coords.iter().enumerate().find_map(|(i, a)| {
        coords[i + 1..]
            .iter()
            .position(|b| a.distance_squared(*b) > limit2)
            .map(|offset| (i, i + 1 + offset))
    })
}

/// Returns whether any pair of atoms is further apart than `threshold`.
pub fn is_fragmented(coords: &[DVec3], threshold: f64) -> bool {
    breakup_pair(coords, threshold).is_some()
}
