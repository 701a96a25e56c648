//! Render fragments as chemical formulas.
//!
//! Elements within a formula are ordered by symbol and a count of one is left out, so water is
//! `H2O` and a lone oxygen atom is `O`. Fragments are joined with [`SEPARATOR`] in the order
//! given by [`fragments`](crate::cluster::fragments), which is by their smallest atom index.
use std::collections::BTreeMap;

use crate::cluster::{self, Fragment};
use crate::Frame;

pub const SEPARATOR: char = '+';

/// Count the elements in a fragment. `elements` holds the symbol of every atom in the frame.
pub fn composition<'e>(fragment: &Fragment, elements: &[&'e str]) -> BTreeMap<&'e str, usize> {
    let mut counts = BTreeMap::new();
    for &idx in fragment.members() {
        *counts.entry(elements[idx]).or_insert(0) += 1;
    }
    counts
}

/// Render the formula of one fragment.
///
/// # Panics
///
/// Panics if the fragment refers to an atom index beyond `elements`.
pub fn formula(fragment: &Fragment, elements: &[&str]) -> String {
    let mut out = String::new();
    for (symbol, count) in composition(fragment, elements) {
        out.push_str(symbol);
        if count > 1 {
            out.push_str(&count.to_string());
        }
    }
    out
}

/// Render all fragments, joined by [`SEPARATOR`].
pub fn join(fragments: &[Fragment], elements: &[&str]) -> String {
    let mut out = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(&formula(fragment, elements));
    }
    out
}

/// Cluster the atoms of `frame` at `threshold` and render the resulting fragments.
///
/// Returns [`None`] for a frame without atoms.
pub fn describe(frame: &Frame, threshold: f64) -> Option<String> {
    if frame.is_empty() {
        return None;
    }
    let coords: Vec<_> = frame.coords().collect();
    let elements: Vec<_> = frame.elements().collect();
    let fragments = cluster::fragments(&coords, threshold);
    log::trace!("{} atoms form {} fragment(s)", coords.len(), fragments.len());
    Some(join(&fragments, &elements))
}
