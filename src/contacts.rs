//! Find when pairs of atoms stay in contact over a trajectory.
//!
//! For every pair of atoms of two given elements, the distance is followed frame by frame, and
//! each maximal stretch of consecutive frames in which the pair is within the cutoff (inclusive)
//! is reported as an [`Interval`].
use crate::error::{Error, Result};
use crate::Frame;

/// A stretch of consecutive frames. Both ends are inclusive frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn start_fs(&self, frame_dt_fs: f64) -> f64 {
        self.start as f64 * frame_dt_fs
    }

    pub fn end_fs(&self, frame_dt_fs: f64) -> f64 {
        self.end as f64 * frame_dt_fs
    }

    pub fn duration_fs(&self, frame_dt_fs: f64) -> f64 {
        self.end_fs(frame_dt_fs) - self.start_fs(frame_dt_fs)
    }
}

/// Contact intervals of one pair of atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct PairContacts {
    pub first: usize,
    pub second: usize,
    pub intervals: Vec<Interval>,
}

/// Returns the maximal runs of consecutive positions in `distances` that are `<= cutoff` and at
/// least `min_len` long, as index pairs into `distances`.
pub fn runs_within(distances: &[f64], cutoff: f64, min_len: usize) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (idx, &r) in distances.iter().enumerate() {
        match (r <= cutoff, start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                if idx - s >= min_len {
                    runs.push((s, idx - 1));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if distances.len() - s >= min_len {
            runs.push((s, distances.len() - 1));
        }
    }
    runs
}

/// Find the contact intervals between atoms of element `first` and atoms of element `second`.
///
/// `frames` holds `(index, frame)` pairs as produced by
/// [`XYZReader::read_frames`](crate::XYZReader::read_frames); consecutive entries count as
/// consecutive frames. Elements are matched ignoring case, and taken from the first frame.
/// When both elements are the same, each pair is reported once. Pairs without any interval are
/// left out, and the rest are ordered by their atom indices.
pub fn pair_contacts(
    frames: &[(usize, Frame)],
    first: &str,
    second: &str,
    cutoff: f64,
    min_frames: usize,
) -> Result<Vec<PairContacts>> {
    let Some((_, reference)) = frames.first() else {
        return Ok(Vec::new());
    };
    let natoms = reference.natoms();
    for (idx, frame) in frames {
        if frame.natoms() != natoms {
            return Err(Error::AtomCount {
                frame: *idx,
                expected: natoms,
                found: frame.natoms(),
            });
        }
    }

    let indices_of = |element: &str| -> Vec<usize> {
        reference
            .elements()
            .enumerate()
            .filter(|(_, el)| el.eq_ignore_ascii_case(element))
            .map(|(idx, _)| idx)
            .collect()
    };
    let (firsts, seconds) = (indices_of(first), indices_of(second));
    let same_element = first.eq_ignore_ascii_case(second);

    let mut contacts = Vec::new();
    let mut distances = Vec::with_capacity(frames.len());
    for &a in &firsts {
        for &b in &seconds {
            if a == b || (same_element && b < a) {
                continue;
            }
            distances.clear();
            distances.extend(
                frames
                    .iter()
                    .map(|(_, frame)| frame.atoms[a].position.distance(frame.atoms[b].position)),
            );
            let intervals: Vec<_> = runs_within(&distances, cutoff, min_frames)
                .into_iter()
                .map(|(s, e)| Interval {
                    start: frames[s].0,
                    end: frames[e].0,
                })
                .collect();
            if !intervals.is_empty() {
                contacts.push(PairContacts {
                    first: a,
                    second: b,
                    intervals,
                });
            }
        }
    }
    log::debug!(
        "{} {first} and {} {second} atoms over {} frames: {} pair(s) in contact",
        firsts.len(),
        seconds.len(),
        frames.len(),
        contacts.len()
    );
    Ok(contacts)
}
