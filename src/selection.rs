use std::num::{NonZeroU64, ParseIntError};
use std::str::FromStr;

/// A selection of [`Frame`](super::Frame)s to be read by an [`XYZReader`](super::XYZReader).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// Include all frames that are in a trajectory.
    #[default]
    All,
    /// Include frames that lie within a certain [`Range`].
    Range(Range),
    /// Include frames that match the indices in this list.
    ///
    /// Invariant: The indices in the FrameList are sorted and unique.
    FrameList(Vec<usize>),
}

impl FrameSelection {
    /// Create a [`FrameSelection::FrameList`], establishing its invariant.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<_> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self::FrameList(indices)
    }

    /// Determine whether some index `idx` is included in this [`FrameSelection`].
    ///
    /// Will return [`None`] once the index is beyond the scope of this `FrameSelection`, which
    /// means that no later index can be included either and reading may stop.
    pub fn is_included(&self, idx: usize) -> Option<bool> {
        match self {
            FrameSelection::All => Some(true),
            FrameSelection::Range(range) => range.is_included(idx as u64),
            FrameSelection::FrameList(indices) => {
                if *indices.last()? < idx {
                    None
                } else {
                    Some(indices.binary_search(&idx).is_ok())
                }
            }
        }
    }
}

impl FromStr for FrameSelection {
    type Err = ParseIntError;

    /// Parse a selection in the format `start:stop:step`, each of these values optional.
    ///
    /// - `:100` selects the first 100 frames.
    /// - `3:14` selects the frames with indices 3 up to and including 13.
    /// - `:100:2` selects every second frame from the first 100 frames, 50 in total.
    fn from_str(selection: &str) -> Result<Self, Self::Err> {
        let mut components = selection.split(':');
        let mut next = || components.next().filter(|s| !s.trim().is_empty());
        let start = next().map(|s| s.trim().parse()).transpose()?;
        let end = next().map(|s| s.trim().parse()).transpose()?;
        let step = next().map(|s| NonZeroU64::from_str(s.trim())).transpose()?;
        Ok(FrameSelection::Range(Range::new(start, end, step)))
    }
}

/// A contiguous, optionally strided, range of frame indices.
///
/// The `start` is always bounded, and is zero by default. The `end` may be bounded or unbounded.
/// When it is unbounded ([`None`]), frames are read up to and including the last frame.
/// When bounded, `end` is exclusive.
///
/// The `step` describes the number of frames that pass in each stride. Given a `step` of four,
/// one frame is read and the following three are skipped.
///
/// # Note
///
/// An instance where `start` > `end` is valid, but it selects zero frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: u64,
    pub end: Option<u64>,
    pub step: NonZeroU64,
}

impl Range {
    pub fn new(start: Option<u64>, end: Option<u64>, step: Option<NonZeroU64>) -> Self {
        let default = Self::default();
        Self {
            start: start.unwrap_or(default.start),
            end,
            step: step.unwrap_or(default.step),
        }
    }

    fn is_included(&self, idx: u64) -> Option<bool> {
        if let Some(end) = self.end {
            if end <= idx {
                return None;
            }
        }
        if idx < self.start {
            return Some(false);
        }
        Some((idx - self.start) % self.step == 0)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            step: NonZeroU64::MIN,
        }
    }
}
