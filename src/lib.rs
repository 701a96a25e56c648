//! Watch a batch of molecular dynamics runs for fragmentation.
//!
//! The heart of this crate takes the last frame of an xyz trajectory, partitions its atoms into
//! connected fragments ([`cluster`]), names those fragments by formula ([`formula`]) and decides
//! whether the system has come apart ([`classify`]). The [`status`] and [`run`] modules combine
//! that with a few signals from outside the trajectory into one [`RunStatus`] per run.
use std::io::{self, BufRead, BufReader, Seek};
use std::path::Path;

use glam::DVec3;

use crate::reader::{parse_atom, parse_atom_count, parse_atoms, parse_iteration, HEADER_LINE};
pub use crate::config::{Settings, Thresholds};
pub use crate::error::{Error, Result};
pub use crate::selection::{FrameSelection, Range};
pub use crate::status::{Completion, RunStatus, SimulatedTime};

pub mod classify;
pub mod cluster;
pub mod config;
pub mod contacts;
mod error;
pub mod formula;
pub mod monitor;
pub mod reader;
pub mod run;
pub mod selection;
pub mod signals;
pub mod status;

/// Upper bound on the atoms reserved up front from a frame's count line.
const MAX_RESERVED_ATOMS: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: String,
    /// Position in ångström.
    pub position: DVec3,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: impl Into<DVec3>) -> Self {
        Self {
            element: element.into(),
            position: position.into(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Frame {
    /// The simulation step taken from the frame header, if it carries one.
    pub iteration: Option<u64>,
    pub atoms: Vec<Atom>,
}

impl Frame {
    pub fn new(iteration: Option<u64>, atoms: Vec<Atom>) -> Self {
        Self { iteration, atoms }
    }

    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.atoms.iter().map(|atom| atom.position)
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> + '_ {
        self.atoms.iter().map(|atom| atom.element.as_str())
    }
}

/// What could be found at the end of a trajectory file.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// There is no trajectory file (yet).
    Missing,
    /// The trajectory is empty, or its frames hold no atoms.
    Empty,
    Frame(Frame),
}

/// Extract the most recent frame from the xyz trajectory at `path`.
///
/// Only the first line and the final frame block are read, so this stays cheap for long
/// trajectories. A file that does not exist is reported as [`Snapshot::Missing`] rather than as
/// an error.
pub fn last_frame(path: impl AsRef<Path>) -> Result<Snapshot> {
    let mut reader = match XYZReader::open(&path) {
        Ok(reader) => reader,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::Missing),
        Err(err) => Err(err)?,
    };
    Ok(match reader.read_last_frame()? {
        Some(frame) => Snapshot::Frame(frame),
        None => Snapshot::Empty,
    })
}

#[derive(Debug)]
pub struct XYZReader<R> {
    pub file: R,
    step: usize,
    /// Line buffer that is reused between reads.
    scratch: String,
}

impl XYZReader<BufReader<std::fs::File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> XYZReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            file: reader,
            step: 0,
            scratch: String::new(),
        }
    }

    /// The index of the frame that will be read next.
    pub fn step(&self) -> usize {
        self.step
    }

    /// A convenience function to read all frames in a trajectory.
    ///
    /// It is likely more efficient to use [`XYZReader::read_frame`] if you are only interested in
    /// the values of a single frame at a time.
    pub fn read_all_frames(&mut self) -> Result<Box<[Frame]>> {
        let mut frames = Vec::new();
        loop {
            let mut frame = Frame::default();
            if !self.read_frame(&mut frame)? {
                break;
            }
            frames.push(frame);
        }
        Ok(frames.into_boxed_slice())
    }

    /// Reads the next [`Frame`] into `frame` and advances one step.
    ///
    /// Returns `false` once the end of the trajectory has been reached, in which case `frame` is
    /// left untouched. Blank lines between frames are skipped.
    pub fn read_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        let Some(natoms) = self.read_frame_header(frame)? else {
            return Ok(false);
        };

        frame.atoms.clear();
        // The count is untrusted until that many atom lines have actually been read.
        frame.atoms.reserve(natoms.min(MAX_RESERVED_ATOMS));
        for line_no in HEADER_LINE + 1..=natoms.saturating_add(HEADER_LINE) {
            self.expect_line(line_no, natoms)?;
            frame.atoms.push(parse_atom(line_no, self.scratch.trim_end())?);
        }

        self.step += 1;
        Ok(true)
    }

    /// Skips over the next frame without parsing its atoms, and advances one step.
    ///
    /// Returns `false` once the end of the trajectory has been reached.
    pub fn skip_frame(&mut self) -> Result<bool> {
        let mut header = Frame::default();
        let Some(natoms) = self.read_frame_header(&mut header)? else {
            return Ok(false);
        };
        for line_no in HEADER_LINE + 1..=natoms.saturating_add(HEADER_LINE) {
            self.expect_line(line_no, natoms)?;
        }

        self.step += 1;
        Ok(true)
    }

    /// Append `(index, frame)` pairs to `frames` according to a [`FrameSelection`].
    ///
    /// If successful, it will return the number of frames that were read.
    /// This can be useful since the selection itself is not enough to tell how many frames will
    /// actually be read.
    pub fn read_frames(
        &mut self,
        frames: &mut impl Extend<(usize, Frame)>,
        frame_selection: &FrameSelection,
    ) -> Result<usize> {
        let mut n = 0;
        loop {
            let idx = self.step;
            match frame_selection.is_included(idx) {
                Some(true) => {
                    let mut frame = Frame::default();
                    if !self.read_frame(&mut frame)? {
                        break;
                    }
                    frames.extend(Some((idx, frame)));
                    n += 1;
                }
                Some(false) => {
                    if !self.skip_frame()? {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(n)
    }

    /// Reads the count and header lines, storing the iteration in `frame`.
    ///
    /// Returns the atom count, or [`None`] at the end of the trajectory.
    fn read_frame_header(&mut self, frame: &mut Frame) -> Result<Option<usize>> {
        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if !self.scratch.trim().is_empty() {
                break;
            }
        }
        let natoms = parse_atom_count(self.scratch.trim_end())?;

        if !self.read_line()? {
            return Err(Error::parse(HEADER_LINE, "", "frame ended before its header"));
        }
        frame.iteration = parse_iteration(&self.scratch);
        Ok(Some(natoms))
    }

    fn expect_line(&mut self, line_no: usize, natoms: usize) -> Result<()> {
        if self.read_line()? {
            return Ok(());
        }
        let read = line_no - HEADER_LINE - 1;
        Err(Error::parse(
            line_no,
            "",
            format!("frame ended after {read} of {natoms} atoms"),
        ))
    }

    fn read_line(&mut self) -> io::Result<bool> {
        self.scratch.clear();
        Ok(self.file.read_line(&mut self.scratch)? > 0)
    }
}

impl<R: BufRead + Seek> XYZReader<R> {
    /// Return to the start of the trajectory.
    pub fn home(&mut self) -> io::Result<()> {
        self.file.rewind()?;
        self.step = 0;
        Ok(())
    }

    /// Reads the final frame of the trajectory without parsing the frames before it.
    ///
    /// The atom count on the first line determines the size of every frame block. The final
    /// block is then read from the end of the file, and it must start with that same count.
    /// Returns [`None`] if the trajectory is empty or its atom count is below one.
    ///
    /// The reader is returned [home](Self::home) afterwards.
    pub fn read_last_frame(&mut self) -> Result<Option<Frame>> {
        self.home()?;
        let frame = self.read_tail_frame();
        self.home()?;
        frame
    }

    fn read_tail_frame(&mut self) -> Result<Option<Frame>> {
        let natoms = match self.first_line()? {
            line if line.trim().is_empty() => 0,
            line => parse_atom_count(line.trim_end())?,
        };
        if natoms == 0 {
            return Ok(None);
        }

        let block_len = natoms.saturating_add(HEADER_LINE);
        let lines = reader::tail_lines(&mut self.file, block_len)?;
        log::trace!("read {} trailing lines for {natoms} atoms", lines.len());

        if lines.len() < block_len {
            return Err(Error::parse(
                lines.len() + 1,
                "",
                format!(
                    "truncated frame: expected {block_len} lines, found {}",
                    lines.len()
                ),
            ));
        }
        let count = parse_atom_count(&lines[0])?;
        if count != natoms {
            return Err(Error::parse(
                reader::COUNT_LINE,
                lines[0].as_str(),
                format!("expected the atom count {natoms}, the final frame is incomplete or misaligned"),
            ));
        }
        let iteration = parse_iteration(&lines[1]);
        let atoms = parse_atoms(lines[HEADER_LINE..].iter().map(String::as_str), HEADER_LINE + 1)?;

        Ok(Some(Frame { iteration, atoms }))
    }

    /// Reads up to the first line that is not blank. At the end of the stream, the returned
    /// line is empty.
    fn first_line(&mut self) -> io::Result<&str> {
        loop {
            if !self.read_line()? || !self.scratch.trim().is_empty() {
                return Ok(&self.scratch);
            }
        }
    }
}
