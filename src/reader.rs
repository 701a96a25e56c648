//! Line-level parsing of xyz frame blocks, and reading lines from the end of a file.
//!
//! A frame block looks like this:
//!
//! ```text
//! 3
//! md step   iter = 430500   E = -76.41
//! O   0.000   0.000   0.117
//! H   0.000   0.757  -0.469
//! H   0.000  -0.757  -0.469
//! ```
use std::io::{self, Read, Seek, SeekFrom};

use glam::DVec3;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::Atom;

/// Number of bytes read per step when walking backwards through a file.
pub const BLOCK_SIZE: usize = 0x2000;

/// The line within a frame block that holds the atom count.
pub const COUNT_LINE: usize = 1;
/// The line within a frame block that holds the free-text header.
pub const HEADER_LINE: usize = 2;

lazy_static! {
    static ref ITERATION: Regex =
        Regex::new(r"iter\s*=\s*(\d+)").expect("iteration pattern must compile");
}

/// Parse the atom count line of a frame block.
///
/// Counts below one are clamped to zero, which the callers understand as "no frame".
pub fn parse_atom_count(line: &str) -> Result<usize> {
    let count: i64 = line
        .trim()
        .parse()
        .map_err(|_| Error::parse(COUNT_LINE, line, "expected an atom count"))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Scan a header line for `iter = <integer>`, whitespace around the `=` being optional.
///
/// Returns [`None`] if there is no such token, or if its value does not fit a `u64`.
pub fn parse_iteration(header: &str) -> Option<u64> {
    ITERATION
        .captures(header)
        .and_then(|captures| captures[1].parse().ok())
}

/// Parse an atom line of the form `element x y z`.
///
/// Trailing columns beyond the coordinates (velocities, charges) are ignored.
pub fn parse_atom(line_no: usize, line: &str) -> Result<Atom> {
    let mut fields = line.split_whitespace();
    let element = fields.next();
    let coords: Vec<&str> = fields.by_ref().take(3).collect();
    let (Some(element), &[x, y, z]) = (element, coords.as_slice()) else {
        let found = line.split_whitespace().count();
        return Err(Error::parse(
            line_no,
            line,
            format!("expected `element x y z`, found {found} field(s)"),
        ));
    };

    let coord = |axis: &str, value: &str| {
        value.parse::<f64>().map_err(|_| {
            Error::parse(line_no, line, format!("invalid {axis} coordinate {value:?}"))
        })
    };
    let position = DVec3::new(coord("x", x)?, coord("y", y)?, coord("z", z)?);

    Ok(Atom::new(element, position))
}

/// Parse the atom lines of a frame block. The first line in `lines` is numbered `first_line_no`.
pub fn parse_atoms<'l>(
    lines: impl IntoIterator<Item = &'l str>,
    first_line_no: usize,
) -> Result<Vec<Atom>> {
    lines
        .into_iter()
        .enumerate()
        .map(|(offset, line)| parse_atom(first_line_no + offset, line))
        .collect()
}

/// Read the last `count` lines of `reader` without reading the whole stream.
///
/// Trailing whitespace at the end of the stream is not counted as a line, so a final newline
/// (or a few blank lines) does not shift the result. If the stream holds fewer than `count`
/// lines, all of them are returned.
///
/// The reader is left at an unspecified position.
pub fn tail_lines<R: Read + Seek>(reader: &mut R, count: usize) -> io::Result<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut pos = reader.seek(SeekFrom::End(0))?;
    // Blocks in the order they were read, so the block at the end of the stream comes first.
    let mut blocks: Vec<Vec<u8>> = Vec::new();
    // Offset just past the last byte that is not whitespace.
    let mut content_end: Option<u64> = None;
    let mut newlines = 0;
    while pos > 0 && newlines < count {
        let len = u64::min(BLOCK_SIZE as u64, pos) as usize;
        pos -= len as u64;
        let mut block = vec![0u8; len];
        reader.seek(SeekFrom::Start(pos))?;
        reader.read_exact(&mut block)?;

        let content = match content_end {
            Some(_) => &block[..],
            None => match block.iter().rposition(|b| !b.is_ascii_whitespace()) {
                Some(idx) => {
                    content_end = Some(pos + idx as u64 + 1);
                    &block[..=idx]
                }
                None => &block[..0],
            },
        };
        newlines += content.iter().filter(|&&b| b == b'\n').count();
        blocks.push(block);
    }

    let Some(content_end) = content_end else {
        return Ok(Vec::new());
    };
    let mut tail: Vec<u8> = Vec::with_capacity(blocks.iter().map(Vec::len).sum());
    for block in blocks.iter().rev() {
        tail.extend_from_slice(block);
    }
    let end = (content_end - pos) as usize;
    // The last `count` lines start after the `count`th newline from the end. Bytes before that
    // may begin halfway into a character, and are never returned.
    let start = tail[..end]
        .iter()
        .enumerate()
        .rev()
        .filter(|&(_, &b)| b == b'\n')
        .nth(count - 1)
        .map_or(0, |(idx, _)| idx + 1);

    let text = std::str::from_utf8(&tail[start..end])
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(text.lines().map(str::to_string).collect())
}
