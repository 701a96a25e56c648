//! Electron count records from a run's monitor file.
//!
//! The monitor file interleaves `INFOLINE` records with other output:
//!
//! ```text
//! INFOLINE:  3.9999900000000002E+002  9.4880000371352313E+000  -5.97E+002 ...
//! ```
//!
//! The first two numbers on such a line are the time in femtoseconds and the electron count.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::Result;

pub const RECORD_TAG: &str = "INFOLINE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub time_fs: f64,
    pub electrons: f64,
}

/// Parse one line, returning [`None`] if it is not a record or holds fewer than two numbers.
pub fn parse_record(line: &str) -> Option<Record> {
    if !line.contains(RECORD_TAG) {
        return None;
    }
    let mut numbers = line
        .split_whitespace()
        .filter_map(|token| token.parse::<f64>().ok());
    Some(Record {
        time_fs: numbers.next()?,
        electrons: numbers.next()?,
    })
}

pub fn read_records<R: BufRead>(reader: R) -> io::Result<Vec<Record>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        if let Some(record) = parse_record(&line?) {
            records.push(record);
        }
    }
    Ok(records)
}

/// The time of the first record whose electron count drops below `threshold`.
pub fn onset(records: &[Record], threshold: f64) -> Option<f64> {
    records
        .iter()
        .find(|record| record.electrons < threshold)
        .map(|record| record.time_fs)
}

/// Reads the monitor file at `path` and returns the ionization onset, if any.
///
/// A missing file has no onset.
pub fn ionization_onset(path: impl AsRef<Path>, threshold: f64) -> Result<Option<f64>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => Err(err)?,
    };
    let records = read_records(BufReader::new(file))?;
    log::debug!("read {} monitor records", records.len());
    Ok(onset(&records, threshold))
}
