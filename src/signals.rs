//! Signals about a run that live outside its trajectory.
//!
//! A missing file is the absence of a signal, never an error.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use crate::reader;

fn open_if_present(path: &Path) -> io::Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Returns the last line of the file at `path` that is not blank.
pub fn last_line(path: impl AsRef<Path>) -> Result<Option<String>> {
    let Some(mut file) = open_if_present(path.as_ref())? else {
        return Ok(None);
    };
    Ok(reader::tail_lines(&mut file, 1)?.pop())
}

/// Returns whether the last line of the log at `path` contains `marker`.
pub fn log_finished(path: impl AsRef<Path>, marker: &str) -> Result<bool> {
    let finished = last_line(&path)?.is_some_and(|line| line.contains(marker));
    log::trace!("{}: finished marker present: {finished}", path.as_ref().display());
    Ok(finished)
}

/// Looks up `key` in the configuration file at `path`. See [`find_value`].
pub fn lookup(path: impl AsRef<Path>, key: &str) -> Result<Option<String>> {
    let Some(file) = open_if_present(path.as_ref())? else {
        return Ok(None);
    };
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some(value) = entry_value(&line, key) {
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

/// Returns the value of the first entry in `text` whose key matches `key`, ignoring case.
///
/// Entries are one per line, with the key separated from the value by `=`, `:` or whitespace.
/// Lines starting with `#` or `!` are comments, and so is whatever follows those characters in
/// a value. Quotes around a value are removed.
pub fn find_value<'t>(text: &'t str, key: &str) -> Option<&'t str> {
    text.lines().find_map(|line| entry_value(line, key))
}

fn entry_value<'l>(line: &'l str, key: &str) -> Option<&'l str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(['#', '!']) {
        return None;
    }
    let (found, value) = match line.find(['=', ':']) {
        Some(idx) => (&line[..idx], &line[idx + 1..]),
        None => line.split_once(char::is_whitespace)?,
    };
    if !found.trim().eq_ignore_ascii_case(key) {
        return None;
    }
    let value = match value.find(['#', '!']) {
        Some(idx) => &value[..idx],
        None => value,
    };
    Some(value.trim().trim_matches(|c: char| c == '"' || c == '\''))
}
