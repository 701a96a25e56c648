use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A line of a frame block could not be parsed.
    ///
    /// The `line` is 1-based and counts from the start of the frame block, such that the atom
    /// count line is line 1 and the header is line 2.
    #[error("malformed line {line} of frame: {details} ({text:?})")]
    Parse {
        line: usize,
        text: String,
        details: String,
    },

    /// Frames of one trajectory that do not hold the same number of atoms.
    #[error("frame {frame} holds {found} atoms, the first frame holds {expected}")]
    AtomCount {
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn parse(line: usize, text: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Parse {
            line,
            text: text.into(),
            details: details.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
