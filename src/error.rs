//! Crate-wide error type.
//!
//! Every failure here is recoverable at the call site. Unstable filter
//! coefficients are not an error: the resonator silences itself instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which kind of index an [`Error::IndexOutOfRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Voice,
    Resonator,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Voice => write!(f, "voice"),
            IndexKind::Resonator => write!(f, "resonator"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameter index {0} (expected 0 = frequency, 1 = gain, 2 = decay)")]
    InvalidParameterIndex(usize),

    #[error("unknown note name '{0}'")]
    UnknownNoteName(String),

    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: IndexKind,
        index: usize,
        len: usize,
    },

    #[error("bank holds {expected} resonators, got {actual} parameter sets")]
    BankSizeMismatch { expected: usize, actual: usize },

    #[error("invalid frequency {0} Hz")]
    InvalidFrequency(f32),

    #[error("voice {voice} has no model loaded")]
    NoModel { voice: usize },

    #[error("command queue is full")]
    QueueFull,
}

impl Error {
    /// True for failures that happened while loading configuration data.
    pub fn is_config_load_failure(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Bounds-check `index` against `len`.
#[inline]
pub(crate) fn check_index(kind: IndexKind, index: usize, len: usize) -> Result<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(Error::IndexOutOfRange { kind, index, len })
    }
}
