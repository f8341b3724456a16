//! Error types for TA image validation and extraction.

use std::fmt;
use std::io;
use std::str;

/// Result type for TA extraction operations.
pub type TaResult<T> = std::result::Result<T, TaError>;

/// The artifact an extraction error relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// One of the ten rotating boot logs, numbered 1..=10 as on the device.
    Bootlog(usize),

    /// The build version string.
    BuildId,

    /// The device serial number.
    Serial,

    /// The embedded SQLite database.
    SqliteDb,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Bootlog(slot) => write!(f, "bootlog {slot}"),
            Artifact::BuildId => write!(f, "build id"),
            Artifact::Serial => write!(f, "serial number"),
            Artifact::SqliteDb => write!(f, "SQLite DB"),
        }
    }
}

/// An error produced while validating a TA image or extracting an artifact.
///
/// `SizeMismatch` and `BadMagic` are image-level: they stop a run before any
/// artifact is touched. Everything else is local to one artifact, so a
/// failing field never blocks the extraction of its siblings.
#[derive(Debug)]
pub enum TaError {
    /// The image is not the expected TA partition size.
    SizeMismatch { expected: usize, actual: usize },

    /// The image does not begin with the TA magic bytes.
    BadMagic { found: [u8; 2] },

    /// A field read would run past the end of the image.
    ShortRead {
        artifact: Artifact,
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// A text field did not decode as UTF-8.
    InvalidText {
        artifact: Artifact,
        offset: usize,
        source: str::Utf8Error,
    },

    /// The SQLite size exponent is outside the accepted range.
    InvalidSizeField {
        exponent: u16,
        offset: usize,
        min: u16,
        max: u16,
    },

    /// A persisted copy of the database is not the size its header promised.
    PayloadLengthMismatch { expected: usize, persisted: u64 },

    /// IO operation error.
    Io(io::Error),
}

impl fmt::Display for TaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaError::SizeMismatch { expected, actual } => write!(
                f,
                "TA size mismatch: expected {expected} bytes, got {actual} \
                 (is the dump corrupted?)"
            ),
            TaError::BadMagic { found } => write!(
                f,
                "TA magic mismatch: image starts with {:02x} {:02x}",
                found[0], found[1]
            ),
            TaError::ShortRead {
                artifact,
                offset,
                requested,
                available,
            } => write!(
                f,
                "{artifact}: short read at {offset:#x}: \
                 requested {requested} bytes, {available} available"
            ),
            TaError::InvalidText {
                artifact,
                offset,
                source,
            } => write!(f, "{artifact}: invalid UTF-8 at {offset:#x}: {source}"),
            TaError::InvalidSizeField {
                exponent,
                offset,
                min,
                max,
            } => write!(
                f,
                "SQLite DB size exponent {exponent} at {offset:#x} \
                 outside the sane range {min}..={max}"
            ),
            TaError::PayloadLengthMismatch {
                expected,
                persisted,
            } => write!(
                f,
                "SQLite DB size mismatched: expected {expected} bytes, \
                 persisted copy has {persisted}"
            ),
            TaError::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for TaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaError::InvalidText { source, .. } => Some(source),
            TaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TaError {
    fn from(err: io::Error) -> TaError {
        TaError::Io(err)
    }
}
