//! Error types for raw record decoding
//!
//! # Design Principles (KISS)
//! - One error enum for everything the decoder can report
//! - Premature EOF and truncation are distinct from OS-level I/O failure
//! - Use thiserror for ergonomic error handling

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::RecordType;

/// Part of a record being read when a decode step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Generic 8-byte record header
    Header,
    /// Digitizer descriptor body
    DigitizerDescriptor,
    /// Fixed prefix of a settings record
    SettingsHeader,
    /// Per-channel DC offsets of a settings record
    DcOffsets,
    /// Per-channel trigger levels of a settings record
    TriggerLevels,
    /// Fixed prefix of a waveform record
    WaveformHeader,
    /// Sample array of a waveform record
    Trace,
    /// Body of a record with an unknown type tag
    UnknownBody,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Header => "record header",
            Section::DigitizerDescriptor => "digitizer descriptor",
            Section::SettingsHeader => "settings header",
            Section::DcOffsets => "DC offsets",
            Section::TriggerLevels => "trigger levels",
            Section::WaveformHeader => "waveform header",
            Section::Trace => "trace samples",
            Section::UnknownBody => "unknown record body",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the raw file decoder
#[derive(Error, Debug)]
pub enum RawFileError {
    /// The file could not be opened
    #[error("Open failed for: {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// OS-level read failure
    #[error("I/O error at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// End of stream before any byte of a mid-record section was read
    #[error("Premature end of file reading {section} at offset {offset}")]
    PrematureEof { section: Section, offset: u64 },

    /// End of stream part way through a section
    #[error("Truncated {section} at offset {offset}: expected {expected} bytes, got {actual}")]
    Truncated {
        section: Section,
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// Element count from the file exceeds the configured limit
    #[error("Implausible {field} {value} (limit {limit})")]
    ImplausibleSize {
        field: &'static str,
        value: u32,
        limit: u32,
    },

    /// Header type tag is not one of the known record types
    #[error("Unknown record type {tag} (declared size {size})")]
    UnknownRecordType { tag: u32, size: u32 },

    /// Declared record size disagrees with the bytes actually decoded
    #[error("Record size mismatch for {record_type:?}: declared {declared}, decoded {actual}")]
    SizeMismatch {
        record_type: RecordType,
        declared: u32,
        actual: usize,
    },
}

impl RawFileError {
    /// Underlying OS error code, if this error came from the OS
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            Self::Open { source, .. } | Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// True for end-of-stream inside a record (corruption signal)
    pub fn is_premature_eof(&self) -> bool {
        matches!(self, Self::PrematureEof { .. })
    }

    /// True when the error carries an I/O failure
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Io { .. })
    }
}

/// Result type alias using RawFileError
pub type RawFileResult<T> = Result<T, RawFileError>;
