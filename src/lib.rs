//! CAEN-RAW: Sequential decoder for raw CAEN digitizer record files
//!
//! A raw file is a flat sequence of self-describing records (digitizer
//! descriptors, digitizer settings snapshots and waveform captures). This
//! crate reads them in order with `RawFileReader`, and optionally
//! regroups the traces into events with `RunContents`.
//!
//! # Example
//! ```ignore
//! let mut reader = RawFileReader::open("run0042.bin")?;
//! for record in reader.records() {
//!     println!("{}", record?);
//! }
//! ```

pub mod assembler;
pub mod common;
pub mod config;
pub mod format;
pub mod reader;

pub use assembler::{AssembleError, Event, Magnitude, RunContents, SamplePoint};
pub use common::{RawFileError, RawFileResult, Section};
pub use config::{Config, DecoderConfig, SizeCheck};
pub use format::{
    DigitizerDescriptor, DigitizerSettings, DigitizerSettingsFixedHeader, RecordHeader,
    RecordType, WaveformData, WaveformFixedHeader,
};
pub use reader::{ByteSource, Decoded, RawFileReader, Record, RecordStream, StreamStats};
