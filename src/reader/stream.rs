//! Record dispatch over a raw data file
//!
//! Implements the caller discipline for the four read operations: read a
//! header, dispatch on its type tag, stop at the first failure. A clean
//! end of file at a record boundary ends the iteration.

use std::io::Read;

use serde::Serialize;
use tracing::{debug, warn};

use super::RawFileReader;
use crate::common::{RawFileError, RawFileResult};
use crate::config::SizeCheck;
use crate::format::{
    DigitizerDescriptor, DigitizerSettings, RecordHeader, RecordType, WaveformData,
    RECORD_HEADER_SIZE,
};

/// One decoded record of any type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Digitizer(DigitizerDescriptor),
    Settings(DigitizerSettings),
    Waveform(WaveformData),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Digitizer(_) => RecordType::DigitizerDescription,
            Record::Settings(_) => RecordType::DigitizerSettings,
            Record::Waveform(_) => RecordType::TraceData,
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Record::Digitizer(d) => write!(f, "{}", d),
            Record::Settings(s) => write!(f, "{}", s),
            Record::Waveform(w) => write!(f, "{}", w),
        }
    }
}

/// Counters accumulated while iterating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub digitizers: u64,
    pub settings: u64,
    pub waveforms: u64,
    /// Records with unknown type tags that were read past
    pub skipped: u64,
    /// Records whose declared size disagreed with the decoded size
    pub size_mismatches: u64,
    /// Bytes consumed by complete records
    pub bytes: u64,
}

impl StreamStats {
    /// Total records decoded (skipped records excluded)
    pub fn records(&self) -> u64 {
        self.digitizers + self.settings + self.waveforms
    }
}

/// Iterator over the records of a raw data file
///
/// Yields `Err` at most once; iteration ends after any failure.
pub struct RecordStream<'a, R> {
    reader: &'a mut RawFileReader<R>,
    stats: StreamStats,
    done: bool,
}

impl<'a, R: Read> RecordStream<'a, R> {
    pub(crate) fn new(reader: &'a mut RawFileReader<R>) -> Self {
        Self {
            reader,
            stats: StreamStats::default(),
            done: false,
        }
    }

    /// Counters for the records read so far
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Decode the body for `header`; `Ok(None)` means the record was skipped
    fn read_body(&mut self, header: RecordHeader) -> RawFileResult<Option<Record>> {
        let Some(kind) = header.kind() else {
            return self.skip_unknown(header);
        };

        let (record, body_bytes) = match kind {
            RecordType::DigitizerDescription => {
                let d = self.reader.read_digitizer_descriptor()?;
                (Record::Digitizer(d.record), d.bytes)
            }
            RecordType::DigitizerSettings => {
                let d = self.reader.read_digitizer_settings()?;
                (Record::Settings(d.record), d.bytes)
            }
            RecordType::TraceData => {
                let d = self.reader.read_waveform()?;
                (Record::Waveform(d.record), d.bytes)
            }
        };

        let total = RECORD_HEADER_SIZE + body_bytes;
        self.check_size(kind, &header, total)?;

        match kind {
            RecordType::DigitizerDescription => self.stats.digitizers += 1,
            RecordType::DigitizerSettings => self.stats.settings += 1,
            RecordType::TraceData => self.stats.waveforms += 1,
        }
        self.stats.bytes += total as u64;
        Ok(Some(record))
    }

    fn skip_unknown(&mut self, header: RecordHeader) -> RawFileResult<Option<Record>> {
        if !self.reader.config().skip_unknown_records {
            return Err(RawFileError::UnknownRecordType {
                tag: header.record_type,
                size: header.size,
            });
        }
        let skipped = self.reader.skip_body(header.body_size() as usize)?;
        warn!(
            tag = header.record_type,
            size = header.size,
            offset = self.reader.position(),
            "Skipped record with unknown type"
        );
        self.stats.skipped += 1;
        self.stats.bytes += (RECORD_HEADER_SIZE + skipped) as u64;
        Ok(None)
    }

    fn check_size(
        &mut self,
        kind: RecordType,
        header: &RecordHeader,
        actual: usize,
    ) -> RawFileResult<()> {
        if header.size as usize == actual {
            return Ok(());
        }
        match self.reader.config().size_check {
            SizeCheck::Ignore => Ok(()),
            SizeCheck::Warn => {
                self.stats.size_mismatches += 1;
                warn!(
                    record_type = ?kind,
                    declared = header.size,
                    decoded = actual,
                    "Record size mismatch"
                );
                Ok(())
            }
            SizeCheck::Strict => Err(RawFileError::SizeMismatch {
                record_type: kind,
                declared: header.size,
                actual,
            }),
        }
    }
}

impl<'a, R: Read> Iterator for RecordStream<'a, R> {
    type Item = RawFileResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let header = match self.reader.read_header() {
                Ok(Some(h)) => h.record,
                Ok(None) => {
                    debug!(records = self.stats.records(), "Reached end of file");
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match self.read_body(header) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
