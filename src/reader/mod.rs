//! Sequential decoder for raw digitizer record files
//!
//! This module provides:
//! - A forward-only byte source (source)
//! - `RawFileReader` with the four record read operations
//! - A dispatching record iterator (stream)
//!
//! Callers read a header, then the body reader matching its type tag.
//! Only `read_header` may see a clean end of file; running out of bytes
//! anywhere else is reported as `PrematureEof` or `Truncated`, and no
//! partially filled record is ever returned.

pub mod source;
pub mod stream;

pub use source::ByteSource;
pub use stream::{Record, RecordStream, StreamStats};

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, trace};

use crate::common::{RawFileError, RawFileResult, Section};
use crate::config::DecoderConfig;
use crate::format::{
    decode_u16_array, decode_u32_array, DigitizerDescriptor, DigitizerSettings,
    DigitizerSettingsFixedHeader, RecordHeader, WaveformData, WaveformFixedHeader,
    DESCRIPTOR_SIZE, RECORD_HEADER_SIZE, SETTINGS_HEADER_SIZE, WAVEFORM_HEADER_SIZE,
};

/// Chunk size used when discarding record bodies
const SKIP_CHUNK_SIZE: usize = 8 * 1024;

/// A decoded record together with the bytes consumed to produce it
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// Total bytes read for this record part (fixed and variable sections)
    pub bytes: usize,
    pub record: T,
}

/// Decoder over one raw data file
///
/// Not reentrant: one read call at a time per instance. All stream state
/// lives in the underlying source position, so a failed read leaves the
/// reader safe to drop.
pub struct RawFileReader<R> {
    source: ByteSource<R>,
    config: DecoderConfig,
}

impl RawFileReader<BufReader<File>> {
    /// Open a data file with default decoder limits
    pub fn open<P: AsRef<Path>>(path: P) -> RawFileResult<Self> {
        Self::open_with_config(path, DecoderConfig::default())
    }

    /// Open a data file with explicit decoder configuration
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: DecoderConfig) -> RawFileResult<Self> {
        let source = ByteSource::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opened raw data file");
        Ok(Self { source, config })
    }
}

impl<R: Read> RawFileReader<R> {
    /// Decode from any reader with default limits
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    /// Decode from any reader with explicit configuration
    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self {
            source: ByteSource::new(reader),
            config,
        }
    }

    /// Decoder configuration in effect
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Bytes consumed from the start of the stream
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Iterate over records, dispatching on each header's type tag
    pub fn records(&mut self) -> RecordStream<'_, R> {
        RecordStream::new(self)
    }

    /// Read the 8-byte record header
    ///
    /// Returns `Ok(None)` on a clean end of file (no bytes left).
    /// A partial header is `Truncated`.
    pub fn read_header(&mut self) -> RawFileResult<Option<Decoded<RecordHeader>>> {
        let offset = self.source.position();
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        let n = self.source.read_up_to(&mut buf)?;
        match n {
            0 => {
                trace!(offset, "End of file");
                Ok(None)
            }
            RECORD_HEADER_SIZE => {
                let header = RecordHeader::from_bytes(&buf);
                trace!(offset, size = header.size, record_type = header.record_type, "Header");
                Ok(Some(Decoded {
                    bytes: n,
                    record: header,
                }))
            }
            actual => Err(RawFileError::Truncated {
                section: Section::Header,
                offset,
                expected: RECORD_HEADER_SIZE,
                actual,
            }),
        }
    }

    /// Read a digitizer descriptor body
    pub fn read_digitizer_descriptor(&mut self) -> RawFileResult<Decoded<DigitizerDescriptor>> {
        let mut buf = [0u8; DESCRIPTOR_SIZE];
        self.read_section(&mut buf, Section::DigitizerDescriptor)?;
        let record = DigitizerDescriptor::from_bytes(&buf);
        debug!(id = record.id, serial = record.serial_number, "Digitizer descriptor");
        Ok(Decoded {
            bytes: DESCRIPTOR_SIZE,
            record,
        })
    }

    /// Read a settings body: fixed header, then DC offsets and trigger
    /// levels, each `n_channels` long
    pub fn read_digitizer_settings(&mut self) -> RawFileResult<Decoded<DigitizerSettings>> {
        let mut fixed = [0u8; SETTINGS_HEADER_SIZE];
        self.read_section(&mut fixed, Section::SettingsHeader)?;
        let header = DigitizerSettingsFixedHeader::from_bytes(&fixed);

        let tail_len = tail_bytes("nChannels", header.n_channels, self.config.max_channels, 4)?;
        let dc_offsets = decode_u32_array(&self.read_tail(tail_len, Section::DcOffsets)?);
        let trigger_levels = decode_u32_array(&self.read_tail(tail_len, Section::TriggerLevels)?);

        debug!(
            settings_id = header.settings_id,
            digitizer_id = header.digitizer_id,
            n_channels = header.n_channels,
            "Digitizer settings"
        );
        Ok(Decoded {
            bytes: SETTINGS_HEADER_SIZE + 2 * tail_len,
            record: DigitizerSettings {
                header,
                dc_offsets,
                trigger_levels,
            },
        })
    }

    /// Read a waveform body: fixed header, then `n_samples` u16 samples
    pub fn read_waveform(&mut self) -> RawFileResult<Decoded<WaveformData>> {
        let mut fixed = [0u8; WAVEFORM_HEADER_SIZE];
        self.read_section(&mut fixed, Section::WaveformHeader)?;
        let header = WaveformFixedHeader::from_bytes(&fixed);

        let tail_len = tail_bytes("nSamples", header.n_samples, self.config.max_samples, 2)?;
        let trace = decode_u16_array(&self.read_tail(tail_len, Section::Trace)?);

        debug!(
            event_id = header.event_id,
            channel = header.channel,
            n_samples = header.n_samples,
            "Waveform"
        );
        Ok(Decoded {
            bytes: WAVEFORM_HEADER_SIZE + tail_len,
            record: WaveformData { header, trace },
        })
    }

    /// Read and discard `len` body bytes
    pub fn skip_body(&mut self, len: usize) -> RawFileResult<usize> {
        let start = self.source.position();
        let mut chunk = vec![0u8; len.min(SKIP_CHUNK_SIZE)];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(chunk.len());
            let n = self.source.read_up_to(&mut chunk[..want])?;
            if n < want {
                let actual = len - remaining + n;
                if actual == 0 {
                    return Err(RawFileError::PrematureEof {
                        section: Section::UnknownBody,
                        offset: start,
                    });
                }
                return Err(RawFileError::Truncated {
                    section: Section::UnknownBody,
                    offset: start,
                    expected: len,
                    actual,
                });
            }
            remaining -= n;
        }
        Ok(len)
    }

    /// Fill `buf` completely or fail
    fn read_section(&mut self, buf: &mut [u8], section: Section) -> RawFileResult<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let offset = self.source.position();
        let n = self.source.read_up_to(buf)?;
        if n == 0 {
            return Err(RawFileError::PrematureEof { section, offset });
        }
        if n < buf.len() {
            return Err(RawFileError::Truncated {
                section,
                offset,
                expected: buf.len(),
                actual: n,
            });
        }
        Ok(())
    }

    fn read_tail(&mut self, len: usize, section: Section) -> RawFileResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_section(&mut buf, section)?;
        Ok(buf)
    }
}

/// Byte length of a variable tail, checked against the configured limit
/// before anything is allocated
fn tail_bytes(field: &'static str, count: u32, limit: u32, width: usize) -> RawFileResult<usize> {
    let implausible = RawFileError::ImplausibleSize {
        field,
        value: count,
        limit,
    };
    if count > limit {
        return Err(implausible);
    }
    (count as usize).checked_mul(width).ok_or(implausible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn push_u32(buf: &mut Vec<u8>, value: u32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn settings_bytes(n_channels: u32, dc: &[u32], levels: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        for w in [9, 1, 0xFF, 6, 1024, 50, 0x7, n_channels] {
            push_u32(&mut buf, w);
        }
        for &v in dc {
            push_u32(&mut buf, v);
        }
        for &v in levels {
            push_u32(&mut buf, v);
        }
        buf
    }

    fn waveform_bytes(n_samples: u32, samples: &[u16]) -> Vec<u8> {
        let mut buf = Vec::new();
        for w in [11, 1, 9, 77] {
            push_u32(&mut buf, w);
        }
        buf.extend_from_slice(&1_700_000_000u64.to_le_bytes());
        buf.extend_from_slice(&(-2i32).to_le_bytes());
        push_u32(&mut buf, 3);
        push_u32(&mut buf, n_samples);
        for &s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_header_clean_eof() {
        let mut reader = RawFileReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_header().unwrap().is_none());
    }

    #[test]
    fn test_header_decoded() {
        let mut bytes = Vec::new();
        push_u32(&mut bytes, 96);
        push_u32(&mut bytes, 1);
        let mut reader = RawFileReader::new(Cursor::new(bytes));
        let header = reader.read_header().unwrap().expect("header");
        assert_eq!(header.bytes, 8);
        assert_eq!(header.record.size, 96);
        assert_eq!(header.record.record_type, 1);
        assert!(reader.read_header().unwrap().is_none());
    }

    #[test]
    fn test_header_truncated() {
        let mut reader = RawFileReader::new(Cursor::new(vec![1u8, 2, 3]));
        let err = reader.read_header().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::Truncated {
                section: Section::Header,
                expected: 8,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_descriptor_premature_eof() {
        let mut reader = RawFileReader::new(Cursor::new(Vec::new()));
        let err = reader.read_digitizer_descriptor().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::PrematureEof {
                section: Section::DigitizerDescriptor,
                offset: 0
            }
        ));
    }

    #[test]
    fn test_descriptor_truncated() {
        let mut reader = RawFileReader::new(Cursor::new(vec![0u8; DESCRIPTOR_SIZE - 1]));
        let err = reader.read_digitizer_descriptor().unwrap_err();
        assert!(matches!(err, RawFileError::Truncated { .. }));
    }

    #[test]
    fn test_settings_arrays() {
        let bytes = settings_bytes(3, &[10, 20, 30], &[100, 200, 300]);
        let total = bytes.len();
        let mut reader = RawFileReader::new(Cursor::new(bytes));
        let decoded = reader.read_digitizer_settings().unwrap();
        assert_eq!(decoded.bytes, total);
        assert_eq!(decoded.bytes, 32 + 3 * 4 * 2);
        assert_eq!(decoded.record.header.settings_id, 9);
        assert_eq!(decoded.record.dc_offsets, vec![10, 20, 30]);
        assert_eq!(decoded.record.trigger_levels, vec![100, 200, 300]);
    }

    #[test]
    fn test_settings_zero_channels() {
        let mut reader = RawFileReader::new(Cursor::new(settings_bytes(0, &[], &[])));
        let decoded = reader.read_digitizer_settings().unwrap();
        assert_eq!(decoded.bytes, SETTINGS_HEADER_SIZE);
        assert!(decoded.record.dc_offsets.is_empty());
        assert!(decoded.record.trigger_levels.is_empty());
    }

    #[test]
    fn test_settings_eof_before_offsets() {
        let mut reader = RawFileReader::new(Cursor::new(settings_bytes(3, &[], &[])));
        let err = reader.read_digitizer_settings().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::PrematureEof {
                section: Section::DcOffsets,
                offset: 32
            }
        ));
    }

    #[test]
    fn test_settings_eof_before_levels() {
        let mut reader = RawFileReader::new(Cursor::new(settings_bytes(2, &[1, 2], &[])));
        let err = reader.read_digitizer_settings().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::PrematureEof {
                section: Section::TriggerLevels,
                offset: 40
            }
        ));
    }

    #[test]
    fn test_settings_partial_levels() {
        let mut reader = RawFileReader::new(Cursor::new(settings_bytes(2, &[1, 2], &[5])));
        let err = reader.read_digitizer_settings().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::Truncated {
                section: Section::TriggerLevels,
                expected: 8,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_settings_implausible_channels() {
        let config = DecoderConfig {
            max_channels: 16,
            ..DecoderConfig::default()
        };
        let mut reader =
            RawFileReader::with_config(Cursor::new(settings_bytes(17, &[], &[])), config);
        let err = reader.read_digitizer_settings().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::ImplausibleSize {
                field: "nChannels",
                value: 17,
                limit: 16
            }
        ));
        // The tail was never consumed
        assert_eq!(reader.position(), SETTINGS_HEADER_SIZE as u64);
    }

    #[test]
    fn test_waveform_trace() {
        let samples: Vec<u16> = (0..16).map(|i| 1000 + i * 3).collect();
        let mut reader = RawFileReader::new(Cursor::new(waveform_bytes(16, &samples)));
        let decoded = reader.read_waveform().unwrap();
        assert_eq!(decoded.bytes, WAVEFORM_HEADER_SIZE + 32);
        assert_eq!(decoded.record.header.event_id, 11);
        assert_eq!(decoded.record.header.shift, -2);
        assert_eq!(decoded.record.header.channel, 3);
        assert_eq!(decoded.record.trace, samples);
    }

    #[test]
    fn test_waveform_eof_before_trace() {
        let mut reader = RawFileReader::new(Cursor::new(waveform_bytes(4, &[])));
        let err = reader.read_waveform().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::PrematureEof {
                section: Section::Trace,
                ..
            }
        ));
    }

    #[test]
    fn test_waveform_header_premature_eof() {
        let mut reader = RawFileReader::new(Cursor::new(Vec::new()));
        let err = reader.read_waveform().unwrap_err();
        assert!(matches!(
            err,
            RawFileError::PrematureEof {
                section: Section::WaveformHeader,
                ..
            }
        ));
    }

    #[test]
    fn test_waveform_implausible_samples() {
        let config = DecoderConfig {
            max_samples: 8,
            ..DecoderConfig::default()
        };
        let mut reader = RawFileReader::with_config(Cursor::new(waveform_bytes(9, &[])), config);
        assert!(matches!(
            reader.read_waveform().unwrap_err(),
            RawFileError::ImplausibleSize { field: "nSamples", .. }
        ));
    }

    #[test]
    fn test_skip_body() {
        let mut reader = RawFileReader::new(Cursor::new(vec![0u8; 20_000]));
        assert_eq!(reader.skip_body(20_000).unwrap(), 20_000);
        assert_eq!(reader.position(), 20_000);
        assert_eq!(reader.skip_body(0).unwrap(), 0);
    }

    #[test]
    fn test_skip_body_short() {
        let mut reader = RawFileReader::new(Cursor::new(vec![0u8; 10]));
        assert!(matches!(
            reader.skip_body(20).unwrap_err(),
            RawFileError::Truncated {
                expected: 20,
                actual: 10,
                ..
            }
        ));

        let mut reader = RawFileReader::new(Cursor::new(Vec::new()));
        assert!(reader.skip_body(4).unwrap_err().is_premature_eof());
    }

    #[test]
    fn test_open_missing_file() {
        let err = match RawFileReader::open("/nonexistent/run0001.bin") {
            Err(e) => e,
            Ok(_) => panic!("open should fail"),
        };
        assert!(err.to_string().contains("/nonexistent/run0001.bin"));
        assert!(err.os_error_code().is_some());
    }
}
