//! Wire layouts for raw CAEN digitizer record files
//!
//! File structure:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Record header (8 bytes)                │
//! │  - size: u32 (header + body bytes)      │
//! │  - type: u32 (1, 2 or 3)                │
//! ├─────────────────────────────────────────┤
//! │  Record body                            │
//! │  - type 1: digitizer descriptor (88)    │
//! │  - type 2: settings header (32)         │
//! │            + nChannels u32 DC offsets   │
//! │            + nChannels u32 trig levels  │
//! │  - type 3: waveform header (36)         │
//! │            + nSamples u16 samples       │
//! ├─────────────────────────────────────────┤
//! │  ...                                    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! All fields are tightly packed. Integers are decoded as little-endian,
//! the byte order of the acquisition hosts that write these files; files
//! from a big-endian producer are not portable to this decoder.

pub mod digitizer;
pub mod settings;
pub mod waveform;

pub use digitizer::DigitizerDescriptor;
pub use settings::{
    ChannelSettings, DigitizerSettings, DigitizerSettingsFixedHeader, TriggerMode, TriggerSource,
};
pub use waveform::{WaveformData, WaveformFixedHeader};

use serde::Serialize;

/// Size of the generic record header in bytes
pub const RECORD_HEADER_SIZE: usize = 8;

/// Size of a digitizer descriptor body in bytes
pub const DESCRIPTOR_SIZE: usize = 88;

/// Size of the fixed prefix of a settings record in bytes
pub const SETTINGS_HEADER_SIZE: usize = 32;

/// Size of the fixed prefix of a waveform record in bytes
pub const WAVEFORM_HEADER_SIZE: usize = 36;

/// Length of the fixed ROC/AMC version string fields
pub const VERSION_STRING_LEN: usize = 20;

// Capability bits (DigitizerDescriptor::capflags)
pub const CAP_HAS_GROUPS: u32 = 1;
pub const CAP_CAN_ZSUPPRESS: u32 = 2;
pub const CAP_CAN_INSPECT: u32 = 4;
pub const CAP_DUAL_EDGE_CLOCK: u32 = 8;

// Trigger code values (DigitizerSettingsFixedHeader::trigger_code)
pub const TRG_EXTERNAL_OUTPUT: u32 = 0;
pub const TRG_TRIGGER_ON_EXT_TRIG: u32 = 1;
pub const TRG_TRIGGER_ON_BOTH: u32 = 2;
pub const TRG_EXT_TRIG_DISABLED: u32 = 3;
pub const TRG_RISING: u32 = 4;

/// Record type tag carried in every record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordType {
    DigitizerDescription = 1,
    DigitizerSettings = 2,
    TraceData = 3,
}

impl RecordType {
    /// Map a raw type tag to a known record type
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::DigitizerDescription),
            2 => Some(Self::DigitizerSettings),
            3 => Some(Self::TraceData),
            _ => None,
        }
    }

    /// Raw tag value as stored in the file
    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Generic record header preceding every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    /// Declared total record size, header included
    pub size: u32,
    /// Raw type tag
    pub record_type: u32,
}

impl RecordHeader {
    /// Decode from the 8 header bytes
    pub fn from_bytes(data: &[u8; RECORD_HEADER_SIZE]) -> Self {
        let mut fields = FieldReader::new(data);
        Self {
            size: fields.u32(),
            record_type: fields.u32(),
        }
    }

    /// Known record type, if the tag is recognised
    pub fn kind(&self) -> Option<RecordType> {
        RecordType::from_tag(self.record_type)
    }

    /// Declared body size (size minus the header itself)
    pub fn body_size(&self) -> u32 {
        self.size.saturating_sub(RECORD_HEADER_SIZE as u32)
    }
}

/// Field-by-field little-endian decoder over a fixed layout
///
/// Callers size the slice from the layout constants above, so every
/// accessor stays in bounds.
pub(crate) struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    pub(crate) fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub(crate) fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    pub(crate) fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    /// Fixed-width text field, cut at the first NUL
    pub(crate) fn fixed_str(&mut self) -> String {
        let raw: [u8; VERSION_STRING_LEN] = self.take();
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

/// Decode a packed array of little-endian u32 values
pub(crate) fn decode_u32_array(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Decode a packed array of little-endian u16 values
pub(crate) fn decode_u16_array(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}
