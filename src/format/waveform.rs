//! Waveform (trace) record (type 3)

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FieldReader, WAVEFORM_HEADER_SIZE};

/// Fixed prefix of a waveform record (36 bytes, packed)
///
/// Layout: event_id, digitizer_id, settings_id, trigger_tag (u32 each),
/// tod_stamp (u64), shift (i32), channel, n_samples (u32 each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaveformFixedHeader {
    /// Event number; traces from several channels may share one
    pub event_id: u32,
    pub digitizer_id: u32,
    pub settings_id: u32,
    /// Digitizer trigger time tag
    pub trigger_tag: u32,
    /// Wall-clock seconds at trigger, taken by the acquisition controller
    pub tod_stamp: u64,
    /// Trigger jitter compensation shift in samples
    pub shift: i32,
    pub channel: u32,
    /// Length of the sample array that follows
    pub n_samples: u32,
}

impl WaveformFixedHeader {
    /// Decode from the 36 fixed bytes
    pub fn from_bytes(data: &[u8; WAVEFORM_HEADER_SIZE]) -> Self {
        let mut fields = FieldReader::new(data);
        Self {
            event_id: fields.u32(),
            digitizer_id: fields.u32(),
            settings_id: fields.u32(),
            trigger_tag: fields.u32(),
            tod_stamp: fields.u64(),
            shift: fields.i32(),
            channel: fields.u32(),
            n_samples: fields.u32(),
        }
    }

    /// Trigger wall-clock time, if the stamp is representable
    pub fn clock_time(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.tod_stamp).ok()?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }
}

/// Waveform record: fixed header plus `n_samples` raw ADC samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveformData {
    pub header: WaveformFixedHeader,
    pub trace: Vec<u16>,
}

impl WaveformData {
    /// Smallest and largest sample, or None for an empty trace
    pub fn sample_range(&self) -> Option<(u16, u16)> {
        let min = *self.trace.iter().min()?;
        let max = *self.trace.iter().max()?;
        Some((min, max))
    }

    /// Format waveform summary for display
    pub fn display(&self) -> String {
        let range = match self.sample_range() {
            Some((lo, hi)) => format!("[{}, {}]", lo, hi),
            None => "[]".to_string(),
        };
        format!(
            "Event {:6} dig:{} set:{} ch:{:2} tag:{:10} tod:{} shift:{:4} n:{} range:{}",
            self.header.event_id,
            self.header.digitizer_id,
            self.header.settings_id,
            self.header.channel,
            self.header.trigger_tag,
            self.header.tod_stamp,
            self.header.shift,
            self.trace.len(),
            range
        )
    }
}

impl std::fmt::Display for WaveformData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
