//! Event reconstruction from decoded records
//!
//! Waveform records carry one channel each; traces sharing an event id
//! belong to the same trigger. `RunContents` collects the digitizers and
//! settings of a file and regroups traces into `Event`s, then converts a
//! channel's samples into (time, amplitude) points using the digitizer's
//! sampling frequency, resolution and input range.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::common::RawFileError;
use crate::config::DecoderConfig;
use crate::format::{DigitizerDescriptor, DigitizerSettings, WaveformData};
use crate::reader::{RawFileReader, Record, StreamStats};

/// Errors while assembling or interpreting events
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Decode error: {0}")]
    Decode(#[from] RawFileError),

    #[error("Event {0} not found")]
    UnknownEvent(u32),

    #[error("Channel {channel} does not exist in event {event}")]
    MissingChannel { event: u32, channel: u32 },

    #[error("Event {event} references unknown digitizer {digitizer}")]
    UnknownDigitizer { event: u32, digitizer: u32 },

    #[error("Event {event} references unknown settings {settings}")]
    UnknownSettings { event: u32, settings: u32 },

    #[error("Digitizer {digitizer} has unusable {field}")]
    InvalidDigitizer {
        digitizer: u32,
        field: &'static str,
    },
}

/// Unit for trace amplitudes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Magnitude {
    /// Raw ADC codes
    #[default]
    AdcCounts,
    /// Volts across the digitizer input range
    Voltage,
}

/// One trace sample placed in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    /// Seconds relative to the trigger
    pub time: f64,
    pub amplitude: f64,
}

/// All traces captured for one trigger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: u32,
    pub digitizer_id: u32,
    pub settings_id: u32,
    /// Digitizer trigger time tag
    pub trigger_tag: u32,
    /// Wall-clock seconds at trigger
    pub tod_stamp: u64,
    /// Trigger jitter compensation shift in samples
    pub shift: i32,
    /// Samples keyed by channel number
    pub traces: BTreeMap<u32, Vec<u16>>,
}

impl Event {
    fn from_waveform(wf: WaveformData) -> Self {
        let h = wf.header;
        let mut traces = BTreeMap::new();
        traces.insert(h.channel, wf.trace);
        Self {
            id: h.event_id,
            digitizer_id: h.digitizer_id,
            settings_id: h.settings_id,
            trigger_tag: h.trigger_tag,
            tod_stamp: h.tod_stamp,
            shift: h.shift,
            traces,
        }
    }

    /// Trigger wall-clock time
    pub fn clock_time(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.tod_stamp).ok()?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }

    /// Channels with a trace in this event, ascending
    pub fn channels(&self) -> impl Iterator<Item = u32> + '_ {
        self.traces.keys().copied()
    }

    pub fn trace(&self, channel: u32) -> Option<&[u16]> {
        self.traces.get(&channel).map(Vec::as_slice)
    }
}

/// Everything decoded from one raw file
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunContents {
    pub digitizers: BTreeMap<u32, DigitizerDescriptor>,
    pub settings: BTreeMap<u32, DigitizerSettings>,
    pub events: BTreeMap<u32, Event>,
    pub stats: StreamStats,
}

impl RunContents {
    /// Decode a whole file
    pub fn load<P: AsRef<Path>>(path: P, config: &DecoderConfig) -> Result<Self, AssembleError> {
        let mut reader = RawFileReader::open_with_config(path, config.clone())?;
        Self::from_reader(&mut reader)
    }

    /// Decode every remaining record of `reader`
    pub fn from_reader<R: Read>(reader: &mut RawFileReader<R>) -> Result<Self, AssembleError> {
        let mut contents = Self::default();
        let mut stream = reader.records();
        for record in stream.by_ref() {
            contents.push(record?);
        }
        contents.stats = stream.stats().clone();
        info!(
            digitizers = contents.digitizers.len(),
            settings = contents.settings.len(),
            events = contents.events.len(),
            bytes = contents.stats.bytes,
            "Loaded run contents"
        );
        Ok(contents)
    }

    /// Add one record
    pub fn push(&mut self, record: Record) {
        match record {
            Record::Digitizer(d) => {
                if self.digitizers.contains_key(&d.id) {
                    warn!(id = d.id, "Duplicate digitizer descriptor replaces earlier one");
                }
                self.digitizers.insert(d.id, d);
            }
            Record::Settings(s) => {
                let id = s.header.settings_id;
                if self.settings.contains_key(&id) {
                    warn!(id, "Duplicate settings record replaces earlier one");
                }
                self.settings.insert(id, s);
            }
            Record::Waveform(wf) => self.push_waveform(wf),
        }
    }

    fn push_waveform(&mut self, wf: WaveformData) {
        let event_id = wf.header.event_id;
        match self.events.get_mut(&event_id) {
            Some(event) => {
                let channel = wf.header.channel;
                if event.traces.insert(channel, wf.trace).is_some() {
                    warn!(event_id, channel, "Duplicate trace replaces earlier one");
                }
            }
            None => {
                self.events.insert(event_id, Event::from_waveform(wf));
            }
        }
    }

    pub fn event(&self, id: u32) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Digitizer that captured `event`
    pub fn digitizer_for(&self, event: &Event) -> Result<&DigitizerDescriptor, AssembleError> {
        self.digitizers
            .get(&event.digitizer_id)
            .ok_or(AssembleError::UnknownDigitizer {
                event: event.id,
                digitizer: event.digitizer_id,
            })
    }

    /// Settings in effect for `event`
    pub fn settings_for(&self, event: &Event) -> Result<&DigitizerSettings, AssembleError> {
        self.settings
            .get(&event.settings_id)
            .ok_or(AssembleError::UnknownSettings {
                event: event.id,
                settings: event.settings_id,
            })
    }

    /// Time/amplitude points for one channel of one event
    ///
    /// Time is `(i - shift) / Hz` when the event carries a jitter shift,
    /// otherwise samples are placed relative to the pre-trigger fraction
    /// of the trace (`100 - post_trigger_pct` percent).
    pub fn channel_samples(
        &self,
        event_id: u32,
        channel: u32,
        magnitude: Magnitude,
    ) -> Result<Vec<SamplePoint>, AssembleError> {
        let event = self
            .event(event_id)
            .ok_or(AssembleError::UnknownEvent(event_id))?;
        let trace = event.trace(channel).ok_or(AssembleError::MissingChannel {
            event: event_id,
            channel,
        })?;
        let digitizer = self.digitizer_for(event)?;
        if digitizer.hz == 0 {
            return Err(AssembleError::InvalidDigitizer {
                digitizer: digitizer.id,
                field: "sampling frequency",
            });
        }
        let hz = digitizer.hz as f64;

        let origin = if event.shift != 0 {
            event.shift as f64
        } else {
            let settings = self.settings_for(event)?;
            if trace.len() != settings.header.window_size as usize {
                warn!(
                    event_id,
                    channel,
                    samples = trace.len(),
                    window = settings.header.window_size,
                    "Trace length does not match acquisition window"
                );
            }
            let pre_trigger = 100.0 - settings.header.post_trigger_pct as f64;
            trace.len() as f64 * pre_trigger / 100.0
        };

        let scale = match magnitude {
            Magnitude::AdcCounts => None,
            Magnitude::Voltage => {
                let full_scale = digitizer.full_scale();
                if full_scale == 0 {
                    return Err(AssembleError::InvalidDigitizer {
                        digitizer: digitizer.id,
                        field: "resolution",
                    });
                }
                let (vlow, vhigh) = digitizer.voltage_range();
                Some((vlow, vhigh - vlow, full_scale as f64))
            }
        };

        Ok(trace
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let amplitude = match scale {
                    None => sample as f64,
                    Some((vlow, span, full_scale)) => vlow + sample as f64 / full_scale * span,
                };
                SamplePoint {
                    time: (i as f64 - origin) / hz,
                    amplitude,
                }
            })
            .collect())
    }
}
