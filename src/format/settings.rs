//! Digitizer settings record (type 2)

use serde::Serialize;

use super::{
    FieldReader, SETTINGS_HEADER_SIZE, TRG_EXTERNAL_OUTPUT, TRG_RISING, TRG_TRIGGER_ON_BOTH,
    TRG_TRIGGER_ON_EXT_TRIG,
};

/// Fixed prefix of a settings record (8 x u32, 32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DigitizerSettingsFixedHeader {
    /// Unique settings id within the file
    pub settings_id: u32,
    /// Digitizer these settings belong to
    pub digitizer_id: u32,
    pub trigger_mask: u32,
    /// Trigger source/polarity code (TRG_* constants)
    pub trigger_code: u32,
    /// Acquisition window in samples
    pub window_size: u32,
    /// Post-trigger fraction of the window, in percent
    pub post_trigger_pct: u32,
    /// Enabled channels
    pub channel_mask: u32,
    /// Length of each per-channel array that follows
    pub n_channels: u32,
}

impl DigitizerSettingsFixedHeader {
    /// Decode from the 32 fixed bytes
    pub fn from_bytes(data: &[u8; SETTINGS_HEADER_SIZE]) -> Self {
        let mut fields = FieldReader::new(data);
        Self {
            settings_id: fields.u32(),
            digitizer_id: fields.u32(),
            trigger_mask: fields.u32(),
            trigger_code: fields.u32(),
            window_size: fields.u32(),
            post_trigger_pct: fields.u32(),
            channel_mask: fields.u32(),
            n_channels: fields.u32(),
        }
    }

    /// Typed view of the trigger code
    pub fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::from_code(self.trigger_code)
    }

    /// True if `channel` is enabled in the channel mask
    pub fn channel_enabled(&self, channel: u32) -> bool {
        channel < 32 && (self.channel_mask >> channel) & 1 != 0
    }
}

/// Trigger source encoded in the low two bits of the trigger code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerSource {
    /// Trigger output reflects the trigger
    ExternalOutput,
    /// External trigger only
    TriggerOnExtTrig,
    /// External and internal trigger
    TriggerOnBoth,
    /// Internal trigger only
    ExtTrigDisabled,
}

/// Trigger source plus edge polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerMode {
    pub source: TriggerSource,
    /// Rising edge when set, falling otherwise
    pub rising: bool,
}

impl TriggerMode {
    pub fn from_code(code: u32) -> Self {
        let source = match code & 0x3 {
            TRG_EXTERNAL_OUTPUT => TriggerSource::ExternalOutput,
            TRG_TRIGGER_ON_EXT_TRIG => TriggerSource::TriggerOnExtTrig,
            TRG_TRIGGER_ON_BOTH => TriggerSource::TriggerOnBoth,
            _ => TriggerSource::ExtTrigDisabled,
        };
        Self {
            source,
            rising: (code & TRG_RISING) != 0,
        }
    }
}

/// One channel's calibration values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSettings {
    pub channel: u32,
    pub dc_offset: u32,
    pub trigger_level: u32,
}

/// Full settings record: fixed header plus per-channel arrays
///
/// `dc_offsets` and `trigger_levels` both have exactly
/// `header.n_channels` entries, aligned by channel index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigitizerSettings {
    pub header: DigitizerSettingsFixedHeader,
    pub dc_offsets: Vec<u32>,
    pub trigger_levels: Vec<u32>,
}

impl DigitizerSettings {
    /// Per-channel view pairing both arrays by index
    pub fn channels(&self) -> impl Iterator<Item = ChannelSettings> + '_ {
        self.dc_offsets
            .iter()
            .zip(self.trigger_levels.iter())
            .enumerate()
            .map(|(i, (&dc_offset, &trigger_level))| ChannelSettings {
                channel: i as u32,
                dc_offset,
                trigger_level,
            })
    }

    /// Settings for a single channel index
    pub fn channel(&self, channel: u32) -> Option<ChannelSettings> {
        let idx = channel as usize;
        Some(ChannelSettings {
            channel,
            dc_offset: *self.dc_offsets.get(idx)?,
            trigger_level: *self.trigger_levels.get(idx)?,
        })
    }

    /// Format settings for display
    pub fn display(&self) -> String {
        let mode = self.header.trigger_mode();
        format!(
            "Settings {} dig:{} window:{} post:{}% mask:0x{:x} trig:{:?}/{} ch:{}",
            self.header.settings_id,
            self.header.digitizer_id,
            self.header.window_size,
            self.header.post_trigger_pct,
            self.header.channel_mask,
            mode.source,
            if mode.rising { "rising" } else { "falling" },
            self.header.n_channels
        )
    }
}

impl std::fmt::Display for DigitizerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TRG_EXT_TRIG_DISABLED;

    fn header_bytes(words: [u32; 8]) -> [u8; SETTINGS_HEADER_SIZE] {
        let mut out = [0u8; SETTINGS_HEADER_SIZE];
        for (i, w) in words.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_fixed_header_field_order() {
        let header =
            DigitizerSettingsFixedHeader::from_bytes(&header_bytes([1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(header.settings_id, 1);
        assert_eq!(header.digitizer_id, 2);
        assert_eq!(header.trigger_mask, 3);
        assert_eq!(header.trigger_code, 4);
        assert_eq!(header.window_size, 5);
        assert_eq!(header.post_trigger_pct, 6);
        assert_eq!(header.channel_mask, 7);
        assert_eq!(header.n_channels, 8);
    }

    #[test]
    fn test_trigger_mode_decoding() {
        let mode = TriggerMode::from_code(TRG_EXT_TRIG_DISABLED | TRG_RISING);
        assert_eq!(mode.source, TriggerSource::ExtTrigDisabled);
        assert!(mode.rising);

        let mode = TriggerMode::from_code(TRG_TRIGGER_ON_BOTH);
        assert_eq!(mode.source, TriggerSource::TriggerOnBoth);
        assert!(!mode.rising);

        let mode = TriggerMode::from_code(TRG_TRIGGER_ON_EXT_TRIG | TRG_RISING);
        assert_eq!(mode.source, TriggerSource::TriggerOnExtTrig);
        assert!(mode.rising);

        let mode = TriggerMode::from_code(TRG_EXTERNAL_OUTPUT);
        assert_eq!(mode.source, TriggerSource::ExternalOutput);
    }

    #[test]
    fn test_channel_mask() {
        let header =
            DigitizerSettingsFixedHeader::from_bytes(&header_bytes([0, 0, 0, 0, 0, 0, 0b101, 3]));
        assert!(header.channel_enabled(0));
        assert!(!header.channel_enabled(1));
        assert!(header.channel_enabled(2));
        assert!(!header.channel_enabled(40));
    }

    #[test]
    fn test_channels_pairs_arrays_by_index() {
        let settings = DigitizerSettings {
            header: DigitizerSettingsFixedHeader::from_bytes(&header_bytes([
                1, 0, 0, 0, 0, 0, 0, 3,
            ])),
            dc_offsets: vec![10, 20, 30],
            trigger_levels: vec![100, 200, 300],
        };
        let channels: Vec<_> = settings.channels().collect();
        assert_eq!(channels.len(), 3);
        assert_eq!(
            channels[1],
            ChannelSettings {
                channel: 1,
                dc_offset: 20,
                trigger_level: 200
            }
        );
        assert_eq!(settings.channel(2).map(|c| c.trigger_level), Some(300));
        assert_eq!(settings.channel(3), None);
    }
}
