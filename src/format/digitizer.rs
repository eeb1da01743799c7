//! Digitizer descriptor record (type 1)

use serde::Serialize;

use super::{
    FieldReader, CAP_CAN_INSPECT, CAP_CAN_ZSUPPRESS, CAP_DUAL_EDGE_CLOCK, CAP_HAS_GROUPS,
    DESCRIPTOR_SIZE,
};

/// Description of one physical digitizer unit
///
/// Layout (88 bytes, packed):
/// ```text
/// 0   u32  id            48  u32  serial_number   72  u32  max_samples
/// 4   u32  family_code   52  u32  board_version   76  u32  capflags
/// 8   [20] roc_version   56  u32  n_channels      80  i32  vlow (mV)
/// 28  [20] amc_version   60  u32  bits            84  i32  vhigh (mV)
///                        64  u64  hz
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigitizerDescriptor {
    /// Unique id within the file
    pub id: u32,
    /// Digitizer family code
    pub family_code: u32,
    /// Readout controller firmware version
    pub roc_version: String,
    /// AMC firmware version
    pub amc_version: String,
    pub serial_number: u32,
    pub board_version: u32,
    /// Number of channels
    pub n_channels: u32,
    /// ADC resolution in bits
    pub bits: u32,
    /// Sampling frequency in Hz
    pub hz: u64,
    /// Longest trace the unit can capture
    pub max_samples: u32,
    /// Capability bit-field (CAP_* constants)
    pub capflags: u32,
    /// Low end of the input range in millivolts
    pub vlow: i32,
    /// High end of the input range in millivolts
    pub vhigh: i32,
}

impl DigitizerDescriptor {
    /// Decode from the fixed descriptor body
    pub fn from_bytes(data: &[u8; DESCRIPTOR_SIZE]) -> Self {
        let mut fields = FieldReader::new(data);
        Self {
            id: fields.u32(),
            family_code: fields.u32(),
            roc_version: fields.fixed_str(),
            amc_version: fields.fixed_str(),
            serial_number: fields.u32(),
            board_version: fields.u32(),
            n_channels: fields.u32(),
            bits: fields.u32(),
            hz: fields.u64(),
            max_samples: fields.u32(),
            capflags: fields.u32(),
            vlow: fields.i32(),
            vhigh: fields.i32(),
        }
    }

    pub fn has_groups(&self) -> bool {
        (self.capflags & CAP_HAS_GROUPS) != 0
    }

    pub fn can_zsuppress(&self) -> bool {
        (self.capflags & CAP_CAN_ZSUPPRESS) != 0
    }

    pub fn can_inspect(&self) -> bool {
        (self.capflags & CAP_CAN_INSPECT) != 0
    }

    pub fn dual_edge_clock(&self) -> bool {
        (self.capflags & CAP_DUAL_EDGE_CLOCK) != 0
    }

    /// Input range in volts (stored values are millivolts)
    pub fn voltage_range(&self) -> (f64, f64) {
        (self.vlow as f64 / 1000.0, self.vhigh as f64 / 1000.0)
    }

    /// Largest ADC code for this resolution
    pub fn full_scale(&self) -> u64 {
        match self.bits {
            0 => 0,
            b if b >= 64 => u64::MAX,
            b => (1u64 << b) - 1,
        }
    }

    /// Combined firmware version string ("ROC.AMC")
    pub fn firmware_version(&self) -> String {
        format!("{}.{}", self.roc_version, self.amc_version)
    }

    /// Format descriptor for display
    pub fn display(&self) -> String {
        format!(
            "Digitizer {} family:{} serial:{} fw:{} ch:{} bits:{} {} Hz range:[{}, {}] mV caps:0x{:x}",
            self.id,
            self.family_code,
            self.serial_number,
            self.firmware_version(),
            self.n_channels,
            self.bits,
            self.hz,
            self.vlow,
            self.vhigh,
            self.capflags
        )
    }
}

impl std::fmt::Display for DigitizerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_descriptor_bytes(capflags: u32) -> [u8; DESCRIPTOR_SIZE] {
        let mut buf = Vec::with_capacity(DESCRIPTOR_SIZE);
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&724u32.to_le_bytes());
        let mut roc = [0u8; 20];
        roc[..5].copy_from_slice(b"04.25");
        buf.extend_from_slice(&roc);
        let mut amc = [0u8; 20];
        amc[..5].copy_from_slice(b"00.12");
        buf.extend_from_slice(&amc);
        buf.extend_from_slice(&1234u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&8u32.to_le_bytes());
        buf.extend_from_slice(&14u32.to_le_bytes());
        buf.extend_from_slice(&100_000_000u64.to_le_bytes());
        buf.extend_from_slice(&512_000u32.to_le_bytes());
        buf.extend_from_slice(&capflags.to_le_bytes());
        buf.extend_from_slice(&(-1250i32).to_le_bytes());
        buf.extend_from_slice(&1250i32.to_le_bytes());
        let mut out = [0u8; DESCRIPTOR_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    #[test]
    fn test_descriptor_fields() {
        let desc = DigitizerDescriptor::from_bytes(&make_descriptor_bytes(0));
        assert_eq!(desc.id, 7);
        assert_eq!(desc.family_code, 724);
        assert_eq!(desc.roc_version, "04.25");
        assert_eq!(desc.amc_version, "00.12");
        assert_eq!(desc.serial_number, 1234);
        assert_eq!(desc.board_version, 2);
        assert_eq!(desc.n_channels, 8);
        assert_eq!(desc.bits, 14);
        assert_eq!(desc.hz, 100_000_000);
        assert_eq!(desc.max_samples, 512_000);
        assert_eq!(desc.vlow, -1250);
        assert_eq!(desc.vhigh, 1250);
        assert_eq!(desc.firmware_version(), "04.25.00.12");
    }

    #[test]
    fn test_capability_bits() {
        let desc = DigitizerDescriptor::from_bytes(&make_descriptor_bytes(
            CAP_HAS_GROUPS | CAP_DUAL_EDGE_CLOCK,
        ));
        assert!(desc.has_groups());
        assert!(!desc.can_zsuppress());
        assert!(!desc.can_inspect());
        assert!(desc.dual_edge_clock());

        let desc = DigitizerDescriptor::from_bytes(&make_descriptor_bytes(
            CAP_CAN_ZSUPPRESS | CAP_CAN_INSPECT,
        ));
        assert!(!desc.has_groups());
        assert!(desc.can_zsuppress());
        assert!(desc.can_inspect());
        assert!(!desc.dual_edge_clock());
    }

    #[test]
    fn test_voltage_range_in_volts() {
        let desc = DigitizerDescriptor::from_bytes(&make_descriptor_bytes(0));
        let (lo, hi) = desc.voltage_range();
        assert!((lo + 1.25).abs() < f64::EPSILON);
        assert!((hi - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_full_scale() {
        let mut desc = DigitizerDescriptor::from_bytes(&make_descriptor_bytes(0));
        assert_eq!(desc.full_scale(), 16383);
        desc.bits = 0;
        assert_eq!(desc.full_scale(), 0);
        desc.bits = 64;
        assert_eq!(desc.full_scale(), u64::MAX);
    }

    #[test]
    fn test_display() {
        let desc = DigitizerDescriptor::from_bytes(&make_descriptor_bytes(CAP_HAS_GROUPS));
        let text = desc.to_string();
        assert!(text.contains("Digitizer 7"));
        assert!(text.contains("caps:0x1"));
    }
}
