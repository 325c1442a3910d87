// src/adc/registers.rs
//! ADS1256 register map, command set and configuration payloads.
//!
//! Byte codes follow the datasheet exactly; the driver never assembles
//! register values from inline magic numbers.

use serde::{Deserialize, Serialize};

/// Programmable gain amplifier setting. Register codes 0 through 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Gain {
    /// Gain 1
    X1 = 0,
    /// Gain 2
    X2 = 1,
    /// Gain 4
    X4 = 2,
    /// Gain 8
    X8 = 3,
    /// Gain 16
    X16 = 4,
    /// Gain 32
    X32 = 5,
    /// Gain 64
    X64 = 6,
}

impl Gain {
    /// ADCON register code for this gain.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Output data rate. Each variant maps to its fixed DRATE register byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataRate {
    /// 30 000 SPS
    Sps30000,
    /// 15 000 SPS
    Sps15000,
    /// 7 500 SPS
    Sps7500,
    /// 3 750 SPS
    Sps3750,
    /// 2 000 SPS
    Sps2000,
    /// 1 000 SPS
    Sps1000,
    /// 500 SPS
    Sps500,
    /// 100 SPS
    Sps100,
    /// 60 SPS
    Sps60,
    /// 50 SPS
    Sps50,
    /// 30 SPS
    Sps30,
    /// 25 SPS
    Sps25,
    /// 15 SPS
    Sps15,
    /// 10 SPS
    Sps10,
    /// 5 SPS
    Sps5,
    /// 2.5 SPS
    Sps2_5,
}

impl DataRate {
    /// DRATE register byte for this rate.
    pub fn code(self) -> u8 {
        match self {
            DataRate::Sps30000 => 0xF0,
            DataRate::Sps15000 => 0xE0,
            DataRate::Sps7500 => 0xD0,
            DataRate::Sps3750 => 0xC0,
            DataRate::Sps2000 => 0xB0,
            DataRate::Sps1000 => 0xA1,
            DataRate::Sps500 => 0x92,
            DataRate::Sps100 => 0x82,
            DataRate::Sps60 => 0x72,
            DataRate::Sps50 => 0x63,
            DataRate::Sps30 => 0x53,
            DataRate::Sps25 => 0x43,
            DataRate::Sps15 => 0x33,
            DataRate::Sps10 => 0x23,
            DataRate::Sps5 => 0x13,
            DataRate::Sps2_5 => 0x03,
        }
    }

    /// Inverse of [`DataRate::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        let rate = match code {
            0xF0 => DataRate::Sps30000,
            0xE0 => DataRate::Sps15000,
            0xD0 => DataRate::Sps7500,
            0xC0 => DataRate::Sps3750,
            0xB0 => DataRate::Sps2000,
            0xA1 => DataRate::Sps1000,
            0x92 => DataRate::Sps500,
            0x82 => DataRate::Sps100,
            0x72 => DataRate::Sps60,
            0x63 => DataRate::Sps50,
            0x53 => DataRate::Sps30,
            0x43 => DataRate::Sps25,
            0x33 => DataRate::Sps15,
            0x23 => DataRate::Sps10,
            0x13 => DataRate::Sps5,
            0x03 => DataRate::Sps2_5,
            _ => return None,
        };
        Some(rate)
    }

    /// Conversions per second.
    pub fn samples_per_second(self) -> f64 {
        match self {
            DataRate::Sps30000 => 30_000.0,
            DataRate::Sps15000 => 15_000.0,
            DataRate::Sps7500 => 7_500.0,
            DataRate::Sps3750 => 3_750.0,
            DataRate::Sps2000 => 2_000.0,
            DataRate::Sps1000 => 1_000.0,
            DataRate::Sps500 => 500.0,
            DataRate::Sps100 => 100.0,
            DataRate::Sps60 => 60.0,
            DataRate::Sps50 => 50.0,
            DataRate::Sps30 => 30.0,
            DataRate::Sps25 => 25.0,
            DataRate::Sps15 => 15.0,
            DataRate::Sps10 => 10.0,
            DataRate::Sps5 => 5.0,
            DataRate::Sps2_5 => 2.5,
        }
    }
}

/// Register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Status, self-calibration flags and the part id nibble.
    Status = 0x00,
    /// Input multiplexer.
    Mux = 0x01,
    /// A/D control: clock out and gain.
    AdControl = 0x02,
    /// Output data rate.
    Drate = 0x03,
    /// Digital I/O.
    Io = 0x04,
    /// Offset calibration, byte 0.
    Ofc0 = 0x05,
    /// Offset calibration, byte 1.
    Ofc1 = 0x06,
    /// Offset calibration, byte 2.
    Ofc2 = 0x07,
    /// Full-scale calibration, byte 0.
    Fsc0 = 0x08,
    /// Full-scale calibration, byte 1.
    Fsc1 = 0x09,
    /// Full-scale calibration, byte 2.
    Fsc2 = 0x0A,
}

/// Command bytes. Chip select must stay low while a command is clocked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Complete SYNC and exit standby.
    WakeUp = 0x00,
    /// Read one conversion.
    ReadData = 0x01,
    /// Enter read-continuous mode.
    ReadDataContinuous = 0x03,
    /// Leave read-continuous mode.
    StopReadContinuous = 0x0F,
    /// Read register, low nibble carries the address.
    ReadRegister = 0x10,
    /// Write register, low nibble carries the address.
    WriteRegister = 0x50,
    /// Offset and gain self-calibration.
    SelfCalibrate = 0xF0,
    /// Synchronize the A/D conversion.
    Sync = 0xFC,
    /// Enter standby.
    Standby = 0xFD,
    /// Reset to power-up values.
    Reset = 0xFE,
}

/// STATUS value enabling self-calibration after register writes.
pub const STATUS_AUTO_CALIBRATE: u8 = 0x04;
/// MUX low nibble selecting AINCOM as the negative input.
pub const MUX_AINCOM: u8 = 0x08;
/// ADCON clock-out setting: f(CLKIN) out, sensor detect off.
pub const ADCON_CLOCK_OUT: u8 = 0x20;
/// Part id expected in the STATUS register's high nibble.
pub const CHIP_ID: u8 = 0x3;

/// One immutable converter setup. Switching setups requires a full
/// reset-and-reinit sequence through the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Analog input gain.
    pub gain: Gain,
    /// Output data rate.
    pub data_rate: DataRate,
    /// Positive input channel, 0 through 7; AINCOM is the negative input.
    pub channel: u8,
}

impl ConverterConfig {
    /// Payload of the configuration burst: STATUS, MUX, ADCON and DRATE,
    /// written in one framed transaction starting at register 0.
    pub fn register_burst(&self) -> [u8; 4] {
        [
            STATUS_AUTO_CALIBRATE,
            (self.channel << 4) | MUX_AINCOM,
            ADCON_CLOCK_OUT | self.gain.code(),
            self.data_rate.code(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_codes_cover_the_register_range() {
        assert_eq!(Gain::X1.code(), 0);
        assert_eq!(Gain::X64.code(), 6);
    }

    #[test]
    fn data_rate_codes_match_the_datasheet() {
        assert_eq!(DataRate::Sps30000.code(), 0xF0);
        assert_eq!(DataRate::Sps15000.code(), 0xE0);
        assert_eq!(DataRate::Sps500.code(), 0x92);
        assert_eq!(DataRate::Sps100.code(), 0x82);
        assert_eq!(DataRate::Sps50.code(), 0x63);
        assert_eq!(DataRate::Sps2_5.code(), 0x03);
    }

    #[test]
    fn data_rate_code_round_trips() {
        for rate in [
            DataRate::Sps30000,
            DataRate::Sps1000,
            DataRate::Sps500,
            DataRate::Sps50,
            DataRate::Sps2_5,
        ] {
            assert_eq!(DataRate::from_code(rate.code()), Some(rate));
        }
        assert_eq!(DataRate::from_code(0xFF), None);
    }

    #[test]
    fn register_burst_for_ecg_setup() {
        let config = ConverterConfig {
            gain: Gain::X1,
            data_rate: DataRate::Sps500,
            channel: 4,
        };
        assert_eq!(config.register_burst(), [0x04, 0x48, 0x20, 0x92]);
    }
}
