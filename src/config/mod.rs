// src/config/mod.rs
//! Session configuration: pin mapping, channel assignment and detection
//! parameters, loadable from TOML with hardware defaults.

pub mod constants;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VpwvError;
use constants::{detection, signal, timing};

/// GPIO pin assignment for the converter and trigger hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    /// Converter reset line (active low).
    pub reset: u8,
    /// Chip-select line, held low during every framed transaction.
    pub chip_select: u8,
    /// Data-ready line, asserted low when a conversion is available.
    pub data_ready: u8,
    /// Output line driving the inflation valve relay.
    pub trigger: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            reset: 18,
            chip_select: 22,
            data_ready: 17,
            trigger: 16,
        }
    }
}

/// Multiplexer channel assignment per signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Respiratory belt channel.
    pub breath: u8,
    /// ECG channel.
    pub ecg: u8,
    /// Doppler audio channel.
    pub doppler: u8,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            breath: 7,
            ecg: 4,
            doppler: 2,
        }
    }
}

/// Parameters of the threshold calibration and phase detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// ECG calibration window, seconds.
    pub ecg_calibration_secs: u32,
    /// Initial ECG threshold: mean + this fraction of peak-to-peak amplitude.
    pub ecg_threshold_fraction: f64,
    /// Refinement increment, fraction of peak-to-peak amplitude.
    pub ecg_refine_step: f64,
    /// Supra-threshold peak bound triggering refinement.
    pub ecg_max_peaks: usize,
    /// Hard cap on refinement iterations.
    pub ecg_refine_cap: usize,
    /// Fallback threshold fraction applied at the cap.
    pub ecg_fallback_fraction: f64,
    /// Respiratory seed window, seconds.
    pub breath_seed_secs: u32,
    /// Respiratory threshold refresh interval, seconds.
    pub breath_refresh_secs: u32,
    /// Consecutive samples required on each side of the expiration crossing.
    pub hysteresis_samples: usize,
    /// R-wave search window per attempt, seconds.
    pub rwave_window_secs: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ecg_calibration_secs: detection::ECG_CALIBRATION_SECS,
            ecg_threshold_fraction: detection::ECG_THRESHOLD_FRACTION,
            ecg_refine_step: detection::ECG_REFINE_STEP,
            ecg_max_peaks: detection::ECG_MAX_PEAKS,
            ecg_refine_cap: detection::ECG_REFINE_CAP,
            ecg_fallback_fraction: detection::ECG_FALLBACK_FRACTION,
            breath_seed_secs: detection::BREATH_SEED_SECS,
            breath_refresh_secs: detection::BREATH_REFRESH_SECS,
            hysteresis_samples: detection::HYSTERESIS_SAMPLES,
            rwave_window_secs: detection::RWAVE_WINDOW_SECS,
        }
    }
}

/// Trigger pulse timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Pulse width, milliseconds.
    pub pulse_ms: u64,
    /// Post-pulse settle, milliseconds.
    pub settle_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            pulse_ms: timing::TRIGGER_PULSE_MS,
            settle_ms: timing::TRIGGER_SETTLE_MS,
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// GPIO pin mapping.
    pub pins: PinConfig,
    /// Multiplexer channel assignment.
    pub channels: ChannelConfig,
    /// Detector parameters.
    pub detection: DetectionConfig,
    /// Trigger timing.
    pub trigger: TriggerConfig,
}

impl SystemConfig {
    /// Parse a configuration from TOML text. Missing sections fall back to
    /// the hardware defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, VpwvError> {
        let config: SystemConfig =
            toml::from_str(text).map_err(|e| VpwvError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VpwvError> {
        let text = std::fs::read_to_string(path).map_err(|e| VpwvError::Config(e.to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Check ranges the serde layer cannot express.
    pub fn validate(&self) -> Result<(), VpwvError> {
        for (name, ch) in [
            ("breath", self.channels.breath),
            ("ecg", self.channels.ecg),
            ("doppler", self.channels.doppler),
        ] {
            if ch > signal::MAX_CHANNEL {
                return Err(VpwvError::Config(format!(
                    "{name} channel {ch} out of range 0..={}",
                    signal::MAX_CHANNEL
                )));
            }
        }
        if !(0.0..1.0).contains(&self.detection.ecg_threshold_fraction) {
            return Err(VpwvError::Config(
                "ecg_threshold_fraction must lie in [0, 1)".into(),
            ));
        }
        if self.detection.ecg_refine_step <= 0.0 {
            return Err(VpwvError::Config("ecg_refine_step must be positive".into()));
        }
        if self.detection.hysteresis_samples == 0 {
            return Err(VpwvError::Config(
                "hysteresis_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channels.ecg, 4);
        assert_eq!(config.trigger.pulse_ms, 200);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = SystemConfig::from_toml_str(
            r#"
            [channels]
            breath = 6
            ecg = 4
            doppler = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.channels.breath, 6);
        assert_eq!(config.pins, PinConfig::default());
        assert_eq!(config.detection.ecg_max_peaks, 15);
    }

    #[test]
    fn rejects_out_of_range_channel() {
        let result = SystemConfig::from_toml_str(
            r#"
            [channels]
            breath = 9
            ecg = 4
            doppler = 2
            "#,
        );
        assert!(result.is_err());
    }
}
