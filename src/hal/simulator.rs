// src/hal/simulator.rs
//! Protocol-level converter simulator.
//!
//! Implements the bus adapter and trigger actuator traits over a shared
//! register file that decodes the converter's command set, so the register
//! driver and the acquisition state machine run unmodified against it. The
//! multiplexer channel selects which synthetic physiological signal is
//! streamed: a slow respiratory sine, an R-spike ECG train or a Doppler
//! burst with a known onset.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::adc::{Command, DataRate, CHIP_ID};
use crate::error::BusError;
use crate::hal::traits::{BusAdapter, TriggerActuator};
use crate::hal::types::{Level, Pin};

const REGISTER_COUNT: usize = 11;
const STATUS_ID_NIBBLE: u8 = CHIP_ID << 4;

/// Synthetic source parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Channel carrying the respiratory sine.
    pub breath_channel: u8,
    /// Channel carrying the ECG spike train.
    pub ecg_channel: u8,
    /// Channel carrying the Doppler burst.
    pub doppler_channel: u8,
    /// Respiratory period in seconds.
    pub breath_period_s: f64,
    /// Heart period in seconds.
    pub heart_period_s: f64,
    /// Onset of the Doppler burst within a capture, in seconds.
    pub doppler_onset_s: f64,
    /// Uniform noise amplitude added to every sample, in volts.
    pub noise_level: f64,
    /// Seed for the noise generator, so runs are reproducible.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            breath_channel: 7,
            ecg_channel: 4,
            doppler_channel: 2,
            breath_period_s: 4.0,
            heart_period_s: 1.0,
            doppler_onset_s: 0.2,
            noise_level: 0.001,
            seed: 42,
        }
    }
}

/// What the next transfer means, when the previous one left the protocol
/// mid-transaction.
#[derive(Debug, Clone, Copy)]
enum Pending {
    /// Register read-back byte queued by a RREG frame.
    ReadByte(u8),
    /// WREG burst header seen: the next transfer carries `len` register
    /// values starting at `start`.
    BurstWrite { start: usize, len: usize },
}

#[derive(Debug)]
struct SimState {
    config: SimulatorConfig,
    registers: [u8; REGISTER_COUNT],
    continuous: bool,
    pending: Option<Pending>,
    sample_index: u64,
    rng: StdRng,
    pulses: u32,
    trigger_level: Level,
}

impl SimState {
    fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let mut state = Self {
            config,
            registers: [0; REGISTER_COUNT],
            continuous: false,
            pending: None,
            sample_index: 0,
            rng,
            pulses: 0,
            trigger_level: Level::Low,
        };
        state.power_on_reset();
        state
    }

    fn power_on_reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[0] = STATUS_ID_NIBBLE | 0x01;
        self.registers[1] = 0x01;
        self.registers[2] = 0x20;
        self.registers[3] = 0xF0;
        self.continuous = false;
        self.pending = None;
        self.sample_index = 0;
    }

    fn write_register(&mut self, address: usize, value: u8) {
        if address >= REGISTER_COUNT {
            return;
        }
        if address == 0 {
            // the id nibble of STATUS is read-only
            self.registers[0] = STATUS_ID_NIBBLE | (value & 0x0F);
        } else {
            self.registers[address] = value;
        }
    }

    fn active_rate(&self) -> f64 {
        DataRate::from_code(self.registers[3])
            .map(DataRate::samples_per_second)
            .unwrap_or(30_000.0)
    }

    fn next_frame(&mut self) -> [u8; 3] {
        let t = self.sample_index as f64 / self.active_rate();
        self.sample_index += 1;
        let volts = self.voltage_at(t);
        encode_frame(volts)
    }

    fn voltage_at(&mut self, t: f64) -> f64 {
        let channel = self.registers[1] >> 4;
        let config = &self.config;
        let noise = if config.noise_level > 0.0 {
            self.rng.gen_range(-config.noise_level..=config.noise_level)
        } else {
            0.0
        };

        if channel == config.breath_channel {
            0.5 * (std::f64::consts::TAU * t / config.breath_period_s).sin() + noise
        } else if channel == config.ecg_channel {
            let phase = t % config.heart_period_s;
            let spike = if phase < 0.02 {
                1.0 - (phase - 0.01).abs() / 0.01
            } else {
                0.0
            };
            spike + noise
        } else if channel == config.doppler_channel {
            let center = config.doppler_onset_s + 0.05;
            let envelope = (-(t - center) * (t - center) / (2.0 * 0.02 * 0.02)).exp();
            2.0 * envelope * (std::f64::consts::TAU * 800.0 * t).sin() + noise
        } else {
            noise
        }
    }

    fn handle_transfer(&mut self, out: &[u8]) -> Vec<u8> {
        let mut response = vec![0u8; out.len()];
        if out.is_empty() {
            return response;
        }

        match self.pending.take() {
            Some(Pending::ReadByte(value)) => {
                response[0] = value;
                return response;
            }
            Some(Pending::BurstWrite { start, len }) if out.len() == len => {
                for (offset, &value) in out.iter().enumerate() {
                    self.write_register(start + offset, value);
                }
                return response;
            }
            Some(Pending::BurstWrite { .. }) | None => {}
        }

        if self.continuous && out.len() == 3 && out.iter().all(|&b| b == 0) {
            let frame = self.next_frame();
            response.copy_from_slice(&frame);
            return response;
        }

        let command = out[0];
        match command & 0xF0 {
            0x50 => {
                let start = (command & 0x0F) as usize;
                if out.len() == 2 {
                    // burst header: count byte is registers minus one
                    self.pending = Some(Pending::BurstWrite {
                        start,
                        len: out[1] as usize + 1,
                    });
                } else if out.len() >= 3 {
                    self.write_register(start, out[2]);
                }
            }
            0x10 => {
                let address = (command & 0x0F) as usize;
                let value = self
                    .registers
                    .get(address)
                    .copied()
                    .unwrap_or(0);
                self.pending = Some(Pending::ReadByte(value));
            }
            _ => {
                if command == Command::Reset as u8 {
                    self.power_on_reset();
                } else if command == Command::ReadDataContinuous as u8 {
                    self.continuous = true;
                } else if command == Command::StopReadContinuous as u8 {
                    self.continuous = false;
                } else if command == Command::Sync as u8 {
                    self.sample_index = 0;
                }
                // WAKEUP, STANDBY and the calibration commands need no model
            }
        }
        response
    }
}

fn encode_frame(volts: f64) -> [u8; 3] {
    let code = (volts / 5.0 * 0x7f_ffff as f64)
        .round()
        .clamp(-8_388_608.0, 8_388_607.0) as i32;
    let bits = (code as u32) & 0xff_ffff;
    [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
}

/// Shared simulator backing one bus adapter and one trigger actuator.
#[derive(Debug, Clone)]
pub struct SignalSimulator {
    state: Arc<Mutex<SimState>>,
}

impl SignalSimulator {
    /// Build a simulator from the given source parameters.
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(config))),
        }
    }

    /// Bus adapter view of this simulator.
    pub fn bus(&self) -> SimulatedBus {
        SimulatedBus {
            state: Arc::clone(&self.state),
        }
    }

    /// Trigger actuator view of this simulator.
    pub fn actuator(&self) -> SimulatedActuator {
        SimulatedActuator {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of trigger pulses fired so far.
    pub fn pulse_count(&self) -> u32 {
        self.state.lock().pulses
    }
}

impl Default for SignalSimulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

/// Bus adapter half of the simulator.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl BusAdapter for SimulatedBus {
    fn set_line(&mut self, pin: Pin, _level: Level) -> Result<(), BusError> {
        match pin {
            // reset is modelled through the RESET command; the line sequence
            // itself has no observable effect on the register file
            Pin::Reset | Pin::ChipSelect => Ok(()),
            Pin::DataReady => Err(BusError::UnknownLine(pin)),
            Pin::Trigger => Ok(()),
        }
    }

    fn read_line(&mut self, pin: Pin) -> Result<Level, BusError> {
        match pin {
            // a conversion is always ready
            Pin::DataReady => Ok(Level::Low),
            Pin::Trigger => Ok(self.state.lock().trigger_level),
            Pin::Reset | Pin::ChipSelect => Err(BusError::UnknownLine(pin)),
        }
    }

    async fn transfer(&mut self, out: &[u8]) -> Result<Vec<u8>, BusError> {
        Ok(self.state.lock().handle_transfer(out))
    }

    async fn sleep_ms(&mut self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Trigger actuator half of the simulator.
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl TriggerActuator for SimulatedActuator {
    async fn pulse(&self, duration_ms: u64) -> Result<(), BusError> {
        {
            let mut state = self.state.lock();
            state.trigger_level = Level::High;
            state.pulses += 1;
        }
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        self.state.lock().trigger_level = Level::Low;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_status_carries_the_part_id() {
        let state = SimState::new(SimulatorConfig::default());
        assert_eq!(state.registers[0] >> 4, CHIP_ID);
    }

    #[test]
    fn wreg_burst_lands_in_the_register_file() {
        let mut state = SimState::new(SimulatorConfig::default());
        state.handle_transfer(&[0x50, 0x03]);
        state.handle_transfer(&[0x04, 0x48, 0x20, 0x92]);
        assert_eq!(state.registers[0], STATUS_ID_NIBBLE | 0x04);
        assert_eq!(state.registers[1], 0x48);
        assert_eq!(state.registers[2], 0x20);
        assert_eq!(state.registers[3], 0x92);
    }

    #[test]
    fn rreg_reads_back_the_queued_byte() {
        let mut state = SimState::new(SimulatorConfig::default());
        state.handle_transfer(&[0x10, 0x00]);
        let response = state.handle_transfer(&[0x00]);
        assert_eq!(response[0] >> 4, CHIP_ID);
    }

    #[test]
    fn continuous_mode_streams_frames() {
        let mut state = SimState::new(SimulatorConfig::default());
        state.handle_transfer(&[0x50, 0x03]);
        state.handle_transfer(&[0x04, 0x48, 0x20, 0x92]);
        state.handle_transfer(&[Command::Sync as u8]);
        state.handle_transfer(&[Command::ReadDataContinuous as u8]);
        let frame = state.handle_transfer(&[0x00, 0x00, 0x00]);
        assert_eq!(frame.len(), 3);
        // first ECG sample sits on the rising R-spike edge
        let volts = crate::adc::volts_from_frame([frame[0], frame[1], frame[2]]);
        assert!((-5.0..=5.0).contains(&volts));
    }

    #[test]
    fn sync_restarts_the_sample_clock() {
        let mut state = SimState::new(SimulatorConfig::default());
        state.handle_transfer(&[Command::ReadDataContinuous as u8]);
        state.handle_transfer(&[0x00, 0x00, 0x00]);
        state.handle_transfer(&[0x00, 0x00, 0x00]);
        assert_eq!(state.sample_index, 2);
        state.continuous = false;
        state.handle_transfer(&[Command::Sync as u8]);
        assert_eq!(state.sample_index, 0);
    }

    #[test]
    fn frame_encoding_round_trips() {
        for volts in [-4.9, -1.0, 0.0, 0.5, 4.9] {
            let decoded = crate::adc::volts_from_frame(encode_frame(volts));
            assert!((decoded - volts).abs() < 1e-5, "{volts} vs {decoded}");
        }
    }
}
