// src/adc/driver.rs
//! ADS1256 register driver: reset sequencing, identity check, configuration
//! bursts, data-ready polling and continuous-read framing.

use tracing::{debug, warn};

use crate::config::constants::signal::{ADC_24BIT_FULL_SCALE, FULL_SCALE_VOLTS, MAX_CHANNEL};
use crate::config::constants::timing::{CONFIG_SETTLE_MS, DRDY_POLL_LIMIT, RESET_SETTLE_MS};
use crate::error::AdcError;
use crate::hal::{BusAdapter, Level, Pin};

use super::registers::{Command, ConverterConfig, Register, CHIP_ID};

/// Driver state machine. Continuous read must be ended before the converter
/// can be reconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No acquisition in progress.
    Idle,
    /// Reset line sequence in progress.
    Resetting,
    /// Identity check and register burst in progress.
    Configuring,
    /// Converter streams conversions; chip select is held low.
    ContinuousRead,
}

/// Register driver for one ADS1256 on a [`BusAdapter`].
pub struct Ads1256<B: BusAdapter> {
    bus: B,
    state: DriverState,
    active: Option<ConverterConfig>,
}

impl<B: BusAdapter> Ads1256<B> {
    /// Wrap a bus adapter. The converter is untouched until [`Self::configure`].
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            state: DriverState::Idle,
            active: None,
        }
    }

    /// Current driver state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Configuration applied by the last successful [`Self::configure`].
    pub fn active_config(&self) -> Option<&ConverterConfig> {
        self.active.as_ref()
    }

    /// Drive the reset line high, low, high with a settle delay per level.
    pub async fn reset(&mut self) -> Result<(), AdcError> {
        self.state = DriverState::Resetting;
        self.bus.set_line(Pin::Reset, Level::High)?;
        self.bus.sleep_ms(RESET_SETTLE_MS).await;
        self.bus.set_line(Pin::Reset, Level::Low)?;
        self.bus.sleep_ms(RESET_SETTLE_MS).await;
        self.bus.set_line(Pin::Reset, Level::High)?;
        self.state = DriverState::Idle;
        self.active = None;
        Ok(())
    }

    /// Clock one command byte out with chip select framed around it.
    pub async fn write_command(&mut self, command: Command) -> Result<(), AdcError> {
        self.bus.set_line(Pin::ChipSelect, Level::Low)?;
        self.bus.transfer(&[command as u8]).await?;
        self.bus.set_line(Pin::ChipSelect, Level::High)?;
        Ok(())
    }

    /// Write one register.
    pub async fn write_register(&mut self, register: Register, value: u8) -> Result<(), AdcError> {
        self.bus.set_line(Pin::ChipSelect, Level::Low)?;
        self.bus
            .transfer(&[Command::WriteRegister as u8 | register as u8, 0x00, value])
            .await?;
        self.bus.set_line(Pin::ChipSelect, Level::High)?;
        Ok(())
    }

    /// Read one register.
    pub async fn read_register(&mut self, register: Register) -> Result<u8, AdcError> {
        self.bus.set_line(Pin::ChipSelect, Level::Low)?;
        self.bus
            .transfer(&[Command::ReadRegister as u8 | register as u8, 0x00])
            .await?;
        let response = self.bus.transfer(&[0x00]).await?;
        self.bus.set_line(Pin::ChipSelect, Level::High)?;
        Ok(response.first().copied().unwrap_or(0))
    }

    /// Poll the data-ready line (active low) up to the configured bound.
    pub fn wait_data_ready(&mut self) -> Result<(), AdcError> {
        for _ in 0..DRDY_POLL_LIMIT {
            if self.bus.read_line(Pin::DataReady)?.is_low() {
                return Ok(());
            }
        }
        warn!(polls = DRDY_POLL_LIMIT, "data-ready timeout");
        Err(AdcError::ReadTimeout {
            polls: DRDY_POLL_LIMIT,
        })
    }

    /// Part id nibble from the STATUS register.
    pub async fn chip_id(&mut self) -> Result<u8, AdcError> {
        self.wait_data_ready()?;
        Ok(self.read_register(Register::Status).await? >> 4)
    }

    /// Reset, verify identity and apply `config` in one framed register
    /// burst, then resynchronize the modulator.
    ///
    /// The identity check is rechecked once before the failure escalates as
    /// [`AdcError::DeviceNotResponding`].
    pub async fn configure(&mut self, config: ConverterConfig) -> Result<(), AdcError> {
        if config.channel > MAX_CHANNEL {
            return Err(AdcError::InvalidConfig("channel out of range 0..=7"));
        }
        if self.state == DriverState::ContinuousRead {
            return Err(AdcError::InvalidState(
                "end continuous read before reconfiguring",
            ));
        }

        self.reset().await?;
        self.state = DriverState::Configuring;

        let mut id = self.chip_id().await?;
        if id != CHIP_ID {
            id = self.chip_id().await?;
            if id != CHIP_ID {
                self.state = DriverState::Idle;
                return Err(AdcError::DeviceNotResponding {
                    expected: CHIP_ID,
                    found: id,
                });
            }
        }

        self.wait_data_ready()?;

        // Write STATUS, MUX, ADCON and DRATE in one frame: command byte,
        // count byte (registers minus one), then the payload.
        let burst = config.register_burst();
        self.bus.set_line(Pin::ChipSelect, Level::Low)?;
        self.bus
            .transfer(&[
                Command::WriteRegister as u8 | Register::Status as u8,
                (burst.len() - 1) as u8,
            ])
            .await?;
        self.bus.transfer(&burst).await?;
        self.bus.set_line(Pin::ChipSelect, Level::High)?;
        self.bus.sleep_ms(CONFIG_SETTLE_MS).await;

        self.write_command(Command::Sync).await?;
        self.write_command(Command::WakeUp).await?;
        self.wait_data_ready()?;

        debug!(
            channel = config.channel,
            drate = format_args!("{:#04x}", config.data_rate.code()),
            "converter configured"
        );
        self.active = Some(config);
        self.state = DriverState::Idle;
        Ok(())
    }

    /// Put the converter into read-continuous mode. Chip select stays low so
    /// sample frames can be clocked straight out.
    pub async fn begin_continuous_read(&mut self) -> Result<(), AdcError> {
        if self.active.is_none() {
            return Err(AdcError::InvalidState(
                "configure before starting continuous read",
            ));
        }
        if self.state == DriverState::ContinuousRead {
            return Err(AdcError::InvalidState("continuous read already active"));
        }
        self.bus.set_line(Pin::ChipSelect, Level::Low)?;
        self.bus
            .transfer(&[Command::ReadDataContinuous as u8])
            .await?;
        self.state = DriverState::ContinuousRead;
        Ok(())
    }

    /// Leave read-continuous mode and release chip select.
    pub async fn end_continuous_read(&mut self) -> Result<(), AdcError> {
        self.bus.set_line(Pin::ChipSelect, Level::High)?;
        self.bus
            .transfer(&[Command::StopReadContinuous as u8])
            .await?;
        self.state = DriverState::Idle;
        Ok(())
    }

    /// Block until data-ready asserts, then read one 24-bit frame and scale
    /// it to volts. Only valid in read-continuous mode.
    ///
    /// A [`AdcError::ReadTimeout`] here is recoverable: the calling phase
    /// loop retries the read.
    pub async fn read_sample(&mut self) -> Result<f64, AdcError> {
        if self.state != DriverState::ContinuousRead {
            return Err(AdcError::InvalidState(
                "read_sample requires continuous read mode",
            ));
        }
        self.wait_data_ready()?;
        let frame = self.bus.transfer(&[0x00, 0x00, 0x00]).await?;
        if frame.len() < 3 {
            return Err(AdcError::Bus(crate::error::BusError::Transfer(format!(
                "short sample frame: {} bytes",
                frame.len()
            ))));
        }
        Ok(volts_from_frame([frame[0], frame[1], frame[2]]))
    }
}

/// Sign-extend a 24-bit two's-complement frame (MSB first) and scale it to
/// the ±5 V input range.
pub fn volts_from_frame(frame: [u8; 3]) -> f64 {
    let mut code =
        ((frame[0] as i32) << 16) | ((frame[1] as i32) << 8) | (frame[2] as i32);
    if code & 0x80_0000 != 0 {
        code -= 0x100_0000;
    }
    code as f64 * FULL_SCALE_VOLTS / ADC_24BIT_FULL_SCALE as f64
}
