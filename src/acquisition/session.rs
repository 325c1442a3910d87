// src/acquisition/session.rs
//! The acquisition state machine: ECG threshold calibration, expiration
//! gating, R-wave gating, concurrent trigger and Doppler capture, then the
//! latency pipeline.
//!
//! One thread owns the bus for the whole session; the only concurrency is
//! the trigger task spawned per cycle, joined before the cycle finalizes.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::adc::{Ads1256, ConverterConfig, DataRate, Gain};
use crate::config::constants::pipeline::CAPTURE_SECS;
use crate::config::constants::signal::{
    BREATH_SAMPLE_RATE_HZ, DOPPLER_SAMPLE_RATE_HZ, ECG_SAMPLE_RATE_HZ,
};
use crate::config::SystemConfig;
use crate::error::{AdcError, NoRWaveDetected, VpwvError, VpwvResult};
use crate::hal::{BusAdapter, TriggerActuator};
use crate::processing::{doppler_latency, MeasurementResult};

use super::detectors::{calibrate_ecg_threshold, EcgCalibration, ExpirationDetector};

/// Which signal a phase samples. Each kind maps to one converter setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Respiratory belt, 50 Hz.
    Breath,
    /// ECG, 500 Hz.
    Ecg,
    /// Doppler audio, 15 kHz.
    Doppler,
}

impl SignalKind {
    /// Fixed sampling rate of this signal.
    pub fn sample_rate_hz(self) -> u32 {
        match self {
            SignalKind::Breath => BREATH_SAMPLE_RATE_HZ,
            SignalKind::Ecg => ECG_SAMPLE_RATE_HZ,
            SignalKind::Doppler => DOPPLER_SAMPLE_RATE_HZ,
        }
    }

    fn data_rate(self) -> DataRate {
        match self {
            SignalKind::Breath => DataRate::Sps50,
            SignalKind::Ecg => DataRate::Sps500,
            SignalKind::Doppler => DataRate::Sps15000,
        }
    }
}

/// Phases of the measurement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Between cycles.
    Idle,
    /// One-time ECG threshold calibration.
    Calibrating,
    /// Sampling the respiratory channel for the expiration crossing.
    AwaitingExpiration,
    /// Sampling the ECG channel for a supra-threshold beat.
    AwaitingRWave,
    /// Trigger pulse and Doppler capture running concurrently.
    Capturing,
    /// Latency pipeline running on the capture.
    Processing,
    /// Loop suspended by the controller.
    Paused,
}

/// External control surface for a running session. Flags are observed at
/// phase boundaries only, never mid-phase, so plain atomics suffice.
#[derive(Debug, Default)]
pub struct SessionControl {
    paused: AtomicBool,
    stopped: AtomicBool,
    trigger_delay_ms: AtomicU64,
}

impl SessionControl {
    /// Suspend the loop before its next cycle.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Re-enter the loop without recalibrating.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Stop the loop entirely.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Delay between R-wave detection and the trigger pulse. Consumed at
    /// trigger time; takes effect from the next cycle.
    pub fn set_delay(&self, ms: u64) {
        self.trigger_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Whether the loop is currently suspended.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether the loop was asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Configured trigger delay in milliseconds.
    pub fn delay_ms(&self) -> u64 {
        self.trigger_delay_ms.load(Ordering::SeqCst)
    }
}

/// Write-only sink receiving each completed measurement. The core never
/// reads this data back.
pub trait MeasurementSink: Send {
    /// Sink-specific failure type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append one measurement.
    fn record(&mut self, result: &MeasurementResult) -> Result<(), Self::Error>;
}

/// Discards every measurement; for sessions without persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MeasurementSink for NullSink {
    type Error = Infallible;

    fn record(&mut self, _result: &MeasurementResult) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The per-session acquisition state machine.
pub struct AcquisitionSession<B: BusAdapter, A: TriggerActuator + 'static> {
    driver: Ads1256<B>,
    actuator: Arc<A>,
    config: SystemConfig,
    control: Arc<SessionControl>,
    ecg_threshold: Option<f64>,
    phase: Phase,
}

impl<B: BusAdapter, A: TriggerActuator + 'static> AcquisitionSession<B, A> {
    /// Build a session over a bus adapter and a trigger actuator. The
    /// returned control handle is shared with the caller (typically the GUI
    /// layer).
    pub fn new(bus: B, actuator: A, config: SystemConfig) -> (Self, Arc<SessionControl>) {
        let control = Arc::new(SessionControl::default());
        let session = Self {
            driver: Ads1256::new(bus),
            actuator: Arc::new(actuator),
            config,
            control: Arc::clone(&control),
            ecg_threshold: None,
            phase: Phase::Idle,
        };
        (session, control)
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Calibrated R-wave threshold, if calibration has run.
    pub fn ecg_threshold(&self) -> Option<f64> {
        self.ecg_threshold
    }

    fn converter_config(&self, kind: SignalKind) -> ConverterConfig {
        let channel = match kind {
            SignalKind::Breath => self.config.channels.breath,
            SignalKind::Ecg => self.config.channels.ecg,
            SignalKind::Doppler => self.config.channels.doppler,
        };
        ConverterConfig {
            gain: Gain::X1,
            data_rate: kind.data_rate(),
            channel,
        }
    }

    async fn begin_phase(&mut self, kind: SignalKind) -> Result<(), AdcError> {
        self.driver.configure(self.converter_config(kind)).await?;
        self.driver.begin_continuous_read().await
    }

    async fn end_phase(&mut self) -> Result<(), AdcError> {
        self.driver.end_continuous_read().await
    }

    /// One sample off the bus, retrying through data-ready timeouts. The
    /// driver already warn-logs each timeout.
    async fn read_retry(&mut self) -> Result<f64, AdcError> {
        loop {
            match self.driver.read_sample().await {
                Ok(sample) => return Ok(sample),
                Err(error) if error.is_recoverable() => continue,
                Err(error) => return Err(error),
            }
        }
    }

    async fn collect(&mut self, count: usize) -> Result<Vec<f64>, AdcError> {
        let mut buffer = Vec::with_capacity(count);
        for _ in 0..count {
            buffer.push(self.read_retry().await?);
        }
        Ok(buffer)
    }

    /// One-time ECG threshold calibration at session start. Returns the
    /// threshold together with the monitoring buffer so the caller can
    /// display it.
    pub async fn calibrate(&mut self) -> VpwvResult<EcgCalibration> {
        self.phase = Phase::Calibrating;
        info!(
            secs = self.config.detection.ecg_calibration_secs,
            "ECG monitoring for threshold calibration"
        );
        self.begin_phase(SignalKind::Ecg).await?;
        let samples =
            (ECG_SAMPLE_RATE_HZ * self.config.detection.ecg_calibration_secs) as usize;
        let buffer = self.collect(samples).await?;
        self.end_phase().await?;

        let threshold = calibrate_ecg_threshold(&buffer, &self.config.detection);
        self.ecg_threshold = Some(threshold);
        self.phase = Phase::Idle;
        Ok(EcgCalibration { threshold, buffer })
    }

    /// Sample the respiratory channel until the expiration crossing fires,
    /// appending to `breath` (the buffer accumulates across retries within
    /// a cycle).
    async fn await_expiration(&mut self, breath: &mut Vec<f64>) -> VpwvResult<()> {
        self.phase = Phase::AwaitingExpiration;
        self.begin_phase(SignalKind::Breath).await?;

        let rate = SignalKind::Breath.sample_rate_hz();
        let seed_len = (rate * self.config.detection.breath_seed_secs) as usize;
        let seed = self.collect(seed_len).await?;
        breath.extend_from_slice(&seed);

        let mut detector = ExpirationDetector::new(breath, rate, &self.config.detection);
        debug!(threshold = detector.threshold(), "searching for expiratory phase");
        loop {
            let sample = self.read_retry().await?;
            breath.push(sample);
            if detector.update(breath) {
                break;
            }
        }

        self.end_phase().await?;
        info!(threshold = detector.threshold(), "expiratory phase detected");
        Ok(())
    }

    /// Sample the ECG channel for up to one search window; true once a
    /// supra-threshold sample is seen.
    async fn await_rwave(&mut self, ecg: &mut Vec<f64>) -> VpwvResult<bool> {
        let threshold = self
            .ecg_threshold
            .ok_or_else(|| VpwvError::Config("calibrate before running the loop".into()))?;

        self.phase = Phase::AwaitingRWave;
        self.begin_phase(SignalKind::Ecg).await?;

        let rate = SignalKind::Ecg.sample_rate_hz();
        let bound = (rate * self.config.detection.rwave_window_secs) as usize;
        let mut found = false;
        for _ in 0..bound {
            let sample = self.read_retry().await?;
            ecg.push(sample);
            if sample >= threshold {
                found = true;
                info!("R-wave detected");
                break;
            }
        }

        self.end_phase().await?;
        if !found {
            warn!("{NoRWaveDetected}");
        }
        Ok(found)
    }

    /// Switch to the Doppler channel, fire the trigger task and capture
    /// exactly one second of samples. The trigger task (pulse plus settle)
    /// runs concurrently; the returned handle is joined by the caller.
    async fn capture_doppler(
        &mut self,
    ) -> VpwvResult<(Vec<f64>, tokio::task::JoinHandle<()>)> {
        self.phase = Phase::Capturing;

        let delay_ms = self.control.delay_ms();
        if delay_ms > 0 {
            debug!(delay_ms, "delaying trigger");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        self.begin_phase(SignalKind::Doppler).await?;

        let actuator = Arc::clone(&self.actuator);
        let pulse_ms = self.config.trigger.pulse_ms;
        let settle_ms = self.config.trigger.settle_ms;
        let trigger_task = tokio::spawn(async move {
            info!(pulse_ms, "trigger");
            if let Err(error) = actuator.pulse(pulse_ms).await {
                warn!(%error, "trigger pulse failed");
            }
            tokio::time::sleep(Duration::from_millis(settle_ms)).await;
        });

        let samples = (SignalKind::Doppler.sample_rate_hz() * CAPTURE_SECS) as usize;
        let doppler = self.collect(samples).await?;
        self.end_phase().await?;
        debug!(samples = doppler.len(), "Doppler signal acquired");

        Ok((doppler, trigger_task))
    }

    /// One full measurement cycle: expiration gate, R-wave gate, concurrent
    /// trigger and Doppler capture, then the latency pipeline.
    ///
    /// A missed beat restarts the gating from the respiratory phase rather
    /// than surfacing an error.
    pub async fn run_cycle(&mut self) -> VpwvResult<MeasurementResult> {
        let mut breath = Vec::new();
        let mut ecg = Vec::new();

        loop {
            self.await_expiration(&mut breath).await?;
            if self.await_rwave(&mut ecg).await? {
                break;
            }
        }

        let (doppler, trigger_task) = self.capture_doppler().await?;

        self.phase = Phase::Processing;
        let (latency_s, envelope) =
            doppler_latency(&doppler, SignalKind::Doppler.sample_rate_hz());
        info!(latency_s, "cycle complete");

        // barrier: the cycle is final only once the trigger task is done too
        trigger_task
            .await
            .map_err(|error| VpwvError::Processing(format!("trigger task failed: {error}")))?;
        self.phase = Phase::Idle;

        Ok(MeasurementResult {
            latency_s,
            envelope,
            breath,
            ecg,
            doppler,
        })
    }

    /// Run cycles until stopped, recording each result to `sink`. Pause and
    /// resume are honoured only between cycles; calibration must have run
    /// first.
    pub async fn run<S: MeasurementSink>(&mut self, sink: &mut S) -> VpwvResult<()> {
        if self.ecg_threshold.is_none() {
            return Err(VpwvError::Config("calibrate before running the loop".into()));
        }
        loop {
            if self.control.is_stopped() {
                self.phase = Phase::Idle;
                info!("measurement loop stopped");
                return Ok(());
            }
            if self.control.is_paused() {
                self.phase = Phase::Paused;
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
            let result = self.run_cycle().await?;
            sink.record(&result)
                .map_err(|error| VpwvError::Sink(error.to_string()))?;
        }
    }
}
