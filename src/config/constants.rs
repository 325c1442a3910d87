// src/config/constants.rs
//! System-wide constants: sampling rates, protocol timing and the fixed
//! parameters of the detection and processing stages.

/// Signal and converter constants
pub mod signal {
    /// Respiratory channel sampling rate.
    pub const BREATH_SAMPLE_RATE_HZ: u32 = 50;
    /// ECG channel sampling rate.
    pub const ECG_SAMPLE_RATE_HZ: u32 = 500;
    /// Doppler channel sampling rate.
    pub const DOPPLER_SAMPLE_RATE_HZ: u32 = 15_000;

    /// Full-scale input range of the converter in volts.
    pub const FULL_SCALE_VOLTS: f64 = 5.0;
    /// Positive full-scale code of the 24-bit converter.
    pub const ADC_24BIT_FULL_SCALE: i32 = 0x7f_ffff;
    /// Highest selectable multiplexer channel.
    pub const MAX_CHANNEL: u8 = 7;
}

/// Protocol and trigger timing constants
pub mod timing {
    /// Settle delay per level of the reset line sequence.
    pub const RESET_SETTLE_MS: u64 = 200;
    /// Settle delay after the configuration register burst.
    pub const CONFIG_SETTLE_MS: u64 = 1;
    /// Upper bound on data-ready polling iterations per read.
    pub const DRDY_POLL_LIMIT: u32 = 400_000;

    /// Width of the trigger pulse driving the inflation valve.
    pub const TRIGGER_PULSE_MS: u64 = 200;
    /// Post-pulse settle before the trigger task completes.
    pub const TRIGGER_SETTLE_MS: u64 = 5_000;
}

/// Phase detection constants
pub mod detection {
    /// ECG monitoring window used for threshold calibration, in seconds.
    pub const ECG_CALIBRATION_SECS: u32 = 10;
    /// Fraction of peak-to-peak amplitude above the mean for the initial
    /// ECG threshold.
    pub const ECG_THRESHOLD_FRACTION: f64 = 0.15;
    /// Per-iteration threshold increment during refinement, as a fraction of
    /// peak-to-peak amplitude.
    pub const ECG_REFINE_STEP: f64 = 0.02;
    /// A calibration window with more supra-threshold peaks than this is
    /// probably intercepting T-waves.
    pub const ECG_MAX_PEAKS: usize = 15;
    /// Hard cap on refinement iterations.
    pub const ECG_REFINE_CAP: usize = 40;
    /// Fallback threshold fraction applied when the cap is reached.
    pub const ECG_FALLBACK_FRACTION: f64 = 0.5;

    /// Seed window for the respiratory threshold, in seconds.
    pub const BREATH_SEED_SECS: u32 = 5;
    /// Respiratory threshold refresh interval, in seconds.
    pub const BREATH_REFRESH_SECS: u32 = 1;
    /// Consecutive samples required on each side of the threshold crossing.
    pub const HYSTERESIS_SAMPLES: usize = 5;

    /// R-wave search window per attempt, in seconds.
    pub const RWAVE_WINDOW_SECS: u32 = 1;
}

/// Doppler pipeline constants
pub mod pipeline {
    /// Doppler capture length, in seconds.
    pub const CAPTURE_SECS: u32 = 1;
    /// Fractional smoothing span of the local-regression step.
    pub const LOWESS_SPAN: f64 = 0.1;
    /// Divisor applied to the sampling rate to size the RMS window.
    pub const RMS_WINDOW_DIVISOR: u32 = 100;
    /// Initial blanking interval where no footprint can appear, as a
    /// fraction of the sampling rate.
    pub const BLANKING_FRACTION: f64 = 0.1;
    /// Minimum peak width, as a fraction of the sampling rate.
    pub const MIN_PEAK_WIDTH_FRACTION: f64 = 0.1;
    /// Footprint threshold as a percentage of peak-to-valley amplitude.
    pub const FOOT_THRESHOLD_PERCENT: f64 = 5.0;
    /// Deviation bound, in standard deviations, for outlier flagging.
    pub const OUTLIER_SIGMA: f64 = 3.0;
}
