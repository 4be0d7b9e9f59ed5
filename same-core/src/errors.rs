//! EAS Station error types with granular per-subsystem categories

use thiserror::Error;

/// Top-level error type for all EAS Station core operations
#[derive(Debug, Error)]
pub enum SameError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Audio source / file loading errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Input file not found: {path}")]
    InputMissing { path: String },

    #[error("Audio backend unavailable: {reason}")]
    AudioUnavailable { reason: String },

    #[error("Failed to write archive file {path}: {reason}")]
    StorageError { path: String, reason: String },
}

/// SAME decode errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No SAME bursts detected in audio")]
    NoSignal,

    #[error("Bit framing consistently invalid: {frame_errors} errors over {frame_count} frames")]
    BadFraming {
        frame_count: usize,
        frame_errors: usize,
    },

    #[error("Invalid header text: {reason}")]
    InvalidHeader { reason: String },
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid FIPS code: {code}")]
    InvalidFipsCode { code: String },

    #[error("Unknown event code: {code}")]
    UnknownEventCode { code: String },

    #[error("Invalid station identity: {reason}")]
    InvalidStationIdentity { reason: String },

    #[error("Invalid sample rate: {rate} Hz (must be > 0)")]
    InvalidSampleRate { rate: usize },
}

/// GPIO controller errors
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("Pin {pin} is not configured")]
    PinNotConfigured { pin: u8 },

    #[error("Pin {pin} is disabled")]
    PinDisabled { pin: u8 },

    #[error("Pin {pin} is already active")]
    PinAlreadyActive { pin: u8 },

    #[error("Hardware backend failure on pin {pin}: {reason}")]
    HardwareError { pin: u8, reason: String },

    #[error("Pin {pin} exceeded watchdog timeout of {timeout_secs}s")]
    WatchdogTimeout { pin: u8, timeout_secs: f64 },
}

/// Continuous monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Audio loop stalled: no heartbeat for {elapsed_secs}s")]
    WatchdogTimeout { elapsed_secs: f64 },

    #[error("Scan worker pool exhausted ({active}/{max} active)")]
    ScanPoolExhausted { active: usize, max: usize },
}

/// Result type alias for EAS Station core operations
pub type Result<T> = std::result::Result<T, SameError>;
