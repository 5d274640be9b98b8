//! Olivia modem error types with granular categories.

use thiserror::Error;

/// Top-level error type for all modem operations.
#[derive(Debug, Error)]
pub enum OliviaError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("audio I/O error: {0}")]
    Audio(#[from] AudioError),
}

/// Configuration errors, raised by `ModemConfig::validate`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("symbol count {symbols} is not a power of two")]
    SymbolsNotPowerOfTwo { symbols: u32 },

    #[error("symbol count {symbols} must be between 2 and 256")]
    SymbolsOutOfRange { symbols: u32 },

    #[error("sample rate {sample_rate} Hz must be greater than zero")]
    InvalidSampleRate { sample_rate: u32 },

    #[error("bandwidth {bandwidth} Hz must be greater than zero")]
    InvalidBandwidth { bandwidth: u32 },

    #[error("centre frequency {centre_freq} Hz leaves no room for a {bandwidth} Hz band")]
    CentreFrequencyTooLow { centre_freq: u32, bandwidth: u32 },

    #[error("block threshold {threshold} must be finite and non-negative")]
    InvalidBlockThreshold { threshold: f32 },
}

/// Audio device / stream errors.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default input device available")]
    NoInputDevice,

    #[error("no default output device available")]
    NoOutputDevice,

    #[error("unsupported stream configuration: {reason}")]
    UnsupportedConfig { reason: String },

    #[error("audio stream build failed: {reason}")]
    StreamBuildFailed { reason: String },

    #[error("audio read timed out after {0:?}")]
    ReadTimeout(std::time::Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for modem operations.
pub type Result<T> = std::result::Result<T, OliviaError>;
