//! Error types for output initialization.
//!
//! Only `init` can fail. Overruns and underruns are not errors: they are
//! absorbed by truncation or silence and surface through
//! [`Stats`](crate::stats::Stats).

use thiserror::Error;

/// The requested configuration cannot be honoured.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported format {bits_per_sample}-bit/{channels}ch, only 16-bit stereo is supported")]
    UnsupportedFormat { bits_per_sample: u8, channels: u8 },

    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(u32),

    /// The generator cannot be divided down to the required rate.
    #[error("cannot derive a {target_hz} Hz generator clock from a {system_hz} Hz system clock")]
    ClockOutOfRange { system_hz: u32, target_hz: u32 },

    #[error("output already initialized")]
    AlreadyInitialized,
}

/// Failure from [`I2sOutput::init`](crate::io::I2sOutput::init).
///
/// Generic over the signal generator's own error type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InitError<E> {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The signal generator refused the program or pins. Nothing was claimed.
    #[error("signal generator rejected configuration: {0:?}")]
    Peripheral(E),
}
