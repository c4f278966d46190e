//! Stream format and clock derivation.
//!
//! The bit clock for 16-bit stereo I2S is `sample_rate × 16 × 2`. The
//! generator runs `edge_factor` ticks per bit-clock period, so its clock
//! must be divided down from the system clock by
//!
//! ```text
//! divisor = system_clock / (bit_clock × edge_factor)
//! ```
//!
//! and the divisor is programmed in 16.8 fixed point. At 44.1 kHz from a
//! 125 MHz system clock that is `44 + 74/256`, giving ≈ 44 099.4 Hz.

use core::fmt;

use crate::constants::{DEFAULT_SAMPLE_RATE, SUPPORTED_BITS_PER_SAMPLE, SUPPORTED_CHANNELS};
use crate::error::ConfigError;

/// Requested PCM format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u8,
    pub channels: u8,
}

impl StreamFormat {
    pub const fn new(sample_rate: u32, bits_per_sample: u8, channels: u8) -> Self {
        StreamFormat {
            sample_rate,
            bits_per_sample,
            channels,
        }
    }

    /// 16-bit stereo at `sample_rate`, the one supported format.
    pub const fn stereo16(sample_rate: u32) -> Self {
        Self::new(sample_rate, SUPPORTED_BITS_PER_SAMPLE, SUPPORTED_CHANNELS)
    }

    /// Check the format against what the output can stream.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bits_per_sample != SUPPORTED_BITS_PER_SAMPLE || self.channels != SUPPORTED_CHANNELS {
            return Err(ConfigError::UnsupportedFormat {
                bits_per_sample: self.bits_per_sample,
                channels: self.channels,
            });
        }
        if self.sample_rate == 0 || self.checked_bit_clock_hz().is_none() {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }

    fn checked_bit_clock_hz(&self) -> Option<u32> {
        self.sample_rate
            .checked_mul(self.bits_per_sample as u32)?
            .checked_mul(self.channels as u32)
    }

    /// Bit-clock frequency in Hz. Saturates for rates `validate` rejects.
    pub fn bit_clock_hz(&self) -> u32 {
        self.checked_bit_clock_hz().unwrap_or(u32::MAX)
    }
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self::stereo16(DEFAULT_SAMPLE_RATE)
    }
}

/// GPIO numbers handed through to the signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    /// Serial data out (DIN on the DAC).
    pub data: u8,
    /// Bit clock (BCK).
    pub bit_clock: u8,
    /// Word select / left-right clock (LRCK).
    pub word_select: u8,
}

impl PinAssignment {
    pub const fn new(data: u8, bit_clock: u8, word_select: u8) -> Self {
        PinAssignment {
            data,
            bit_clock,
            word_select,
        }
    }
}

/// Generator clock divisor in 16.8 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDivisor {
    pub integer: u16,
    /// Fractional part in 1/256 steps.
    pub fraction: u8,
}

impl ClockDivisor {
    /// Smallest divisor (generator at full system clock).
    pub const UNITY: ClockDivisor = ClockDivisor {
        integer: 1,
        fraction: 0,
    };

    /// Divisor that runs the generator at `bit_clock_hz × edge_factor`.
    pub fn for_bit_clock(
        system_hz: u32,
        bit_clock_hz: u32,
        edge_factor: u32,
    ) -> Result<Self, ConfigError> {
        let target_hz = bit_clock_hz.saturating_mul(edge_factor);
        let out_of_range = ConfigError::ClockOutOfRange {
            system_hz,
            target_hz,
        };
        if target_hz == 0 {
            return Err(out_of_range);
        }

        Self::from_f32(system_hz as f32 / target_hz as f32).ok_or(out_of_range)
    }

    /// Quantize a divisor to 1/256. `None` outside `[1.0, 65536.0)`.
    pub fn from_f32(divisor: f32) -> Option<Self> {
        // Also rejects NaN.
        if !(1.0..65_536.0).contains(&divisor) {
            return None;
        }

        let mut integer = libm::floorf(divisor) as u32;
        let mut fraction = libm::roundf((divisor - integer as f32) * 256.0) as u32;
        if fraction == 256 {
            integer += 1;
            fraction = 0;
        }
        if integer > u16::MAX as u32 {
            return None;
        }

        Some(ClockDivisor {
            integer: integer as u16,
            fraction: fraction as u8,
        })
    }

    pub fn as_f32(&self) -> f32 {
        self.integer as f32 + self.fraction as f32 / 256.0
    }

    /// Sample rate actually produced once the divisor is quantized.
    pub fn effective_sample_rate(
        &self,
        system_hz: u32,
        format: &StreamFormat,
        edge_factor: u32,
    ) -> f32 {
        let ticks_per_frame =
            edge_factor as f32 * format.bits_per_sample as f32 * format.channels as f32;
        system_hz as f32 / (self.as_f32() * ticks_per_frame)
    }
}

impl fmt::Display for ClockDivisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}/256", self.integer, self.fraction)
    }
}
