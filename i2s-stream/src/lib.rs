//! # i2s-stream
//!
//! A `no_std`, zero-allocation streaming engine that feeds 16-bit stereo
//! PCM to an I2S DAC through autonomous DMA transfers. The application
//! hands off decoded frames without waiting on I/O; a transfer-complete
//! interrupt keeps the hardware fed from a lock-free ring.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Data | [`frame`] | Stereo sample pair, the unit of buffering |
//! | Buffering | [`io::ring`] | SPSC ring between application and ISR |
//! | Transfer | [`io::transfer`] | Ping-pong slots owned alternately by DMA and software |
//! | Scheduling | [`io::output_i2s`] | Start/stop/clear, completion handling |
//! | Setup | [`config`] | Format validation, bit clock and divisor |
//! | Hardware | [`peripheral`] | Traits for the signal generator and DMA channel |
//! | Reporting | [`stats`] / [`error`] | Underrun/overrun counters, init errors |
//!
//! ## Quick start
//!
//! ```ignore
//! use i2s_stream::config::{PinAssignment, StreamFormat};
//! use i2s_stream::io::{DefaultI2sOutput, I2sOutput};
//!
//! static OUTPUT: DefaultI2sOutput = I2sOutput::new();
//!
//! let (mut control, mut completion) = OUTPUT.init(
//!     StreamFormat::stereo16(44_100),
//!     PinAssignment::new(18, 16, 17),
//!     &mut generator,
//!     &channel,
//! )?;
//!
//! control.write(&frames);
//! control.start();
//!
//! // In the DMA ISR:
//! completion.on_transfer_complete();
//!
//! let stats = control.stats();
//! ```
//!
//! ## Audio parameters
//!
//! - **Format:** 16-bit signed stereo only
//! - **Ring:** 512 frames ([`constants::RING_CAPACITY_FRAMES`])
//! - **Quantum:** 256 frames per transfer ([`constants::TRANSFER_QUANTUM_FRAMES`])
//! - **Underrun:** a full quantum of silence; **overrun:** excess frames dropped

#![cfg_attr(not(test), no_std)]

pub mod constants;
pub mod frame;
pub mod config;
pub mod error;
pub mod peripheral;
pub mod stats;
pub mod io;

#[cfg(test)]
mod testing;

pub use error::{ConfigError, InitError};
pub use frame::Frame;
pub use stats::Stats;
