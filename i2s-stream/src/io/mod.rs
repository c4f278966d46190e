//! The streaming data plane.
//!
//! ## Components
//!
//! | Item | Context | Description |
//! |------|---------|-------------|
//! | [`RingBuffer`] | app → ISR | Lock-free SPSC frame ring |
//! | [`TransferSlots`] | ISR → DMA | Ping-pong transfer buffers |
//! | [`I2sOutput`] | both | Engine owning ring, slots, state and counters |
//! | [`OutputControl`] | app | Write, start, stop, clear, stats |
//! | [`Completion`] | ISR | Transfer-complete handler |
//!
//! ## Utilities
//!
//! - [`interleave`] — Frame ↔ transfer word packing
//!
//! ## Transfer Buffer Layout
//!
//! Each slot is a `[u32; Q]`:
//! - Each `u32` = one stereo frame (left in lower 16 bits, right in upper 16)
//! - One transfer moves a whole slot, then raises a completion interrupt
//! - The ISR re-arms on the other slot and refills the one just sent

pub mod interleave;
pub mod ring;
pub mod transfer;
pub mod output_i2s;

pub use output_i2s::{Completion, DefaultI2sOutput, I2sOutput, OutputControl, StreamState};
pub use ring::RingBuffer;
pub use transfer::{Slot, TransferSlots};
