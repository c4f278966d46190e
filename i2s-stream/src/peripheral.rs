//! Hardware collaborators driven by the output.
//!
//! The output never touches registers itself. A board support layer
//! implements these two traits for its serial-audio signal generator (for
//! example a PIO state machine running an I2S program) and the DMA channel
//! feeding it.

use crate::config::{ClockDivisor, PinAssignment};
use crate::constants::DEFAULT_EDGE_FACTOR;

/// Signal generator producing bit clock, word select and data.
///
/// Owned exclusively by the control side.
pub trait SignalGenerator {
    /// Error type for configuration.
    type Error: core::fmt::Debug;

    /// Frequency of the clock the divisor is applied to, in Hz.
    fn system_clock_hz(&self) -> u32;

    /// Generator ticks per output bit-clock period.
    fn edge_factor(&self) -> u32 {
        DEFAULT_EDGE_FACTOR
    }

    /// Claim a program slot, route the pins and program the divisor.
    ///
    /// Must be all-or-nothing: on `Err`, nothing stays claimed.
    fn configure(&mut self, divisor: ClockDivisor, pins: PinAssignment)
        -> Result<(), Self::Error>;

    /// Start or stop clocking data out.
    fn enable(&mut self, enabled: bool);

    /// Return the resources taken by [`configure()`](Self::configure).
    fn release(&mut self);
}

/// One-shot transfer engine moving a slot into the generator's FIFO.
///
/// Methods take `&self` because both the control side and the completion
/// interrupt drive the same channel, as with memory-mapped channel
/// registers. The destination is fixed when the channel is bound to the
/// generator.
pub trait TransferChannel {
    /// Schedule one autonomous transfer of `words` words starting at `source`.
    ///
    /// # Safety
    ///
    /// The buffer must stay valid and unmodified until the transfer
    /// completes or is aborted.
    unsafe fn arm(&self, source: *const u32, words: usize);

    /// Cancel the in-flight transfer immediately.
    fn abort(&self);

    /// Enable or disable the completion interrupt.
    fn listen(&self, enabled: bool);

    /// Clear a pending completion. Returns `false` if this channel had none
    /// (for example when the interrupt line is shared).
    fn acknowledge(&self) -> bool;
}
