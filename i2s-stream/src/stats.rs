/// Lifetime counters for the output.
///
/// Each counter has a single writer: `overruns` is bumped by the producer
/// when a write is truncated, `underruns` by the completion handler when a
/// quantum is replaced with silence. Both saturate and are only zeroed by
/// `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Quanta streamed as silence because the ring held less than a quantum.
    pub underruns: u32,
    /// `write` calls that dropped frames because the ring was full.
    pub overruns: u32,
}

impl Stats {
    /// `true` if any audio was dropped or padded since `init`.
    pub const fn has_glitched(&self) -> bool {
        self.underruns != 0 || self.overruns != 0
    }
}
