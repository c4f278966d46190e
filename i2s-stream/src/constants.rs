/// Ring buffer capacity in stereo frames.
pub const RING_CAPACITY_FRAMES: usize = 512;

/// Frames moved per hardware transfer (one ping-pong slot).
pub const TRANSFER_QUANTUM_FRAMES: usize = 256;

/// The only supported sample width.
pub const SUPPORTED_BITS_PER_SAMPLE: u8 = 16;

/// The only supported channel count (interleaved stereo).
pub const SUPPORTED_CHANNELS: u8 = 2;

/// Generator ticks per output bit-clock period (one per edge).
pub const DEFAULT_EDGE_FACTOR: u32 = 2;

/// CD-quality sample rate, the usual rate for decoded PCM.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
