//! Conversion between [`Frame`]s and transfer words.
//!
//! ## Transfer Word Format
//!
//! Each `u32` in a transfer slot carries one stereo frame:
//! - Lower 16 bits (bits 0–15): left channel sample (`i16`)
//! - Upper 16 bits (bits 16–31): right channel sample (`i16`)
//!
//! On a little-endian core this is `[left, right]` as consecutive `i16`
//! values in memory, so the signal generator can shift out one frame per
//! FIFO word.

use crate::frame::Frame;

/// Pack one frame into a transfer word: `(right << 16) | (left & 0xFFFF)`.
#[inline]
pub const fn pack(frame: Frame) -> u32 {
    (frame.left as u16 as u32) | ((frame.right as u16 as u32) << 16)
}

/// Split a transfer word back into its frame.
#[inline]
pub const fn unpack(word: u32) -> Frame {
    Frame {
        left: word as i16,
        right: (word >> 16) as i16,
    }
}

/// Fill a region of a transfer slot with silence (zero for both channels).
pub fn silence(dest: &mut [u32]) {
    dest.fill(0);
}
