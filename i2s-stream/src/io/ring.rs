//! Lock-free single-producer single-consumer (SPSC) frame ring.
//!
//! Decouples application write timing from hardware consumption timing.
//! The application writes frames; the transfer-complete interrupt drains
//! them one quantum at a time into the idle transfer slot.
//!
//! # Safety Contract
//!
//! - Only ONE context may call the producer methods ([`write()`](RingBuffer::write),
//!   [`write_interleaved()`](RingBuffer::write_interleaved)).
//! - Only ONE context may call the consumer methods ([`drain()`](RingBuffer::drain),
//!   [`read_exact()`](RingBuffer::read_exact)).
//! - [`reset()`](RingBuffer::reset) writes both positions and may only be
//!   called while neither side is active.
//!
//! # Positions
//!
//! `head` and `tail` run over `[0, 2C)` rather than `[0, C)`, which keeps
//! "full" and "empty" distinct without sacrificing a slot. The fill level is
//! `(head - tail) mod 2C`; each position has exactly one writer, so no
//! read-modify-write atomics are needed and the ring also works on cores
//! without compare-and-swap.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::frame::Frame;

use super::interleave::pack;

/// Fixed-capacity ring of stereo [`Frame`]s.
///
/// # Type Parameters
///
/// - `C`: Capacity in frames. All `C` slots are usable. Must be ≥ 1.
pub struct RingBuffer<const C: usize> {
    storage: UnsafeCell<[Frame; C]>,
    /// Write position in `[0, 2C)` (only modified by the producer).
    head: AtomicUsize,
    /// Read position in `[0, 2C)` (only modified by the consumer).
    tail: AtomicUsize,
    /// Number of truncated writes (only modified by the producer).
    overruns: AtomicU32,
}

// SAFETY: Frame is plain data. The SPSC contract ensures head and tail are
// only modified by their respective sides, and the Release/Acquire pairs on
// them order every slot access against the other side's.
unsafe impl<const C: usize> Sync for RingBuffer<C> {}

impl<const C: usize> RingBuffer<C> {
    const WRAP: usize = 2 * C;

    /// Create an empty, silent ring.
    ///
    /// # Panics
    ///
    /// If `C` is zero. Evaluated at compile time when used to initialize a
    /// `static` or `const`, at run time otherwise.
    pub const fn new() -> Self {
        assert!(C >= 1, "ring buffer must hold at least one frame");
        assert!(C <= usize::MAX / 2, "ring buffer capacity too large");

        RingBuffer {
            storage: UnsafeCell::new([Frame::SILENCE; C]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    #[inline]
    fn distance(head: usize, tail: usize) -> usize {
        (head + Self::WRAP - tail) % Self::WRAP
    }

    /// Capacity in frames.
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Number of frames currently buffered. May be stale by the time the
    /// caller acts on it.
    pub fn buffered_count(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        Self::distance(head, tail)
    }

    /// Frames that a `write` could accept right now.
    pub fn free_space(&self) -> usize {
        C - self.buffered_count()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered_count() == 0
    }

    /// Number of writes that were truncated because the ring was full.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    // ── Producer side ──────────────────────────────────────────────────

    /// Copy as many frames as fit (producer side).
    ///
    /// Never blocks. If `frames` does not fit, the excess tail is dropped,
    /// the overrun counter is bumped once for this call, and the number of
    /// frames actually accepted is returned. An empty slice is a no-op.
    pub fn write(&self, frames: &[Frame]) -> usize {
        self.write_from(frames.iter().copied())
    }

    /// Like [`write()`](Self::write), from interleaved `L, R, L, R, …`
    /// samples. A trailing unpaired sample is ignored. Returns frames
    /// accepted.
    pub fn write_interleaved(&self, samples: &[i16]) -> usize {
        self.write_from(
            samples
                .chunks_exact(2)
                .map(|pair| Frame::new(pair[0], pair[1])),
        )
    }

    fn write_from<I>(&self, frames: I) -> usize
    where
        I: ExactSizeIterator<Item = Frame>,
    {
        let requested = frames.len();
        if requested == 0 {
            return 0;
        }

        let head = self.head.load(Ordering::Relaxed);
        // Acquire pairs with the consumer's Release on tail: its reads of the
        // slots we are about to reuse have completed.
        let tail = self.tail.load(Ordering::Acquire);
        let free = C - Self::distance(head, tail);

        let accepted = requested.min(free);
        if accepted < requested {
            self.record_overrun();
        }

        let base = self.storage.get() as *mut Frame;
        for (i, frame) in frames.take(accepted).enumerate() {
            // SAFETY: We are the sole producer. The `accepted` slots after
            // head are free, so the consumer is not reading them.
            unsafe { base.add((head + i) % C).write(frame) };
        }

        // Release ordering makes the frame writes visible before head advances.
        self.head
            .store((head + accepted) % Self::WRAP, Ordering::Release);
        accepted
    }

    fn record_overrun(&self) {
        let count = self.overruns.load(Ordering::Relaxed);
        self.overruns
            .store(count.saturating_add(1), Ordering::Relaxed);
    }

    // ── Consumer side ──────────────────────────────────────────────────

    /// Copy up to `dest.len()` frames out in insertion order, packed as
    /// transfer words (consumer side).
    ///
    /// Returns the number of frames copied. Anything past that in `dest`
    /// is left untouched; the caller pads the shortfall.
    pub fn drain(&self, dest: &mut [u32]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let count = dest.len().min(Self::distance(head, tail));

        self.copy_out(tail, &mut dest[..count]);
        self.tail
            .store((tail + count) % Self::WRAP, Ordering::Release);
        count
    }

    /// Fill all of `dest` or nothing (consumer side).
    ///
    /// Returns `false` and consumes nothing when fewer than `dest.len()`
    /// frames are buffered.
    pub fn read_exact(&self, dest: &mut [u32]) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if Self::distance(head, tail) < dest.len() {
            return false;
        }

        self.copy_out(tail, dest);
        self.tail
            .store((tail + dest.len()) % Self::WRAP, Ordering::Release);
        true
    }

    fn copy_out(&self, tail: usize, dest: &mut [u32]) {
        let base = self.storage.get() as *const Frame;
        for (i, word) in dest.iter_mut().enumerate() {
            // SAFETY: We are the sole consumer and the caller checked that
            // these slots are published by the producer (Acquire on head).
            let frame = unsafe { base.add((tail + i) % C).read() };
            *word = pack(frame);
        }
    }

    // ── Quiescent operations ───────────────────────────────────────────

    /// Zero the storage and rewind both positions.
    ///
    /// Only valid while neither the producer nor the consumer is running.
    /// The overrun counter is left alone.
    pub fn reset(&self) {
        // SAFETY: Caller guarantees no concurrent producer or consumer.
        unsafe { (*self.storage.get()).fill(Frame::SILENCE) };
        self.tail.store(0, Ordering::Release);
        self.head.store(0, Ordering::Release);
    }

    /// Zero the overrun counter. Producer side only.
    pub(crate) fn reset_overruns(&self) {
        self.overruns.store(0, Ordering::Relaxed);
    }
}

impl<const C: usize> Default for RingBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}
