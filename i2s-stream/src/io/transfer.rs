//! Ping-pong transfer slots.
//!
//! Two fixed `[u32; Q]` buffers alternate between the *active* role (owned
//! by the transfer hardware, read-only to software) and the *idle* role
//! (owned by software, being refilled). Ownership moves at each
//! transfer-complete signal via [`TransferSlots::swap()`].
//!
//! ```text
//!            complete           complete           complete
//! slot 0: ─[ active ]─────[ idle/refill ]────[ active ]───── ...
//! slot 1: ─[ idle   ]─────[ active      ]────[ idle   ]───── ...
//! ```

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::interleave::silence;

/// Index of a ping-pong slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Ping = 0,
    Pong = 1,
}

impl Slot {
    /// The other slot.
    pub const fn other(self) -> Slot {
        match self {
            Slot::Ping => Slot::Pong,
            Slot::Pong => Slot::Ping,
        }
    }

    const fn from_index(index: usize) -> Slot {
        if index == 0 {
            Slot::Ping
        } else {
            Slot::Pong
        }
    }
}

/// The transfer buffer pair.
///
/// # Type Parameters
///
/// - `Q`: Quantum, in frames (one `u32` word per frame). Must be ≥ 1.
pub struct TransferSlots<const Q: usize> {
    slots: [UnsafeCell<[u32; Q]>; 2],
    /// Slot currently owned by the hardware.
    active: AtomicUsize,
}

// SAFETY: Software only ever touches the idle slot, and only from the one
// context that currently owns the scheduler (control while stopped, the
// completion handler while streaming). The active slot is only read, by
// hardware.
unsafe impl<const Q: usize> Sync for TransferSlots<Q> {}

impl<const Q: usize> TransferSlots<Q> {
    /// Create a silent pair with [`Slot::Ping`] active.
    ///
    /// # Panics
    ///
    /// If `Q` is zero (at compile time when used in a `static`).
    pub const fn new() -> Self {
        assert!(Q >= 1, "transfer quantum must be at least one frame");

        TransferSlots {
            slots: [UnsafeCell::new([0; Q]), UnsafeCell::new([0; Q])],
            active: AtomicUsize::new(0),
        }
    }

    /// Frames per slot.
    pub const fn quantum(&self) -> usize {
        Q
    }

    pub fn active(&self) -> Slot {
        Slot::from_index(self.active.load(Ordering::Acquire))
    }

    pub fn idle(&self) -> Slot {
        self.active().other()
    }

    /// Hand `slot` to the hardware. The other slot becomes idle.
    pub fn set_active(&self, slot: Slot) {
        self.active.store(slot as usize, Ordering::Release);
    }

    /// Flip the roles and return the newly active slot.
    pub fn swap(&self) -> Slot {
        let next = self.active().other();
        self.set_active(next);
        next
    }

    /// Start address of `slot` for arming a transfer.
    pub fn as_ptr(&self, slot: Slot) -> *const u32 {
        self.slots[slot as usize].get() as *const u32
    }

    /// Mutable access to a slot the hardware is not reading.
    ///
    /// # Safety
    ///
    /// `slot` must not be armed in the transfer engine, and the caller must
    /// be the only software context touching it for the returned lifetime.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_mut(&self, slot: Slot) -> &mut [u32; Q] {
        &mut *self.slots[slot as usize].get()
    }

    /// Read a copy of one slot. Test and diagnostics helper.
    pub fn snapshot(&self, slot: Slot) -> [u32; Q] {
        // SAFETY: Hardware only reads slots, so a plain copy cannot tear.
        unsafe { *self.slots[slot as usize].get() }
    }

    /// Zero both slots and make [`Slot::Ping`] active again.
    ///
    /// Only valid while no transfer is armed.
    pub fn reset(&self) {
        for slot in [Slot::Ping, Slot::Pong] {
            // SAFETY: Caller guarantees nothing is armed or refilling.
            silence(unsafe { self.slot_mut(slot) });
        }
        self.set_active(Slot::Ping);
    }
}

impl<const Q: usize> Default for TransferSlots<Q> {
    fn default() -> Self {
        Self::new()
    }
}
