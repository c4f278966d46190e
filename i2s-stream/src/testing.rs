//! Software stand-ins for the signal generator and transfer channel.

use core::cell::{Cell, RefCell};

use crate::config::{ClockDivisor, PinAssignment};
use crate::constants::DEFAULT_EDGE_FACTOR;
use crate::frame::Frame;
use crate::io::interleave::unpack;
use crate::peripheral::{SignalGenerator, TransferChannel};

pub const SYSTEM_CLOCK_HZ: u32 = 125_000_000;
pub const PINS: PinAssignment = PinAssignment::new(18, 16, 17);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug, Default)]
pub struct MockGenerator {
    pub configured: Option<(ClockDivisor, PinAssignment)>,
    pub enabled: bool,
    pub enable_calls: usize,
    pub released: bool,
    pub fail_configure: bool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        MockGenerator {
            fail_configure: true,
            ..Self::default()
        }
    }
}

impl SignalGenerator for MockGenerator {
    type Error = MockError;

    fn system_clock_hz(&self) -> u32 {
        SYSTEM_CLOCK_HZ
    }

    fn edge_factor(&self) -> u32 {
        DEFAULT_EDGE_FACTOR
    }

    fn configure(&mut self, divisor: ClockDivisor, pins: PinAssignment) -> Result<(), MockError> {
        if self.fail_configure {
            return Err(MockError);
        }
        self.configured = Some((divisor, pins));
        self.released = false;
        Ok(())
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.enable_calls += 1;
    }

    fn release(&mut self) {
        self.configured = None;
        self.released = true;
    }
}

/// Transfer channel that "streams" a slot by copying it when armed.
///
/// Software never writes an armed slot, so the copy taken at arm time is
/// exactly what hardware would have shifted out.
#[derive(Default)]
pub struct MockChannel {
    armed: Cell<Option<(*const u32, usize)>>,
    transfers: RefCell<Vec<Vec<u32>>>,
    pending: Cell<bool>,
    listening: Cell<bool>,
    aborts: Cell<usize>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish the armed transfer and raise the completion flag.
    /// Returns `false` if nothing was armed.
    pub fn complete(&self) -> bool {
        if self.armed.take().is_none() {
            return false;
        }
        self.pending.set(true);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get().is_some()
    }

    pub fn armed_source(&self) -> Option<*const u32> {
        self.armed.get().map(|(source, _)| source)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }

    pub fn aborts(&self) -> usize {
        self.aborts.get()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.borrow().len()
    }

    /// Contents of the `index`th armed transfer, as frames.
    pub fn transfer(&self, index: usize) -> Vec<Frame> {
        self.transfers.borrow()[index].iter().map(|&w| unpack(w)).collect()
    }

    /// Every frame armed so far, in order.
    pub fn streamed(&self) -> Vec<Frame> {
        self.transfers
            .borrow()
            .iter()
            .flatten()
            .map(|&w| unpack(w))
            .collect()
    }
}

impl TransferChannel for MockChannel {
    unsafe fn arm(&self, source: *const u32, words: usize) {
        let data = core::slice::from_raw_parts(source, words).to_vec();
        self.transfers.borrow_mut().push(data);
        self.armed.set(Some((source, words)));
    }

    fn abort(&self) {
        self.armed.set(None);
        self.aborts.set(self.aborts.get() + 1);
    }

    fn listen(&self, enabled: bool) {
        self.listening.set(enabled);
    }

    fn acknowledge(&self) -> bool {
        self.pending.replace(false)
    }
}

/// A ramp of `len` distinct, non-silent frames starting at `start`.
pub fn ramp(start: i16, len: usize) -> Vec<Frame> {
    (0..len)
        .map(|i| {
            let s = start.wrapping_add(i as i16);
            Frame::new(s, s.wrapping_neg().wrapping_sub(1))
        })
        .collect()
}
