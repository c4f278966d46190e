//! DMA-driven I2S stereo output with ping-pong transfer buffers.
//!
//! [`I2sOutput`] owns the ring buffer and both transfer slots. It is
//! `const`-constructible so it can live in a `static`. [`I2sOutput::init()`]
//! configures the hardware and splits the output into two handles:
//!
//! - [`OutputControl`]: the application side. Writes frames, starts, stops
//!   and clears the stream, reads stats.
//! - [`Completion`]: the interrupt side. Moved into the transfer-complete
//!   ISR, it can only swap slots, drain the ring and re-arm the channel.
//!
//! ## Architecture
//!
//! ```text
//! Application              Ring (C frames)             Slots (2 × Q words)       Generator
//! ┌───────────┐  write   ┌─────────────────┐  ISR    ┌──────────┐   DMA       ┌──────────┐
//! │ decoder   ├────────►│ L R L R L R ... ├───────►│ ping/pong├───────────►│ TX FIFO  │
//! └───────────┘         └─────────────────┘ refill └──────────┘            └──────────┘
//! ```
//!
//! ## Completion cycle
//!
//! Each transfer-complete interrupt:
//! 1. swaps active and idle slots,
//! 2. re-arms the channel on the newly active slot (filled last period),
//! 3. refills the newly idle slot with one quantum from the ring, or with
//!    silence (counting an underrun) if less than a quantum is buffered.
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! static OUTPUT: DefaultI2sOutput = I2sOutput::new();
//!
//! // In init:
//! let (control, completion) = OUTPUT
//!     .init(StreamFormat::stereo16(44_100), pins, generator, channel)?;
//!
//! // In the DMA ISR (local resource `completion`):
//! completion.on_transfer_complete();
//!
//! // In the decoder task (local resource `control`):
//! control.write(&frames);
//! control.start();
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use log::{debug, info, warn};

use crate::config::{ClockDivisor, PinAssignment, StreamFormat};
use crate::constants::{RING_CAPACITY_FRAMES, TRANSFER_QUANTUM_FRAMES};
use crate::error::{ConfigError, InitError};
use crate::frame::Frame;
use crate::peripheral::{SignalGenerator, TransferChannel};
use crate::stats::Stats;

use super::interleave::silence;
use super::ring::RingBuffer;
use super::transfer::{Slot, TransferSlots};

/// Output with the default ring capacity and quantum.
pub type DefaultI2sOutput = I2sOutput<RING_CAPACITY_FRAMES, TRANSFER_QUANTUM_FRAMES>;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    /// Initialized, never started. No transfer armed.
    Idle = 0,
    /// One slot armed in hardware, the other idle.
    Streaming = 1,
    /// Explicitly halted.
    Stopped = 2,
}

impl StreamState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => StreamState::Streaming,
            2 => StreamState::Stopped,
            _ => StreamState::Idle,
        }
    }
}

/// Double-buffered I2S output engine.
///
/// # Type Parameters
///
/// - `C`: Ring capacity in frames.
/// - `Q`: Frames per hardware transfer. Must not exceed `C`.
pub struct I2sOutput<const C: usize, const Q: usize> {
    ring: RingBuffer<C>,
    slots: TransferSlots<Q>,
    /// Scheduler state (only modified by the control side).
    state: AtomicU8,
    /// Quanta replaced by silence (only modified by the completion side).
    underruns: AtomicU32,
    /// Held between `init` and `release` (only modified by the control side).
    claimed: AtomicBool,
}

impl<const C: usize, const Q: usize> I2sOutput<C, Q> {
    /// Create an unconfigured output.
    ///
    /// # Panics
    ///
    /// If `Q` exceeds `C`, since a full quantum could never be buffered.
    /// Evaluated at compile time when used to initialize a `static` or
    /// `const`, at run time otherwise.
    pub const fn new() -> Self {
        assert!(Q <= C, "transfer quantum larger than ring capacity");

        I2sOutput {
            ring: RingBuffer::new(),
            slots: TransferSlots::new(),
            state: AtomicU8::new(StreamState::Idle as u8),
            underruns: AtomicU32::new(0),
            claimed: AtomicBool::new(false),
        }
    }

    /// Configure the generator for `format`, claim the output and install
    /// the completion path.
    ///
    /// Either fully succeeds or leaves the hardware and this output as they
    /// were. Fails with [`ConfigError::AlreadyInitialized`] until the
    /// previous handles are given back through [`OutputControl::release()`].
    /// Does not start streaming.
    pub fn init<'a, G, T>(
        &'a self,
        format: StreamFormat,
        pins: PinAssignment,
        generator: &'a mut G,
        channel: &'a T,
    ) -> Result<(OutputControl<'a, G, T, C, Q>, Completion<'a, T, C, Q>), InitError<G::Error>>
    where
        G: SignalGenerator,
        T: TransferChannel,
    {
        let divisor = self
            .configure(format, pins, generator)
            .inspect_err(|err| warn!("I2S init failed: {err}"))?;

        // Nothing below can fail.
        self.claimed.store(true, Ordering::Release);
        self.ring.reset();
        self.slots.reset();
        self.ring.reset_overruns();
        self.underruns.store(0, Ordering::Relaxed);
        self.state.store(StreamState::Idle as u8, Ordering::Release);
        channel.listen(true);

        let system_hz = generator.system_clock_hz();
        let edge_factor = generator.edge_factor();
        info!(
            "I2S output initialized: {} Hz, {}-bit, {}ch, BCLK {} Hz, divisor {} ({} Hz effective)",
            format.sample_rate,
            format.bits_per_sample,
            format.channels,
            format.bit_clock_hz(),
            divisor,
            divisor.effective_sample_rate(system_hz, &format, edge_factor),
        );
        info!(
            "I2S pins: DATA {} BCLK {} LRCLK {}",
            pins.data, pins.bit_clock, pins.word_select
        );

        Ok((
            OutputControl {
                output: self,
                generator,
                channel,
                format,
                divisor,
            },
            Completion {
                output: self,
                channel,
            },
        ))
    }

    fn configure<G: SignalGenerator>(
        &self,
        format: StreamFormat,
        pins: PinAssignment,
        generator: &mut G,
    ) -> Result<ClockDivisor, InitError<G::Error>> {
        if self.claimed.load(Ordering::Acquire) {
            return Err(ConfigError::AlreadyInitialized.into());
        }
        format.validate()?;

        let divisor = ClockDivisor::for_bit_clock(
            generator.system_clock_hz(),
            format.bit_clock_hz(),
            generator.edge_factor(),
        )?;
        generator
            .configure(divisor, pins)
            .map_err(InitError::Peripheral)?;
        Ok(divisor)
    }

    /// Whether the output is claimed by a live pair of handles.
    pub fn is_initialized(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Snapshot of the lifetime counters. Never fails.
    pub fn stats(&self) -> Stats {
        Stats {
            underruns: self.underruns.load(Ordering::Relaxed),
            overruns: self.ring.overruns(),
        }
    }

    pub fn buffered_count(&self) -> usize {
        self.ring.buffered_count()
    }

    pub fn free_space(&self) -> usize {
        self.ring.free_space()
    }

    /// Copy of one transfer slot, packed as transfer words.
    pub fn slot_snapshot(&self, slot: Slot) -> [u32; Q] {
        self.slots.snapshot(slot)
    }

    fn set_state(&self, state: StreamState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn record_underrun(&self) {
        let count = self.underruns.load(Ordering::Relaxed);
        self.underruns
            .store(count.saturating_add(1), Ordering::Relaxed);
    }
}

impl<const C: usize, const Q: usize> Default for I2sOutput<C, Q> {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-side handle: producer of frames and owner of the stream
/// state.
pub struct OutputControl<'a, G, T, const C: usize, const Q: usize> {
    output: &'a I2sOutput<C, Q>,
    generator: &'a mut G,
    channel: &'a T,
    format: StreamFormat,
    divisor: ClockDivisor,
}

impl<'a, G, T, const C: usize, const Q: usize> OutputControl<'a, G, T, C, Q>
where
    G: SignalGenerator,
    T: TransferChannel,
{
    /// Queue frames for playback. Never blocks.
    ///
    /// Returns the number of frames accepted. Frames that do not fit are
    /// dropped from the end of `frames` and counted as one overrun.
    pub fn write(&self, frames: &[Frame]) -> usize {
        self.output.ring.write(frames)
    }

    /// [`write()`](Self::write) for interleaved `L, R, …` samples.
    pub fn write_interleaved(&self, samples: &[i16]) -> usize {
        self.output.ring.write_interleaved(samples)
    }

    pub fn free_space(&self) -> usize {
        self.output.free_space()
    }

    pub fn buffered_count(&self) -> usize {
        self.output.buffered_count()
    }

    pub fn stats(&self) -> Stats {
        self.output.stats()
    }

    pub fn state(&self) -> StreamState {
        self.output.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn divisor(&self) -> ClockDivisor {
        self.divisor
    }

    pub fn generator(&self) -> &G {
        &*self.generator
    }

    /// Prime the ping slot and start streaming. No-op while streaming.
    ///
    /// Up to one quantum is taken from the ring; a short ring is padded with
    /// silence without counting an underrun. The pong slot is silenced so a
    /// restart never replays a stale quantum.
    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }

        let slots = &self.output.slots;
        // SAFETY: Not streaming, so no slot is armed and no completion is
        // pending (`stop` discards it). This context owns both slots and the
        // consumer side of the ring.
        let ping = unsafe { slots.slot_mut(Slot::Ping) };
        let primed = self.output.ring.drain(&mut ping[..]);
        silence(&mut ping[primed..]);
        silence(unsafe { slots.slot_mut(Slot::Pong) });
        slots.set_active(Slot::Ping);

        // Publish Streaming before arming so the first completion is honoured.
        self.output.set_state(StreamState::Streaming);
        // SAFETY: Ping is not written again until it has been swapped out.
        unsafe { self.channel.arm(slots.as_ptr(Slot::Ping), Q) };
        self.generator.enable(true);

        debug!("I2S playback started, {primed} frames primed");
    }

    /// Abort the in-flight transfer and stop clocking. No-op unless
    /// streaming.
    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }

        // Completions that race the abort see Stopped and do not re-arm.
        self.output.set_state(StreamState::Stopped);
        self.channel.abort();
        // A completion raised before the abort must not survive into the
        // next `start()`, where it would re-arm over the live transfer.
        self.channel.acknowledge();
        self.generator.enable(false);

        debug!("I2S playback stopped");
    }

    /// Stop, then discard all buffered audio and silence both slots.
    ///
    /// Underrun and overrun counters are lifetime statistics and survive.
    pub fn clear(&mut self) {
        self.stop();
        self.output.ring.reset();
        self.output.slots.reset();

        debug!("I2S buffer cleared");
    }

    /// Tear down: stop, detach the completion path and give the generator's
    /// resources back. The output can be initialized again afterwards.
    ///
    /// # Panics
    ///
    /// If `completion` was split from a different output.
    pub fn release(mut self, completion: Completion<'a, T, C, Q>) {
        assert!(
            core::ptr::eq(self.output, completion.output),
            "completion handle belongs to another output"
        );

        self.stop();
        self.channel.listen(false);
        self.generator.release();
        self.output.claimed.store(false, Ordering::Release);

        debug!("I2S output released");
    }
}

/// Interrupt-side handle: the sole consumer of the ring while streaming.
pub struct Completion<'a, T, const C: usize, const Q: usize> {
    output: &'a I2sOutput<C, Q>,
    channel: &'a T,
}

impl<'a, T, const C: usize, const Q: usize> Completion<'a, T, C, Q>
where
    T: TransferChannel,
{
    /// Handle a transfer-complete interrupt.
    ///
    /// Call this from the channel's ISR. Bounded by one quantum copy and
    /// never fails; while streaming the channel is always re-armed, with
    /// silence if the ring is short.
    ///
    /// # Returns
    ///
    /// `true` if this channel had a completion pending.
    pub fn on_transfer_complete(&mut self) -> bool {
        if !self.channel.acknowledge() {
            return false;
        }
        // Late completion of a transfer aborted by `stop`.
        if self.output.state() != StreamState::Streaming {
            return true;
        }

        let slots = &self.output.slots;
        let active = slots.swap();
        // SAFETY: `active` was filled during the previous period and is
        // only read from now on.
        unsafe { self.channel.arm(slots.as_ptr(active), Q) };

        // SAFETY: The slot just drained by hardware is no longer armed, and
        // only this handler writes slots while streaming.
        let idle = unsafe { slots.slot_mut(active.other()) };
        if !self.output.ring.read_exact(&mut idle[..]) {
            silence(idle);
            self.output.record_underrun();
        }

        true
    }

    pub fn stats(&self) -> Stats {
        self.output.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::interleave::unpack;
    use crate::testing::{ramp, MockChannel, MockGenerator, PINS};

    type SmallOutput = I2sOutput<16, 4>;

    const FORMAT: StreamFormat = StreamFormat::stereo16(44_100);

    #[test]
    fn new_is_idle_and_unclaimed() {
        let output = SmallOutput::new();
        assert!(!output.is_initialized());
        assert_eq!(output.state(), StreamState::Idle);
        assert_eq!(output.stats(), Stats::default());
        assert_eq!(output.free_space(), 16);
    }

    #[test]
    fn usable_as_static() {
        static OUTPUT: SmallOutput = I2sOutput::new();
        assert_eq!(OUTPUT.state(), StreamState::Idle);
        assert_eq!(OUTPUT.free_space(), 16);
    }

    #[test]
    fn init_programs_generator_and_listens() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();

        let (control, _completion) = output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        assert!(output.is_initialized());
        assert!(channel.is_listening());
        assert!(!channel.is_armed());
        assert_eq!(control.state(), StreamState::Idle);
        assert!(!control.is_playing());
        assert_eq!(control.divisor(), ClockDivisor { integer: 44, fraction: 74 });
        assert_eq!(control.generator().configured, Some((control.divisor(), PINS)));
        assert!(!control.generator().enabled);
    }

    #[test]
    fn start_arms_ping_and_enables_clock() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, _completion) = output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.write(&ramp(1, 6));
        control.start();

        assert!(control.is_playing());
        assert!(control.generator().enabled);
        assert_eq!(channel.armed_source(), Some(output.slots.as_ptr(Slot::Ping)));
        assert_eq!(channel.transfer(0), ramp(1, 4));
        assert_eq!(control.buffered_count(), 2);
    }

    #[test]
    fn short_ring_pads_first_quantum_without_underrun() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, _completion) = output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.write(&ramp(5, 3));
        control.start();

        let first = channel.transfer(0);
        assert_eq!(&first[..3], &ramp(5, 3)[..]);
        assert_eq!(first[3], Frame::SILENCE);
        assert_eq!(control.buffered_count(), 0);
        assert_eq!(control.stats().underruns, 0);
    }

    #[test]
    fn start_is_idempotent() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, _completion) = output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.write(&ramp(0, 8));
        control.start();
        control.start();

        assert_eq!(channel.transfer_count(), 1);
        assert_eq!(control.generator().enable_calls, 1);
        assert_eq!(control.buffered_count(), 4);
        assert_eq!(control.state(), StreamState::Streaming);
    }

    #[test]
    fn stop_is_idempotent() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, _completion) = output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        // Stopping an idle output does nothing.
        control.stop();
        assert_eq!(control.state(), StreamState::Idle);
        assert_eq!(channel.aborts(), 0);

        control.start();
        control.stop();
        control.stop();

        assert_eq!(control.state(), StreamState::Stopped);
        assert_eq!(channel.aborts(), 1);
        assert!(!channel.is_armed());
        assert!(!control.generator().enabled);
        assert_eq!(control.generator().enable_calls, 2);
    }

    #[test]
    fn completion_swaps_and_refills() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.write(&ramp(0, 8));
        control.start();

        assert!(channel.complete());
        assert!(completion.on_transfer_complete());

        // Pong went out (silent, primed by start); ping was refilled.
        assert_eq!(output.slots.active(), Slot::Pong);
        assert_eq!(channel.transfer(1), [Frame::SILENCE; 4]);
        let ping: Vec<Frame> = output
            .slot_snapshot(Slot::Ping)
            .iter()
            .map(|&w| unpack(w))
            .collect();
        assert_eq!(ping, ramp(4, 4));
        assert_eq!(control.buffered_count(), 0);
        assert_eq!(control.stats().underruns, 0);

        assert!(channel.complete());
        assert!(completion.on_transfer_complete());
        assert_eq!(channel.transfer(2), ramp(4, 4));
    }

    #[test]
    fn starved_completion_streams_silence_and_counts() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.start();
        // Three frames are less than a quantum: nothing is consumed.
        control.write(&ramp(9, 3));

        channel.complete();
        completion.on_transfer_complete();

        assert_eq!(control.stats().underruns, 1);
        assert_eq!(control.buffered_count(), 3);
        assert_eq!(output.slot_snapshot(Slot::Ping), [0; 4]);
        assert!(channel.is_armed());
    }

    #[test]
    fn spurious_interrupt_is_ignored() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();
        control.start();

        assert!(!completion.on_transfer_complete());
        assert_eq!(channel.transfer_count(), 1);
        assert_eq!(output.slots.active(), Slot::Ping);
    }

    #[test]
    fn late_completion_after_stop_does_not_rearm() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();
        control.write(&ramp(0, 12));
        control.start();

        // Completion raised just as the application stops the stream.
        channel.complete();
        control.stop();

        // `stop` already discarded it.
        assert!(!completion.on_transfer_complete());
        assert!(!channel.is_armed());
        assert_eq!(channel.transfer_count(), 1);
        assert_eq!(control.buffered_count(), 8);
        assert_eq!(control.stats().underruns, 0);
    }

    #[test]
    fn completion_pending_across_restart_is_discarded() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();
        control.write(&ramp(0, 12));
        control.start();

        // The ISR does not get to run until after the restart.
        channel.complete();
        control.stop();
        control.start();
        assert!(!completion.on_transfer_complete());

        // The restarted transfer is still the one armed, untouched.
        assert_eq!(channel.transfer_count(), 2);
        assert_eq!(channel.armed_source(), Some(output.slots.as_ptr(Slot::Ping)));
        assert_eq!(output.slots.active(), Slot::Ping);
        assert_eq!(channel.transfer(1), ramp(4, 4));
        assert_eq!(control.buffered_count(), 4);

        // The next real completion continues the stream in order.
        assert!(channel.complete());
        assert!(completion.on_transfer_complete());
        assert_eq!(channel.transfer(2), [Frame::SILENCE; 4]);
        assert_eq!(output.slot_snapshot(Slot::Ping).map(unpack).to_vec(), ramp(8, 4));
    }

    #[test]
    #[should_panic(expected = "completion handle belongs to another output")]
    fn release_rejects_foreign_completion() {
        let first_output = SmallOutput::new();
        let second_output = SmallOutput::new();
        let mut first_generator = MockGenerator::new();
        let mut second_generator = MockGenerator::new();
        let channel = MockChannel::new();

        let (control, _completion) = first_output
            .init(FORMAT, PINS, &mut first_generator, &channel)
            .unwrap();
        let (_other_control, foreign) = second_output
            .init(FORMAT, PINS, &mut second_generator, &channel)
            .unwrap();

        control.release(foreign);
    }

    #[test]
    fn clear_resets_geometry_but_not_stats() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.start();
        channel.complete();
        completion.on_transfer_complete();
        control.write(&ramp(0, 20));
        let before = control.stats();
        assert_eq!(before, Stats { underruns: 1, overruns: 1 });

        control.clear();

        assert_eq!(control.state(), StreamState::Stopped);
        assert_eq!(control.buffered_count(), 0);
        assert_eq!(control.free_space(), 16);
        assert_eq!(control.stats(), before);
        assert_eq!(output.slot_snapshot(Slot::Ping), [0; 4]);
        assert_eq!(output.slot_snapshot(Slot::Pong), [0; 4]);
    }

    #[test]
    fn restart_does_not_replay_stale_audio() {
        let output = SmallOutput::new();
        let mut generator = MockGenerator::new();
        let channel = MockChannel::new();
        let (mut control, mut completion) =
            output.init(FORMAT, PINS, &mut generator, &channel).unwrap();

        control.write(&ramp(100, 8));
        control.start();
        channel.complete();
        completion.on_transfer_complete();
        control.stop();

        // Ring is empty now; both slots hold or held real audio.
        control.start();
        channel.complete();
        completion.on_transfer_complete();

        let restarted = channel.transfer_count() - 2;
        assert_eq!(channel.transfer(restarted), [Frame::SILENCE; 4]);
        assert_eq!(channel.transfer(restarted + 1), [Frame::SILENCE; 4]);
    }

    #[test]
    fn release_allows_reinit() {
        let output = SmallOutput::new();
        let channel = MockChannel::new();
        let mut first = MockGenerator::new();

        let (mut control, completion) = output.init(FORMAT, PINS, &mut first, &channel).unwrap();
        control.write(&ramp(0, 20));
        control.start();
        control.release(completion);

        assert!(first.released);
        assert!(!first.enabled);
        assert!(!channel.is_listening());
        assert!(!output.is_initialized());

        let mut second = MockGenerator::new();
        let (control, _completion) = output
            .init(StreamFormat::stereo16(48_000), PINS, &mut second, &channel)
            .unwrap();
        // Re-init starts from a clean slate, counters included.
        assert_eq!(control.buffered_count(), 0);
        assert_eq!(control.stats(), Stats::default());
        assert_eq!(control.state(), StreamState::Idle);
        assert_eq!(control.format().sample_rate, 48_000);
    }
}
