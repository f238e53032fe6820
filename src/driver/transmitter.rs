//! Transmit sequencer
//!
//! Timer-driven state machine that emits Break, Mark-After-Break and the
//! data slots of one DMX frame per period. The transmit alarm paces the
//! phases; once the frame is handed to the UART the FIFO-ready interrupt
//! keeps it fed.
//!
//! Send data is double-buffered. The foreground fills the back buffer and
//! marks it pending; the sequencer swaps buffers only when it asserts the
//! next break, so the frame on the wire is never modified.

use crate::hal::uart::DmxUart;
use crate::internal::constants::{DMX_FRAME_SIZE, DMX_START_CODE, SLOT_TIME_US};

use super::config::DmxConfig;
use super::statistics::Statistics;
use super::timing::TimingConfig;

/// Transmit sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitState {
    /// Not running
    Idle,
    /// Break asserted
    Break,
    /// Mark-after-break
    MarkAfterBreak,
    /// Frame bytes still queued for the FIFO
    Data,
    /// Frame handed off, waiting for the next period
    InterPacket,
}

/// Transmit sequencer. Shared by the transmit timer interrupt, the UART
/// interrupt and the foreground through the engine cell.
pub(crate) struct Transmitter {
    state: TransmitState,
    buffers: [[u8; DMX_FRAME_SIZE]; 2],
    lengths: [usize; 2],
    /// Buffer on the wire
    active: usize,
    /// Back buffer holds data not yet sent
    pending: bool,
    /// Next byte of the active buffer to push
    index: usize,
    timing: TimingConfig,
    /// Break assertion time of the current frame
    frame_start: u32,
    /// Finish the current frame but do not start another
    stopping: bool,
}

impl Transmitter {
    pub(crate) const fn new(timing: TimingConfig) -> Self {
        Self {
            state: TransmitState::Idle,
            buffers: [[0; DMX_FRAME_SIZE]; 2],
            lengths: [DMX_FRAME_SIZE; 2],
            active: 0,
            pending: false,
            index: 0,
            timing,
            frame_start: 0,
            stopping: false,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> TransmitState {
        self.state
    }

    #[inline]
    pub(crate) fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Frame in flight (break, MAB or data still being queued)
    #[inline]
    pub(crate) fn is_busy(&self) -> bool {
        matches!(
            self.state,
            TransmitState::Break | TransmitState::MarkAfterBreak | TransmitState::Data
        )
    }

    /// Bytes that will go out with the next frame
    #[cfg(test)]
    pub(crate) fn next_frame(&self) -> &[u8] {
        let idx = if self.pending { self.back() } else { self.active };
        &self.buffers[idx][..self.lengths[idx]]
    }

    #[inline(always)]
    fn back(&self) -> usize {
        self.active ^ 1
    }

    /// Longest payload the period must accommodate
    fn payload_len(&self) -> usize {
        if self.pending {
            self.lengths[self.active].max(self.lengths[self.back()])
        } else {
            self.lengths[self.active]
        }
    }

    /// Take the timing inputs from `config` and recompute the effective period
    pub(crate) fn set_timing(&mut self, config: &DmxConfig) {
        self.timing = config.timing(self.payload_len());
    }

    /// Queue a full frame (start code included) for the next break.
    /// The caller validates `1..=513` bytes.
    pub(crate) fn set_send_data(&mut self, frame: &[u8]) {
        let back = self.back();
        self.buffers[back][..frame.len()].copy_from_slice(frame);
        self.lengths[back] = frame.len();
        self.pending = true;
        self.timing = self.timing.for_payload(self.payload_len());
    }

    /// Queue slots behind a DMX start code. The caller validates `0..=512` slots.
    pub(crate) fn set_send_slots(&mut self, slots: &[u8]) {
        let back = self.back();
        self.buffers[back][0] = DMX_START_CODE;
        self.buffers[back][1..=slots.len()].copy_from_slice(slots);
        self.lengths[back] = slots.len() + 1;
        self.pending = true;
        self.timing = self.timing.for_payload(self.payload_len());
    }

    /// Arm for a fresh start; the first break follows the next alarm
    pub(crate) fn start(&mut self) {
        self.state = TransmitState::Idle;
        self.stopping = false;
    }

    /// Let the frame in flight finish without starting another
    pub(crate) fn request_stop(&mut self) {
        self.stopping = true;
    }

    /// Force idle and release the line
    pub(crate) fn stop<U: DmxUart>(&mut self, uart: &mut U) {
        uart.set_tx_interrupt(false);
        uart.set_break(false);
        self.state = TransmitState::Idle;
        self.stopping = false;
        self.index = 0;
    }

    /// Transmit alarm fired. Returns the next alarm deadline, if any.
    pub(crate) fn on_timer<U: DmxUart>(
        &mut self,
        now: u32,
        uart: &mut U,
        stats: &Statistics,
    ) -> Option<u32> {
        match self.state {
            TransmitState::Idle | TransmitState::InterPacket => {
                if self.stopping {
                    self.state = TransmitState::Idle;
                    return None;
                }
                if self.pending {
                    self.active = self.back();
                    self.pending = false;
                    self.timing = self.timing.for_payload(self.lengths[self.active]);
                }
                uart.set_break(true);
                self.frame_start = now;
                self.state = TransmitState::Break;
                Some(now.wrapping_add(self.timing.break_time_us))
            }
            TransmitState::Break => {
                uart.set_break(false);
                self.state = TransmitState::MarkAfterBreak;
                Some(now.wrapping_add(self.timing.mab_time_us))
            }
            TransmitState::MarkAfterBreak => {
                self.index = 0;
                if self.fill_fifo(uart) {
                    self.state = TransmitState::InterPacket;
                } else {
                    self.state = TransmitState::Data;
                    uart.set_tx_interrupt(true);
                }
                Some(self.frame_start.wrapping_add(self.timing.period_us_effective))
            }
            TransmitState::Data => {
                // UART slower than nominal: keep draining and look again once
                // the remaining slots should be out.
                stats.count_transmit_overrun();
                #[cfg(feature = "defmt")]
                defmt::trace!("tx: alarm while draining, {=usize} bytes left", self.remaining());
                let remaining = self.remaining() as u32;
                Some(now.wrapping_add(remaining * SLOT_TIME_US + SLOT_TIME_US))
            }
        }
    }

    /// UART transmit FIFO has room
    pub(crate) fn on_fifo_ready<U: DmxUart>(&mut self, uart: &mut U) {
        if self.state != TransmitState::Data {
            uart.set_tx_interrupt(false);
            return;
        }
        if self.fill_fifo(uart) {
            uart.set_tx_interrupt(false);
            self.state = TransmitState::InterPacket;
        }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.lengths[self.active] - self.index
    }

    /// Push bytes while the FIFO accepts them. Returns `true` once the whole
    /// frame is queued.
    fn fill_fifo<U: DmxUart>(&mut self, uart: &mut U) -> bool {
        let len = self.lengths[self.active];
        while self.index < len && uart.line_status().tx_ready {
            uart.write_byte(self.buffers[self.active][self.index]);
            self.index += 1;
        }
        self.index == len
    }
}
