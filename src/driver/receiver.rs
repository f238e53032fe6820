//! Receive byte state machine
//!
//! Classifies each break or data byte delivered by the UART interrupt,
//! assembles DMX and RDM frames in place and reports when one is complete.
//! Malformed input never escapes this module: the partial frame is dropped
//! and the machine resynchronizes on the next break or discovery preamble.

use crate::frame::{DmxFrame, RdmFrame};
use crate::hal::timer::{elapsed_since, is_due};
use crate::internal::constants::{
    DISCOVERY_DELIMITER, DISCOVERY_ECS_SIZE, DISCOVERY_EUID_SIZE, DISCOVERY_PREAMBLE_BYTE,
    DISCOVERY_PREAMBLE_MAX, DMX_FRAME_SIZE, DMX_START_CODE, RDM_FRAME_SIZE,
    RDM_OFFSET_MESSAGE_LENGTH, RDM_OFFSET_SUB_START_CODE, RDM_START_CODE, RDM_SUB_START_CODE,
    RECEIVE_TIMEOUT_GUARD_US, SLOT_TO_SLOT_FLOOR_US,
};

use super::statistics::Statistics;

/// Receive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveState {
    /// Waiting for a break or a discovery preamble
    Idle,
    /// Break seen, waiting for the start code
    Break,
    /// Collecting DMX slots
    DmxData,
    /// Collecting an RDM message
    RdmData,
    /// Expecting the checksum high byte
    ChecksumHigh,
    /// Expecting the checksum low byte
    ChecksumLow,
    /// Collecting discovery preamble bytes
    RdmDiscPreamble,
    /// Collecting the encoded UID of a discovery response
    RdmDiscUid,
    /// Collecting the encoded checksum of a discovery response
    RdmDiscChecksum,
}

/// Frame completed by the last event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completed {
    /// [`Receiver::dmx_frame`] holds a new frame
    Dmx,
    /// [`Receiver::rdm_frame`] holds a new frame
    Rdm,
}

/// Receive state machine. Owned by the UART interrupt.
pub(crate) struct Receiver {
    state: ReceiveState,
    dmx: DmxFrame,
    rdm: RdmFrame,
    /// Bytes buffered in the frame under construction
    index: usize,
    /// Running RDM checksum
    checksum: u16,
    /// Bytes collected in the current discovery section
    disc_index: usize,
    /// Timestamp of the latest break
    break_micros: u32,
    /// Break that started the previous DMX frame, if the latest start code
    /// was DMX as well
    last_dmx_break: Option<u32>,
    /// Break-to-break interval of the frame under construction
    break_to_break: u32,
    /// Arrival time of the previous DMX slot
    slot_previous: u32,
    /// Receive watchdog deadline while collecting DMX slots
    deadline: Option<u32>,
}

impl Receiver {
    pub(crate) const fn new() -> Self {
        Self {
            state: ReceiveState::Idle,
            dmx: DmxFrame::EMPTY,
            rdm: RdmFrame::EMPTY,
            index: 0,
            checksum: 0,
            disc_index: 0,
            break_micros: 0,
            last_dmx_break: None,
            break_to_break: 0,
            slot_previous: 0,
            deadline: None,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> ReceiveState {
        self.state
    }

    /// Latest completed DMX frame
    #[inline]
    pub(crate) fn dmx_frame(&self) -> &DmxFrame {
        &self.dmx
    }

    /// Latest completed RDM frame
    #[inline]
    pub(crate) fn rdm_frame(&self) -> &RdmFrame {
        &self.rdm
    }

    /// Deadline the receive watchdog alarm should be armed for
    #[inline]
    pub(crate) fn watchdog_deadline(&self) -> Option<u32> {
        self.deadline
    }

    /// Drop any partial frame and wait for the next break
    pub(crate) fn reset(&mut self) {
        self.state = ReceiveState::Idle;
        self.deadline = None;
        self.last_dmx_break = None;
    }

    /// Discard the partial frame after a line error
    pub(crate) fn on_line_error(&mut self) {
        #[cfg(feature = "defmt")]
        if self.state != ReceiveState::Idle {
            defmt::trace!("rx: line error in {}, frame dropped", self.state);
        }
        self.state = ReceiveState::Idle;
        self.deadline = None;
    }

    /// Break detected
    ///
    /// A DMX frame whose watchdog deadline already passed is published
    /// first; any other partial frame is dropped. The deadline sits
    /// `RECEIVE_TIMEOUT_GUARD_US` (12 us) after the next slot was due, so a
    /// short frame survives only when the break is reported at least that
    /// long after the missing slot.
    pub(crate) fn on_break(&mut self, now: u32, stats: &Statistics) -> Option<Completed> {
        let completed = self.on_timeout(now, stats);
        #[cfg(feature = "defmt")]
        if completed.is_none() && !matches!(self.state, ReceiveState::Idle | ReceiveState::Break) {
            defmt::trace!("rx: break in {}, frame dropped", self.state);
        }

        self.state = ReceiveState::Break;
        self.deadline = None;
        self.break_micros = now;
        completed
    }

    /// Receive watchdog alarm fired
    ///
    /// Publishes the truncated frame when the slot window really expired;
    /// a stale alarm is ignored.
    pub(crate) fn on_timeout(&mut self, now: u32, stats: &Statistics) -> Option<Completed> {
        match (self.state, self.deadline) {
            (ReceiveState::DmxData, Some(deadline)) if is_due(now, deadline) => {
                Some(self.publish_dmx(stats))
            }
            _ => None,
        }
    }

    /// Data byte received
    pub(crate) fn on_byte(&mut self, byte: u8, now: u32, stats: &Statistics) -> Option<Completed> {
        match self.state {
            ReceiveState::Idle => {
                if byte == DISCOVERY_PREAMBLE_BYTE {
                    self.rdm.data[0] = byte;
                    self.index = 1;
                    self.state = ReceiveState::RdmDiscPreamble;
                }
                None
            }
            ReceiveState::Break => {
                self.on_start_code(byte, now, stats);
                None
            }
            ReceiveState::DmxData => self.on_dmx_slot(byte, now, stats),
            ReceiveState::RdmData => {
                if !self.push_rdm(byte) {
                    return None;
                }
                self.checksum = self.checksum.wrapping_add(u16::from(byte));
                let declared = self.rdm.data[RDM_OFFSET_MESSAGE_LENGTH] as usize;
                if self.index > RDM_OFFSET_MESSAGE_LENGTH && self.index == declared {
                    self.state = ReceiveState::ChecksumHigh;
                }
                None
            }
            ReceiveState::ChecksumHigh => {
                if self.push_rdm(byte) {
                    self.checksum = self.checksum.wrapping_sub(u16::from(byte) << 8);
                    self.state = ReceiveState::ChecksumLow;
                }
                None
            }
            ReceiveState::ChecksumLow => {
                if !self.push_rdm(byte) {
                    return None;
                }
                self.checksum = self.checksum.wrapping_sub(u16::from(byte));
                self.state = ReceiveState::Idle;

                let sub_start = self.rdm.data[RDM_OFFSET_SUB_START_CODE];
                if self.checksum == 0 && sub_start == RDM_SUB_START_CODE {
                    Some(self.publish_rdm(now, stats))
                } else {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("rx: rdm checksum {=u16:#x}, frame dropped", self.checksum);
                    None
                }
            }
            ReceiveState::RdmDiscPreamble => {
                if !self.push_rdm(byte) {
                    return None;
                }
                if byte == DISCOVERY_DELIMITER || self.index > DISCOVERY_PREAMBLE_MAX {
                    self.disc_index = 0;
                    self.state = ReceiveState::RdmDiscUid;
                }
                None
            }
            ReceiveState::RdmDiscUid => {
                if self.push_rdm(byte) {
                    self.disc_index += 1;
                    if self.disc_index == DISCOVERY_EUID_SIZE {
                        self.disc_index = 0;
                        self.state = ReceiveState::RdmDiscChecksum;
                    }
                }
                None
            }
            ReceiveState::RdmDiscChecksum => {
                if !self.push_rdm(byte) {
                    return None;
                }
                self.disc_index += 1;
                if self.disc_index == DISCOVERY_ECS_SIZE {
                    self.state = ReceiveState::Idle;
                    return Some(self.publish_rdm(now, stats));
                }
                None
            }
        }
    }

    fn on_start_code(&mut self, byte: u8, now: u32, stats: &Statistics) {
        match byte {
            DMX_START_CODE => {
                self.break_to_break = match self.last_dmx_break {
                    Some(previous) => {
                        let interval = elapsed_since(self.break_micros, previous);
                        stats.record_break_to_break(interval);
                        interval
                    }
                    None => 0,
                };
                self.last_dmx_break = Some(self.break_micros);

                self.dmx.data[0] = byte;
                self.index = 1;
                self.slot_previous = now;
                self.state = ReceiveState::DmxData;
                stats.count_dmx_packet();
            }
            RDM_START_CODE => {
                self.last_dmx_break = None;
                self.rdm.data[0] = byte;
                self.index = 1;
                self.checksum = u16::from(byte);
                self.state = ReceiveState::RdmData;
                stats.count_rdm_packet();
            }
            _ => {
                #[cfg(feature = "defmt")]
                defmt::trace!("rx: start code {=u8:#x} ignored", byte);
                self.last_dmx_break = None;
                self.state = ReceiveState::Idle;
            }
        }
    }

    fn on_dmx_slot(&mut self, byte: u8, now: u32, stats: &Statistics) -> Option<Completed> {
        self.dmx.data[self.index] = byte;
        self.index += 1;

        let spacing = elapsed_since(now, self.slot_previous).max(SLOT_TO_SLOT_FLOOR_US);
        self.slot_previous = now;
        self.dmx.slot_to_slot_micros = spacing;
        stats.record_slot_to_slot(spacing);

        if self.index == DMX_FRAME_SIZE {
            return Some(self.publish_dmx(stats));
        }

        self.deadline = Some(now.wrapping_add(spacing).wrapping_add(RECEIVE_TIMEOUT_GUARD_US));
        None
    }

    /// Append to the RDM frame, falling back to idle when it would overflow
    #[inline]
    fn push_rdm(&mut self, byte: u8) -> bool {
        if self.index >= RDM_FRAME_SIZE {
            #[cfg(feature = "defmt")]
            defmt::trace!("rx: rdm overflow in {}, frame dropped", self.state);
            self.state = ReceiveState::Idle;
            return false;
        }
        self.rdm.data[self.index] = byte;
        self.index += 1;
        true
    }

    fn publish_dmx(&mut self, stats: &Statistics) -> Completed {
        let slots = (self.index - 1) as u16;
        self.dmx.slots_in_packet = slots;
        self.dmx.break_to_break_micros = self.break_to_break;
        stats.record_slots_in_packet(slots);

        self.state = ReceiveState::Idle;
        self.deadline = None;
        Completed::Dmx
    }

    fn publish_rdm(&mut self, now: u32, stats: &Statistics) -> Completed {
        self.rdm.len = self.index as u16;
        stats.record_rdm_receive_end(now);
        Completed::Rdm
    }
}
