//! Received frame types.
//!
//! Frames are plain `Copy` values so they can live in the statically sized
//! receive stores and be copied out to the foreground without references
//! into interrupt-owned memory.

use crate::internal::constants::{
    DISCOVERY_PREAMBLE_BYTE, DMX_FRAME_SIZE, RDM_FRAME_SIZE,
};

// =============================================================================
// DMX Frame
// =============================================================================

/// One received DMX512 packet plus the timing measured while receiving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxFrame {
    /// Start code followed by up to 512 slots
    pub(crate) data: [u8; DMX_FRAME_SIZE],
    /// Number of data slots received (start code excluded)
    pub(crate) slots_in_packet: u16,
    /// Spacing between the last two received slots
    pub(crate) slot_to_slot_micros: u32,
    /// Break-to-break time, when the previous break also started DMX data
    pub(crate) break_to_break_micros: u32,
}

impl DmxFrame {
    /// An empty frame (start code only, zero slots)
    pub const EMPTY: Self = Self {
        data: [0; DMX_FRAME_SIZE],
        slots_in_packet: 0,
        slot_to_slot_micros: 0,
        break_to_break_micros: 0,
    };

    /// Start code and received slots
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Received slots, start code excluded
    #[inline]
    pub fn slots(&self) -> &[u8] {
        &self.data[1..self.len()]
    }

    /// Start code of the packet
    #[inline]
    pub fn start_code(&self) -> u8 {
        self.data[0]
    }

    /// Length including the start code
    #[inline]
    pub fn len(&self) -> usize {
        self.slots_in_packet as usize + 1
    }

    /// A DMX frame always carries its start code
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of data slots received
    #[inline]
    pub fn slots_in_packet(&self) -> u16 {
        self.slots_in_packet
    }

    /// Spacing of the last slot pair in microseconds (never below 44)
    #[inline]
    pub fn slot_to_slot_micros(&self) -> u32 {
        self.slot_to_slot_micros
    }

    /// Break-to-break interval in microseconds, or 0 when unknown
    #[inline]
    pub fn break_to_break_micros(&self) -> u32 {
        self.break_to_break_micros
    }
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DmxFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "DmxFrame {{ start_code: {=u8:#x}, slots: {=u16}, s2s: {=u32}us, b2b: {=u32}us }}",
            self.start_code(),
            self.slots_in_packet,
            self.slot_to_slot_micros,
            self.break_to_break_micros
        );
    }
}

// =============================================================================
// RDM Frame
// =============================================================================

/// Kind of RDM frame held by an [`RdmFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdmFrameKind {
    /// Checksummed message starting with the RDM start code
    Message,
    /// Discovery unique branch response (preamble, delimiter, encoded UID)
    DiscoveryResponse,
}

/// One received RDM message or discovery response, checksum bytes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdmFrame {
    pub(crate) data: [u8; RDM_FRAME_SIZE],
    pub(crate) len: u16,
}

impl RdmFrame {
    /// An empty frame
    pub const EMPTY: Self = Self {
        data: [0; RDM_FRAME_SIZE],
        len: 0,
    };

    /// Received bytes, checksum included
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Number of received bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Check if the frame holds no bytes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Classify the frame by its first byte
    pub fn kind(&self) -> RdmFrameKind {
        // The receiver publishes only frames starting 0xCC or 0xFE
        if self.data[0] == DISCOVERY_PREAMBLE_BYTE {
            RdmFrameKind::DiscoveryResponse
        } else {
            RdmFrameKind::Message
        }
    }

    /// Message bytes without the trailing checksum (messages only)
    pub fn message(&self) -> Option<&[u8]> {
        match self.kind() {
            RdmFrameKind::Message if self.len() >= 2 => Some(&self.data[..self.len() - 2]),
            _ => None,
        }
    }
}

impl Default for RdmFrame {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RdmFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "RdmFrame {{ kind: {}, len: {=u16} }}", self.kind(), self.len);
    }
}
