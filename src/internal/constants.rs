//! Centralized Constants
//!
//! Single source of truth for the DMX512 (ANSI E1.11) and RDM (ANSI E1.20)
//! numbers used by the link layer.
//!
//! # Organization
//!
//! - **Frame sizes**: DMX slots, RDM message bounds, discovery layout
//! - **Start codes / markers**: values the byte state machine keys on
//! - **Transmit timing**: break, mark-after-break and period limits
//! - **Receive timing**: slot spacing floor and watchdog guard
//! - **RDM timing**: controller/responder framing and packet spacing
//! - **Defaults**: frame store depths and drain bounds

// =============================================================================
// Frame Sizes
// =============================================================================

/// Maximum number of data slots in a DMX512 packet
pub const DMX_MAX_SLOTS: usize = 512;

/// DMX frame capacity: start code + 512 slots
pub const DMX_FRAME_SIZE: usize = DMX_MAX_SLOTS + 1;

/// Smallest value a valid RDM `message_length` field may carry
/// (24-byte header with no parameter data)
pub const RDM_MESSAGE_MIN_LENGTH: usize = 24;

/// Largest value the 8-bit RDM `message_length` field can carry
pub const RDM_MESSAGE_MAX_LENGTH: usize = 255;

/// Size of the big-endian RDM checksum trailer
pub const RDM_CHECKSUM_SIZE: usize = 2;

/// RDM frame capacity: longest message plus checksum
pub const RDM_FRAME_SIZE: usize = RDM_MESSAGE_MAX_LENGTH + RDM_CHECKSUM_SIZE;

/// RDM unique identifier size (manufacturer id + device id)
pub const UID_SIZE: usize = 6;

/// Maximum number of 0xFE bytes preceding a discovery response delimiter
pub const DISCOVERY_PREAMBLE_MAX: usize = 7;

/// Encoded UID bytes in a discovery response (each byte sent twice, masked)
pub const DISCOVERY_EUID_SIZE: usize = 2 * UID_SIZE;

/// Encoded checksum bytes in a discovery response
pub const DISCOVERY_ECS_SIZE: usize = 4;

/// Full discovery response: preamble + delimiter + encoded UID + checksum
pub const DISCOVERY_RESPONSE_SIZE: usize =
    DISCOVERY_PREAMBLE_MAX + 1 + DISCOVERY_EUID_SIZE + DISCOVERY_ECS_SIZE;

// =============================================================================
// Start Codes and Markers
// =============================================================================

/// Null start code for dimmer data
pub const DMX_START_CODE: u8 = 0x00;

/// RDM start code
pub const RDM_START_CODE: u8 = 0xCC;

/// RDM sub-start code (sub-message marker)
pub const RDM_SUB_START_CODE: u8 = 0x01;

/// Discovery response preamble byte
pub const DISCOVERY_PREAMBLE_BYTE: u8 = 0xFE;

/// Discovery response preamble separator
pub const DISCOVERY_DELIMITER: u8 = 0xAA;

// =============================================================================
// Transmit Timing (microseconds)
// =============================================================================

/// Duration of one slot on the wire at 250 kbit/s, 8N2 (11 bits x 4 us)
pub const SLOT_TIME_US: u32 = 44;

/// Minimum transmitted break
pub const BREAK_TIME_MIN_US: u32 = 92;

/// Typical transmitted break, used as default
pub const BREAK_TIME_TYPICAL_US: u32 = 176;

/// Upper bound accepted for break and mark-after-break
pub const BREAK_TIME_MAX_US: u32 = 1_000_000;

/// Minimum transmitted mark-after-break
pub const MAB_TIME_MIN_US: u32 = 12;

/// Upper bound accepted for mark-after-break
pub const MAB_TIME_MAX_US: u32 = 1_000_000;

/// Absolute minimum break-to-break time for a transmitter
pub const BREAK_TO_BREAK_TIME_MIN_US: u32 = 1204;

/// Default refresh rate in packets per second
pub const REFRESH_RATE_DEFAULT: u32 = 40;

/// Default requested period (40 Hz)
pub const PERIOD_DEFAULT_US: u32 = 1_000_000 / REFRESH_RATE_DEFAULT;

/// First transmit alarm after a sequencer start
pub const TRANSMIT_START_DELAY_US: u32 = 4;

/// Alarm latency margin added to the computed minimum period when the
/// requested period is shorter than the frame
pub const PERIOD_LATENCY_MARGIN_US: u32 = 4;

// =============================================================================
// Receive Timing (microseconds)
// =============================================================================

/// Floor applied to measured slot-to-slot spacing. Some UARTs timestamp
/// back-to-back FIFO bytes closer than the wire allows.
pub const SLOT_TO_SLOT_FLOOR_US: u32 = 44;

/// Guard added to the expected slot spacing before the receive watchdog fires
pub const RECEIVE_TIMEOUT_GUARD_US: u32 = 12;

/// Window over which updates-per-second is sampled
pub const UPDATES_SAMPLE_WINDOW_US: u32 = 1_000_000;

// =============================================================================
// RDM Timing (microseconds)
// =============================================================================

/// Break sent ahead of RDM commands and responses
pub const RDM_TRANSMIT_BREAK_TIME_US: u32 = 176;

/// Mark-after-break sent ahead of RDM commands and responses
pub const RDM_TRANSMIT_MAB_TIME_US: u32 = 68;

/// Minimum time a responder waits after the end of a request
pub const RDM_RESPONDER_PACKET_SPACING_US: u32 = 176;

/// Bound on waiting for the UART transmitter to empty after an RDM send
pub const RDM_TRANSMIT_DRAIN_TIMEOUT_US: u32 = 20_000;

// =============================================================================
// Defaults
// =============================================================================

/// Default depth of the DMX receive frame store
pub const DEFAULT_DMX_BUFFERS: usize = 4;

/// Default depth of the RDM receive frame store
pub const DEFAULT_RDM_BUFFERS: usize = 8;

/// Slack added to twice the effective period when draining the sequencer
pub const DRAIN_TIMEOUT_SLACK_US: u32 = 1_000;

/// Maximum bytes serviced per UART interrupt (hardware FIFO depth)
pub const UART_FIFO_DEPTH: usize = 64;

// =============================================================================
// RDM Message Layout (byte offsets)
// =============================================================================

/// Offset of the sub-start code
pub const RDM_OFFSET_SUB_START_CODE: usize = 1;

/// Offset of the `message_length` field
pub const RDM_OFFSET_MESSAGE_LENGTH: usize = 2;

/// Offset of the destination UID
pub const RDM_OFFSET_DESTINATION_UID: usize = 3;

/// Offset of the source UID
pub const RDM_OFFSET_SOURCE_UID: usize = 9;

/// Offset of the transaction number
pub const RDM_OFFSET_TRANSACTION_NUMBER: usize = 15;
