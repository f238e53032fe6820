//! RDM framing helpers
//!
//! Checksum computation and validation of outgoing RDM messages. Only the
//! link-layer framing lives here; parameter IDs and the device model are
//! left to higher layers.
//!
//! An RDM message on the wire is:
//!
//! | Offset | Field                              |
//! |--------|------------------------------------|
//! | 0      | Start code (0xCC)                  |
//! | 1      | Sub-start code (0x01)              |
//! | 2      | Message length (checksum excluded) |
//! | 3..9   | Destination UID                    |
//! | 9..15  | Source UID                         |
//! | 15     | Transaction number                 |
//! | ...    | Port, count, sub-device, command   |
//! | len    | 16-bit checksum, big-endian        |

pub mod discovery;

use crate::driver::error::{RdmError, RdmResult};
use crate::internal::constants::{
    RDM_CHECKSUM_SIZE, RDM_MESSAGE_MAX_LENGTH, RDM_MESSAGE_MIN_LENGTH, RDM_OFFSET_DESTINATION_UID,
    RDM_OFFSET_MESSAGE_LENGTH, RDM_OFFSET_SOURCE_UID, RDM_OFFSET_SUB_START_CODE,
    RDM_OFFSET_TRANSACTION_NUMBER, RDM_START_CODE, RDM_SUB_START_CODE, UID_SIZE,
};

/// 48-bit RDM unique identifier (manufacturer ID + device ID)
pub type Uid = [u8; UID_SIZE];

/// Additive RDM checksum: wrapping 16-bit sum of every byte
#[inline]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

/// Validate an outgoing message (checksum excluded) and return its checksum.
///
/// # Errors
///
/// - [`RdmError::MessageTooShort`] / [`RdmError::MessageTooLong`]: outside 24..=255 bytes
/// - [`RdmError::InvalidStartCode`]: start code or sub-start code is not RDM
/// - [`RdmError::LengthMismatch`]: the length field disagrees with the slice
pub fn validate_message(message: &[u8]) -> RdmResult<u16> {
    if message.len() < RDM_MESSAGE_MIN_LENGTH {
        return Err(RdmError::MessageTooShort);
    }
    if message.len() > RDM_MESSAGE_MAX_LENGTH {
        return Err(RdmError::MessageTooLong);
    }
    if message[0] != RDM_START_CODE || message[RDM_OFFSET_SUB_START_CODE] != RDM_SUB_START_CODE {
        return Err(RdmError::InvalidStartCode);
    }
    if message[RDM_OFFSET_MESSAGE_LENGTH] as usize != message.len() {
        return Err(RdmError::LengthMismatch);
    }
    Ok(checksum(message))
}

/// Stamp `transaction_number` into an outgoing message, validate it and
/// return its checksum.
///
/// # Errors
///
/// Same as [`validate_message`]. The message is left untouched on error.
pub fn prepare_message(message: &mut [u8], transaction_number: u8) -> RdmResult<u16> {
    validate_message(message)?;
    message[RDM_OFFSET_TRANSACTION_NUMBER] = transaction_number;
    Ok(checksum(message))
}

/// Check a received message including its trailing checksum.
///
/// # Errors
///
/// Framing errors as in [`validate_message`], or
/// [`RdmError::ChecksumMismatch`].
pub fn verify_frame(frame: &[u8]) -> RdmResult<()> {
    let Some(split) = frame.len().checked_sub(RDM_CHECKSUM_SIZE) else {
        return Err(RdmError::MessageTooShort);
    };
    let (message, sum) = frame.split_at(split);
    let expected = validate_message(message)?;
    if u16::from_be_bytes([sum[0], sum[1]]) != expected {
        return Err(RdmError::ChecksumMismatch);
    }
    Ok(())
}

fn uid_at(message: &[u8], offset: usize) -> Option<Uid> {
    let bytes = message.get(offset..offset + UID_SIZE)?;
    let mut uid = [0u8; UID_SIZE];
    uid.copy_from_slice(bytes);
    Some(uid)
}

/// Destination UID of a message, if it is long enough to carry one
#[inline]
pub fn destination_uid(message: &[u8]) -> Option<Uid> {
    uid_at(message, RDM_OFFSET_DESTINATION_UID)
}

/// Source UID of a message, if it is long enough to carry one
#[inline]
pub fn source_uid(message: &[u8]) -> Option<Uid> {
    uid_at(message, RDM_OFFSET_SOURCE_UID)
}

/// Transaction number of a message, if it is long enough to carry one
#[inline]
pub fn transaction_number(message: &[u8]) -> Option<u8> {
    message.get(RDM_OFFSET_TRANSACTION_NUMBER).copied()
}
