//! Discovery unique branch response framing
//!
//! A responder answers DISC_UNIQUE_BRANCH without a break:
//!
//! ```text
//! FE FE FE FE FE FE FE  AA  EUID x 12  ECS x 4
//! ```
//!
//! Every UID byte `b` is sent twice, as `b | 0xAA` and `b | 0x55`, so that
//! collisions between responders still decode to a detectable error. The
//! checksum is the 16-bit sum of the 12 encoded UID bytes, encoded the same
//! way (high byte first).

use super::Uid;
use crate::driver::error::{RdmError, RdmResult};
use crate::internal::constants::{
    DISCOVERY_DELIMITER, DISCOVERY_ECS_SIZE, DISCOVERY_EUID_SIZE, DISCOVERY_PREAMBLE_BYTE,
    DISCOVERY_PREAMBLE_MAX, DISCOVERY_RESPONSE_SIZE,
};

const ENCODE_HIGH: u8 = 0xAA;
const ENCODE_LOW: u8 = 0x55;

#[inline(always)]
fn encode_byte(b: u8) -> [u8; 2] {
    [b | ENCODE_HIGH, b | ENCODE_LOW]
}

#[inline(always)]
fn decode_byte(pair: &[u8]) -> u8 {
    pair[0] & pair[1]
}

/// Build the 24-byte discovery response for `uid`
#[must_use]
pub fn encode_response(uid: &Uid) -> [u8; DISCOVERY_RESPONSE_SIZE] {
    let mut out = [DISCOVERY_PREAMBLE_BYTE; DISCOVERY_RESPONSE_SIZE];
    out[DISCOVERY_PREAMBLE_MAX] = DISCOVERY_DELIMITER;

    let euid_start = DISCOVERY_PREAMBLE_MAX + 1;
    for (i, &b) in uid.iter().enumerate() {
        let at = euid_start + 2 * i;
        out[at..at + 2].copy_from_slice(&encode_byte(b));
    }

    let ecs_start = euid_start + DISCOVERY_EUID_SIZE;
    let sum = super::checksum(&out[euid_start..ecs_start]).to_be_bytes();
    out[ecs_start..ecs_start + 2].copy_from_slice(&encode_byte(sum[0]));
    out[ecs_start + 2..ecs_start + 4].copy_from_slice(&encode_byte(sum[1]));
    out
}

/// Decode a received discovery response and return the responder's UID.
///
/// Accepts 0 to 7 preamble bytes before the delimiter, as the wire may
/// lose some of them.
///
/// # Errors
///
/// - [`RdmError::InvalidDiscoveryResponse`]: preamble, delimiter or length malformed
/// - [`RdmError::ChecksumMismatch`]: encoded checksum does not match (collision)
pub fn decode_response(bytes: &[u8]) -> RdmResult<Uid> {
    let preamble = bytes
        .iter()
        .take_while(|&&b| b == DISCOVERY_PREAMBLE_BYTE)
        .count();
    if preamble > DISCOVERY_PREAMBLE_MAX || bytes.get(preamble) != Some(&DISCOVERY_DELIMITER) {
        return Err(RdmError::InvalidDiscoveryResponse);
    }

    let body = &bytes[preamble + 1..];
    if body.len() != DISCOVERY_EUID_SIZE + DISCOVERY_ECS_SIZE {
        return Err(RdmError::InvalidDiscoveryResponse);
    }
    let (euid, ecs) = body.split_at(DISCOVERY_EUID_SIZE);

    let expected = super::checksum(euid);
    let received = u16::from_be_bytes([decode_byte(&ecs[0..2]), decode_byte(&ecs[2..4])]);
    if received != expected {
        return Err(RdmError::ChecksumMismatch);
    }

    let mut uid = Uid::default();
    for (b, pair) in uid.iter_mut().zip(euid.chunks_exact(2)) {
        *b = decode_byte(pair);
    }
    Ok(uid)
}
