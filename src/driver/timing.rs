//! Transmit timing policy
//!
//! Pure computation of break, mark-after-break and break-to-break period
//! from the configured values and the outgoing payload length. Recomputed
//! whenever any input changes so the sequencer can never be scheduled
//! faster than the frame it is sending.

use crate::internal::constants::{
    BREAK_TIME_MAX_US, BREAK_TIME_MIN_US, BREAK_TIME_TYPICAL_US, BREAK_TO_BREAK_TIME_MIN_US,
    DMX_FRAME_SIZE, MAB_TIME_MAX_US, MAB_TIME_MIN_US, PERIOD_DEFAULT_US,
    PERIOD_LATENCY_MARGIN_US, SLOT_TIME_US,
};

/// Clamp a break time to [92, 1_000_000] us
#[inline]
#[must_use]
pub const fn clamp_break_time(us: u32) -> u32 {
    clamp(us, BREAK_TIME_MIN_US, BREAK_TIME_MAX_US)
}

/// Clamp a mark-after-break time to [12, 1_000_000] us
#[inline]
#[must_use]
pub const fn clamp_mab_time(us: u32) -> u32 {
    clamp(us, MAB_TIME_MIN_US, MAB_TIME_MAX_US)
}

/// Shortest break-to-break period that fits one frame:
/// `break + mab + payload_len * 44 + 44`.
///
/// `payload_len` counts every byte sent after the MAB, start code included.
#[inline]
#[must_use]
pub const fn minimum_period(break_time_us: u32, mab_time_us: u32, payload_len: usize) -> u32 {
    let payload_len = if payload_len > DMX_FRAME_SIZE {
        DMX_FRAME_SIZE
    } else {
        payload_len
    };
    break_time_us + mab_time_us + payload_len as u32 * SLOT_TIME_US + SLOT_TIME_US
}

/// Period actually used by the sequencer.
///
/// A request at or above `minimum_us` is kept. Anything shorter, including
/// 0 ("as fast as allowed"), runs at the minimum plus the alarm latency
/// margin. Never below the 1204 us break-to-break floor.
#[inline]
#[must_use]
pub const fn effective_period(requested_us: u32, minimum_us: u32) -> u32 {
    let period = if requested_us >= minimum_us {
        requested_us
    } else {
        minimum_us + PERIOD_LATENCY_MARGIN_US
    };
    max(period, BREAK_TO_BREAK_TIME_MIN_US)
}

#[inline(always)]
const fn clamp(value: u32, lo: u32, hi: u32) -> u32 {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

#[inline(always)]
const fn max(a: u32, b: u32) -> u32 {
    if a > b { a } else { b }
}

/// Resolved transmit timing for one payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Break duration after clamping
    pub break_time_us: u32,
    /// Mark-after-break duration after clamping
    pub mab_time_us: u32,
    /// Period as requested by the application (0 = as fast as allowed)
    pub period_us_requested: u32,
    /// Period the sequencer runs at
    pub period_us_effective: u32,
}

impl TimingConfig {
    /// Resolve timing for `payload_len` bytes (start code included)
    #[must_use]
    pub const fn compute(
        break_time_us: u32,
        mab_time_us: u32,
        period_us_requested: u32,
        payload_len: usize,
    ) -> Self {
        let break_time_us = clamp_break_time(break_time_us);
        let mab_time_us = clamp_mab_time(mab_time_us);
        let minimum = minimum_period(break_time_us, mab_time_us, payload_len);
        Self {
            break_time_us,
            mab_time_us,
            period_us_requested,
            period_us_effective: effective_period(period_us_requested, minimum),
        }
    }

    /// Default timing for a full 513-byte frame at 40 Hz
    #[must_use]
    pub const fn new() -> Self {
        Self::compute(
            BREAK_TIME_TYPICAL_US,
            MAB_TIME_MIN_US,
            PERIOD_DEFAULT_US,
            DMX_FRAME_SIZE,
        )
    }

    /// Recompute for a different payload length, keeping the requested values
    #[must_use]
    pub const fn for_payload(self, payload_len: usize) -> Self {
        Self::compute(
            self.break_time_us,
            self.mab_time_us,
            self.period_us_requested,
            payload_len,
        )
    }

    /// Minimum period for `payload_len` with this break and MAB
    #[inline]
    #[must_use]
    pub const fn minimum_period(&self, payload_len: usize) -> u32 {
        minimum_period(self.break_time_us, self.mab_time_us, payload_len)
    }

    /// Refresh rate in packets per second implied by the effective period
    #[inline]
    #[must_use]
    pub const fn refresh_rate(&self) -> u32 {
        1_000_000 / self.period_us_effective
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new()
    }
}
