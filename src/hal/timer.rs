//! Microsecond timer capability
//!
//! One free-running 32-bit microsecond counter, readable from every context,
//! plus two one-shot alarm channels: one paces the transmit sequencer, the
//! other is the receive watchdog. Counter values wrap; every comparison in
//! the crate goes through [`elapsed_since`] / [`is_due`].

/// Alarm channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm {
    /// Transmit sequencer phase timer
    Transmit,
    /// Receive slot watchdog
    ReceiveTimeout,
}

/// Timer operations the link layer needs.
///
/// All methods take `&self`: the counter is read from the interrupts and the
/// foreground alike, and alarm registers are plain MMIO writes.
pub trait DmxTimer {
    /// Free-running microsecond counter
    fn now_micros(&self) -> u32;

    /// Fire the alarm's interrupt once the counter reaches `at_micros`
    fn set_alarm(&self, alarm: Alarm, at_micros: u32);

    /// Disarm the alarm
    fn cancel_alarm(&self, alarm: Alarm);
}

/// Microseconds from `since` to `now`, across counter wraparound
#[inline(always)]
pub const fn elapsed_since(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Check if `deadline` has been reached at `now`
///
/// Valid while the two instants are less than 2^31 us (~35 min) apart.
#[inline(always)]
pub const fn is_due(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// Spin until `deadline`. Foreground context only.
#[inline]
pub fn spin_until<T: DmxTimer + ?Sized>(timer: &T, deadline: u32) {
    while !is_due(timer.now_micros(), deadline) {
        core::hint::spin_loop();
    }
}

/// Spin for `micros` microseconds. Foreground context only.
#[inline]
pub fn spin_for<T: DmxTimer + ?Sized>(timer: &T, micros: u32) {
    let deadline = timer.now_micros().wrapping_add(micros);
    spin_until(timer, deadline);
}

/// Spin while `busy` holds, at most `timeout_us`. Returns `false` on timeout.
pub fn spin_while<T, F>(timer: &T, timeout_us: u32, mut busy: F) -> bool
where
    T: DmxTimer + ?Sized,
    F: FnMut() -> bool,
{
    let start = timer.now_micros();
    while busy() {
        if elapsed_since(timer.now_micros(), start) >= timeout_us {
            return false;
        }
        core::hint::spin_loop();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTimer;

    #[test]
    fn elapsed_since_wraps() {
        assert_eq!(elapsed_since(10, 5), 5);
        assert_eq!(elapsed_since(5, u32::MAX - 4), 10);
    }

    #[test]
    fn is_due_handles_wraparound() {
        assert!(is_due(100, 100));
        assert!(is_due(101, 100));
        assert!(!is_due(99, 100));
        assert!(is_due(3, u32::MAX - 3));
        assert!(!is_due(u32::MAX - 3, 3));
    }

    #[test]
    fn spin_for_advances_mock_clock() {
        let timer = MockTimer::with_auto_advance(1);
        let start = timer.now_micros();
        spin_for(&timer, 50);
        assert!(elapsed_since(timer.now_micros(), start) >= 50);
    }

    #[test]
    fn spin_while_times_out() {
        let timer = MockTimer::with_auto_advance(10);
        assert!(!spin_while(&timer, 100, || true));
    }

    #[test]
    fn spin_while_returns_when_condition_clears() {
        let timer = MockTimer::with_auto_advance(1);
        let mut polls = 0;
        assert!(spin_while(&timer, 1_000, || {
            polls += 1;
            polls < 5
        }));
        assert_eq!(polls, 5);
    }
}
