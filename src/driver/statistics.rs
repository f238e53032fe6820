//! Receive and transmit statistics
//!
//! Every counter has exactly one writing context. The receive counters are
//! written by the UART interrupt, the overrun counter by the transmit timer
//! interrupt; the foreground only loads. Increments are plain load/store
//! pairs so cores without atomic read-modify-write still qualify.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::hal::timer::elapsed_since;
use crate::internal::constants::UPDATES_SAMPLE_WINDOW_US;

/// Counters shared between the interrupt handlers and the foreground.
pub struct Statistics {
    dmx_packets: AtomicU32,
    rdm_packets: AtomicU32,
    break_to_break_us: AtomicU32,
    slot_to_slot_us: AtomicU32,
    slots_in_packet: AtomicU32,
    rdm_receive_end_us: AtomicU32,
    transmit_overruns: AtomicU32,
}

#[inline(always)]
fn bump(counter: &AtomicU32) {
    counter.store(counter.load(Ordering::Relaxed).wrapping_add(1), Ordering::Relaxed);
}

impl Statistics {
    /// All counters zeroed
    pub const fn new() -> Self {
        Self {
            dmx_packets: AtomicU32::new(0),
            rdm_packets: AtomicU32::new(0),
            break_to_break_us: AtomicU32::new(0),
            slot_to_slot_us: AtomicU32::new(0),
            slots_in_packet: AtomicU32::new(0),
            rdm_receive_end_us: AtomicU32::new(0),
            transmit_overruns: AtomicU32::new(0),
        }
    }

    // ---- UART interrupt writers ----

    #[inline]
    pub(crate) fn count_dmx_packet(&self) {
        bump(&self.dmx_packets);
    }

    #[inline]
    pub(crate) fn count_rdm_packet(&self) {
        bump(&self.rdm_packets);
    }

    #[inline]
    pub(crate) fn record_break_to_break(&self, us: u32) {
        self.break_to_break_us.store(us, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_slot_to_slot(&self, us: u32) {
        self.slot_to_slot_us.store(us, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_slots_in_packet(&self, slots: u16) {
        self.slots_in_packet.store(u32::from(slots), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rdm_receive_end(&self, now: u32) {
        self.rdm_receive_end_us.store(now, Ordering::Release);
    }

    // ---- Transmit timer writer ----

    #[inline]
    pub(crate) fn count_transmit_overrun(&self) {
        bump(&self.transmit_overruns);
    }

    // ---- Readers ----

    /// DMX packets seen since power-up (wrapping)
    #[inline]
    pub fn dmx_packets(&self) -> u32 {
        self.dmx_packets.load(Ordering::Relaxed)
    }

    /// RDM packets seen since power-up (wrapping)
    #[inline]
    pub fn rdm_packets(&self) -> u32 {
        self.rdm_packets.load(Ordering::Relaxed)
    }

    /// Latest DMX break-to-break interval
    #[inline]
    pub fn break_to_break_us(&self) -> u32 {
        self.break_to_break_us.load(Ordering::Relaxed)
    }

    /// Latest slot-to-slot interval (never below 44)
    #[inline]
    pub fn slot_to_slot_us(&self) -> u32 {
        self.slot_to_slot_us.load(Ordering::Relaxed)
    }

    /// Slot count of the latest published DMX frame
    #[inline]
    pub fn slots_in_packet(&self) -> u16 {
        self.slots_in_packet.load(Ordering::Relaxed) as u16
    }

    /// Timer value at the end of the latest published RDM frame
    #[inline]
    pub fn rdm_receive_end_us(&self) -> u32 {
        self.rdm_receive_end_us.load(Ordering::Acquire)
    }

    /// Transmit alarms that fired while the previous frame was still draining
    #[inline]
    pub fn transmit_overruns(&self) -> u32 {
        self.transmit_overruns.load(Ordering::Relaxed)
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of [`Statistics`] as seen by one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatisticsSnapshot {
    /// DMX packets since the last counter reset
    pub dmx_packets: u32,
    /// RDM packets since the last counter reset
    pub rdm_packets: u32,
    /// DMX packets per second over the last complete sample window
    pub updates_per_second: u32,
    /// Latest DMX break-to-break interval
    pub break_to_break_us: u32,
    /// Latest slot-to-slot interval
    pub slot_to_slot_us: u32,
    /// Slot count of the latest DMX frame
    pub slots_in_packet: u16,
    /// Timer value at the end of the latest RDM frame
    pub rdm_receive_end_us: u32,
    /// Transmit sequencer overruns
    pub transmit_overruns: u32,
}

/// Foreground-owned view state: reset baselines and the update-rate sampler.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StatisticsView {
    dmx_baseline: u32,
    rdm_baseline: u32,
    window_start_us: u32,
    window_start_packets: u32,
    window_primed: bool,
    updates_per_second: u32,
}

impl StatisticsView {
    pub(crate) const fn new() -> Self {
        Self {
            dmx_baseline: 0,
            rdm_baseline: 0,
            window_start_us: 0,
            window_start_packets: 0,
            window_primed: false,
            updates_per_second: 0,
        }
    }

    /// Zero the packet counters as seen through this view
    pub(crate) fn reset_counters(&mut self, stats: &Statistics) {
        self.dmx_baseline = stats.dmx_packets();
        self.rdm_baseline = stats.rdm_packets();
    }

    /// Advance the update-rate sampler and return the latest rate.
    ///
    /// The rate is refreshed once at least one sample window has elapsed.
    pub(crate) fn sample_updates(&mut self, stats: &Statistics, now: u32) -> u32 {
        let packets = stats.dmx_packets();
        if !self.window_primed {
            self.window_primed = true;
            self.window_start_us = now;
            self.window_start_packets = packets;
            return self.updates_per_second;
        }

        let elapsed = elapsed_since(now, self.window_start_us);
        if elapsed >= UPDATES_SAMPLE_WINDOW_US {
            let delta = packets.wrapping_sub(self.window_start_packets);
            self.updates_per_second = (u64::from(delta) * 1_000_000 / u64::from(elapsed)) as u32;
            self.window_start_us = now;
            self.window_start_packets = packets;
        }
        self.updates_per_second
    }

    pub(crate) fn snapshot(&mut self, stats: &Statistics, now: u32) -> StatisticsSnapshot {
        StatisticsSnapshot {
            dmx_packets: stats.dmx_packets().wrapping_sub(self.dmx_baseline),
            rdm_packets: stats.rdm_packets().wrapping_sub(self.rdm_baseline),
            updates_per_second: self.sample_updates(stats, now),
            break_to_break_us: stats.break_to_break_us(),
            slot_to_slot_us: stats.slot_to_slot_us(),
            slots_in_packet: stats.slots_in_packet(),
            rdm_receive_end_us: stats.rdm_receive_end_us(),
            transmit_overruns: stats.transmit_overruns(),
        }
    }
}
