//! Configuration types for the DMX512/RDM port

use super::timing::TimingConfig;
use crate::internal::constants::{
    BREAK_TIME_TYPICAL_US, DRAIN_TIMEOUT_SLACK_US, MAB_TIME_MIN_US, PERIOD_DEFAULT_US,
};

/// Line direction of the half-duplex port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortDirection {
    /// Receiver enabled, transceiver driver off
    #[default]
    Input,
    /// Transceiver driver on, transmit sequencer active
    Output,
}

impl PortDirection {
    /// Level to drive on the direction pin (`true` = high)
    #[inline]
    #[must_use]
    pub const fn pin_level(self) -> bool {
        matches!(self, PortDirection::Output)
    }
}

/// Port configuration applied by [`crate::DmxPort::new`].
///
/// # Example
///
/// ```ignore
/// let config = DmxConfig::new()
///     .with_direction(PortDirection::Output)
///     .with_period_us(0)
///     .with_break_time_us(176);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmxConfig {
    /// Break duration (clamped to [92, 1_000_000] us when applied)
    pub break_time_us: u32,
    /// Mark-after-break duration (clamped to [12, 1_000_000] us when applied)
    pub mab_time_us: u32,
    /// Requested break-to-break period, 0 = as fast as allowed
    pub period_us: u32,
    /// Initial direction
    pub direction: PortDirection,
    /// Start the sequencer for `direction` immediately
    pub data_enabled: bool,
    /// Bound on draining the transmit sequencer before a direction switch.
    /// `None` derives it from the effective period.
    pub drain_timeout_us: Option<u32>,
}

impl Default for DmxConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DmxConfig {
    /// Create a new configuration with defaults (receive, 40 Hz when sending)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            break_time_us: BREAK_TIME_TYPICAL_US,
            mab_time_us: MAB_TIME_MIN_US,
            period_us: PERIOD_DEFAULT_US,
            direction: PortDirection::Input,
            data_enabled: true,
            drain_timeout_us: None,
        }
    }

    /// Set the break time
    #[must_use]
    pub const fn with_break_time_us(mut self, us: u32) -> Self {
        self.break_time_us = us;
        self
    }

    /// Set the mark-after-break time
    #[must_use]
    pub const fn with_mab_time_us(mut self, us: u32) -> Self {
        self.mab_time_us = us;
        self
    }

    /// Set the requested break-to-break period
    #[must_use]
    pub const fn with_period_us(mut self, us: u32) -> Self {
        self.period_us = us;
        self
    }

    /// Set the initial direction
    #[must_use]
    pub const fn with_direction(mut self, direction: PortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Start or hold off the sequencer at attach time
    #[must_use]
    pub const fn with_data_enabled(mut self, enabled: bool) -> Self {
        self.data_enabled = enabled;
        self
    }

    /// Override the drain bound used on direction switches
    #[must_use]
    pub const fn with_drain_timeout_us(mut self, us: u32) -> Self {
        self.drain_timeout_us = Some(us);
        self
    }

    /// Resolved transmit timing for `payload_len` bytes (start code included)
    #[must_use]
    pub const fn timing(&self, payload_len: usize) -> TimingConfig {
        TimingConfig::compute(
            self.break_time_us,
            self.mab_time_us,
            self.period_us,
            payload_len,
        )
    }

    /// Drain bound for a sequencer running at `timing`
    #[must_use]
    pub const fn drain_timeout_for(&self, timing: &TimingConfig) -> u32 {
        match self.drain_timeout_us {
            Some(us) => us,
            None => timing
                .period_us_effective
                .saturating_mul(2)
                .saturating_add(DRAIN_TIMEOUT_SLACK_US),
        }
    }
}
