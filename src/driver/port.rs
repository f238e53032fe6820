//! Foreground port API
//!
//! [`DmxPort`] is the single foreground handle onto a [`Dmx`] context. It
//! owns the direction pin, applies configuration, copies received frames
//! out of the stores and runs the bounded busy-waits (sequencer drain, RDM
//! framing) that must never happen in interrupt context.
//!
//! The port is not re-entrant: one caller, one thread of control.

use embedded_hal::digital::{OutputPin, PinState};

use crate::frame::{DmxFrame, RdmFrame};
use crate::hal::timer::{DmxTimer, elapsed_since, spin_for, spin_while};
use crate::hal::uart::DmxUart;
use crate::internal::constants::{
    DEFAULT_DMX_BUFFERS, DEFAULT_RDM_BUFFERS, DMX_FRAME_SIZE, DMX_MAX_SLOTS, RDM_CHECKSUM_SIZE,
    RDM_FRAME_SIZE, RDM_RESPONDER_PACKET_SPACING_US, RDM_TRANSMIT_BREAK_TIME_US,
    RDM_TRANSMIT_DRAIN_TIMEOUT_US, RDM_TRANSMIT_MAB_TIME_US,
};
use crate::rdm::{self, Uid};

use super::config::{DmxConfig, PortDirection};
use super::dmx::Dmx;
use super::error::{ConfigError, IoError, IoResult, Result};
use super::statistics::{StatisticsSnapshot, StatisticsView};
use super::timing::TimingConfig;

/// Foreground handle onto a [`Dmx`] context.
///
/// # Example
///
/// ```ignore
/// let mut port = DmxPort::new(&DMX, direction_pin, DmxConfig::new())?;
///
/// loop {
///     if let Some(frame) = port.dmx_changed() {
///         apply(frame.slots());
///     }
///     if let Some(request) = port.rdm_available() {
///         // answer with port.rdm_send_response(...)
///     }
/// }
/// ```
pub struct DmxPort<
    'a,
    U,
    T,
    P,
    const DMX_BUFS: usize = DEFAULT_DMX_BUFFERS,
    const RDM_BUFS: usize = DEFAULT_RDM_BUFFERS,
> where
    U: DmxUart,
    T: DmxTimer,
    P: OutputPin,
{
    dmx: &'a Dmx<U, T, DMX_BUFS, RDM_BUFS>,
    pin: P,
    config: DmxConfig,
    transaction_number: u8,
    dmx_frame: DmxFrame,
    last_changed: Option<DmxFrame>,
    rdm_frame: RdmFrame,
    view: StatisticsView,
}

impl<'a, U, T, P, const DMX_BUFS: usize, const RDM_BUFS: usize>
    DmxPort<'a, U, T, P, DMX_BUFS, RDM_BUFS>
where
    U: DmxUart,
    T: DmxTimer,
    P: OutputPin,
{
    /// Attach to `dmx`, drive the direction pin and start the configured
    /// sequencer.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::AlreadyInitialized`]: another port is attached
    /// - [`IoError::Gpio`]: the direction pin could not be driven
    pub fn new(
        dmx: &'a Dmx<U, T, DMX_BUFS, RDM_BUFS>,
        mut pin: P,
        config: DmxConfig,
    ) -> Result<Self> {
        let already_attached = dmx.with_engine(|e| core::mem::replace(&mut e.attached, true));
        if already_attached {
            return Err(ConfigError::AlreadyInitialized.into());
        }

        if pin
            .set_state(PinState::from(config.direction.pin_level()))
            .is_err()
        {
            dmx.with_engine(|e| e.attached = false);
            return Err(IoError::Gpio.into());
        }

        let timer = dmx.timer();
        dmx.with_engine(|e| {
            e.transmitter.set_timing(&config);
            e.direction = config.direction;
            if config.data_enabled {
                e.start(timer);
            }
        });

        #[cfg(feature = "defmt")]
        defmt::info!(
            "port: attached, direction {}, data {=bool}",
            config.direction,
            config.data_enabled
        );

        Ok(Self {
            dmx,
            pin,
            config,
            transaction_number: 0,
            dmx_frame: DmxFrame::EMPTY,
            last_changed: None,
            rdm_frame: RdmFrame::EMPTY,
            view: StatisticsView::new(),
        })
    }

    /// Configuration as currently applied
    #[inline]
    pub fn config(&self) -> &DmxConfig {
        &self.config
    }

    /// Current direction and whether its sequencer runs
    #[inline]
    pub fn direction(&self) -> (PortDirection, bool) {
        self.dmx.direction()
    }

    // =========================================================================
    // Direction
    // =========================================================================

    /// Switch the line direction and optionally start its sequencer.
    ///
    /// A running transmit sequencer finishes its frame first (bounded
    /// busy-wait). Same direction with `enable_data` stops without touching
    /// the pin; same direction with data already running is a no-op.
    ///
    /// # Errors
    ///
    /// [`IoError::Gpio`] if the direction pin cannot be driven. The old
    /// sequencer is already stopped at that point.
    pub fn set_port_direction(
        &mut self,
        direction: PortDirection,
        enable_data: bool,
    ) -> Result<()> {
        let (current, running) = self.dmx.direction();

        if direction == current {
            if enable_data && !running {
                let timer = self.dmx.timer();
                self.dmx.with_engine(|e| e.start(timer));
            } else if !enable_data && running {
                self.stop_sequencer();
            }
            self.config.data_enabled = enable_data;
            return Ok(());
        }

        if running {
            self.stop_sequencer();
        }
        self.pin
            .set_state(PinState::from(direction.pin_level()))
            .map_err(|_| IoError::Gpio)?;

        let timer = self.dmx.timer();
        self.dmx.with_engine(|e| {
            e.direction = direction;
            if enable_data {
                e.start(timer);
            }
        });
        self.config.direction = direction;
        self.config.data_enabled = enable_data;

        #[cfg(feature = "defmt")]
        defmt::info!("port: direction {}, data {=bool}", direction, enable_data);
        Ok(())
    }

    /// Stop the running sequencer, letting an in-flight frame drain
    fn stop_sequencer(&mut self) {
        let dmx = self.dmx;
        let timer = dmx.timer();
        let direction = dmx.with_engine(|e| {
            if e.direction == PortDirection::Output {
                e.transmitter.request_stop();
            }
            e.direction
        });

        if direction == PortDirection::Output {
            let timeout = self.config.drain_timeout_for(&self.timing());
            let drained = spin_while(timer, timeout, || dmx.with_engine(|e| e.transmit_busy()));
            if !drained {
                #[cfg(feature = "defmt")]
                defmt::warn!("port: transmit drain timed out after {=u32}us", timeout);
            }
        }

        dmx.with_engine(|e| e.halt(timer));
    }

    // =========================================================================
    // Timing
    // =========================================================================

    /// Set the break time. Returns the resolved timing.
    pub fn set_break_time(&mut self, us: u32) -> TimingConfig {
        self.config.break_time_us = us;
        self.apply_timing()
    }

    /// Set the mark-after-break time. Returns the resolved timing.
    pub fn set_mab_time(&mut self, us: u32) -> TimingConfig {
        self.config.mab_time_us = us;
        self.apply_timing()
    }

    /// Set the requested break-to-break period (0 = as fast as allowed).
    /// Returns the resolved timing.
    pub fn set_period(&mut self, us: u32) -> TimingConfig {
        self.config.period_us = us;
        self.apply_timing()
    }

    /// Transmit timing currently in effect
    pub fn timing(&self) -> TimingConfig {
        self.dmx.with_engine(|e| *e.transmitter.timing())
    }

    fn apply_timing(&mut self) -> TimingConfig {
        let config = self.config;
        let timing = self.dmx.with_engine(|e| {
            e.transmitter.set_timing(&config);
            *e.transmitter.timing()
        });

        #[cfg(feature = "defmt")]
        defmt::debug!("port: timing {}", timing);
        timing
    }

    // =========================================================================
    // Send data
    // =========================================================================

    /// Queue a frame (start code included, 1..=513 bytes) for transmission.
    /// It goes out from the next break on.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidLength`] for an empty or oversized frame.
    pub fn set_send_data(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() || data.len() > DMX_FRAME_SIZE {
            return Err(ConfigError::InvalidLength.into());
        }
        self.dmx.with_engine(|e| e.transmitter.set_send_data(data));

        #[cfg(feature = "defmt")]
        defmt::debug!("port: send data {=usize} bytes", data.len());
        Ok(())
    }

    /// Queue up to 512 slots behind a DMX start code.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidLength`] for more than 512 slots.
    pub fn set_send_data_without_start_code(&mut self, slots: &[u8]) -> Result<()> {
        if slots.len() > DMX_MAX_SLOTS {
            return Err(ConfigError::InvalidLength.into());
        }
        self.dmx.with_engine(|e| e.transmitter.set_send_slots(slots));

        #[cfg(feature = "defmt")]
        defmt::debug!("port: send data {=usize} slots", slots.len());
        Ok(())
    }

    // =========================================================================
    // Receive
    // =========================================================================

    /// Oldest unread DMX frame, consuming it
    pub fn dmx_available(&mut self) -> Option<&DmxFrame> {
        if self.dmx.dmx_frames().pop_into(&mut self.dmx_frame) {
            Some(&self.dmx_frame)
        } else {
            None
        }
    }

    /// Oldest unread DMX frame, left in the store
    pub fn dmx_current(&mut self) -> Option<&DmxFrame> {
        if self.dmx.dmx_frames().peek_into(&mut self.dmx_frame) {
            Some(&self.dmx_frame)
        } else {
            None
        }
    }

    /// Oldest unread DMX frame, consumed, returned only when its data
    /// differs from the last frame this method returned
    pub fn dmx_changed(&mut self) -> Option<&DmxFrame> {
        if !self.dmx.dmx_frames().pop_into(&mut self.dmx_frame) {
            return None;
        }
        let changed = self
            .last_changed
            .as_ref()
            .is_none_or(|previous| previous.data() != self.dmx_frame.data());
        if !changed {
            return None;
        }
        self.last_changed = Some(self.dmx_frame);
        Some(&self.dmx_frame)
    }

    /// Oldest unread RDM frame, consuming it
    pub fn rdm_available(&mut self) -> Option<&RdmFrame> {
        if self.dmx.rdm_frames().pop_into(&mut self.rdm_frame) {
            Some(&self.rdm_frame)
        } else {
            None
        }
    }

    /// Oldest unread RDM frame, left in the store
    pub fn rdm_current(&mut self) -> Option<&RdmFrame> {
        if self.dmx.rdm_frames().peek_into(&mut self.rdm_frame) {
            Some(&self.rdm_frame)
        } else {
            None
        }
    }

    /// Unread DMX frames (at most the store depth)
    #[inline]
    pub fn dmx_pending(&self) -> usize {
        self.dmx.dmx_frames().len()
    }

    /// Unread RDM frames (at most the store depth)
    #[inline]
    pub fn rdm_pending(&self) -> usize {
        self.dmx.rdm_frames().len()
    }

    /// Drop every unread frame
    pub fn flush_received(&mut self) {
        self.dmx.dmx_frames().clear();
        self.dmx.rdm_frames().clear();
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Snapshot of the counters as seen by this port
    pub fn statistics(&mut self) -> StatisticsSnapshot {
        let now = self.dmx.timer().now_micros();
        self.view.snapshot(self.dmx.statistics(), now)
    }

    /// DMX packets per second over the last complete sample window
    pub fn updates_per_second(&mut self) -> u32 {
        let now = self.dmx.timer().now_micros();
        self.view.sample_updates(self.dmx.statistics(), now)
    }

    /// Zero the DMX and RDM packet counters
    pub fn reset_counters(&mut self) {
        self.view.reset_counters(self.dmx.statistics());
    }

    // =========================================================================
    // RDM
    // =========================================================================

    /// Transaction number the next [`Self::rdm_send`] will use
    #[inline]
    pub fn transaction_number(&self) -> u8 {
        self.transaction_number
    }

    /// Send an RDM command (checksum excluded) with break framing.
    ///
    /// Waits until `spacing_us` have passed since the end of the last
    /// received RDM frame, stamps the next transaction number, appends the
    /// checksum and transmits. The port is left receiving afterwards.
    /// Returns the transaction number used.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidState`]: the port is streaming DMX output
    /// - [`crate::RdmError`]: the message is malformed
    /// - [`IoError::Timeout`]: the UART did not accept or drain the frame
    /// - [`IoError::Gpio`]: the direction pin could not be driven
    ///
    /// Nothing is sent on the first two.
    pub fn rdm_send(&mut self, message: &[u8], spacing_us: u32) -> Result<u8> {
        self.ensure_line_free()?;
        rdm::validate_message(message)?;

        let len = message.len();
        let mut frame = [0u8; RDM_FRAME_SIZE];
        frame[..len].copy_from_slice(message);
        let transaction = self.transaction_number;
        let sum = rdm::prepare_message(&mut frame[..len], transaction)?;
        frame[len..len + RDM_CHECKSUM_SIZE].copy_from_slice(&sum.to_be_bytes());
        self.transaction_number = transaction.wrapping_add(1);

        self.wait_spacing(spacing_us);
        self.transmit_raw(&frame[..len + RDM_CHECKSUM_SIZE], true)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("rdm: sent {=usize} bytes, tn {=u8}", len, transaction);
        Ok(transaction)
    }

    /// Send an RDM response (checksum excluded) with break framing after the
    /// responder packet spacing. The transaction number is taken from the
    /// message as-is.
    ///
    /// # Errors
    ///
    /// As [`Self::rdm_send`].
    pub fn rdm_send_response(&mut self, message: &[u8]) -> Result<()> {
        self.ensure_line_free()?;
        let sum = rdm::validate_message(message)?;

        let len = message.len();
        let mut frame = [0u8; RDM_FRAME_SIZE];
        frame[..len].copy_from_slice(message);
        frame[len..len + RDM_CHECKSUM_SIZE].copy_from_slice(&sum.to_be_bytes());

        self.wait_spacing(RDM_RESPONDER_PACKET_SPACING_US);
        self.transmit_raw(&frame[..len + RDM_CHECKSUM_SIZE], true)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("rdm: response {=usize} bytes", len);
        Ok(())
    }

    /// Answer a discovery unique branch request: no break, encoded UID.
    ///
    /// # Errors
    ///
    /// [`IoError::InvalidState`], [`IoError::Timeout`] or [`IoError::Gpio`]
    /// as for [`Self::rdm_send`].
    pub fn rdm_send_discovery_response(&mut self, uid: &Uid) -> Result<()> {
        self.ensure_line_free()?;
        let response = rdm::discovery::encode_response(uid);
        self.wait_spacing(RDM_RESPONDER_PACKET_SPACING_US);
        self.transmit_raw(&response, false)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("rdm: discovery response sent");
        Ok(())
    }

    /// RDM framing hands the line back to the receiver afterwards, so it
    /// must not cut into a running DMX output stream
    fn ensure_line_free(&self) -> IoResult<()> {
        if self.dmx.direction() == (PortDirection::Output, true) {
            #[cfg(feature = "defmt")]
            defmt::warn!("rdm: send refused while transmitting DMX");
            return Err(IoError::InvalidState);
        }
        Ok(())
    }

    /// Busy-wait until `spacing_us` have passed since the last RDM receipt
    fn wait_spacing(&self, spacing_us: u32) {
        let timer = self.dmx.timer();
        let end = self.dmx.statistics().rdm_receive_end_us();
        let elapsed = elapsed_since(timer.now_micros(), end);
        if elapsed < spacing_us {
            spin_for(timer, spacing_us - elapsed);
        }
    }

    /// Take the line, send `bytes`, hand the line back to the receiver
    fn transmit_raw(&mut self, bytes: &[u8], with_break: bool) -> Result<()> {
        self.set_port_direction(PortDirection::Output, false)?;
        let sent = self.write_frame(bytes, with_break);
        self.set_port_direction(PortDirection::Input, true)?;

        #[cfg(feature = "defmt")]
        if sent.is_err() {
            defmt::warn!("rdm: transmit timed out");
        }
        Ok(sent?)
    }

    fn write_frame(&self, bytes: &[u8], with_break: bool) -> IoResult<()> {
        let dmx = self.dmx;
        let timer = dmx.timer();

        if with_break {
            dmx.with_engine(|e| e.uart.set_break(true));
            spin_for(timer, RDM_TRANSMIT_BREAK_TIME_US);
            dmx.with_engine(|e| e.uart.set_break(false));
            spin_for(timer, RDM_TRANSMIT_MAB_TIME_US);
        }

        for &byte in bytes {
            let ready = spin_while(timer, RDM_TRANSMIT_DRAIN_TIMEOUT_US, || {
                !dmx.line_status().tx_ready
            });
            if !ready {
                return Err(IoError::Timeout);
            }
            dmx.with_engine(|e| e.uart.write_byte(byte));
        }

        let drained = spin_while(timer, RDM_TRANSMIT_DRAIN_TIMEOUT_US, || {
            !dmx.line_status().tx_idle
        });
        if drained { Ok(()) } else { Err(IoError::Timeout) }
    }
}

impl<U, T, P, const DMX_BUFS: usize, const RDM_BUFS: usize> Drop
    for DmxPort<'_, U, T, P, DMX_BUFS, RDM_BUFS>
where
    U: DmxUart,
    T: DmxTimer,
    P: OutputPin,
{
    fn drop(&mut self) {
        let timer = self.dmx.timer();
        self.dmx.with_engine(|e| {
            if e.running {
                e.halt(timer);
            }
            e.attached = false;
        });
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::driver::error::{Error, RdmError};
    use crate::driver::transmitter::TransmitState;
    use crate::hal::timer::Alarm;
    use crate::testing::{MockPin, MockTimer, MockUart, TxEvent};

    type TestDmx = Dmx<MockUart, MockTimer, 4, 4>;

    fn context(timer: &MockTimer) -> (TestDmx, MockUart) {
        let uart = MockUart::new();
        (TestDmx::new(uart.clone(), timer.clone()), uart)
    }

    fn rdm_get() -> [u8; 24] {
        let mut msg = [0u8; 24];
        msg[0] = 0xCC;
        msg[1] = 0x01;
        msg[2] = 24;
        msg[3..9].copy_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        msg[9..15].copy_from_slice(&[0x7A, 0x70, 0, 0, 0, 1]);
        msg[20] = 0x20;
        msg[21] = 0x10;
        msg
    }

    fn receive_frame(dmx: &TestDmx, uart: &MockUart, timer: &MockTimer, bytes: &[u8]) {
        uart.push_break();
        dmx.on_uart_interrupt();
        for &b in bytes {
            timer.advance(44);
            uart.push_bytes(&[b]);
            dmx.on_uart_interrupt();
        }
    }

    fn step_transmit(dmx: &TestDmx, timer: &MockTimer) {
        let at = timer.alarm(Alarm::Transmit).unwrap();
        timer.set(at);
        dmx.on_transmit_timer();
    }

    // =========================================================================
    // Attach
    // =========================================================================

    #[test]
    fn new_starts_receiving_with_pin_low() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let pin = MockPin::new();

        let port = DmxPort::new(&dmx, pin.clone(), DmxConfig::new()).unwrap();
        assert_eq!(port.direction(), (PortDirection::Input, true));
        assert!(!pin.is_high());
        assert_eq!(pin.writes(), 1);
        assert!(uart.rx_interrupt_enabled());
    }

    #[test]
    fn second_port_rejected_until_first_dropped() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);

        let first = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();
        let second = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new());
        assert!(matches!(
            second,
            Err(Error::Config(ConfigError::AlreadyInitialized))
        ));

        drop(first);
        assert!(!uart.rx_interrupt_enabled());
        assert!(DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).is_ok());
    }

    #[test]
    fn failing_pin_releases_context() {
        let timer = MockTimer::new();
        let (dmx, _uart) = context(&timer);

        let result = DmxPort::new(&dmx, MockPin::failing(), DmxConfig::new());
        assert!(matches!(result, Err(Error::Io(IoError::Gpio))));
        assert!(DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).is_ok());
    }

    #[test]
    fn new_output_primes_transmit_alarm() {
        let timer = MockTimer::new();
        timer.set(500);
        let (dmx, _uart) = context(&timer);
        let pin = MockPin::new();
        let config = DmxConfig::new().with_direction(PortDirection::Output);

        let _port = DmxPort::new(&dmx, pin.clone(), config).unwrap();
        assert!(pin.is_high());
        assert_eq!(timer.alarm(Alarm::Transmit), Some(504));
    }

    // =========================================================================
    // Direction
    // =========================================================================

    #[test]
    fn output_enable_twice_keeps_one_sequencer() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let pin = MockPin::new();
        let mut port = DmxPort::new(&dmx, pin.clone(), DmxConfig::new()).unwrap();

        port.set_port_direction(PortDirection::Output, true).unwrap();
        step_transmit(&dmx, &timer);
        assert_eq!(dmx.transmit_state(), TransmitState::Break);
        let alarm = timer.alarm(Alarm::Transmit);

        port.set_port_direction(PortDirection::Output, true).unwrap();
        assert_eq!(dmx.transmit_state(), TransmitState::Break);
        assert_eq!(timer.alarm(Alarm::Transmit), alarm);
        assert!(uart.break_asserted());
        assert_eq!(pin.writes(), 2);
    }

    #[test]
    fn switch_to_input_drains_and_releases_line() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let pin = MockPin::new();
        let config = DmxConfig::new().with_direction(PortDirection::Output);
        let mut port = DmxPort::new(&dmx, pin.clone(), config).unwrap();
        port.set_send_data(&[0, 1, 2, 3]).unwrap();

        for _ in 0..3 {
            step_transmit(&dmx, &timer);
        }
        assert_eq!(dmx.transmit_state(), TransmitState::InterPacket);

        port.set_port_direction(PortDirection::Input, true).unwrap();
        assert_eq!(port.direction(), (PortDirection::Input, true));
        assert_eq!(dmx.transmit_state(), TransmitState::Idle);
        assert_eq!(timer.alarm(Alarm::Transmit), None);
        assert!(!pin.is_high());
        assert!(uart.rx_interrupt_enabled());
        assert_eq!(uart.transmitted(), std::vec![0, 1, 2, 3]);
    }

    #[test]
    fn drain_timeout_forces_idle() {
        let timer = MockTimer::with_auto_advance(5);
        let (dmx, uart) = context(&timer);
        let config = DmxConfig::new()
            .with_direction(PortDirection::Output)
            .with_drain_timeout_us(200);
        let mut port = DmxPort::new(&dmx, MockPin::new(), config).unwrap();

        // Break asserted; nobody services the alarm during the drain
        step_transmit(&dmx, &timer);
        assert!(uart.break_asserted());

        port.set_port_direction(PortDirection::Input, true).unwrap();
        assert_eq!(dmx.transmit_state(), TransmitState::Idle);
        assert!(!uart.break_asserted());
        assert_eq!(port.direction(), (PortDirection::Input, true));
    }

    #[test]
    fn same_direction_disable_leaves_pin_alone() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let pin = MockPin::new();
        let mut port = DmxPort::new(&dmx, pin.clone(), DmxConfig::new()).unwrap();

        port.set_port_direction(PortDirection::Input, false).unwrap();
        assert_eq!(port.direction(), (PortDirection::Input, false));
        assert!(!uart.rx_interrupt_enabled());
        assert_eq!(pin.writes(), 1);

        port.set_port_direction(PortDirection::Input, true).unwrap();
        assert_eq!(port.direction(), (PortDirection::Input, true));
        assert_eq!(pin.writes(), 1);
    }

    #[test]
    fn pin_failure_on_switch_reported() {
        let timer = MockTimer::new();
        let (dmx, _uart) = context(&timer);
        let pin = MockPin::new();
        let mut port = DmxPort::new(&dmx, pin.clone(), DmxConfig::new()).unwrap();

        pin.set_failing(true);
        let result = port.set_port_direction(PortDirection::Output, true);
        assert_eq!(result, Err(Error::Io(IoError::Gpio)));
        assert_eq!(port.direction(), (PortDirection::Input, false));
    }

    // =========================================================================
    // Timing and send data
    // =========================================================================

    #[test]
    fn short_period_is_clamped() {
        let timer = MockTimer::new();
        let (dmx, _uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        port.set_break_time(176);
        port.set_mab_time(16);
        let timing = port.set_period(100);
        assert!(timing.period_us_effective >= 176 + 16 + 513 * 44 + 44);
        assert!(timing.period_us_effective >= 22_812);
        assert_eq!(port.timing(), timing);
    }

    #[test]
    fn zero_period_tracks_payload() {
        let timer = MockTimer::new();
        let (dmx, _uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let full = port.set_period(0);
        assert_eq!(full.period_us_effective, full.minimum_period(513) + 4);
    }

    #[test]
    fn send_data_length_validated() {
        let timer = MockTimer::new();
        let (dmx, _uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let too_long = [0u8; 514];
        assert_eq!(
            port.set_send_data(&[]),
            Err(Error::Config(ConfigError::InvalidLength))
        );
        assert_eq!(
            port.set_send_data(&too_long),
            Err(Error::Config(ConfigError::InvalidLength))
        );
        assert_eq!(
            port.set_send_data_without_start_code(&too_long[..513]),
            Err(Error::Config(ConfigError::InvalidLength))
        );
        assert!(port.set_send_data(&too_long[..513]).is_ok());
        assert!(port.set_send_data_without_start_code(&too_long[..512]).is_ok());
        assert!(port.set_send_data_without_start_code(&[]).is_ok());
    }

    #[test]
    fn slots_without_start_code_go_out_with_zero_start_code() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let config = DmxConfig::new().with_direction(PortDirection::Output);
        let mut port = DmxPort::new(&dmx, MockPin::new(), config).unwrap();

        port.set_send_data_without_start_code(&[10, 20, 30]).unwrap();
        for _ in 0..3 {
            step_transmit(&dmx, &timer);
        }
        assert_eq!(uart.transmitted(), std::vec![0, 10, 20, 30]);
    }

    // =========================================================================
    // Receive
    // =========================================================================

    #[test]
    fn dmx_available_and_current() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        assert!(port.dmx_available().is_none());
        assert!(port.dmx_current().is_none());

        let mut frame = [0xA5u8; 513];
        frame[0] = 0;
        receive_frame(&dmx, &uart, &timer, &frame);
        assert_eq!(port.dmx_pending(), 1);

        assert_eq!(port.dmx_current().map(DmxFrame::len), Some(513));
        assert_eq!(port.dmx_pending(), 1);
        let got = port.dmx_available().unwrap();
        assert_eq!(got.data(), &frame[..]);
        assert_eq!(got.start_code(), 0);
        assert!(port.dmx_available().is_none());
        assert!(port.dmx_available().is_none());
    }

    #[test]
    fn dmx_changed_skips_repeats() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let mut a = [1u8; 513];
        a[0] = 0;
        let mut b = a;
        b[100] = 2;

        receive_frame(&dmx, &uart, &timer, &a);
        assert!(port.dmx_changed().is_some());

        receive_frame(&dmx, &uart, &timer, &a);
        assert!(port.dmx_changed().is_none());

        receive_frame(&dmx, &uart, &timer, &b);
        assert_eq!(port.dmx_changed().map(|f| f.slots()[99]), Some(2));
        assert!(port.dmx_changed().is_none());
    }

    #[test]
    fn rdm_frame_available_once() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let msg = rdm_get();
        let mut wire: Vec<u8> = msg.to_vec();
        wire.extend_from_slice(&rdm::checksum(&msg).to_be_bytes());
        receive_frame(&dmx, &uart, &timer, &wire);

        assert_eq!(port.rdm_current().map(RdmFrame::len), Some(26));
        let frame = port.rdm_available().unwrap();
        assert_eq!(frame.data(), &wire[..]);
        assert_eq!(frame.message(), Some(&msg[..]));
        assert!(port.rdm_available().is_none());
    }

    #[test]
    fn flush_drops_unread_frames() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let frame = [0u8; 513];
        receive_frame(&dmx, &uart, &timer, &frame);
        receive_frame(&dmx, &uart, &timer, &frame);
        assert_eq!(port.dmx_pending(), 2);

        port.flush_received();
        assert_eq!(port.dmx_pending(), 0);
        assert_eq!(port.rdm_pending(), 0);
    }

    #[test]
    fn statistics_count_and_reset() {
        let timer = MockTimer::new();
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let frame = [0u8; 513];
        receive_frame(&dmx, &uart, &timer, &frame);
        receive_frame(&dmx, &uart, &timer, &frame);

        let snap = port.statistics();
        assert_eq!(snap.dmx_packets, 2);
        assert_eq!(snap.slots_in_packet, 512);
        assert_eq!(snap.slot_to_slot_us, 44);
        assert!(snap.break_to_break_us > 0);

        port.reset_counters();
        assert_eq!(port.statistics().dmx_packets, 0);
    }

    // =========================================================================
    // RDM send
    // =========================================================================

    #[test]
    fn rdm_send_frames_with_break_and_checksum() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let pin = MockPin::new();
        let mut port = DmxPort::new(&dmx, pin.clone(), DmxConfig::new()).unwrap();

        let msg = rdm_get();
        assert_eq!(port.rdm_send(&msg, 0), Ok(0));
        assert_eq!(port.transaction_number(), 1);

        let log = uart.tx_log();
        assert_eq!(log[0], TxEvent::BreakOn);
        assert_eq!(log[1], TxEvent::BreakOff);

        let sent = uart.transmitted();
        assert_eq!(sent.len(), 26);
        assert_eq!(sent[15], 0);
        assert_eq!(rdm::verify_frame(&sent), Ok(()));

        // Back to receiving
        assert_eq!(port.direction(), (PortDirection::Input, true));
        assert!(!pin.is_high());
        assert_eq!(pin.writes(), 3);
    }

    #[test]
    fn rdm_send_increments_transaction_number() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();
        let msg = rdm_get();

        port.rdm_send(&msg, 0).unwrap();
        uart.clear_transmitted();
        assert_eq!(port.rdm_send(&msg, 0), Ok(1));
        assert_eq!(uart.transmitted()[15], 1);
    }

    #[test]
    fn rdm_send_rejects_malformed_message() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let mut msg = rdm_get();
        msg[2] = 30;
        assert_eq!(
            port.rdm_send(&msg, 0),
            Err(Error::Rdm(RdmError::LengthMismatch))
        );
        assert_eq!(port.transaction_number(), 0);
        assert!(uart.tx_log().is_empty());
    }

    #[test]
    fn rdm_response_keeps_transaction_number() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let mut msg = rdm_get();
        msg[15] = 0x77;
        port.rdm_send_response(&msg).unwrap();

        let sent = uart.transmitted();
        assert_eq!(sent[15], 0x77);
        assert_eq!(rdm::verify_frame(&sent), Ok(()));
        assert_eq!(port.transaction_number(), 0);
    }

    #[test]
    fn rdm_response_waits_responder_spacing() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let msg = rdm_get();
        let mut wire: Vec<u8> = msg.to_vec();
        wire.extend_from_slice(&rdm::checksum(&msg).to_be_bytes());
        receive_frame(&dmx, &uart, &timer, &wire);
        let end = dmx.statistics().rdm_receive_end_us();

        port.rdm_send_response(&msg).unwrap();
        assert!(elapsed_since(timer.peek(), end) >= RDM_RESPONDER_PACKET_SPACING_US);
    }

    #[test]
    fn discovery_response_has_no_break() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();

        let uid = [0x7A, 0x70, 0x12, 0x34, 0x56, 0x78];
        port.rdm_send_discovery_response(&uid).unwrap();

        assert!(!uart.tx_log().contains(&TxEvent::BreakOn));
        let sent = uart.transmitted();
        assert_eq!(sent.len(), 24);
        assert_eq!(rdm::discovery::decode_response(&sent), Ok(uid));
        assert_eq!(port.direction(), (PortDirection::Input, true));
    }

    #[test]
    fn rdm_send_times_out_on_stuck_uart() {
        let timer = MockTimer::with_auto_advance(50);
        let (dmx, uart) = context(&timer);
        let mut port = DmxPort::new(&dmx, MockPin::new(), DmxConfig::new()).unwrap();
        uart.set_tx_capacity(Some(4));

        let result = port.rdm_send(&rdm_get(), 0);
        assert_eq!(result, Err(Error::Io(IoError::Timeout)));
        assert_eq!(uart.transmitted().len(), 4);
        assert_eq!(port.direction(), (PortDirection::Input, true));
    }

    #[test]
    fn rdm_send_refused_while_transmitting_dmx() {
        let timer = MockTimer::with_auto_advance(1);
        let (dmx, uart) = context(&timer);
        let config = DmxConfig::new().with_direction(PortDirection::Output);
        let mut port = DmxPort::new(&dmx, MockPin::new(), config).unwrap();

        assert_eq!(
            port.rdm_send(&rdm_get(), 0),
            Err(Error::Io(IoError::InvalidState))
        );
        assert_eq!(
            port.rdm_send_response(&rdm_get()),
            Err(Error::Io(IoError::InvalidState))
        );
        let uid = [0x7A, 0x70, 0x12, 0x34, 0x56, 0x78];
        assert_eq!(
            port.rdm_send_discovery_response(&uid),
            Err(Error::Io(IoError::InvalidState))
        );

        assert_eq!(port.transaction_number(), 0);
        assert!(uart.tx_log().is_empty());
        assert_eq!(port.direction(), (PortDirection::Output, true));

        // Once the output stream stops the line is free again
        port.set_port_direction(PortDirection::Input, true).unwrap();
        assert_eq!(port.rdm_send(&rdm_get(), 0), Ok(0));
    }
}
