//! Link-layer context shared by the interrupt handlers and the port
//!
//! One [`Dmx`] value owns everything the three execution contexts share:
//! the UART and the two state machines (behind a critical section), the
//! lock-free receive frame stores and the statistics counters. Interrupt
//! vectors stay fixed-address trampolines that call straight into
//! [`Dmx::on_uart_interrupt`], [`Dmx::on_transmit_timer`] and
//! [`Dmx::on_receive_timeout`].
//!
//! # Example
//!
//! ```ignore
//! static DMX: Dmx<Pl011, SystemTimer> = Dmx::new(Pl011::new(), SystemTimer::new());
//!
//! #[interrupt]
//! fn UART0() {
//!     DMX.on_uart_interrupt();
//! }
//!
//! #[interrupt]
//! fn TIMER_1() {
//!     DMX.on_transmit_timer();
//! }
//!
//! #[interrupt]
//! fn TIMER_3() {
//!     DMX.on_receive_timeout();
//! }
//! ```

use crate::frame::{DmxFrame, RdmFrame};
use crate::hal::timer::{Alarm, DmxTimer};
use crate::hal::uart::{DmxUart, LineStatus};
use crate::internal::constants::{
    DEFAULT_DMX_BUFFERS, DEFAULT_RDM_BUFFERS, TRANSMIT_START_DELAY_US, UART_FIFO_DEPTH,
};
use crate::internal::ring::FrameRing;
use crate::sync::CriticalSectionCell;

use super::config::PortDirection;
use super::receiver::{Completed, ReceiveState, Receiver};
use super::statistics::Statistics;
use super::timing::TimingConfig;
use super::transmitter::{TransmitState, Transmitter};

/// Interrupt-shared engine state, guarded by a critical section.
pub(crate) struct Engine<U> {
    pub(crate) uart: U,
    pub(crate) receiver: Receiver,
    pub(crate) transmitter: Transmitter,
    pub(crate) direction: PortDirection,
    /// Sequencer for `direction` is running
    pub(crate) running: bool,
    /// A [`crate::DmxPort`] is attached
    pub(crate) attached: bool,
    /// Deadline currently programmed into the receive watchdog alarm
    watchdog: Option<u32>,
}

impl<U: DmxUart> Engine<U> {
    const fn new(uart: U) -> Self {
        Self {
            uart,
            receiver: Receiver::new(),
            transmitter: Transmitter::new(TimingConfig::new()),
            direction: PortDirection::Input,
            running: false,
            attached: false,
            watchdog: None,
        }
    }

    /// Start the sequencer for the current direction
    pub(crate) fn start<T: DmxTimer>(&mut self, timer: &T) {
        match self.direction {
            PortDirection::Input => {
                self.receiver.reset();
                self.uart.clear_interrupts();
                self.uart.set_rx_interrupt(true);
            }
            PortDirection::Output => {
                self.transmitter.start();
                let first = timer.now_micros().wrapping_add(TRANSMIT_START_DELAY_US);
                timer.set_alarm(Alarm::Transmit, first);
            }
        }
        self.running = true;
    }

    /// Stop the sequencer for the current direction immediately
    pub(crate) fn halt<T: DmxTimer>(&mut self, timer: &T) {
        match self.direction {
            PortDirection::Input => {
                self.uart.set_rx_interrupt(false);
                self.receiver.reset();
                self.sync_watchdog(timer);
            }
            PortDirection::Output => {
                self.transmitter.stop(&mut self.uart);
                timer.cancel_alarm(Alarm::Transmit);
            }
        }
        self.running = false;
    }

    /// Transmit frame in flight or UART still shifting bytes out
    pub(crate) fn transmit_busy(&self) -> bool {
        self.transmitter.is_busy() || !self.uart.line_status().tx_idle
    }

    fn sync_watchdog<T: DmxTimer>(&mut self, timer: &T) {
        let deadline = self.receiver.watchdog_deadline();
        if deadline == self.watchdog {
            return;
        }
        match deadline {
            Some(at) => timer.set_alarm(Alarm::ReceiveTimeout, at),
            None => timer.cancel_alarm(Alarm::ReceiveTimeout),
        }
        self.watchdog = deadline;
    }

    fn receiving(&self) -> bool {
        self.running && self.direction == PortDirection::Input
    }
}

/// DMX512/RDM link-layer context.
///
/// `DMX_BUFS` and `RDM_BUFS` are the receive store depths; both must be
/// powers of two.
pub struct Dmx<
    U,
    T,
    const DMX_BUFS: usize = DEFAULT_DMX_BUFFERS,
    const RDM_BUFS: usize = DEFAULT_RDM_BUFFERS,
> {
    timer: T,
    dmx_frames: FrameRing<DmxFrame, DMX_BUFS>,
    rdm_frames: FrameRing<RdmFrame, RDM_BUFS>,
    stats: Statistics,
    engine: CriticalSectionCell<Engine<U>>,
}

impl<U, T, const DMX_BUFS: usize, const RDM_BUFS: usize> Dmx<U, T, DMX_BUFS, RDM_BUFS>
where
    U: DmxUart,
    T: DmxTimer,
{
    /// Create the context (const, suitable for static initialization).
    ///
    /// The UART must already be configured for 250 kbit/s 8N2. Nothing is
    /// enabled until a [`crate::DmxPort`] attaches.
    pub const fn new(uart: U, timer: T) -> Self {
        Self {
            timer,
            dmx_frames: FrameRing::new(),
            rdm_frames: FrameRing::new(),
            stats: Statistics::new(),
            engine: CriticalSectionCell::new(Engine::new(uart)),
        }
    }

    /// Microsecond timer shared with the interrupts
    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Live statistics counters
    #[inline]
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    #[inline]
    pub(crate) fn dmx_frames(&self) -> &FrameRing<DmxFrame, DMX_BUFS> {
        &self.dmx_frames
    }

    #[inline]
    pub(crate) fn rdm_frames(&self) -> &FrameRing<RdmFrame, RDM_BUFS> {
        &self.rdm_frames
    }

    /// Run `f` on the engine inside a critical section
    #[inline]
    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<U>) -> R) -> R {
        self.engine.with(f)
    }

    /// Current direction and whether its sequencer runs
    pub fn direction(&self) -> (PortDirection, bool) {
        self.engine.with_ref(|e| (e.direction, e.running))
    }

    /// UART line status, sampled inside the critical section
    pub(crate) fn line_status(&self) -> LineStatus {
        self.engine.with_ref(|e| e.uart.line_status())
    }

    /// Current receive state machine state
    pub fn receive_state(&self) -> ReceiveState {
        self.engine.with_ref(|e| e.receiver.state())
    }

    /// Current transmit sequencer state
    pub fn transmit_state(&self) -> TransmitState {
        self.engine.with_ref(|e| e.transmitter.state())
    }

    // =========================================================================
    // Interrupt entry points
    // =========================================================================

    /// UART interrupt: received bytes, breaks and transmit FIFO room.
    ///
    /// Services at most one FIFO's worth of receive events per call.
    pub fn on_uart_interrupt(&self) {
        self.engine.with(|e| {
            for _ in 0..UART_FIFO_DEPTH {
                let status = e.uart.line_status();
                if status.break_detected {
                    // The break arrives with a null character; drop it
                    let _ = e.uart.read_byte();
                    if e.receiving() {
                        let now = self.timer.now_micros();
                        if let Some(completed) = e.receiver.on_break(now, &self.stats) {
                            self.publish(completed, &e.receiver);
                        }
                    }
                } else if status.data_ready {
                    let byte = e.uart.read_byte();
                    if !e.receiving() {
                        continue;
                    }
                    if status.has_rx_error() {
                        e.receiver.on_line_error();
                        continue;
                    }
                    let now = self.timer.now_micros();
                    if let Some(completed) = e.receiver.on_byte(byte, now, &self.stats) {
                        self.publish(completed, &e.receiver);
                    }
                } else {
                    break;
                }
            }

            if e.transmitter.state() == TransmitState::Data {
                e.transmitter.on_fifo_ready(&mut e.uart);
            }

            e.sync_watchdog(&self.timer);
        });
    }

    /// Transmit alarm: advances the sequencer one phase.
    pub fn on_transmit_timer(&self) {
        self.engine.with(|e| {
            if !(e.running && e.direction == PortDirection::Output) {
                self.timer.cancel_alarm(Alarm::Transmit);
                return;
            }
            let now = self.timer.now_micros();
            match e.transmitter.on_timer(now, &mut e.uart, &self.stats) {
                Some(at) => self.timer.set_alarm(Alarm::Transmit, at),
                None => self.timer.cancel_alarm(Alarm::Transmit),
            }
        });
    }

    /// Receive watchdog alarm: publishes a truncated DMX frame after a stall.
    pub fn on_receive_timeout(&self) {
        self.engine.with(|e| {
            let now = self.timer.now_micros();
            if let Some(completed) = e.receiver.on_timeout(now, &self.stats) {
                self.publish(completed, &e.receiver);
            }
            // One-shot alarm: re-arm only if the receiver still waits
            e.watchdog = None;
            self.timer.cancel_alarm(Alarm::ReceiveTimeout);
            e.sync_watchdog(&self.timer);
        });
    }

    fn publish(&self, completed: Completed, receiver: &Receiver) {
        match completed {
            Completed::Dmx => self.dmx_frames.push(receiver.dmx_frame()),
            Completed::Rdm => self.rdm_frames.push(receiver.rdm_frame()),
        }
    }
}
