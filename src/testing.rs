//! Testing utilities and mock implementations
//!
//! Mock UART, timer and direction pin for exercising the link layer on the
//! host without hardware access. Each mock is a cheap handle onto shared
//! state, so a test can move one clone into the engine and inspect the
//! other.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use crate::hal::timer::{Alarm, DmxTimer};
use crate::hal::uart::{DmxUart, LineStatus};

// =============================================================================
// Mock UART
// =============================================================================

/// Receive-side event queued in the mock FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Line break (reads back as a null byte)
    Break,
    /// Data byte
    Byte(u8),
    /// Data byte with a framing error
    FramingError(u8),
}

/// Transmit-side event recorded by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    BreakOn,
    BreakOff,
    Byte(u8),
}

#[derive(Debug, Default)]
struct UartState {
    rx: VecDeque<RxEvent>,
    tx_log: Vec<TxEvent>,
    /// Bytes in the transmit FIFO not yet "sent"
    tx_fifo_level: usize,
    /// `None` = FIFO never fills
    tx_capacity: Option<usize>,
    break_asserted: bool,
    rx_interrupt: bool,
    tx_interrupt: bool,
    clear_count: usize,
}

/// Mock UART
///
/// # Example
///
/// ```ignore
/// let uart = MockUart::new();
/// uart.push_break();
/// uart.push_bytes(&[0x00, 1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockUart {
    state: Rc<RefCell<UartState>>,
}

impl MockUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a received break
    pub fn push_break(&self) {
        self.state.borrow_mut().rx.push_back(RxEvent::Break);
    }

    /// Queue received bytes
    pub fn push_bytes(&self, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.rx.extend(bytes.iter().map(|&b| RxEvent::Byte(b)));
    }

    /// Queue an arbitrary receive event
    pub fn push_event(&self, event: RxEvent) {
        self.state.borrow_mut().rx.push_back(event);
    }

    /// Receive events not yet read
    pub fn rx_pending(&self) -> usize {
        self.state.borrow().rx.len()
    }

    /// Limit the transmit FIFO to `capacity` bytes
    pub fn set_tx_capacity(&self, capacity: Option<usize>) {
        self.state.borrow_mut().tx_capacity = capacity;
    }

    /// Pretend the transmit FIFO has shifted everything out
    pub fn drain_tx_fifo(&self) {
        self.state.borrow_mut().tx_fifo_level = 0;
    }

    /// Data bytes written so far
    pub fn transmitted(&self) -> Vec<u8> {
        self.state
            .borrow()
            .tx_log
            .iter()
            .filter_map(|e| match e {
                TxEvent::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    /// Every transmit-side event in order
    pub fn tx_log(&self) -> Vec<TxEvent> {
        self.state.borrow().tx_log.clone()
    }

    pub fn clear_transmitted(&self) {
        self.state.borrow_mut().tx_log.clear();
    }

    pub fn break_asserted(&self) -> bool {
        self.state.borrow().break_asserted
    }

    pub fn rx_interrupt_enabled(&self) -> bool {
        self.state.borrow().rx_interrupt
    }

    pub fn tx_interrupt_enabled(&self) -> bool {
        self.state.borrow().tx_interrupt
    }

    pub fn clear_count(&self) -> usize {
        self.state.borrow().clear_count
    }
}

impl DmxUart for MockUart {
    fn read_byte(&mut self) -> u8 {
        match self.state.borrow_mut().rx.pop_front() {
            Some(RxEvent::Byte(b) | RxEvent::FramingError(b)) => b,
            Some(RxEvent::Break) | None => 0,
        }
    }

    fn line_status(&self) -> LineStatus {
        let state = self.state.borrow();
        let front = state.rx.front().copied();
        let tx_ready = state.tx_capacity.is_none_or(|cap| state.tx_fifo_level < cap);
        let tx_idle = state.tx_capacity.is_none() || state.tx_fifo_level == 0;

        LineStatus {
            data_ready: front.is_some(),
            break_detected: front == Some(RxEvent::Break),
            framing_error: matches!(front, Some(RxEvent::FramingError(_) | RxEvent::Break)),
            tx_ready,
            tx_idle,
            ..LineStatus::default()
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut state = self.state.borrow_mut();
        state.tx_log.push(TxEvent::Byte(byte));
        state.tx_fifo_level += 1;
    }

    fn set_break(&mut self, asserted: bool) {
        let mut state = self.state.borrow_mut();
        if state.break_asserted != asserted {
            state
                .tx_log
                .push(if asserted { TxEvent::BreakOn } else { TxEvent::BreakOff });
        }
        state.break_asserted = asserted;
    }

    fn set_rx_interrupt(&mut self, enabled: bool) {
        self.state.borrow_mut().rx_interrupt = enabled;
    }

    fn set_tx_interrupt(&mut self, enabled: bool) {
        self.state.borrow_mut().tx_interrupt = enabled;
    }

    fn clear_interrupts(&mut self) {
        let mut state = self.state.borrow_mut();
        state.rx.clear();
        state.clear_count += 1;
    }
}

// =============================================================================
// Mock Timer
// =============================================================================

#[derive(Debug, Default)]
struct TimerState {
    now: Cell<u32>,
    /// Added to the clock after every read
    auto_advance: Cell<u32>,
    transmit: Cell<Option<u32>>,
    receive_timeout: Cell<Option<u32>>,
}

/// Mock microsecond timer with recorded alarms
#[derive(Debug, Clone, Default)]
pub struct MockTimer {
    state: Rc<TimerState>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that moves `step` microseconds on every read, so busy-waits end
    pub fn with_auto_advance(step: u32) -> Self {
        let timer = Self::new();
        timer.state.auto_advance.set(step);
        timer
    }

    pub fn set(&self, now: u32) {
        self.state.now.set(now);
    }

    pub fn advance(&self, us: u32) {
        self.state.now.set(self.state.now.get().wrapping_add(us));
    }

    /// Current clock without advancing it
    pub fn peek(&self) -> u32 {
        self.state.now.get()
    }

    /// Armed deadline of `alarm`
    pub fn alarm(&self, alarm: Alarm) -> Option<u32> {
        match alarm {
            Alarm::Transmit => self.state.transmit.get(),
            Alarm::ReceiveTimeout => self.state.receive_timeout.get(),
        }
    }
}

impl DmxTimer for MockTimer {
    fn now_micros(&self) -> u32 {
        let now = self.state.now.get();
        self.state
            .now
            .set(now.wrapping_add(self.state.auto_advance.get()));
        now
    }

    fn set_alarm(&self, alarm: Alarm, at_micros: u32) {
        match alarm {
            Alarm::Transmit => self.state.transmit.set(Some(at_micros)),
            Alarm::ReceiveTimeout => self.state.receive_timeout.set(Some(at_micros)),
        }
    }

    fn cancel_alarm(&self, alarm: Alarm) {
        match alarm {
            Alarm::Transmit => self.state.transmit.set(None),
            Alarm::ReceiveTimeout => self.state.receive_timeout.set(None),
        }
    }
}

// =============================================================================
// Mock Direction Pin
// =============================================================================

#[derive(Debug, Default)]
struct PinState {
    high: Cell<bool>,
    writes: Cell<usize>,
    failing: Cell<bool>,
}

/// Mock direction pin
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    state: Rc<PinState>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin whose writes fail
    pub fn failing() -> Self {
        let pin = Self::new();
        pin.state.failing.set(true);
        pin
    }

    pub fn is_high(&self) -> bool {
        self.state.high.get()
    }

    pub fn writes(&self) -> usize {
        self.state.writes.get()
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.set(failing);
    }

    fn write(&self, high: bool) -> Result<(), ErrorKind> {
        if self.state.failing.get() {
            return Err(ErrorKind::Other);
        }
        self.state.high.set(high);
        self.state.writes.set(self.state.writes.get() + 1);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_uart_break_reads_as_null() {
        let mut uart = MockUart::new();
        uart.push_break();
        uart.push_bytes(&[0x42]);

        let status = uart.line_status();
        assert!(status.break_detected && status.data_ready);
        assert_eq!(uart.read_byte(), 0);

        let status = uart.line_status();
        assert!(!status.break_detected && status.data_ready);
        assert_eq!(uart.read_byte(), 0x42);
        assert!(!uart.line_status().data_ready);
    }

    #[test]
    fn mock_uart_tx_capacity() {
        let mut uart = MockUart::new();
        uart.set_tx_capacity(Some(1));
        assert!(uart.line_status().tx_ready);
        uart.write_byte(1);
        assert!(!uart.line_status().tx_ready);
        assert!(!uart.line_status().tx_idle);
        uart.drain_tx_fifo();
        assert!(uart.line_status().tx_idle);
    }

    #[test]
    fn mock_timer_auto_advance() {
        let timer = MockTimer::with_auto_advance(3);
        assert_eq!(timer.now_micros(), 0);
        assert_eq!(timer.now_micros(), 3);
        assert_eq!(timer.peek(), 6);
    }

    #[test]
    fn mock_pin_failing() {
        let mut pin = MockPin::failing();
        assert!(pin.set_high().is_err());
        pin.set_failing(false);
        assert!(pin.set_high().is_ok());
        assert!(pin.is_high());
        assert_eq!(pin.writes(), 1);
    }
}
