//! UART capability consumed by the link layer
//!
//! The engine never touches registers directly. A platform crate implements
//! [`DmxUart`] for its UART (PL011, 16550-compatible, ...) configured for
//! 250 kbit/s, 8 data bits, no parity, 2 stop bits.

// =============================================================================
// 16550-style Line Status Register bits
// =============================================================================

/// Receive data ready
pub const LSR_DR: u32 = 1 << 0;
/// Receiver overrun
pub const LSR_OE: u32 = 1 << 1;
/// Parity error
pub const LSR_PE: u32 = 1 << 2;
/// Framing error
pub const LSR_FE: u32 = 1 << 3;
/// Break interrupt
pub const LSR_BI: u32 = 1 << 4;
/// Transmit holding register (FIFO) can accept data
pub const LSR_THRE: u32 = 1 << 5;
/// Transmitter empty (FIFO and shift register)
pub const LSR_TEMT: u32 = 1 << 6;

// =============================================================================
// Line Status
// =============================================================================

/// Line and FIFO status flags.
///
/// # Example
///
/// ```ignore
/// let status = uart.line_status();
/// if status.break_detected {
///     // frame boundary
/// } else if status.data_ready {
///     let byte = uart.read_byte();
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineStatus {
    /// At least one received byte is waiting
    pub data_ready: bool,
    /// Receive FIFO overrun
    pub overrun: bool,
    /// Parity error on the received byte
    pub parity_error: bool,
    /// Framing error on the received byte
    pub framing_error: bool,
    /// Line held low for longer than a character (DMX break)
    pub break_detected: bool,
    /// Transmit FIFO can accept another byte
    pub tx_ready: bool,
    /// Transmitter completely idle (FIFO and shift register empty)
    pub tx_idle: bool,
}

impl LineStatus {
    /// Create from a raw 16550-style line status register value
    #[inline]
    pub fn from_lsr(lsr: u32) -> Self {
        Self {
            data_ready: (lsr & LSR_DR) != 0,
            overrun: (lsr & LSR_OE) != 0,
            parity_error: (lsr & LSR_PE) != 0,
            framing_error: (lsr & LSR_FE) != 0,
            break_detected: (lsr & LSR_BI) != 0,
            tx_ready: (lsr & LSR_THRE) != 0,
            tx_idle: (lsr & LSR_TEMT) != 0,
        }
    }

    /// Convert back to a raw line status value
    #[inline]
    pub fn to_lsr(&self) -> u32 {
        let mut val = 0u32;
        if self.data_ready {
            val |= LSR_DR;
        }
        if self.overrun {
            val |= LSR_OE;
        }
        if self.parity_error {
            val |= LSR_PE;
        }
        if self.framing_error {
            val |= LSR_FE;
        }
        if self.break_detected {
            val |= LSR_BI;
        }
        if self.tx_ready {
            val |= LSR_THRE;
        }
        if self.tx_idle {
            val |= LSR_TEMT;
        }
        val
    }

    /// Check if a receive error accompanied the current byte
    #[inline]
    pub fn has_rx_error(&self) -> bool {
        self.overrun || self.parity_error || self.framing_error
    }
}

// =============================================================================
// UART Capability
// =============================================================================

/// UART operations the link layer needs.
///
/// Implementations must be callable from interrupt context: no blocking,
/// no allocation.
pub trait DmxUart {
    /// Pop one byte from the receive FIFO
    fn read_byte(&mut self) -> u8;

    /// Current line and FIFO status
    fn line_status(&self) -> LineStatus;

    /// Push one byte into the transmit FIFO. Only called when
    /// [`LineStatus::tx_ready`] is set.
    fn write_byte(&mut self, byte: u8);

    /// Assert (`true`) or release (`false`) a line break
    fn set_break(&mut self, asserted: bool);

    /// Enable or disable the byte-received / break interrupt
    fn set_rx_interrupt(&mut self, enabled: bool);

    /// Enable or disable the transmit-FIFO-ready interrupt
    fn set_tx_interrupt(&mut self, enabled: bool);

    /// Clear pending interrupts and flush the receive FIFO
    fn clear_interrupts(&mut self);
}
