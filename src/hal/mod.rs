//! Hardware Abstraction Layer
//!
//! Capability traits the link layer consumes. Register layout, clock setup
//! and interrupt controller wiring belong to the platform crate.
//!
//! # Modules
//!
//! - [`uart`]: Byte read/write, line status, break assertion, interrupt masks
//! - [`timer`]: Free-running microsecond counter and the two alarm channels
//!
//! # Direction Pin
//!
//! The RS-485 transceiver direction is any
//! [`embedded_hal::digital::OutputPin`]: high enables the driver (Output),
//! low enables the receiver (Input).

pub mod timer;
pub mod uart;

// Re-export commonly used types
pub use timer::{Alarm, DmxTimer, elapsed_since, is_due, spin_for, spin_until, spin_while};
pub use uart::{DmxUart, LineStatus};
