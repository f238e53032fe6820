//! Synchronization and Concurrency Support
//!
//! The link layer runs in three execution contexts: the UART interrupt, the
//! timer interrupts (transmit pacing and receive watchdog) and the foreground.
//! State is split by who writes it:
//!
//! - **Engine state** (receive/transmit state machines, UART handle): guarded
//!   by a [`CriticalSectionCell`], taken briefly by every context.
//! - **Frame stores**: lock-free single-producer/single-consumer rings that
//!   overwrite the oldest unread frame when full.
//! - **Statistics**: atomics with exactly one writing context each, see
//!   [`crate::driver::Statistics`].
//!
//! # Example
//!
//! ```ignore
//! use dmx_rdm_link::sync::CriticalSectionCell;
//!
//! static COUNTER: CriticalSectionCell<u32> = CriticalSectionCell::new(0);
//!
//! #[interrupt]
//! fn UART0() {
//!     COUNTER.with(|c| *c += 1);
//! }
//! ```

mod primitives;

pub use primitives::CriticalSectionCell;
