//! DMX512/RDM Link Layer
//!
//! A `no_std`, `no_alloc` DMX512-A and RDM (E1.20) link-layer engine for
//! interrupt-driven UARTs.
//!
//! The crate turns a 250 kbit/s 8N2 UART, a free-running microsecond timer
//! with two alarm channels and an RS-485 direction pin into a DMX512 port
//! that can either receive or transmit, and that carries RDM messages
//! (including discovery responses) on the same line.
//!
//! # Architecture
//!
//! The engine is organized into three layers:
//!
//! 1. **Interrupt layer** ([`Dmx`]): receive and transmit state machines
//!    driven from the UART and timer interrupts
//! 2. **Foreground layer** ([`DmxPort`]): configuration, direction changes,
//!    frame retrieval and RDM transmission
//! 3. **HAL layer** ([`hal`]): capability traits for the UART and timer
//!
//! Received frames travel from the interrupt to the foreground through
//! fixed-depth overwrite rings: when the foreground falls behind, the oldest
//! unread frame is lost and the newest is always kept.
//!
//! ## Standard Compliance
//!
//! - **ANSI E1.11 (DMX512-A)**: Break/MAB timing, 513-slot frames, 1204 us
//!   minimum break-to-break
//! - **ANSI E1.20 (RDM)**: Start codes, additive checksum, discovery
//!   response encoding, responder packet spacing
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting for public types and defmt logging
//!
//! # Example
//!
//! ```ignore
//! use dmx_rdm_link::{Dmx, DmxConfig, DmxPort, PortDirection};
//!
//! static DMX: Dmx<Pl011, SystemTimer> = Dmx::new(Pl011::new(), SystemTimer::new());
//!
//! let config = DmxConfig::new().with_direction(PortDirection::Output);
//! let mut port = DmxPort::new(&DMX, direction_pin, config)?;
//!
//! let mut frame = [0u8; 513];
//! frame[1] = 255;
//! port.set_send_data(&frame)?;
//! ```
//!
//! # Memory Requirements
//!
//! With default store depths (4 DMX frames, 8 RDM frames) a [`Dmx`] context
//! holds roughly 5 KB of frame storage plus the 1 KB transmit double buffer.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod frame;
pub mod hal;
pub mod rdm;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{DmxConfig, PortDirection};
pub use driver::error::{ConfigError, Error, IoError, IoResult, RdmError, RdmResult, Result};
pub use driver::statistics::{Statistics, StatisticsSnapshot};
pub use driver::timing::TimingConfig;
pub use driver::{Dmx, DmxPort, ReceiveState, TransmitState};
pub use frame::{DmxFrame, RdmFrame, RdmFrameKind};
pub use hal::{Alarm, DmxTimer, DmxUart, LineStatus};
pub use rdm::Uid;

/// Shared link-layer constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on driver types.
pub mod constants {
    pub use crate::internal::constants::{
        // Timing
        BREAK_TIME_MAX_US,
        BREAK_TIME_MIN_US,
        BREAK_TIME_TYPICAL_US,
        BREAK_TO_BREAK_TIME_MIN_US,
        // Store depths
        DEFAULT_DMX_BUFFERS,
        DEFAULT_RDM_BUFFERS,
        // Frame sizes
        DISCOVERY_RESPONSE_SIZE,
        DMX_FRAME_SIZE,
        DMX_MAX_SLOTS,
        // Start codes
        DMX_START_CODE,
        MAB_TIME_MAX_US,
        MAB_TIME_MIN_US,
        PERIOD_DEFAULT_US,
        RDM_FRAME_SIZE,
        RDM_MESSAGE_MAX_LENGTH,
        RDM_MESSAGE_MIN_LENGTH,
        // RDM timing
        RDM_RESPONDER_PACKET_SPACING_US,
        RDM_START_CODE,
        RDM_SUB_START_CODE,
        REFRESH_RATE_DEFAULT,
        SLOT_TIME_US,
        UID_SIZE,
    };
}
