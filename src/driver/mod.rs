//! Core link-layer components.
//!
//! - [`config`] - Port configuration and builder methods
//! - [`error`] - Error types and result aliases
//! - [`timing`] - Break, MAB and period arithmetic
//! - [`statistics`] - Interrupt-updated counters and snapshots
//!
//! The interrupt-side state machines live in private submodules and are
//! reached through [`Dmx`]; the foreground drives them through [`DmxPort`].
//!
//! # Example
//!
//! ```ignore
//! use dmx_rdm_link::driver::{DmxConfig, PortDirection};
//!
//! let config = DmxConfig::new()
//!     .with_direction(PortDirection::Output)
//!     .with_period_us(25_000);
//! ```

// Submodules
pub mod config;
pub mod error;
pub mod statistics;
pub mod timing;

mod dmx;
mod port;
mod receiver;
mod transmitter;

// Re-exports for convenience
pub use config::{DmxConfig, PortDirection};
pub use dmx::Dmx;
pub use error::{ConfigError, Error, IoError, IoResult, RdmError, RdmResult, Result};
pub use port::DmxPort;
pub use receiver::ReceiveState;
pub use statistics::{Statistics, StatisticsSnapshot};
pub use timing::TimingConfig;
pub use transmitter::TransmitState;
