//! Error types for the DMX512/RDM link layer
//!
//! Errors are organized by domain:
//! - [`ConfigError`]: Setup and send-data validation failures
//! - [`IoError`]: Runtime port and transmit failures
//! - [`RdmError`]: Outgoing RDM message and discovery response validation
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most port methods. Malformed *received* frames are never reported
//! here; the receive state machine drops them and resynchronizes.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and send-data errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The engine already has a foreground port attached
    AlreadyInitialized,
    /// Send data is empty or longer than a DMX frame
    InvalidLength,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::AlreadyInitialized => "port already attached",
            ConfigError::InvalidLength => "invalid send data length",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime port errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Bounded wait expired
    Timeout,
    /// Operation not valid in the current port state, e.g. an RDM send
    /// while the port streams DMX output
    InvalidState,
    /// Direction pin could not be driven
    Gpio,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::Timeout => "operation timed out",
            IoError::InvalidState => "invalid state for operation",
            IoError::Gpio => "direction pin error",
        }
    }
}

// =============================================================================
// RDM Errors
// =============================================================================

/// RDM message framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdmError {
    /// Message shorter than the 24-byte RDM header
    MessageTooShort,
    /// Message longer than the 8-bit length field allows
    MessageTooLong,
    /// `message_length` field disagrees with the buffer length
    LengthMismatch,
    /// Start code or sub-start code is not RDM
    InvalidStartCode,
    /// Discovery response preamble, delimiter or length is malformed
    InvalidDiscoveryResponse,
    /// Checksum does not match the message contents
    ChecksumMismatch,
}

impl core::fmt::Display for RdmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RdmError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RdmError::MessageTooShort => "message too short",
            RdmError::MessageTooLong => "message too long",
            RdmError::LengthMismatch => "message length field mismatch",
            RdmError::InvalidStartCode => "invalid start code",
            RdmError::InvalidDiscoveryResponse => "invalid discovery response",
            RdmError::ChecksumMismatch => "checksum mismatch",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match port.set_send_data(&frame) {
///     Err(Error::Config(ConfigError::InvalidLength)) => { /* ... */ }
///     Err(Error::Io(IoError::Gpio)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// I/O error
    Io(IoError),
    /// RDM framing error
    Rdm(RdmError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
            Error::Rdm(e) => write!(f, "rdm: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<RdmError> for Error {
    fn from(e: RdmError) -> Self {
        Error::Rdm(e)
    }
}

/// Result type alias for port operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

/// Result type alias for RDM framing operations
pub type RdmResult<T> = core::result::Result<T, RdmError>;

// =============================================================================
// Unit Tests
// =============================================================================
