//! Error types for the ring-manager driver.
//!
//! Errors are organized by domain:
//! - [`InitError`]: ring bring-up and configuration failures
//! - [`TransferError`]: runtime batch submission/completion failures
//!
//! The unified [`Error`] enum wraps both domains and is returned by most
//! driver methods.

// =============================================================================
// Initialization Errors
// =============================================================================

/// Ring bring-up and configuration errors.
///
/// These abort initialization of the affected ring only; other rings
/// remain usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Ring flush request did not complete within the poll budget
    FlushTimeout,
    /// RM hardware never reported ready
    NotReady,
    /// Descriptor or completion area base violates its alignment contract
    BadAlignment,
    /// Invalid configuration parameter
    InvalidConfig,
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InitError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            InitError::FlushTimeout => "ring flush timed out",
            InitError::NotReady => "ring manager hardware not ready",
            InitError::BadAlignment => "ring area base misaligned",
            InitError::InvalidConfig => "invalid configuration",
        }
    }
}

// =============================================================================
// Transfer Errors
// =============================================================================

/// Runtime batch errors.
///
/// Hardware-detected conditions (`ProtocolViolation`, `DeviceError`) are
/// returned without automatic retry; retry policy belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// Completion wait exceeded its bounded retry budget
    Timeout,
    /// Completion packet id mismatch, or hardware-reported engine timeout
    ProtocolViolation,
    /// Bus or endpoint error bits set in a completion packet
    DeviceError,
    /// Block-list length or per-header descriptor count over the maximum
    CapacityExceeded,
    /// Channel already has an outstanding batch
    Busy,
    /// Operation not supported by the active protocol variant
    Unsupported,
    /// Caller contract violation: length/address out of range or misaligned
    InvalidRequest,
    /// Write-sync poll expired; data may not yet be visible to the host
    SyncTimeout,
}

impl core::fmt::Display for TransferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransferError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferError::Timeout => "completion wait timed out",
            TransferError::ProtocolViolation => "completion protocol violation",
            TransferError::DeviceError => "device reported DMA-path error",
            TransferError::CapacityExceeded => "block list or descriptor count over limit",
            TransferError::Busy => "channel busy",
            TransferError::Unsupported => "unsupported by active protocol variant",
            TransferError::InvalidRequest => "invalid transfer request",
            TransferError::SyncTimeout => "host write-sync timed out",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::Init(InitError::FlushTimeout)) => { /* ... */ }
///     Err(Error::Transfer(TransferError::Busy)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bring-up error
    Init(InitError),
    /// Transfer error
    Transfer(TransferError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Init(e) => write!(f, "init: {}", e.as_str()),
            Error::Transfer(e) => write!(f, "transfer: {}", e.as_str()),
        }
    }
}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Error::Init(e)
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Error::Transfer(e)
    }
}

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for bring-up operations
pub type InitResult<T> = core::result::Result<T, InitError>;

/// Result type alias for transfer operations
pub type TransferResult<T> = core::result::Result<T, TransferError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn init_error_as_str_non_empty() {
        let variants = [
            InitError::FlushTimeout,
            InitError::NotReady,
            InitError::BadAlignment,
            InitError::InvalidConfig,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "InitError::{:?}", variant);
        }
    }

    #[test]
    fn transfer_error_as_str_non_empty() {
        let variants = [
            TransferError::Timeout,
            TransferError::ProtocolViolation,
            TransferError::DeviceError,
            TransferError::CapacityExceeded,
            TransferError::Busy,
            TransferError::Unsupported,
            TransferError::InvalidRequest,
            TransferError::SyncTimeout,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "TransferError::{:?}", variant);
        }
    }

    #[test]
    fn transfer_error_display() {
        let display = format!("{}", TransferError::Busy);
        assert_eq!(display, "channel busy");
    }

    #[test]
    fn error_from_init_error() {
        let err: Error = InitError::FlushTimeout.into();
        match err {
            Error::Init(e) => assert_eq!(e, InitError::FlushTimeout),
            Error::Transfer(_) => panic!("Expected Error::Init"),
        }
    }

    #[test]
    fn error_from_transfer_error() {
        let err: Error = TransferError::SyncTimeout.into();
        match err {
            Error::Transfer(e) => assert_eq!(e, TransferError::SyncTimeout),
            Error::Init(_) => panic!("Expected Error::Transfer"),
        }
    }

    #[test]
    fn error_display_includes_domain() {
        let display = format!("{}", Error::Transfer(TransferError::DeviceError));
        assert!(display.contains("transfer"));
        assert!(display.contains("DMA-path"));

        let display = format!("{}", Error::Init(InitError::BadAlignment));
        assert!(display.contains("init"));
        assert!(display.contains("misaligned"));
    }

    #[test]
    fn sync_timeout_distinct_from_timeout() {
        // Callers must be able to tell "data may not be host-visible yet"
        // apart from "the engine never completed".
        assert_ne!(TransferError::SyncTimeout, TransferError::Timeout);
    }
}
