//! Error types for driver operations.

use thiserror::Error;

/// Errors that can occur while operating the card.
///
/// Nothing here is fatal to the process: argument errors are rejected
/// before any hardware access, resource errors leave the device unusable
/// but the caller running, and `Busy`/`Interrupted`/`TimedOut` are
/// retryable by design.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Seek with a non-absolute mode or an offset outside the window.
    #[error("seek rejected: absolute offsets in 0..={limit} only, got {requested}")]
    InvalidSeek {
        /// Requested position, as passed by the caller.
        requested: i64,
        /// Inclusive upper bound of the seek range.
        limit: u64,
    },

    /// Register access outside the mapped window.
    #[error("register access out of range: offset {offset:#x} + {width} exceeds {limit:#x}")]
    OutOfRange {
        /// Starting offset of the access.
        offset: u64,
        /// Access width in bytes.
        width: usize,
        /// Window length in bytes.
        limit: u64,
    },

    /// Transfer size other than 1, 2 or 4 bytes.
    #[error("unsupported transfer size: {size} bytes (must be 1, 2 or 4)")]
    InvalidTransferSize {
        /// Requested size in bytes.
        size: usize,
    },

    /// Unknown control-channel command code.
    #[error("unsupported control command: {code:#x}")]
    UnsupportedCommand {
        /// Raw command code.
        code: u32,
    },

    /// The PCI function at the configured address is not a sym560 card.
    #[error(
        "unsupported device {vendor:04x}:{device:04x} (subsystem {subvendor:04x}:{subsystem:04x})"
    )]
    UnsupportedDevice {
        /// PCI vendor ID found.
        vendor: u16,
        /// PCI device ID found.
        device: u16,
        /// PCI subsystem vendor ID found.
        subvendor: u16,
        /// PCI subsystem ID found.
        subsystem: u16,
    },

    /// Interrupt line registration failed on first open.
    #[error("could not register interrupt line {line}: {reason}")]
    IrqRegistration {
        /// Interrupt line number.
        line: u32,
        /// Underlying failure.
        reason: String,
    },

    /// Caller buffer too small for the reply.
    #[error("caller buffer too small: need {needed} bytes, got {provided}")]
    TransferFault {
        /// Bytes the operation must return.
        needed: usize,
        /// Bytes the caller provided.
        provided: usize,
    },

    /// Satellite signal fields are being updated; retry shortly.
    #[error("satellite signal status is being updated, try again")]
    Busy,

    /// Blocking capture wait was cancelled before an event arrived.
    #[error("event capture wait was interrupted")]
    Interrupted,

    /// Blocking capture wait exceeded the configured bound.
    #[error("event capture wait timed out")]
    TimedOut,

    /// IO error.
    #[error("IO error: {source}")]
    Io {
        /// Source IO error.
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error.
    #[error("system call error: {source}")]
    Nix {
        /// Source nix error.
        #[from]
        source: nix::Error,
    },
}

/// Result type for driver operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
