//! Control-channel command codes.
//!
//! The driver multiplexes a small set of out-of-band operations over a single
//! control channel, dispatched by a fixed numeric code. The codes are stable
//! across releases so callers can hardwire them.

use crate::consts::{EVENT_CAPTURE_LEN, SIGNAL_SUMMARY_LEN};

/// Out-of-band operations accepted by the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ControlCommand {
    /// Block until the card latches an event timestamp, then return the
    /// 12-byte capture buffer.
    EventCapture = 0,
    /// No hardware access; verifies the control channel is alive.
    SimpleTest = 1,
    /// Read the satellite signal summary, failing with a retry error while
    /// the card is updating the fields.
    CheckSignal = 2,
    /// Verify (and repair) the bridge-chip interrupt-enable register.
    CheckIrqEnable = 3,
}

impl ControlCommand {
    /// Decode a raw command code. Unknown codes are rejected by the
    /// dispatcher with an operation-not-supported error.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::EventCapture),
            1 => Some(Self::SimpleTest),
            2 => Some(Self::CheckSignal),
            3 => Some(Self::CheckIrqEnable),
            _ => None,
        }
    }

    /// The numeric code carried on the wire.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Number of bytes this command writes into the caller's buffer.
    pub fn reply_len(self) -> usize {
        match self {
            Self::EventCapture => EVENT_CAPTURE_LEN,
            Self::CheckSignal => SIGNAL_SUMMARY_LEN,
            Self::SimpleTest | Self::CheckIrqEnable => 0,
        }
    }
}
