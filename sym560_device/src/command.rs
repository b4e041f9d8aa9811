//! Control-channel command dispatch.
//!
//! The out-of-band operations multiplexed over the control channel, keyed
//! by the fixed numeric codes in [`sym560_common::command`]. Raw dispatch
//! through [`Session::control`] mirrors the ioctl-style surface; the typed
//! wrappers below it are the ergonomic path for Rust callers.

use crate::error::{DeviceError, DeviceResult};
use crate::session::Session;
use sym560_common::bcd::{BcdError, SatelliteSignal};
use sym560_common::command::ControlCommand;
use sym560_common::consts::{
    EVENT_CAPTURE_LEN, LCR_INTCSR, LCR_INTCSR_ENABLED, REG_SIG_STATUS, REG_SIG_STRENGTH,
    SIGNAL_SUMMARY_LEN,
};
use tracing::{debug, trace, warn};

/// Reply of the check-signal command: update status plus the raw
/// satellite-A signal strength word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSummary {
    /// Update-status byte; always zero in a successful reply.
    pub status: u8,
    /// Little-endian bytes of the signal strength word.
    pub raw: [u8; 4],
}

impl SignalSummary {
    /// Wire form: status byte followed by the four word bytes.
    pub fn to_bytes(self) -> [u8; SIGNAL_SUMMARY_LEN] {
        let mut out = [0u8; SIGNAL_SUMMARY_LEN];
        out[0] = self.status;
        out[1..].copy_from_slice(&self.raw);
        out
    }

    /// Decode the BCD signal fields.
    pub fn decode(&self) -> Result<SatelliteSignal, BcdError> {
        SatelliteSignal::decode(&self.raw)
    }
}

impl Session {
    /// Dispatch a raw control-channel command, writing any reply into
    /// `buf` and returning the reply length.
    ///
    /// Unknown codes fail with `UnsupportedCommand`; a too-small reply
    /// buffer fails with `TransferFault` before any state is consumed.
    pub fn control(&self, code: u32, buf: &mut [u8]) -> DeviceResult<usize> {
        let cmd = ControlCommand::from_code(code)
            .ok_or(DeviceError::UnsupportedCommand { code })?;
        if buf.len() < cmd.reply_len() {
            return Err(DeviceError::TransferFault {
                needed: cmd.reply_len(),
                provided: buf.len(),
            });
        }

        match cmd {
            ControlCommand::EventCapture => {
                let event = self.capture_event()?;
                buf[..EVENT_CAPTURE_LEN].copy_from_slice(&event);
                Ok(EVENT_CAPTURE_LEN)
            }
            ControlCommand::SimpleTest => {
                debug!("simple-test control command");
                Ok(0)
            }
            ControlCommand::CheckSignal => {
                let summary = self.check_signal()?;
                buf[..SIGNAL_SUMMARY_LEN].copy_from_slice(&summary.to_bytes());
                Ok(SIGNAL_SUMMARY_LEN)
            }
            ControlCommand::CheckIrqEnable => {
                self.check_irq_enable()?;
                Ok(0)
            }
        }
    }

    /// Block until the card latches an event timestamp, then return the
    /// 12-byte capture buffer.
    ///
    /// Uses the session's capture-wait bound; `Interrupted` and `TimedOut`
    /// leave the device state untouched and the call can simply be
    /// retried.
    pub fn capture_event(&self) -> DeviceResult<[u8; EVENT_CAPTURE_LEN]> {
        self.device().wait_event(self.capture_timeout())
    }

    /// Read the satellite signal summary.
    ///
    /// # Errors
    ///
    /// `Busy` while the card is updating the signal fields; the strength
    /// word is not read in that case and the caller should retry shortly.
    pub fn check_signal(&self) -> DeviceResult<SignalSummary> {
        let main = self.device().main_window();

        let status = main.read_u8(REG_SIG_STATUS)?;
        if status != 0 {
            warn!(
                status = format_args!("{status:#04x}"),
                "satellite signal fields are updating"
            );
            return Err(DeviceError::Busy);
        }

        let word = main.read_u32(REG_SIG_STRENGTH)?;
        trace!(
            word = format_args!("{word:#010x}"),
            "satellite A signal strength"
        );
        Ok(SignalSummary {
            status,
            raw: word.to_le_bytes(),
        })
    }

    /// Verify the bridge-chip interrupt-enable register, rewriting it to
    /// the expected value when it has drifted. Returns the final register
    /// value.
    pub fn check_irq_enable(&self) -> DeviceResult<u32> {
        let lcr = self.device().lcr_window();

        let mut value = lcr.read_u32(LCR_INTCSR)?;
        trace!(
            intcsr = format_args!("{value:#010x}"),
            "bridge interrupt control register"
        );
        if value as u8 != LCR_INTCSR_ENABLED {
            warn!(
                intcsr = format_args!("{value:#010x}"),
                expected = format_args!("{LCR_INTCSR_ENABLED:#04x}"),
                "interrupt enable drifted, rewriting"
            );
            lcr.write_u32(LCR_INTCSR, u32::from(LCR_INTCSR_ENABLED))?;
            value = lcr.read_u32(LCR_INTCSR)?;
            debug!(
                intcsr = format_args!("{value:#010x}"),
                "interrupt enable rewritten"
            );
        }
        Ok(value)
    }
}
