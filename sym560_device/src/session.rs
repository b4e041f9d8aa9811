//! Per-open session state: a shared device reference plus a seek cursor.

use crate::error::{DeviceError, DeviceResult};
use crate::resource::DeviceResource;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// One open handle to the card.
///
/// Sessions are independent: each carries its own seek cursor and nothing
/// else; the hardware resources stay with the shared [`DeviceResource`].
/// Dropping the session performs the close accounting — the last one out
/// releases the interrupt line.
pub struct Session {
    dev: Arc<DeviceResource>,
    cursor: u64,
    capture_timeout: Option<Duration>,
}

impl Session {
    pub(crate) fn new(dev: Arc<DeviceResource>, capture_timeout: Option<Duration>) -> Self {
        Self {
            dev,
            cursor: 0,
            capture_timeout,
        }
    }

    /// The shared device this session opens.
    pub fn device(&self) -> &Arc<DeviceResource> {
        &self.dev
    }

    /// Current seek cursor, an offset into the main register bank.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Override the capture-wait bound for this session. `None` waits
    /// indefinitely.
    pub fn set_capture_timeout(&mut self, timeout: Option<Duration>) {
        self.capture_timeout = timeout;
    }

    pub(crate) fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout
    }

    /// Position the cursor.
    ///
    /// Only absolute positioning within `0..=len` of the main bank is
    /// supported; relative and end-relative seeks are rejected and leave
    /// the cursor unchanged.
    pub fn seek(&mut self, pos: SeekFrom) -> DeviceResult<u64> {
        let limit = self.dev.main_window().len();
        let offset = match pos {
            SeekFrom::Start(o) => o,
            SeekFrom::Current(o) | SeekFrom::End(o) => {
                return Err(DeviceError::InvalidSeek {
                    requested: o,
                    limit,
                });
            }
        };
        if offset > limit {
            return Err(DeviceError::InvalidSeek {
                requested: offset as i64,
                limit,
            });
        }
        trace!(offset, "cursor moved");
        self.cursor = offset;
        Ok(offset)
    }

    /// Read `buf.len()` bytes (1, 2 or 4) from the main bank at the
    /// cursor.
    ///
    /// Performs exactly one register access of that width; the cursor does
    /// not advance. Returns the byte count on success.
    pub fn read(&self, buf: &mut [u8]) -> DeviceResult<usize> {
        let width = buf.len();
        let value = self.dev.main_window().read(self.cursor, width)?;
        buf.copy_from_slice(&value.to_le_bytes()[..width]);
        Ok(width)
    }

    /// Write `buf.len()` bytes (1, 2 or 4) to the main bank at the cursor.
    ///
    /// Performs exactly one register access of that width; the cursor does
    /// not advance. Returns the byte count on success.
    pub fn write(&self, buf: &[u8]) -> DeviceResult<usize> {
        let width = buf.len();
        if !matches!(width, 1 | 2 | 4) {
            return Err(DeviceError::InvalidTransferSize { size: width });
        }
        let mut bytes = [0u8; 4];
        bytes[..width].copy_from_slice(buf);
        self.dev
            .main_window()
            .write(self.cursor, width, u32::from_le_bytes(bytes))?;
        Ok(width)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dev.release();
    }
}
