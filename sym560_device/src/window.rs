//! Bounds-checked access to one mapped hardware register range.

use crate::error::{DeviceError, DeviceResult};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::Path;
use std::ptr;

/// A mapped view of one physical register range.
///
/// Accesses are volatile, bounds checked, and 1, 2 or 4 bytes wide. The
/// window performs no internal fencing or locking: ordering between
/// accesses, and the consequences of concurrent register-level access from
/// several sessions, are the caller's concern — exactly as with raw memory.
/// The mapping is released when the window is dropped.
pub struct RegisterWindow {
    // Field order matters: `ptr` aliases `map`, which must outlive it.
    ptr: *mut u8,
    len: u64,
    base: u64,
    #[allow(dead_code)]
    map: MmapMut,
}

// The raw pointer only ever targets the owned mapping; hardware-level races
// between concurrent accessors are part of the access contract above.
unsafe impl Send for RegisterWindow {}
unsafe impl Sync for RegisterWindow {}

impl RegisterWindow {
    /// Wrap an existing mapping. `base` is the physical base address and is
    /// used for diagnostics only.
    pub fn from_mmap(mut map: MmapMut, base: u64) -> Self {
        let ptr = map.as_mut_ptr();
        let len = map.len() as u64;
        Self {
            ptr,
            len,
            base,
            map,
        }
    }

    /// Map a register-backing file in its entirety.
    ///
    /// Used for sysfs PCI `resourceN` files and, in tests, for plain
    /// temporary files standing in for the hardware.
    pub fn map_file(path: &Path, base: u64) -> DeviceResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self::from_mmap(map, base))
    }

    /// Window length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True for a zero-length window (never the case for a mapped BAR).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Physical base address, for diagnostics.
    pub fn base(&self) -> u64 {
        self.base
    }

    fn checked_ptr(&self, offset: u64, width: usize) -> DeviceResult<*mut u8> {
        if !matches!(width, 1 | 2 | 4) {
            return Err(DeviceError::InvalidTransferSize { size: width });
        }
        match offset.checked_add(width as u64) {
            Some(end) if end <= self.len => Ok(unsafe { self.ptr.add(offset as usize) }),
            _ => Err(DeviceError::OutOfRange {
                offset,
                width,
                limit: self.len,
            }),
        }
    }

    /// Read `width` bytes (1, 2 or 4) at `offset`, little endian.
    ///
    /// Naturally aligned offsets are serviced with a single volatile access
    /// of the full width; unaligned 2/4-byte offsets fall back to byte-wise
    /// volatile reads so every in-range offset is serviceable.
    pub fn read(&self, offset: u64, width: usize) -> DeviceResult<u32> {
        let p = self.checked_ptr(offset, width)?;
        let value = unsafe {
            match width {
                1 => u32::from(ptr::read_volatile(p)),
                2 if p.align_offset(2) == 0 => u32::from(ptr::read_volatile(p.cast::<u16>())),
                4 if p.align_offset(4) == 0 => ptr::read_volatile(p.cast::<u32>()),
                _ => {
                    let mut v = 0u32;
                    for i in 0..width {
                        v |= u32::from(ptr::read_volatile(p.add(i))) << (8 * i);
                    }
                    v
                }
            }
        };
        Ok(value)
    }

    /// Write the low `width` bytes (1, 2 or 4) of `value` at `offset`,
    /// little endian. Same alignment handling as [`read`](Self::read).
    pub fn write(&self, offset: u64, width: usize, value: u32) -> DeviceResult<()> {
        let p = self.checked_ptr(offset, width)?;
        unsafe {
            match width {
                1 => ptr::write_volatile(p, value as u8),
                2 if p.align_offset(2) == 0 => ptr::write_volatile(p.cast::<u16>(), value as u16),
                4 if p.align_offset(4) == 0 => ptr::write_volatile(p.cast::<u32>(), value),
                _ => {
                    for i in 0..width {
                        ptr::write_volatile(p.add(i), (value >> (8 * i)) as u8);
                    }
                }
            }
        }
        Ok(())
    }

    /// Read one byte at `offset`.
    pub fn read_u8(&self, offset: u64) -> DeviceResult<u8> {
        Ok(self.read(offset, 1)? as u8)
    }

    /// Write one byte at `offset`.
    pub fn write_u8(&self, offset: u64, value: u8) -> DeviceResult<()> {
        self.write(offset, 1, u32::from(value))
    }

    /// Read one 32-bit word at `offset`.
    pub fn read_u32(&self, offset: u64) -> DeviceResult<u32> {
        self.read(offset, 4)
    }

    /// Write one 32-bit word at `offset`.
    pub fn write_u32(&self, offset: u64, value: u32) -> DeviceResult<()> {
        self.write(offset, 4, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn window(len: usize) -> (NamedTempFile, RegisterWindow) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; len]).unwrap();
        file.flush().unwrap();
        let win = RegisterWindow::map_file(file.path(), 0xF000_0000).unwrap();
        (file, win)
    }

    #[test]
    fn test_round_trip_all_widths() {
        let (_f, win) = window(0x200);
        for &(offset, width, value) in &[
            (0xF8, 1, 0x47u32),
            (0xFE, 2, 0xBEEF),
            (0x174, 4, 0x1234_5678),
        ] {
            win.write(offset, width, value).unwrap();
            assert_eq!(win.read(offset, width).unwrap(), value);
        }
    }

    #[test]
    fn test_unaligned_round_trip() {
        let (_f, win) = window(0x200);
        win.write(0x101, 4, 0xDEAD_BEEF).unwrap();
        assert_eq!(win.read(0x101, 4).unwrap(), 0xDEAD_BEEF);
        // Byte-wise view must agree with the little-endian word.
        assert_eq!(win.read(0x101, 1).unwrap(), 0xEF);
        assert_eq!(win.read(0x104, 1).unwrap(), 0xDE);
    }

    #[test]
    fn test_invalid_width_rejected() {
        let (_f, win) = window(0x200);
        for width in [0, 3, 5, 8, 12] {
            assert!(matches!(
                win.read(0, width),
                Err(DeviceError::InvalidTransferSize { size }) if size == width
            ));
            assert!(matches!(
                win.write(0, width, 0),
                Err(DeviceError::InvalidTransferSize { .. })
            ));
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let (_f, win) = window(0x100);
        assert!(win.read(0xFF, 1).is_ok());
        assert!(matches!(
            win.read(0xFF, 2),
            Err(DeviceError::OutOfRange { .. })
        ));
        assert!(matches!(
            win.write(0x100, 1, 0),
            Err(DeviceError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_width_checked_before_bounds() {
        // A bad width reports as such even when the offset is also bad.
        let (_f, win) = window(0x10);
        assert!(matches!(
            win.read(0x1000, 3),
            Err(DeviceError::InvalidTransferSize { .. })
        ));
    }
}
