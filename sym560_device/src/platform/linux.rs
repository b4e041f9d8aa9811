//! Linux sysfs access to the PCI function.
//!
//! The card is driven entirely from userspace: configuration-space identity
//! comes from the sysfs attribute files, the register windows are the
//! `resourceN` BAR files mapped read-write, and interrupts arrive through a
//! UIO character device (see [`crate::irq::UioIrqLine`]).

use crate::error::{DeviceError, DeviceResult};
use crate::window::RegisterWindow;
use std::io;
use std::path::Path;
use sym560_common::consts::{
    SYM560_DEVICE_ID, SYM560_SUBSYSTEM_ID, SYM560_SUBVENDOR_ID, SYM560_VENDOR_ID,
};
use tracing::{debug, info, warn};

/// PCI configuration-space identity of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciIdent {
    /// Vendor ID.
    pub vendor: u16,
    /// Device ID.
    pub device: u16,
    /// Subsystem vendor ID.
    pub subvendor: u16,
    /// Subsystem ID.
    pub subsystem: u16,
    /// Revision.
    pub revision: u8,
}

impl PciIdent {
    /// Read the identity attributes from a sysfs device directory.
    pub fn read_from(dir: &Path) -> DeviceResult<Self> {
        let ident = Self {
            vendor: read_sysfs_hex(&dir.join("vendor"))? as u16,
            device: read_sysfs_hex(&dir.join("device"))? as u16,
            subvendor: read_sysfs_hex(&dir.join("subsystem_vendor"))? as u16,
            subsystem: read_sysfs_hex(&dir.join("subsystem_device"))? as u16,
            revision: read_sysfs_hex(&dir.join("revision"))? as u8,
        };
        info!(
            vendor = format_args!("{:#06x}", ident.vendor),
            device = format_args!("{:#06x}", ident.device),
            revision = ident.revision,
            "PCI function identified"
        );
        Ok(ident)
    }

    /// Exact four-field match against the supported card.
    pub fn is_sym560(&self) -> bool {
        self.vendor == SYM560_VENDOR_ID
            && self.device == SYM560_DEVICE_ID
            && self.subvendor == SYM560_SUBVENDOR_ID
            && self.subsystem == SYM560_SUBSYSTEM_ID
    }
}

/// Parse a sysfs attribute holding one hex number (`0x10b5\n`).
fn read_sysfs_hex(path: &Path) -> DeviceResult<u32> {
    let raw = std::fs::read_to_string(path)?;
    let trimmed = raw.trim().trim_start_matches("0x");
    u32::from_str_radix(trimmed, 16).map_err(|e| {
        DeviceError::Io {
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad sysfs value in {}: {e}", path.display()),
            ),
        }
    })
}

/// Enable the PCI function (sysfs `enable` attribute).
///
/// Harmless when the function is already enabled; the kernel keeps an
/// enable count per function.
pub fn enable_device(dir: &Path) -> DeviceResult<()> {
    let path = dir.join("enable");
    std::fs::write(&path, "1")?;
    debug!(device = %dir.display(), "PCI function enabled");
    Ok(())
}

/// Read the assigned interrupt line (sysfs `irq` attribute).
pub fn read_irq_line(dir: &Path) -> DeviceResult<u32> {
    let raw = std::fs::read_to_string(dir.join("irq"))?;
    raw.trim().parse::<u32>().map_err(|e| DeviceError::Io {
        source: io::Error::new(io::ErrorKind::InvalidData, format!("bad irq value: {e}")),
    })
}

/// Map one BAR of the function as a register window.
///
/// The physical base address is recovered from the sysfs `resource` table
/// for diagnostics; a missing or unparsable table only costs the
/// diagnostic, not the mapping.
pub fn map_bar(dir: &Path, bar: usize) -> DeviceResult<RegisterWindow> {
    let path = dir.join(format!("resource{bar}"));
    let base = bar_base_address(dir, bar).unwrap_or_else(|| {
        warn!(bar, "could not read BAR base address from resource table");
        0
    });
    let window = RegisterWindow::map_file(&path, base)?;
    debug!(
        bar,
        base = format_args!("{base:#x}"),
        len = window.len(),
        "BAR mapped"
    );
    Ok(window)
}

/// Start address of one BAR from the sysfs `resource` table, whose lines
/// are `start end flags` in hex.
fn bar_base_address(dir: &Path, bar: usize) -> Option<u64> {
    let table = std::fs::read_to_string(dir.join("resource")).ok()?;
    let line = table.lines().nth(bar)?;
    let start = line.split_whitespace().next()?;
    u64::from_str_radix(start.trim_start_matches("0x"), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_sysfs() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("vendor"), "0x10b5\n").unwrap();
        fs::write(dir.path().join("device"), "0x9050\n").unwrap();
        fs::write(dir.path().join("subsystem_vendor"), "0x12da\n").unwrap();
        fs::write(dir.path().join("subsystem_device"), "0x5908\n").unwrap();
        fs::write(dir.path().join("revision"), "0x02\n").unwrap();
        fs::write(dir.path().join("irq"), "11\n").unwrap();
        fs::write(
            dir.path().join("resource"),
            "0x00000000f7a00000 0x00000000f7a0007f 0x0000000000040200\n\
             0x0000000000000000 0x0000000000000000 0x0000000000000000\n\
             0x00000000f7a01000 0x00000000f7a011ff 0x0000000000040200\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_ident_read_and_match() {
        let dir = fake_sysfs();
        let ident = PciIdent::read_from(dir.path()).unwrap();
        assert!(ident.is_sym560());
        assert_eq!(ident.revision, 2);
    }

    #[test]
    fn test_ident_mismatch() {
        let dir = fake_sysfs();
        fs::write(dir.path().join("device"), "0x9051\n").unwrap();
        let ident = PciIdent::read_from(dir.path()).unwrap();
        assert!(!ident.is_sym560());
    }

    #[test]
    fn test_irq_line() {
        let dir = fake_sysfs();
        assert_eq!(read_irq_line(dir.path()).unwrap(), 11);
    }

    #[test]
    fn test_bar_base_address() {
        let dir = fake_sysfs();
        assert_eq!(bar_base_address(dir.path(), 0), Some(0xf7a0_0000));
        assert_eq!(bar_base_address(dir.path(), 2), Some(0xf7a0_1000));
        assert_eq!(bar_base_address(dir.path(), 5), None);
    }

    #[test]
    fn test_missing_attribute_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            PciIdent::read_from(dir.path()),
            Err(DeviceError::Io { .. })
        ));
    }
}
