//! Shared fixtures: a simulated card backed by temporary files.

// Each test binary uses a different slice of this module.
#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sym560_device::irq::{IrqLine, IrqLineFactory};
use sym560_device::{DeviceResource, PciIdent, RegisterWindow, SimulatedIrqLine};
use tempfile::NamedTempFile;

/// Main register bank size used by the fixtures.
pub const MAIN_LEN: usize = 0x200;
/// Bridge register bank size used by the fixtures.
pub const LCR_LEN: usize = 0x80;

pub fn ident() -> PciIdent {
    PciIdent {
        vendor: 0x10b5,
        device: 0x9050,
        subvendor: 0x12DA,
        subsystem: 0x5908,
        revision: 2,
    }
}

/// A zero-filled file-backed register window.
pub fn window(len: usize) -> (NamedTempFile, RegisterWindow) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&vec![0u8; len]).unwrap();
    file.flush().unwrap();
    let win = RegisterWindow::map_file(file.path(), 0).unwrap();
    (file, win)
}

/// A simulated card: file-backed windows plus a counting interrupt-line
/// factory that hands out a fresh simulated line per registration.
pub struct SimCard {
    pub device: Arc<DeviceResource>,
    pub registrations: Arc<AtomicUsize>,
    lines: Arc<Mutex<Vec<SimulatedIrqLine>>>,
    _main_file: NamedTempFile,
    _lcr_file: NamedTempFile,
}

impl SimCard {
    pub fn new(capture_timeout: Option<Duration>) -> Self {
        let (main_file, main) = window(MAIN_LEN);
        let (lcr_file, lcr) = window(LCR_LEN);

        let registrations = Arc::new(AtomicUsize::new(0));
        let lines = Arc::new(Mutex::new(Vec::new()));

        let regs = registrations.clone();
        let line_log = lines.clone();
        let factory: IrqLineFactory = Box::new(move |_line| {
            regs.fetch_add(1, Ordering::SeqCst);
            let line = SimulatedIrqLine::new();
            line_log.lock().unwrap().push(line.clone());
            Ok(Arc::new(line) as Arc<dyn IrqLine>)
        });

        let device =
            DeviceResource::from_parts(ident(), main, lcr, 11, factory, capture_timeout);

        Self {
            device,
            registrations,
            lines,
            _main_file: main_file,
            _lcr_file: lcr_file,
        }
    }

    /// The line handed out by the most recent registration.
    pub fn line(&self) -> SimulatedIrqLine {
        self.lines.lock().unwrap().last().unwrap().clone()
    }

    /// Deliver one interrupt pulse on the current line.
    pub fn pulse(&self) {
        self.line().pulse();
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}
