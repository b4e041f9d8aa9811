//! Capture-loop demo against a simulated card.
//!
//! Builds a device over file-backed register windows, pulses the
//! simulated interrupt line once a second, and prints each decoded
//! event timestamp.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sym560_common::bcd::EventTimestamp;
use sym560_common::consts::{HARD_CTRL_EVENT_ENABLE, REG_EVENT_CAP, REG_HARD_CTRL};
use sym560_device::irq::IrqLine;
use sym560_device::{DeviceResource, PciIdent, RegisterWindow, SimulatedIrqLine};
use tempfile::NamedTempFile;

fn backing_window(len: usize) -> std::io::Result<(NamedTempFile, RegisterWindow)> {
    let mut file = NamedTempFile::new()?;
    file.write_all(&vec![0u8; len])?;
    file.flush()?;
    let win = RegisterWindow::map_file(file.path(), 0).map_err(std::io::Error::other)?;
    Ok((file, win))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sym560_device::init_tracing();

    let (_main_file, main) = backing_window(0x200)?;
    let (_lcr_file, lcr) = backing_window(0x80)?;

    // A plausible latched capture: 2024 day 123, 14:36:52.847291.
    let event: [u8; 12] = [
        0x91, 0x72, 0x00, 0x50, 0x84, 0x52, 0x36, 0x14, 0x23, 0x01, 0x24, 0x20,
    ];
    for (i, byte) in event.iter().enumerate() {
        main.write_u8(REG_EVENT_CAP + i as u64, *byte)?;
    }
    main.write_u8(REG_HARD_CTRL, HARD_CTRL_EVENT_ENABLE)?;

    let line = SimulatedIrqLine::new();
    let pulse_line = line.clone();
    let ident = PciIdent {
        vendor: 0x10b5,
        device: 0x9050,
        subvendor: 0x12DA,
        subsystem: 0x5908,
        revision: 2,
    };
    let device = DeviceResource::from_parts(
        ident,
        main,
        lcr,
        0,
        Box::new(move |_| Ok(Arc::new(line.clone()) as Arc<dyn IrqLine>)),
        Some(Duration::from_secs(5)),
    );

    let session = device.open()?;

    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_secs(1));
            pulse_line.pulse();
        }
    });

    for n in 1..=5 {
        let raw = session.capture_event()?;
        let stamp = EventTimestamp::decode(&raw)?;
        println!(
            "event {n}: {} day {:03} {:02}:{:02}:{:02}.{:09}",
            stamp.year,
            stamp.day_of_year,
            stamp.hour,
            stamp.minute,
            stamp.second,
            stamp.subsec_nanos(),
        );
    }

    Ok(())
}
