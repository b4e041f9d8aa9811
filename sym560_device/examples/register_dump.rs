//! Dump the interesting register bank fields of an attached card.
//!
//! Expects a config file path as the first argument:
//!
//! ```text
//! register_dump card.toml
//! ```

use sym560_common::config::{CardConfig, ConfigLoader};
use sym560_common::consts::{
    REG_CONFIG1, REG_CONFIG2, REG_DIAGNOSTIC, REG_HARD_STATUS, REG_SIG_STATUS, REG_STIMECAP_LOCK,
    REG_VERSION,
};
use sym560_common::prelude::{AntennaStatus, LockStatus};
use sym560_device::DeviceResource;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sym560_device::init_tracing();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: register_dump <config.toml>")?;
    let config = CardConfig::load(path.as_ref())?;

    let device = DeviceResource::attach(&config)?;
    let session = device.open()?;
    let main = device.main_window();

    let ident = device.ident();
    println!(
        "card {}: {:04x}:{:04x} subsystem {:04x}:{:04x} rev {:02x}",
        config.pci_address, ident.vendor, ident.device, ident.subvendor, ident.subsystem,
        ident.revision,
    );
    println!("firmware version word: {:#010x}", main.read_u32(REG_VERSION)?);
    println!("config 1:              {:#010x}", main.read_u32(REG_CONFIG1)?);
    println!("config 2:              {:#010x}", main.read_u32(REG_CONFIG2)?);
    println!("diagnostic:            {:#010x}", main.read_u32(REG_DIAGNOSTIC)?);

    let status = main.read_u8(REG_HARD_STATUS)?;
    let antenna = AntennaStatus::from_bits_truncate(status);
    println!(
        "antenna: open={} short={}",
        !antenna.contains(AntennaStatus::NO_OPEN),
        !antenna.contains(AntennaStatus::NO_SHORT),
    );

    let lock = LockStatus::from_bits_truncate(main.read_u8(REG_STIMECAP_LOCK)?);
    println!("lock: fully_locked={} ({lock:?})", lock.fully_locked());
    println!(
        "satellite scan status: {:#04x}",
        main.read_u8(REG_SIG_STATUS)?
    );

    println!("bridge intcsr: {:#010x}", session.check_irq_enable()?);

    Ok(())
}
