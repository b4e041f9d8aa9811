//! # sym560 Driver Core
//!
//! Userspace driver for the Symmetricom 560-5908-U (GPS-PCI-2U) timing
//! card: a byte-addressable register surface plus an interrupt-driven
//! event-timestamp capture facility.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │  Session 1   │     │  DeviceResource  │     │  IrqService  │
//! │ cursor, r/w, ├────►│  main BAR  (2)   │◄────┤  UIO / sim   │
//! │ control cmds │     │  bridge BAR (0)  │     │  line wait   │
//! └──────────────┘     │  CaptureGate     │◄────┤  Interrupt   │
//! ┌──────────────┐     │  open counting   │     │  Bridge      │
//! │  Session N   ├────►│                  │     └──────────────┘
//! └──────────────┘     └──────────────────┘
//! ```
//!
//! A hardware event pulses the interrupt line; the service thread latches
//! the 12-byte event capture, acknowledges the card and raises the capture
//! gate; a session blocked in the event-capture command consumes the
//! latched bytes. The interrupt handler is registered on the first open
//! and released on the last close, however many sessions come and go in
//! between.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sym560_common::config::{CardConfig, ConfigLoader};
//! use sym560_device::DeviceResource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CardConfig::load(Path::new("sym560.toml"))?;
//! config.validate()?;
//!
//! let device = DeviceResource::attach(&config)?;
//! let session = device.open()?;
//!
//! // Blocks until the card timestamps an external event.
//! let event = session.capture_event()?;
//! let ts = sym560_common::bcd::EventTimestamp::decode(&event)?;
//! println!("event at {:03}:{:02}:{:02}:{:02}", ts.day_of_year, ts.hour, ts.minute, ts.second);
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - `DeviceResource`: shared through `Arc`; open/close accounting is the
//!   only internally serialized operation.
//! - `Session`: one cursor per session, not shared; register-level access
//!   from concurrent sessions is deliberately unsynchronized.
//! - `CaptureGate`: single-slot; with several concurrent capture waiters,
//!   exactly one consumes any given event.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod irq;
pub mod platform;
pub mod resource;
pub mod session;
pub mod window;

pub use command::SignalSummary;
pub use error::{DeviceError, DeviceResult};
pub use irq::{CaptureGate, InterruptBridge, IrqLine, IrqLineFactory, IrqService, SimulatedIrqLine, UioIrqLine};
pub use platform::PciIdent;
pub use resource::DeviceResource;
pub use session::Session;
pub use window::RegisterWindow;

/// Initialize tracing with the environment filter.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
