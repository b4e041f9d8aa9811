//! Platform-specific device plumbing.

pub mod linux;

pub use linux::{PciIdent, enable_device, map_bar, read_irq_line};
