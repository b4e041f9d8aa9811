//! sym560 Common Library
//!
//! Shared definitions for the sym560 driver suite, a userspace driver for the
//! Symmetricom 560-5908-U (GPS-PCI-2U) timing card.
//!
//! # Module Structure
//!
//! - [`consts`] - PCI identity, register map and hardware bit definitions
//! - [`command`] - Control-channel command codes
//! - [`config`] - Configuration loading traits and types
//! - [`bcd`] - Binary-coded-decimal field decoding
//! - [`prelude`] - Common re-exports for convenience

pub mod bcd;
pub mod command;
pub mod config;
pub mod consts;
pub mod prelude;
