//! Common re-exports for convenience.
//!
//! ```rust
//! use sym560_common::prelude::*;
//! ```

pub use crate::bcd::{BcdError, EventTimestamp, SatelliteSignal};
pub use crate::command::ControlCommand;
pub use crate::config::{CardConfig, ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::consts::*;
