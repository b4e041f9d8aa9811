//! PCI identity, register map and hardware bit definitions.
//!
//! Offsets are relative to the start of the main register window (BAR 2).
//! The bridge-chip register lives in the local-configuration window (BAR 0).
//! See chapter 3 of the 560-5908 user guide for the register semantics.

use bitflags::bitflags;
use static_assertions::const_assert_eq;

/// PCI vendor ID of the card (PLX bridge).
pub const SYM560_VENDOR_ID: u16 = 0x10b5;
/// PCI device ID of the card.
pub const SYM560_DEVICE_ID: u16 = 0x9050;
/// PCI subsystem vendor ID.
pub const SYM560_SUBVENDOR_ID: u16 = 0x12DA;
/// PCI subsystem ID.
pub const SYM560_SUBSYSTEM_ID: u16 = 0x5908;

/// Interrupt and flag control (1 byte).
pub const REG_HARD_CTRL: u64 = 0xF8;
/// Software time capture (12 bytes).
pub const REG_STIMECAP: u64 = 0xFC;
/// Hardware status (1 byte, part of the software time capture block).
pub const REG_HARD_STATUS: u64 = 0xFE;
/// Software time capture lock/status byte.
pub const REG_STIMECAP_LOCK: u64 = 0x105;
/// Antenna hardware position (16 bytes).
pub const REG_ANT_POSITION: u64 = 0x108;
/// Configuration #1 (4 bytes).
pub const REG_CONFIG1: u64 = 0x118;
/// Diagnostic (4 bytes).
pub const REG_DIAGNOSTIC: u64 = 0x11C;
/// Time zone offset (4 bytes).
pub const REG_TZO: u64 = 0x120;
/// Phase compensation (3 bytes).
pub const REG_PHASE_COMP: u64 = 0x124;
/// Factory calibration (1 byte).
pub const REG_FACTORY_CAL: u64 = 0x127;
/// Rate synthesizer (4 bytes).
pub const REG_RATE_SYNTH: u64 = 0x128;
/// Configuration #2 (4 bytes).
pub const REG_CONFIG2: u64 = 0x12C;
/// Event time capture control byte inside configuration #2.
pub const REG_CONFIG2_ETCC: u64 = 0x12E;
/// Time compensation (8 bytes).
pub const REG_TIME_COMP: u64 = 0x138;
/// Preset time (12 bytes).
pub const REG_PRESET_TIME: u64 = 0x158;
/// Preset position (16 bytes).
pub const REG_PRESET_POS: u64 = 0x164;
/// Event time capture (12 bytes).
pub const REG_EVENT_CAP: u64 = 0x174;
/// Satellite signal strength, six 4-byte slots.
pub const REG_SIG_STRENGTH: u64 = 0x198;
/// Satellite signal strength update status (1 byte).
pub const REG_SIG_STATUS: u64 = 0x1B0;
/// IRIG AM AGC delays (4 bytes).
pub const REG_IRIG_AM: u64 = 0x1B4;
/// PCI card firmware version (4 bytes).
pub const REG_VERSION: u64 = 0x1BC;

/// Number of satellites the card tracks concurrently.
pub const SATELLITE_SLOTS: usize = 6;
/// Size of one latched event timestamp in bytes.
pub const EVENT_CAPTURE_LEN: usize = 12;
/// Size of the check-signal summary buffer in bytes.
pub const SIGNAL_SUMMARY_LEN: usize = 5;

/// Interrupt control/status register of the PLX 9050 bridge, in the
/// local-configuration window.
pub const LCR_INTCSR: u64 = 0x4C;
/// Expected low byte of `LCR_INTCSR` when the interrupt line is enabled.
pub const LCR_INTCSR_ENABLED: u8 = 0x48;

/// ORed into `REG_HARD_CTRL` by the interrupt handler: writes a 1 to every
/// clear position, acknowledging the captured/error bits while leaving the
/// remaining bits untouched.
pub const HARD_CTRL_CLEAR_MASK: u8 = 0x47;
/// Control byte value enabling event-driven interrupts with a cleared event
/// status bit.
pub const HARD_CTRL_EVENT_ENABLE: u8 = 0x09;

// The hardware-status byte sits two bytes into the time-capture block.
const_assert_eq!(REG_HARD_STATUS, REG_STIMECAP + 2);
// Six signal-strength slots end exactly at the update-status byte.
const_assert_eq!(
    REG_SIG_STRENGTH + (SATELLITE_SLOTS as u64) * 4,
    REG_SIG_STATUS
);

bitflags! {
    /// Antenna diagnostics in the hardware-status byte (`REG_HARD_STATUS`).
    ///
    /// Both bits set means the antenna feed is healthy. A cleared
    /// `NO_SHORT` indicates a shorted feed, a cleared `NO_OPEN` an open
    /// load. Both cleared is the known artifact of reseating the antenna
    /// connector without a power cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AntennaStatus: u8 {
        /// No open load detected on the antenna feed.
        const NO_OPEN = 0x10;
        /// No short detected on the antenna feed.
        const NO_SHORT = 0x20;
    }
}

bitflags! {
    /// Lock bits in the software-time-capture lock byte (`REG_STIMECAP_LOCK`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LockStatus: u8 {
        /// GPS receiver has achieved lock.
        const GPS_LOCKED = 0x10;
        /// Input reference signal is valid.
        const INPUT_VALID = 0x20;
        /// Generator is phase locked to the input reference.
        const PHASE_LOCKED = 0x40;
    }
}

impl LockStatus {
    /// True when all three lock conditions hold.
    pub fn fully_locked(self) -> bool {
        self.contains(Self::GPS_LOCKED | Self::INPUT_VALID | Self::PHASE_LOCKED)
    }
}
