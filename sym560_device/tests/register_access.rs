//! Register window access through sessions: seek discipline, transfer
//! widths, and read/write round-trips.

mod common;

use std::io::SeekFrom;
use proptest::prelude::*;
use sym560_device::DeviceError;
use sym560_common::consts::{REG_CONFIG1, REG_DIAGNOSTIC};

#[test]
fn seek_then_write_then_read_round_trips() {
    let card = common::SimCard::new(None);
    let mut session = card.device.open().unwrap();

    session.seek(SeekFrom::Start(REG_CONFIG1)).unwrap();
    assert_eq!(session.write(&[0xAB]).unwrap(), 1);
    let mut byte = [0u8; 1];
    assert_eq!(session.read(&mut byte).unwrap(), 1);
    assert_eq!(byte, [0xAB]);

    // The cursor does not advance on transfers.
    assert_eq!(session.cursor(), REG_CONFIG1);

    session.seek(SeekFrom::Start(REG_DIAGNOSTIC)).unwrap();
    let word = 0xDEAD_BEEFu32.to_le_bytes();
    assert_eq!(session.write(&word).unwrap(), 4);
    let mut back = [0u8; 4];
    session.read(&mut back).unwrap();
    assert_eq!(back, word);
}

#[test]
fn seek_rejects_relative_origins() {
    let card = common::SimCard::new(None);
    let mut session = card.device.open().unwrap();

    session.seek(SeekFrom::Start(0x10)).unwrap();
    assert!(matches!(
        session.seek(SeekFrom::Current(4)),
        Err(DeviceError::InvalidSeek { .. })
    ));
    assert!(matches!(
        session.seek(SeekFrom::End(0)),
        Err(DeviceError::InvalidSeek { .. })
    ));
    // A failed seek leaves the cursor alone.
    assert_eq!(session.cursor(), 0x10);
}

#[test]
fn seek_past_window_is_rejected() {
    let card = common::SimCard::new(None);
    let mut session = card.device.open().unwrap();

    let limit = common::MAIN_LEN as u64;
    session.seek(SeekFrom::Start(limit)).unwrap();
    assert!(matches!(
        session.seek(SeekFrom::Start(limit + 1)),
        Err(DeviceError::InvalidSeek { .. })
    ));
    assert_eq!(session.cursor(), limit);
}

#[test]
fn transfer_width_must_be_one_two_or_four() {
    let card = common::SimCard::new(None);
    let session = card.device.open().unwrap();

    for bad in [0usize, 3, 5, 8, 12] {
        let mut buf = vec![0u8; bad];
        assert!(matches!(
            session.read(&mut buf),
            Err(DeviceError::InvalidTransferSize { size }) if size == bad
        ));
        assert!(matches!(
            session.write(&buf),
            Err(DeviceError::InvalidTransferSize { size }) if size == bad
        ));
    }
}

#[test]
fn width_is_checked_before_bounds() {
    let card = common::SimCard::new(None);
    let mut session = card.device.open().unwrap();

    // Cursor parked right at the window edge: a bad width still reports
    // the width error, not the range error.
    session.seek(SeekFrom::Start(common::MAIN_LEN as u64)).unwrap();
    let mut buf = [0u8; 3];
    assert!(matches!(
        session.read(&mut buf),
        Err(DeviceError::InvalidTransferSize { size: 3 })
    ));
    let mut word = [0u8; 4];
    assert!(matches!(
        session.read(&mut word),
        Err(DeviceError::OutOfRange { .. })
    ));
}

proptest! {
    /// Any aligned-or-not offset that fits the window round-trips all
    /// three transfer widths through the raw window.
    #[test]
    fn window_round_trips_at_any_offset(
        offset in 0u64..(common::MAIN_LEN as u64),
        width in prop::sample::select(vec![1usize, 2, 4]),
        value in any::<u32>(),
    ) {
        prop_assume!(offset + width as u64 <= common::MAIN_LEN as u64);

        let (_file, win) = common::window(common::MAIN_LEN);
        let mask = if width == 4 { u32::MAX } else { (1u32 << (width * 8)) - 1 };
        win.write(offset, width, value).unwrap();
        prop_assert_eq!(win.read(offset, width).unwrap(), value & mask);
    }
}
