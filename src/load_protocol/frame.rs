//! Wire constants and the frame header of the loader protocol.

use std::convert::TryFrom;

use crate::error::{LoaderError, Result};

/// Command asking the bootloader to receive a program.
pub const LOAD_CMD: &[u8] = b"LOAD\r\n";
/// Command asking the bootloader to run the received program.
pub const RESET_CMD: &[u8] = b"RESET\r\n";
/// Token sent by the bootloader when it is ready for a command.
pub const READY_TOKEN: &[u8] = b"READY\r\n";

/// Address the program is loaded at. Record addresses in the program file are
/// not used to place the bytes.
pub const START_ADDRESS: u16 = 0x0000;

/// Number of result bytes the device reports after running the program.
pub const RESULT_SIZE: usize = 2;

/// The part of the frame sent before the payload:
/// `length (LE16) ‖ start address (LE16)`.
///
/// `length` counts the payload plus the 4 header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u16,
    pub start_address: u16,
}
impl FrameHeader {
    pub const SIZE: usize = 4;

    /// The largest payload that still fits in the 16 bit length field.
    pub const MAX_PAYLOAD: usize = u16::MAX as usize - Self::SIZE;

    pub fn for_payload(payload_len: usize) -> Result<Self> {
        let length = payload_len
            .checked_add(Self::SIZE)
            .and_then(|length| u16::try_from(length).ok())
            .ok_or(LoaderError::ImageTooLarge(payload_len))?;
        Ok(FrameHeader {
            length,
            start_address: START_ADDRESS,
        })
    }

    /// The header bytes in transmission order.
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let length = self.length.to_le_bytes();
        let start = self.start_address.to_le_bytes();
        [length[0], length[1], start[0], start[1]]
    }
}

#[test]
fn header_counts_itself() {
    let header = FrameHeader::for_payload(2).unwrap();
    assert_eq!(header.length, 6);
    assert_eq!(header.to_le_bytes(), [0x06, 0x00, 0x00, 0x00]);
}

#[test]
fn empty_payload() {
    assert_eq!(FrameHeader::for_payload(0).unwrap().length, 4);
}

#[test]
fn length_is_little_endian() {
    let header = FrameHeader::for_payload(0x1230).unwrap();
    assert_eq!(header.to_le_bytes(), [0x34, 0x12, 0x00, 0x00]);
}

#[test]
fn largest_payload() {
    assert_eq!(
        FrameHeader::for_payload(FrameHeader::MAX_PAYLOAD)
            .unwrap()
            .length,
        0xFFFF
    );
    match FrameHeader::for_payload(FrameHeader::MAX_PAYLOAD + 1) {
        Err(LoaderError::ImageTooLarge(len)) => assert_eq!(len, 65_532),
        other => panic!("unexpected {:?}", other),
    }
}
