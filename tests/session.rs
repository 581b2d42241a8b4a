//! End to end loader sessions against a scripted device.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;

use loadcom::load_protocol::{self as lpsm, LOAD_CMD, READY_TOKEN, RESET_CMD};
use loadcom::{
    Checksum, ExpectedResult, HexDecoder, LoaderError, ProgramImage, Settings, SettingsBuilder,
};

/// Replays what the device says and records what the host writes.
struct ScriptedDevice {
    replies: Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
}
impl Read for ScriptedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.replies.read(buf)
    }
}
impl Write for ScriptedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        *self.writes.lock().unwrap() += 1;
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Wire {
    written: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
}
impl Wire {
    fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
    fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

fn device(replies: Vec<u8>) -> (Box<ScriptedDevice>, Wire) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let writes = Arc::new(Mutex::new(0));
    let device = ScriptedDevice {
        replies: Cursor::new(replies),
        written: written.clone(),
        writes: writes.clone(),
    };
    (Box::new(device), Wire { written, writes })
}

fn settings(strict: bool) -> Settings {
    SettingsBuilder::new()
        .pacing(Duration::ZERO)
        .strict(strict)
        .finalize()
}

fn replies(checksum: u8, results: [u8; 2]) -> Vec<u8> {
    let mut replies = READY_TOKEN.to_vec();
    replies.push(checksum);
    replies.extend_from_slice(&results);
    replies.extend_from_slice(READY_TOKEN);
    replies
}

fn program(text: &str) -> ProgramImage {
    ProgramImage::parse(Cursor::new(text), &HexDecoder).unwrap()
}

fn frame_checksum(frame: &[u8]) -> u8 {
    let mut checksum = Checksum::new();
    frame.iter().for_each(|b| checksum.fold(*b));
    checksum.value()
}

#[test]
fn two_records_three_bytes_pass() {
    let image = program("0000: 3E AA -- LD A,AAh\n0002: 76 -- HALT\n");
    let expected = ExpectedResult::from_file_name("halt_expect_AA.hex").unwrap();
    let checksum = frame_checksum(&[0x07, 0x00, 0x00, 0x00, 0x3E, 0xAA, 0x76]);
    let (channel, wire) = device(replies(checksum, [0xAA, 0x00]));

    let report = lpsm::factory(settings(false), channel, image, expected)
        .run()
        .unwrap();

    assert!(report.ready);
    assert!(report.checksum_ok);
    assert_eq!(report.checksum_sent, checksum);
    assert_eq!(report.results, [0xAA, 0x00]);
    assert!(report.passed);
    assert!(report.final_ready);
    assert_eq!(report.bytes_sent, 7);

    let mut expected_wire = LOAD_CMD.to_vec();
    expected_wire.extend_from_slice(&[0x07, 0x00, 0x00, 0x00, 0x3E, 0xAA, 0x76]);
    expected_wire.extend_from_slice(RESET_CMD);
    assert_eq!(wire.written(), expected_wire);
    // Every byte goes out in its own write.
    assert_eq!(wire.writes(), expected_wire.len());
}

#[test]
fn checksum_vector() {
    let image = ProgramImage::from(vec![0x10, 0x20]);
    let expected = ExpectedResult::from_file_name("expect_00").unwrap();
    let (channel, wire) = device(replies(0x36, [0x00, 0x00]));

    let report = lpsm::factory(settings(true), channel, image, expected)
        .run()
        .unwrap();

    assert_eq!(report.checksum_sent, 0x36);
    let mut expected_wire = b"LOAD\r\n".to_vec();
    expected_wire.extend_from_slice(&[0x06, 0x00, 0x00, 0x00, 0x10, 0x20]);
    expected_wire.extend_from_slice(b"RESET\r\n");
    assert_eq!(wire.written(), expected_wire);
}

#[test]
fn empty_program_sends_header_only() {
    let expected = ExpectedResult::from_file_name("nop_expect_01").unwrap();
    let (channel, wire) = device(replies(0x04, [0x01, 0x02]));

    let report = lpsm::factory(settings(true), channel, ProgramImage::default(), expected)
        .run()
        .unwrap();

    assert_eq!(report.bytes_sent, 4);
    assert_eq!(report.checksum_sent, 0x04);
    assert!(report.passed);
    assert_eq!(&wire.written()[LOAD_CMD.len()..][..4], &[0x04, 0x00, 0x00, 0x00]);
}

#[test]
fn only_first_result_byte_is_checked() {
    let image = ProgramImage::from(vec![0x01]);
    let expected = ExpectedResult::from_file_name("x_expect_3F_07").unwrap();
    let checksum = frame_checksum(&[0x05, 0x00, 0x00, 0x00, 0x01]);
    let (channel, _) = device(replies(checksum, [0x3F, 0xEE]));

    let report = lpsm::factory(settings(false), channel, image, expected)
        .run()
        .unwrap();
    assert!(report.passed);
}

#[test]
fn lenient_session_reports_mismatches() {
    let image = ProgramImage::from(vec![0x10, 0x20]);
    let expected = ExpectedResult::from_file_name("expect_AA").unwrap();
    let mut replies = b"BUSY!\r\n".to_vec();
    replies.push(0x99);
    replies.extend_from_slice(&[0x55, 0x00]);
    replies.extend_from_slice(b"READY\r\n");
    let (channel, wire) = device(replies);

    let report = lpsm::factory(settings(false), channel, image, expected)
        .run()
        .unwrap();

    assert!(!report.ready);
    assert!(!report.checksum_ok);
    assert_eq!(report.checksum_received, 0x99);
    assert!(!report.passed);
    assert!(report.final_ready);
    assert!(wire.written().ends_with(RESET_CMD));
}

#[test]
fn lenient_session_survives_silent_device() {
    let image = ProgramImage::from(vec![0x10, 0x20]);
    let expected = ExpectedResult::from_file_name("expect_AA").unwrap();
    let (channel, wire) = device(READY_TOKEN.to_vec());

    let report = lpsm::factory(settings(false), channel, image, expected)
        .run()
        .unwrap();

    assert!(report.ready);
    assert_eq!(report.checksum_received, 0x00);
    assert_eq!(report.results, [0x00, 0x00]);
    assert!(!report.passed);
    assert!(!report.final_ready);
    assert!(wire.written().ends_with(RESET_CMD));
}

#[test]
fn strict_checksum_mismatch_stops_before_reset() {
    let image = ProgramImage::from(vec![0x10, 0x20]);
    let expected = ExpectedResult::from_file_name("expect_AA").unwrap();
    let (channel, wire) = device(replies(0x37, [0xAA, 0x00]));

    match lpsm::factory(settings(true), channel, image, expected).run() {
        Err(LoaderError::ChecksumMismatch { sent, received }) => {
            assert_eq!(sent, 0x36);
            assert_eq!(received, 0x37);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!wire.written().ends_with(RESET_CMD));
}

#[test]
fn strict_handshake_mismatch() {
    let image = ProgramImage::from(vec![0x10]);
    let expected = ExpectedResult::from_file_name("expect_AA").unwrap();
    let (channel, wire) = device(b"ERROR\r\n".to_vec());

    match lpsm::factory(settings(true), channel, image, expected).run() {
        Err(LoaderError::HandshakeMismatch(received)) => assert_eq!(received, b"ERROR\r\n"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(wire.written(), LOAD_CMD.to_vec());
}

#[test]
fn strict_short_read() {
    let image = ProgramImage::from(vec![0x10]);
    let expected = ExpectedResult::from_file_name("expect_AA").unwrap();
    let (channel, _) = device(b"REA".to_vec());

    match lpsm::factory(settings(true), channel, image, expected).run() {
        Err(LoaderError::ShortRead {
            expected, received, ..
        }) => {
            assert_eq!(expected, 7);
            assert_eq!(received, 3);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn oversized_image_is_refused_before_sending() {
    let image = ProgramImage::from(vec![0; 65_532]);
    let expected = ExpectedResult::from_file_name("expect_AA").unwrap();
    let (channel, wire) = device(Vec::new());

    match lpsm::factory(settings(false), channel, image, expected).run() {
        Err(LoaderError::ImageTooLarge(len)) => assert_eq!(len, 65_532),
        other => panic!("unexpected {:?}", other),
    }
    assert!(wire.written().is_empty());
}
