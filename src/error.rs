//! Errors raised while preparing or running an upload.

use std::io;

/// Everything that can go wrong in `loadcom`.
///
/// Only a subset is fatal in the default (lenient) mode: a missing program
/// file, a file name without a valid expectation, an image too large to frame
/// and a port that cannot be opened. Handshake, checksum and short-read
/// variants are only produced when [`Settings::strict`](crate::Settings) is
/// set.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("cannot read program file `{path}`: {source}")]
    ProgramFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("expected result not found in file name: {0}")]
    MalformedExpectation(String),

    #[error("program image of {0} bytes does not fit in a single frame")]
    ImageTooLarge(usize),

    #[error("no serial port was selected")]
    NoPort,

    #[error("expected {expected} bytes for the {what}, received {received}")]
    ShortRead {
        what: &'static str,
        expected: usize,
        received: usize,
    },

    #[error("expected `READY` from the device, received {0:02X?}")]
    HandshakeMismatch(Vec<u8>),

    #[error("checksum mismatch: sent {sent:02X}, device computed {received:02X}")]
    ChecksumMismatch { sent: u8, received: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, LoaderError>;
