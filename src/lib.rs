//! Loadcom is a bring-up utility that pushes a small program to a
//! bootloader-equipped board over the serial port, has the board run it, and
//! checks the result the program reports against the one encoded in the
//! program file name.
//!
//! The program is written as a text file of hex records:
//!
//! ```text
//! 0000: 3E 3F    -- LD A,3Fh
//! 0002: D3 00    -- OUT (0),A
//! ```
//!
//! and its file name carries the expected result, e.g.
//! `ld_out_expect_3F_00.hex`. The exchange with the bootloader is:
//!
//! * send `LOAD\r\n`, wait for `READY\r\n`,
//! * send the frame: length (LE16, payload + 4), start address (LE16,
//!   `0x0000`) and the program bytes, one byte at a time with a fixed delay
//!   between bytes,
//! * read back the device's XOR checksum of the frame and compare it,
//! * send `RESET\r\n`, read the two result bytes, wait for `READY\r\n`.
//!
//! Mismatches along the way are reported but do not stop the upload, unless
//! strict mode is requested.
//!
//! The loader protocol is implemented as a state machine in terms of
//! **states** and **transitions** between them with the following
//! characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * Session data (the channel, the program, the checksum, the report) is
//!   shared between **all** states.
//! * Transitions between states are triggered via typed **events** and follow
//!   defined semantics.
//! * Only explicitly defined transitions are permitted and as many errors as
//!   possible are detected at **compile-time**.
//! * Transitioning from one state to another consumes the original state.
//!
//! The implementation of state transitions leverages `rust`'s `From` and `Into`
//! pattern: the next state is created `From` the event returned by the current
//! one. Only transitions for which the `From` trait is implemented are
//! authorized and any other transition would be detected at compile-time as an
//! error.

mod checksum;
mod error;
pub mod load_protocol;
mod program;
mod settings;
mod uploader;
mod utils;

pub use checksum::Checksum;
pub use error::{LoaderError, Result};
pub use load_protocol::{LoaderSession, SessionReport};
pub use program::{
    BinaryDecoder, ExpectedResult, HexDecoder, HexRecord, ProgramImage, RecordDecoder,
    RecordError, RecordFormat,
};
pub use settings::{Settings, SettingsBuilder};
pub use uploader::{exit_code, report_exit_code, Uploader, EXIT_BAD_EXPECTATION, EXIT_FAILURE};
pub use utils::Channel;
