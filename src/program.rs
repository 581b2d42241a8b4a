//! The program to upload and the result it is expected to produce.
//!
//! The program bytes come from a line oriented text file where each line is a
//! record:
//!
//! ```text
//! 0000: 3E 3F    -- LD A,3Fh
//! 0002: D3 00    -- OUT (0),A
//! ```
//!
//! The expected result comes from the file name, e.g. `ld_out_expect_3F.hex`.
//!
//! **Example** - Loading a program and its expectation:
//! ```no_run
//! use loadcom::{ExpectedResult, ProgramImage, RecordFormat};
//!
//! let path = "ld_out_expect_3F.hex";
//! let expected = ExpectedResult::from_path(path).unwrap();
//! let image = ProgramImage::load(path, RecordFormat::Hex).unwrap();
//! println!("{} bytes, expecting {:02X?}", image.len(), expected.as_bytes());
//! ```

mod expectation;
mod records;

pub use expectation::ExpectedResult;
pub use records::{
    BinaryDecoder, HexDecoder, HexRecord, ProgramImage, RecordDecoder, RecordError, RecordFormat,
};
