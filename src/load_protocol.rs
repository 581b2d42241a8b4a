//! `loadcom` loader protocol.
//!
//! **Example** - Running a session over an already opened channel:
//! ```no_run
//! use loadcom::{self as lc, load_protocol, ExpectedResult, ProgramImage, RecordFormat};
//!
//! let settings = lc::SettingsBuilder::new().path("/dev/ttyUSB1").finalize();
//! let path = "ld_out_expect_3F.hex";
//! let expected = ExpectedResult::from_path(path).unwrap();
//! let image = ProgramImage::load(path, RecordFormat::Hex).unwrap();
//! let port = serialport::new("/dev/ttyUSB1", 115_200).open().unwrap();
//!
//! let session = load_protocol::factory(settings, Box::new(port), image, expected);
//! let report = session.run().unwrap();
//! println!("passed: {}", report.passed);
//! ```

mod events;
mod frame;
mod state_machine;
mod states;

pub use frame::{FrameHeader, LOAD_CMD, READY_TOKEN, RESET_CMD, RESULT_SIZE, START_ADDRESS};
pub use state_machine::{factory, LoaderSession, SessionReport};
