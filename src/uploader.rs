//! Everything around a loader session: reading the program and its
//! expectation, getting hold of the serial port, and turning the outcome into
//! a process exit code.
//!
//! **Example**
//! ```no_run
//! use loadcom::{self as lc, Uploader};
//!
//! let settings = lc::SettingsBuilder::new()
//!     .path("/dev/ttyUSB1")
//!     .program("ld_out_expect_3F.hex")
//!     .finalize();
//! let status = Uploader::new(settings).run();
//! std::process::exit(status.into());
//! ```

use log::{debug, error, info};

use crate::error::{LoaderError, Result};
use crate::load_protocol::{self as lpsm, SessionReport};
use crate::program::{ExpectedResult, ProgramImage};
use crate::settings::Settings;
use crate::utils;

// =============================================================================
// Public Interface
// =============================================================================

/// Exit code when the file name carries no valid expectation.
pub const EXIT_BAD_EXPECTATION: i8 = -1;
/// Exit code for any other failure.
pub const EXIT_FAILURE: i8 = 1;

/// Runs one upload as configured by its [`Settings`].
#[derive(Debug)]
pub struct Uploader {
    settings: Settings,
}
impl Uploader {
    pub fn new(settings: Settings) -> Self {
        Uploader { settings }
    }

    /// Run the whole upload and return the status to exit the process with:
    /// `0` when the session ran to the end (and, in strict mode, the result
    /// matched), non-zero otherwise.
    pub fn run(&self) -> i8 {
        match self.upload() {
            Ok(report) => {
                debug!("{:#?}", report);
                report_exit_code(&report, self.settings.strict)
            }
            Err(e) => {
                error!("{}", e);
                exit_code(&e)
            }
        }
    }

    /// Prepare the program and its expectation, open the port and run the
    /// loader session.
    pub fn upload(&self) -> Result<SessionReport> {
        let (image, expected) = self.prepare()?;

        let mut settings = self.settings.clone();
        if settings.path.is_none() {
            settings.path = Some(utils::select_port().ok_or(LoaderError::NoPort)?);
        }
        let port = utils::open_and_setup_port(&settings)?;

        lpsm::factory(settings, Box::new(port), image, expected).run()
    }

    /// Everything that can be checked before touching the device: the
    /// expectation in the file name first, then the program file itself.
    pub fn prepare(&self) -> Result<(ProgramImage, ExpectedResult)> {
        let program = self.settings.program.as_deref().unwrap_or_default();

        let expected = ExpectedResult::from_path(program)?;
        info!("expected results: {:02X?}", expected.as_bytes());

        let image = ProgramImage::load(program, self.settings.format)?;
        info!("program image is {} bytes long", image.len());

        Ok((image, expected))
    }
}

/// Map a session that ran to the end to a process exit code. Only strict mode
/// turns a failed result into a failure.
pub fn report_exit_code(report: &SessionReport, strict: bool) -> i8 {
    if strict && !report.passed {
        EXIT_FAILURE
    } else {
        0
    }
}

/// Map an error that ended the upload to a process exit code.
pub fn exit_code(error: &LoaderError) -> i8 {
    match error {
        LoaderError::MalformedExpectation(_) => EXIT_BAD_EXPECTATION,
        _ => EXIT_FAILURE,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SettingsBuilder;
    use std::fs;

    #[test]
    fn missing_expectation_is_checked_first() {
        let settings = SettingsBuilder::new().program("missing.hex").finalize();
        assert_eq!(Uploader::new(settings).run(), EXIT_BAD_EXPECTATION);
    }

    #[test]
    fn missing_program_file() {
        let settings = SettingsBuilder::new()
            .program("no/such/dir/prog_expect_3F.hex")
            .finalize();
        assert_eq!(Uploader::new(settings).run(), EXIT_FAILURE);
    }

    #[test]
    fn prepare_reads_program_and_expectation() {
        let path = std::env::temp_dir().join(format!(
            "loadcom_{}_prepare_expect_AA_01.hex",
            std::process::id()
        ));
        fs::write(&path, "0000: 3E AA -- LD A,AAh\n0002: 76\n").unwrap();

        let settings = SettingsBuilder::new()
            .program(path.to_string_lossy())
            .finalize();
        let (image, expected) = Uploader::new(settings).prepare().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(image.as_bytes(), &[0x3E, 0xAA, 0x76]);
        assert_eq!(expected.as_bytes(), &[0xAA, 0x01]);
    }

    #[test]
    fn failed_result_only_fails_strict_runs() {
        let failed = SessionReport {
            results: [0x55, 0x00],
            passed: false,
            ..SessionReport::default()
        };
        assert_eq!(report_exit_code(&failed, true), EXIT_FAILURE);
        assert_eq!(report_exit_code(&failed, false), 0);

        let passed = SessionReport {
            passed: true,
            ..failed
        };
        assert_eq!(report_exit_code(&passed, true), 0);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&LoaderError::MalformedExpectation("x".into())), -1);
        assert_eq!(exit_code(&LoaderError::NoPort), 1);
        assert_eq!(exit_code(&LoaderError::ImageTooLarge(70_000)), 1);
    }
}
