//! Settings related to the loadcom serial port and the loader protocol.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::program::RecordFormat;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings related to the serial port and the upload session used
/// by `loadcom` and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,
    /// How long a blocking read on the port may wait before giving up.
    pub timeout: Duration,

    /// Delay observed after every single byte written to the device. The
    /// bootloader consumes one byte at a time and needs this budget to keep
    /// up.
    pub pacing: Duration,
    /// Syntax of the byte tokens in the program file.
    pub format: RecordFormat,
    /// When `true`, handshake, checksum and short-read problems end the
    /// session with an error, and a failed result makes the exit code
    /// non-zero. Otherwise they are only logged.
    pub strict: bool,

    /// Path to the program file to be uploaded. Its file name carries the
    /// expected result (`..._expect_3F_00.hex`).
    pub program: Option<String>,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use loadcom::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().path("/dev/ttyUSB1").finalize();
/// assert_eq!(settings.baud_rate, 115_200);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: 115_200,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                timeout: Duration::from_secs(10),
                pacing: Duration::from_millis(100),
                format: RecordFormat::Hex,
                strict: false,
                program: None,
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set the read timeout on the serial port
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Set the delay observed after each byte sent to the device
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.settings.pacing = pacing;
        self
    }

    /// Set the syntax of the byte tokens in the program file
    pub fn format(mut self, format: RecordFormat) -> Self {
        self.settings.format = format;
        self
    }

    /// Abort on handshake/checksum mismatches instead of only logging them
    pub fn strict(mut self, strict: bool) -> Self {
        self.settings.strict = strict;
        self
    }

    /// Set the path to the program file
    pub fn program<'a>(mut self, program: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.program = Some(program.into().as_ref().to_owned());
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_secs(10),
            pacing: Duration::from_millis(100),
            format: RecordFormat::Hex,
            strict: false,
            program: None,
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyUSB1").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyUSB1");
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn data_bits() {
    let data_bits = DataBits::Seven;
    let settings = SettingsBuilder::new().data_bits(data_bits).finalize();
    assert_eq!(settings.data_bits, data_bits);
}

#[test]
fn flow_control() {
    let flow_control = FlowControl::Hardware;
    let settings = SettingsBuilder::new().flow_control(flow_control).finalize();
    assert_eq!(settings.flow_control, flow_control);
}

#[test]
fn stop_bits() {
    let stop_bits = StopBits::Two;
    let settings = SettingsBuilder::new().stop_bits(stop_bits).finalize();
    assert_eq!(settings.stop_bits, stop_bits);
}

#[test]
fn parity() {
    let parity = Parity::Even;
    let settings = SettingsBuilder::new().parity(parity).finalize();
    assert_eq!(settings.parity, parity);
}

#[test]
fn pacing() {
    let settings = SettingsBuilder::new().pacing(Duration::ZERO).finalize();
    assert_eq!(settings.pacing, Duration::ZERO);
}

#[test]
fn format_and_strict() {
    let settings = SettingsBuilder::new()
        .format(RecordFormat::Binary)
        .strict(true)
        .finalize();
    assert_eq!(settings.format, RecordFormat::Binary);
    assert!(settings.strict);
}

#[test]
fn program() {
    let settings = SettingsBuilder::new()
        .program("add_expect_3F_07.hex")
        .finalize();
    assert_eq!(settings.program.unwrap(), "add_expect_3F_07.hex");
}
