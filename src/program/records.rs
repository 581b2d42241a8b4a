//! Decoding of the program file records into a program image.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::{debug, trace, warn};

use crate::error::{LoaderError, Result};

// =============================================================================
// Public Interface
// =============================================================================

/// One decoded line of the program file.
///
/// The address is only echoed in the logs; the frame always starts at
/// `0x0000` whatever the records say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRecord {
    pub address: u16,
    pub payload: Vec<u8>,
}

/// Why a line of the program file did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The line has no `:` separating the address from the bytes.
    MissingColon,
    /// The text before the `:` is not a 16 bit hexadecimal value.
    BadAddress(String),
}
impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingColon => write!(f, "no colon found"),
            RecordError::BadAddress(text) => write!(f, "invalid address `{}`", text),
        }
    }
}

/// Turns a line of the program file into a [`HexRecord`].
///
/// All formats share the same line grammar,
/// `<hexAddress>:<tokens>[--<comment>]`, implemented by
/// [`decode_line`](RecordDecoder::decode_line). Implementors only decide how a
/// single byte token is spelled.
pub trait RecordDecoder {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Parse one whitespace delimited token into a byte, or `None` if the
    /// token is not valid for this format.
    fn parse_byte(&self, token: &str) -> Option<u8>;

    fn decode_line(&self, line: &str) -> std::result::Result<HexRecord, RecordError> {
        let colon = line.find(':').ok_or(RecordError::MissingColon)?;

        let address_text = line[..colon].trim();
        let address = u16::from_str_radix(address_text, 16)
            .ok()
            .filter(|_| address_text.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| RecordError::BadAddress(address_text.to_owned()))?;

        let remainder = &line[colon + 1..];
        let bytes_part = match remainder.find("--") {
            Some(comment) => &remainder[..comment],
            None => remainder,
        };

        let mut payload = Vec::new();
        for token in bytes_part.split_whitespace() {
            match self.parse_byte(token) {
                Some(byte) => payload.push(byte),
                None => warn!(
                    "{:04X}: skipping invalid {} byte `{}`",
                    address,
                    self.name(),
                    token
                ),
            }
        }

        Ok(HexRecord { address, payload })
    }
}

/// Byte tokens written as 1 or 2 hexadecimal digits (`3F`, `a`).
#[derive(Debug, Clone, Copy, Default)]
pub struct HexDecoder;
impl RecordDecoder for HexDecoder {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn parse_byte(&self, token: &str) -> Option<u8> {
        parse_digits(token, 2, 16)
    }
}

/// Byte tokens written as 1 to 8 binary digits (`00111111`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryDecoder;
impl RecordDecoder for BinaryDecoder {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn parse_byte(&self, token: &str) -> Option<u8> {
        parse_digits(token, 8, 2)
    }
}

/// Selects the [`RecordDecoder`] used to read a program file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Hex,
    Binary,
}
impl RecordFormat {
    pub fn decoder(self) -> &'static dyn RecordDecoder {
        match self {
            RecordFormat::Hex => &HexDecoder,
            RecordFormat::Binary => &BinaryDecoder,
        }
    }
}
impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hex" => Ok(RecordFormat::Hex),
            "binary" => Ok(RecordFormat::Binary),
            _ => Err(format!("unknown record format `{}`", s)),
        }
    }
}

/// The bytes to upload, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    bytes: Vec<u8>,
}
impl ProgramImage {
    /// Read and decode the program file at `path`.
    ///
    /// Only a failure to open or read the file is an error. Lines and tokens
    /// that cannot be decoded are logged and skipped.
    pub fn load(path: impl AsRef<Path>, format: RecordFormat) -> Result<Self> {
        let path = path.as_ref();
        let wrap = |source| LoaderError::ProgramFile {
            path: path.display().to_string(),
            source,
        };
        let file = File::open(path).map_err(wrap)?;
        Self::parse(BufReader::new(file), format.decoder()).map_err(wrap)
    }

    /// Decode the program records provided by `reader`.
    pub fn parse<R: BufRead>(reader: R, decoder: &dyn RecordDecoder) -> io::Result<Self> {
        let mut bytes = Vec::new();
        // Raw lines: a stray non UTF-8 byte (typically in a comment) must not
        // reject the whole file.
        for (index, raw) in reader.split(b'\n').enumerate() {
            let mut raw = raw?;
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw);
            if line.trim().is_empty() {
                continue;
            }
            match decoder.decode_line(&line) {
                Ok(record) => {
                    trace!("Address: {:04X} {:02X?}", record.address, record.payload);
                    bytes.extend_from_slice(&record.payload);
                }
                Err(e) => warn!("line {}: {}, skipped", index + 1, e),
            }
        }
        debug!("program image is {} bytes long", bytes.len());
        Ok(ProgramImage { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
impl From<Vec<u8>> for ProgramImage {
    fn from(bytes: Vec<u8>) -> Self {
        ProgramImage { bytes }
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Parse a token of at most `max_digits` digits in the given `radix`. Signs
/// and prefixes are refused.
pub(super) fn parse_digits(token: &str, max_digits: usize, radix: u32) -> Option<u8> {
    if token.is_empty()
        || token.len() > max_digits
        || !token.chars().all(|c| c.is_digit(radix))
    {
        return None;
    }
    u8::from_str_radix(token, radix).ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn parse(text: &str, decoder: &dyn RecordDecoder) -> Vec<u8> {
        ProgramImage::parse(Cursor::new(text), decoder)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn comment_is_ignored() {
        let record = HexDecoder.decode_line("00A0: 01 02 -- comment").unwrap();
        assert_eq!(
            record,
            HexRecord {
                address: 0x00A0,
                payload: vec![0x01, 0x02]
            }
        );
    }

    #[test]
    fn comment_with_hex_looking_words() {
        let record = HexDecoder.decode_line("0000: 3E--LD A,3F").unwrap();
        assert_eq!(record.payload, vec![0x3E]);
    }

    #[test]
    fn extra_whitespace_produces_no_empty_tokens() {
        let record = HexDecoder.decode_line("0010:   a\t0F   \t ").unwrap();
        assert_eq!(record.payload, vec![0x0A, 0x0F]);
    }

    #[test]
    fn missing_colon() {
        assert_eq!(
            HexDecoder.decode_line("0000 01 02"),
            Err(RecordError::MissingColon)
        );
    }

    #[test]
    fn bad_address() {
        assert_eq!(
            HexDecoder.decode_line("zz: 01"),
            Err(RecordError::BadAddress("zz".into()))
        );
        assert_eq!(
            HexDecoder.decode_line("10000: 01"),
            Err(RecordError::BadAddress("10000".into()))
        );
    }

    #[test]
    fn invalid_tokens_are_skipped() {
        let record = HexDecoder.decode_line("0000: 01 GG 123 +1 02").unwrap();
        assert_eq!(record.payload, vec![0x01, 0x02]);
    }

    #[test]
    fn binary_tokens() {
        let record = BinaryDecoder
            .decode_line("0000: 1010 00111111 2 111111111")
            .unwrap();
        assert_eq!(record.payload, vec![0x0A, 0x3F]);
    }

    #[test]
    fn malformed_line_does_not_stop_parsing() {
        let text = "0000: 01 02\nno colon here\n\n0002: 03 -- done\n";
        assert_eq!(parse(text, &HexDecoder), vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn non_utf8_comment_keeps_every_record() {
        let text: &[u8] = b"0000: 01 02 -- caf\xE9\r\n0002: 03\n";
        let image = ProgramImage::parse(Cursor::new(text), &HexDecoder).unwrap();
        assert_eq!(image.as_bytes(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn record_addresses_do_not_reorder_bytes() {
        let text = "0010: AA\n0000: BB\n";
        assert_eq!(parse(text, &HexDecoder), vec![0xAA, 0xBB]);
    }

    #[test]
    fn empty_input() {
        assert!(ProgramImage::parse(Cursor::new(""), &HexDecoder)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn parsing_is_repeatable() {
        let text = "0000: 3E 3F\n0002: D3 00 -- out\n";
        assert_eq!(parse(text, &HexDecoder), parse(text, &HexDecoder));
    }

    #[test]
    fn format_from_str() {
        assert_eq!("hex".parse::<RecordFormat>(), Ok(RecordFormat::Hex));
        assert_eq!("binary".parse::<RecordFormat>(), Ok(RecordFormat::Binary));
        assert!("ihex".parse::<RecordFormat>().is_err());
    }

    #[test]
    fn missing_file() {
        match ProgramImage::load("does/not/exist_expect_00.hex", RecordFormat::Hex) {
            Err(LoaderError::ProgramFile { path, .. }) => {
                assert_eq!(path, "does/not/exist_expect_00.hex")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
