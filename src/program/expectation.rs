//! Expected program result encoded in the program file name.

use std::path::Path;

use super::records::parse_digits;
use crate::error::{LoaderError, Result};

const MARKER: &str = "expect_";

/// The result bytes the program is expected to report back, as found in the
/// `expect_<hex>[_<hex>]*` part of the file name. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedResult {
    bytes: Vec<u8>,
}
impl ExpectedResult {
    /// Extract the expectation from the file name component of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LoaderError::MalformedExpectation(path.display().to_string()))?;
        Self::from_file_name(name)
    }

    /// Extract the expectation from a file name such as
    /// `add_expect_3F_07.hex`.
    ///
    /// ```
    /// use loadcom::ExpectedResult;
    ///
    /// let expected = ExpectedResult::from_file_name("add_expect_3F_07.hex").unwrap();
    /// assert_eq!(expected.as_bytes(), &[0x3F, 0x07]);
    /// ```
    pub fn from_file_name(name: &str) -> Result<Self> {
        let malformed = || LoaderError::MalformedExpectation(name.to_owned());

        // The first marker followed by at least one hex digit or `_` wins,
        // and the capture runs as far as such characters go.
        let captured = name
            .match_indices(MARKER)
            .map(|(at, _)| {
                let rest = &name[at + MARKER.len()..];
                let end = rest
                    .find(|c: char| !(c.is_ascii_hexdigit() || c == '_'))
                    .unwrap_or_else(|| rest.len());
                &rest[..end]
            })
            .find(|group| !group.is_empty())
            .ok_or_else(malformed)?;

        let bytes = captured
            .split('_')
            .map(|segment| parse_digits(segment, 2, 16))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(malformed)?;

        Ok(ExpectedResult { bytes })
    }

    /// The first expected byte, the one compared against the device result.
    pub fn primary(&self) -> u8 {
        self.bytes[0]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("prog_expect_3F_07.hex", &[0x3F, 0x07])]
    #[case("expect_AA", &[0xAA])]
    #[case("nop_expect_0.hex", &[0x00])]
    #[case("lower_expect_ff_a.txt", &[0xFF, 0x0A])]
    #[case("skip_expect_.x_expect_12.hex", &[0x12])]
    fn valid_names(#[case] name: &str, #[case] bytes: &[u8]) {
        let expected = ExpectedResult::from_file_name(name).unwrap();
        assert_eq!(expected.as_bytes(), bytes);
        assert_eq!(expected.primary(), bytes[0]);
    }

    #[rstest]
    #[case("program.hex")]
    #[case("prog_expect_.hex")]
    #[case("prog_expect_3F__07.hex")]
    #[case("prog_expect_3F_.hex")]
    #[case("prog_expect_123.hex")]
    fn malformed_names(#[case] name: &str) {
        match ExpectedResult::from_file_name(name) {
            Err(LoaderError::MalformedExpectation(n)) => assert_eq!(n, name),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parsing_is_repeatable() {
        let name = "prog_expect_3F_07.hex";
        assert_eq!(
            ExpectedResult::from_file_name(name).unwrap(),
            ExpectedResult::from_file_name(name).unwrap()
        );
    }

    #[test]
    fn only_file_name_is_searched() {
        let expected = ExpectedResult::from_path("tests/expect_11/run_expect_22.hex").unwrap();
        assert_eq!(expected.as_bytes(), &[0x22]);
        assert!(ExpectedResult::from_path("tests/expect_11/run.hex").is_err());
    }
}
