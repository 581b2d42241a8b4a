//! Running XOR checksum over the frame bytes.

/// Single byte XOR accumulator, folded with each frame byte as it goes on the
/// wire (length, start address, then payload). Command tokens never go
/// through it.
///
/// ```
/// use loadcom::Checksum;
///
/// let mut checksum = Checksum::new();
/// for byte in &[0x06, 0x00, 0x00, 0x00, 0x10, 0x20] {
///     checksum.fold(*byte);
/// }
/// assert_eq!(checksum.value(), 0x36);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(u8);
impl Checksum {
    pub fn new() -> Self {
        Checksum(0)
    }

    pub fn fold(&mut self, byte: u8) {
        self.0 ^= byte;
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[test]
fn starts_at_zero() {
    assert_eq!(Checksum::new().value(), 0);
}

#[test]
fn same_byte_twice_cancels_out() {
    let mut checksum = Checksum::new();
    checksum.fold(0x5A);
    checksum.fold(0x5A);
    assert_eq!(checksum.value(), 0);
}
