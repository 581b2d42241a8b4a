//! Byte-paced writes and fixed-length reads over the device channel.

use std::io::{self, Read, Write};
use std::{thread, time::Duration};

use log::trace;

/// Anything the loader can talk to the device through: a serial port, or an
/// in-memory script in tests.
pub trait Channel: Read + Write + Send {}
impl<T: Read + Write + Send + ?Sized> Channel for T {}

/// Write `bytes` one at a time, each followed by `pacing` so the device can
/// consume it before the next one arrives.
pub(crate) fn write_paced<C: Channel + ?Sized>(
    channel: &mut C,
    bytes: &[u8],
    pacing: Duration,
) -> io::Result<()> {
    for byte in bytes {
        write_byte_paced(channel, *byte, pacing)?;
    }
    Ok(())
}

pub(crate) fn write_byte_paced<C: Channel + ?Sized>(
    channel: &mut C,
    byte: u8,
    pacing: Duration,
) -> io::Result<()> {
    trace!("Sending {:02X}", byte);
    channel.write_all(&[byte])?;
    channel.flush()?;
    if !pacing.is_zero() {
        thread::sleep(pacing);
    }
    Ok(())
}

/// Read up to `count` bytes, stopping early only when the stream ends or the
/// read times out. The returned buffer may therefore be shorter than `count`.
pub(crate) fn read_fixed<C: Channel + ?Sized>(
    channel: &mut C,
    count: usize,
) -> io::Result<Vec<u8>> {
    let mut buf = vec![0; count];
    let mut filled = 0;
    while filled < count {
        match channel.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                trace!("read timed out after {} of {} bytes", filled, count);
                break;
            }
            Err(e) => return Err(e),
        }
    }
    buf.truncate(filled);
    trace!("Received {:02X?}", buf);
    Ok(buf)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out its script one byte per read, then times out.
    struct Trickle {
        script: Vec<u8>,
        written: Vec<u8>,
    }
    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.script.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
            }
            buf[0] = self.script.remove(0);
            Ok(1)
        }
    }
    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            // One byte per call is what the pacing contract asks for.
            assert_eq!(buf.len(), 1);
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn trickle(script: &[u8]) -> Trickle {
        Trickle {
            script: script.to_vec(),
            written: Vec::new(),
        }
    }

    #[test]
    fn read_accumulates_partial_reads() {
        let mut channel = trickle(b"READY\r\n");
        assert_eq!(read_fixed(&mut channel, 7).unwrap(), b"READY\r\n".to_vec());
    }

    #[test]
    fn read_stops_on_timeout() {
        let mut channel = trickle(b"RE");
        assert_eq!(read_fixed(&mut channel, 7).unwrap(), b"RE".to_vec());
    }

    #[test]
    fn read_stops_at_end_of_stream() {
        let mut channel = io::Cursor::new(vec![0xAA]);
        assert_eq!(read_fixed(&mut channel, 2).unwrap(), vec![0xAA]);
    }

    #[test]
    fn writes_one_byte_at_a_time() {
        let mut channel = trickle(b"");
        write_paced(&mut channel, b"LOAD\r\n", Duration::ZERO).unwrap();
        assert_eq!(channel.written, b"LOAD\r\n".to_vec());
    }
}
