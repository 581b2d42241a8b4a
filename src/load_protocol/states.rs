//! States for the `loadcom` loader protocol state machine.
//!
//! This modules is private and restricted to the
//! [`load_protocol`](crate::load_protocol) scope. The public interface of the
//! loader protocol state machine is provided by
//! [`load_protocol`](crate::load_protocol).
//!
//! ```ignore
//! use super::states::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::fmt;

use console::style;
use hexplay::HexViewBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, log_enabled, warn, Level::Debug};

use super::events::*;
use super::frame::{FrameHeader, LOAD_CMD, READY_TOKEN, RESET_CMD, RESULT_SIZE};
use super::state_machine::SessionReport;
use crate::error::{LoaderError, Result};
use crate::program::{ExpectedResult, ProgramImage};
use crate::settings::Settings;
use crate::utils::{read_fixed, write_byte_paced, write_paced, Channel};
use crate::Checksum;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Data shared by all the states of one upload session.
///
/// The channel is exclusively owned by the session for its whole duration.
pub(crate) struct Session {
    pub channel: Box<dyn Channel>,
    pub image: ProgramImage,
    pub expected: ExpectedResult,
    pub checksum: Checksum,
    pub report: SessionReport,
}
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("image_len", &self.image.len())
            .field("expected", &self.expected.as_bytes())
            .field("checksum", &self.checksum)
            .field("report", &self.report)
            .finish()
    }
}

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state does its part of the exchange with the
    /// device and, when finished, requests a transition to a `new state` by
    /// returning the appropriate `event`. The `event` is consumed to create
    /// the `new state` using the corresponding [`From`] trait implementation
    /// (provided such implementation exists).
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event;
}

// Idle State ==================================================================

/// The initial state of the loader protocol state machine.
///
///  * **[`LoadSentEvent`] => [`AwaitingReadyState`]** after `LOAD\r\n` has
///    been written, one paced byte at a time,
///  * **[`DoneEvent`] => [`DoneState`]** if the image cannot be framed or the
///    channel fails.
#[derive(Debug)]
pub(crate) struct IdleState {}
impl Runnable for IdleState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> Idle");

        // Refuse before anything goes on the wire.
        let header = match FrameHeader::for_payload(session.image.len()) {
            Ok(header) => header,
            Err(e) => return Event::Done(DoneEvent::failed(e)),
        };

        println!("[LC] ⏩ Sending LOAD command");
        match write_paced(session.channel.as_mut(), LOAD_CMD, settings.pacing) {
            Ok(()) => Event::LoadSent(LoadSentEvent { header }),
            Err(e) => Event::Done(DoneEvent::failed(e)),
        }
    }
}

// AwaitingReady State =========================================================

/// Waits for the 7 bytes of `READY\r\n` from the device.
///
/// A mismatch is only logged, unless in strict mode:
///
///  * **[`ReadyEvent`] => [`FramingState`]**,
///  * **[`DoneEvent`] => [`DoneState`]** on channel errors or, in strict mode,
///    on a mismatch.
#[derive(Debug)]
pub(crate) struct AwaitingReadyState {
    pub header: FrameHeader,
}
impl Runnable for AwaitingReadyState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> AwaitingReady");
        match expect_ready(settings, session) {
            Ok(ready) => {
                session.report.ready = ready;
                Event::Ready(ReadyEvent {
                    header: self.header,
                })
            }
            Err(e) => Event::Done(DoneEvent::failed(e)),
        }
    }
}

// Framing State ===============================================================

/// Lays out the frame: the header computed before `LOAD` was sent, followed
/// by the program image.
///
///  * **[`FrameReadyEvent`] => [`TransmittingState`]**.
#[derive(Debug)]
pub(crate) struct FramingState {
    pub header: FrameHeader,
}
impl Runnable for FramingState {
    fn run(&mut self, _settings: &Settings, session: &mut Session) -> Event {
        info!("=> Framing");
        let header = self.header;
        debug!(
            "message length: {} {:02X?}",
            header.length,
            header.to_le_bytes()
        );
        if log_enabled!(Debug) && !session.image.is_empty() {
            let view = HexViewBuilder::new(session.image.as_bytes())
                .address_offset(header.start_address as usize)
                .row_width(16)
                .finish();
            println!("{}", view);
        }
        Event::FrameReady(FrameReadyEvent { header })
    }
}

// Transmitting State ==========================================================

/// Sends the frame header then the program image, folding every byte into
/// the running checksum as it goes out.
///
///  * **[`FrameSentEvent`] => [`AwaitingChecksumState`]**,
///  * **[`DoneEvent`] => [`DoneState`]** on channel errors.
#[derive(Debug)]
pub(crate) struct TransmittingState {
    pub header: FrameHeader,
}
impl Runnable for TransmittingState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> Transmitting");

        let header = self.header.to_le_bytes();
        let total = header.len() + session.image.len();

        let pb = if log_enabled!(Debug) {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[LC] ⏩ Loading [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} bytes")
                .progress_chars("=>-"),
        );

        session.checksum = Checksum::new();
        for byte in header.iter().chain(session.image.as_bytes()) {
            session.checksum.fold(*byte);
            if let Err(e) = write_byte_paced(session.channel.as_mut(), *byte, settings.pacing) {
                pb.abandon();
                return Event::Done(DoneEvent::failed(e));
            }
            session.report.bytes_sent += 1;
            pb.inc(1);
        }
        pb.finish_and_clear();

        session.report.checksum_sent = session.checksum.value();
        println!(
            "[LC] {} bytes sent, calculated checksum: {:02X}",
            session.report.bytes_sent, session.report.checksum_sent
        );
        Event::FrameSent(FrameSentEvent {})
    }
}

// AwaitingChecksum State ======================================================

/// Reads the single checksum byte computed by the device and compares it with
/// the one accumulated while sending.
///
///  * **[`ChecksumEvent`] => [`ResettingState`]**,
///  * **[`DoneEvent`] => [`DoneState`]** on channel errors or, in strict mode,
///    on a mismatch.
#[derive(Debug)]
pub(crate) struct AwaitingChecksumState {}
impl Runnable for AwaitingChecksumState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> AwaitingChecksum");
        let received = match read_response(settings, session, 1, "checksum") {
            Ok(bytes) => bytes[0],
            Err(e) => return Event::Done(DoneEvent::failed(e)),
        };

        let sent = session.report.checksum_sent;
        session.report.checksum_received = received;
        session.report.checksum_ok = received == sent;

        if session.report.checksum_ok {
            println!("[LC] Received checksum: {:02X}", received);
        } else {
            println!(
                "{}",
                style(format!(
                    "[LC] Received checksum: {:02X}, expected {:02X}",
                    received, sent
                ))
                .yellow()
            );
            if settings.strict {
                return Event::Done(DoneEvent::failed(LoaderError::ChecksumMismatch {
                    sent,
                    received,
                }));
            }
        }
        Event::Checksum(ChecksumEvent {})
    }
}

// Resetting State =============================================================

/// Sends `RESET\r\n` so the device runs the program it received.
///
///  * **[`ResetSentEvent`] => [`AwaitingResultState`]**,
///  * **[`DoneEvent`] => [`DoneState`]** on channel errors.
#[derive(Debug)]
pub(crate) struct ResettingState {}
impl Runnable for ResettingState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> Resetting");
        match write_paced(session.channel.as_mut(), RESET_CMD, settings.pacing) {
            Ok(()) => Event::ResetSent(ResetSentEvent {}),
            Err(e) => Event::Done(DoneEvent::failed(e)),
        }
    }
}

// AwaitingResult State ========================================================

/// Reads the two result bytes produced by the program. The test passes when
/// the first one equals the first expected byte.
///
///  * **[`ResultEvent`] => [`AwaitingFinalReadyState`]**,
///  * **[`DoneEvent`] => [`DoneState`]** on channel errors.
#[derive(Debug)]
pub(crate) struct AwaitingResultState {}
impl Runnable for AwaitingResultState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> AwaitingResult");
        let results = match read_response(settings, session, RESULT_SIZE, "program results") {
            Ok(bytes) => [bytes[0], bytes[1]],
            Err(e) => return Event::Done(DoneEvent::failed(e)),
        };

        println!("[LC] Result-1: {:02X}", results[0]);
        println!("[LC] Result-2: {:02X}", results[1]);

        let expected = session.expected.primary();
        session.report.results = results;
        session.report.passed = results[0] == expected;
        if session.report.passed {
            println!("{}", style("[LC] ✅ test passed").green());
        } else {
            println!(
                "{}",
                style(format!(
                    "[LC] ❌ test failed: expected {:02X}, got {:02X}",
                    expected, results[0]
                ))
                .red()
            );
        }
        Event::ResultReceived(ResultEvent {})
    }
}

// AwaitingFinalReady State ====================================================

/// Waits for the bootloader to announce `READY\r\n` again after the program
/// run.
///
///  * **[`DoneEvent`] => [`DoneState`]** in all cases, carrying an error only
///    on channel failure or, in strict mode, on a mismatch.
#[derive(Debug)]
pub(crate) struct AwaitingFinalReadyState {}
impl Runnable for AwaitingFinalReadyState {
    fn run(&mut self, settings: &Settings, session: &mut Session) -> Event {
        info!("=> AwaitingFinalReady");
        match expect_ready(settings, session) {
            Ok(ready) => {
                session.report.final_ready = ready;
                Event::Done(DoneEvent::completed())
            }
            Err(e) => Event::Done(DoneEvent::failed(e)),
        }
    }
}

// Done State ==================================================================

/// Reached when the loader protocol state machine completes its execution and
/// is about to terminate (normally or abnormally).
///
/// This state goes into a 2-phase execution. During the initial phase, it runs
/// like any other state to report the outcome. It then triggers the
/// [`ExitEvent`] to cause the state machine to terminate and exit.
#[derive(Debug)]
pub(crate) struct DoneState {
    /// The error that ended the session, if any.
    pub error: Option<LoaderError>,
    /// When `true` instructs the state machine to exit its event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, _settings: &Settings, _session: &mut Session) -> Event {
        info!(
            "=> Done with{}errors",
            if self.error.is_some() { " " } else { " no " }
        );
        // The error itself is reported by whoever receives it from `run()`.
        if self.error.is_none() {
            println!("[LC] Data transmission complete.");
        }

        Event::Exit(ExitEvent {
            error: self.error.take(),
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Read exactly `count` bytes for `what`. A short read is an error in strict
/// mode; otherwise it is logged and the missing bytes are zero.
fn read_response(
    settings: &Settings,
    session: &mut Session,
    count: usize,
    what: &'static str,
) -> Result<Vec<u8>> {
    let mut bytes = read_fixed(session.channel.as_mut(), count)?;
    if bytes.len() < count {
        if settings.strict {
            return Err(LoaderError::ShortRead {
                what,
                expected: count,
                received: bytes.len(),
            });
        }
        warn!(
            "expected {} bytes for the {}, received {}",
            count,
            what,
            bytes.len()
        );
        bytes.resize(count, 0);
    }
    Ok(bytes)
}

/// Read the `READY` token and tell whether it matched.
fn expect_ready(settings: &Settings, session: &mut Session) -> Result<bool> {
    let response = read_response(settings, session, READY_TOKEN.len(), "READY token")?;
    if response == READY_TOKEN {
        println!("[LC] 👍 READY received");
        return Ok(true);
    }
    if settings.strict {
        return Err(LoaderError::HandshakeMismatch(response));
    }
    warn!(
        "did not receive `READY`; received: {:?}",
        String::from_utf8_lossy(&response)
    );
    Ok(false)
}
