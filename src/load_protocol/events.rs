//! Events for the `loadcom` loader protocol state machine.
//!
//! This modules is private and restricted to the
//! [`load_protocol`](crate::load_protocol) scope. The public interface of the
//! loader protocol state machine is provided by
//! [`load_protocol`](crate::load_protocol).
//!
//! ```ignore
//! use super::events::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use super::frame::FrameHeader;
use crate::error::LoaderError;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// LoadSentEvent ===============================================================

/// Event fired once the `LOAD` command has been fully written to the device.
/// It triggers a transition to the `AwaitingReady` state, carrying the frame
/// header computed before anything was sent.
#[derive(Debug)]
pub(crate) struct LoadSentEvent {
    pub header: FrameHeader,
}

// ReadyEvent ==================================================================

/// Event fired after the `READY` token was read from the device, whether it
/// matched or not, triggering a transition to the `Framing` state.
#[derive(Debug)]
pub(crate) struct ReadyEvent {
    pub header: FrameHeader,
}

// FrameReadyEvent =============================================================

/// Event fired when the frame is laid out. The header is moved to the
/// `Transmitting` state.
#[derive(Debug)]
pub(crate) struct FrameReadyEvent {
    pub header: FrameHeader,
}

// FrameSentEvent ==============================================================

/// Event fired when the last frame byte has been written. It triggers a
/// transition to the `AwaitingChecksum` state.
#[derive(Debug)]
pub(crate) struct FrameSentEvent {}

// ChecksumEvent ===============================================================

/// Event fired once the device checksum has been received and compared. It
/// triggers a transition to the `Resetting` state.
#[derive(Debug)]
pub(crate) struct ChecksumEvent {}

// ResetSentEvent ==============================================================

/// Event fired once the `RESET` command has been written. It triggers a
/// transition to the `AwaitingResult` state.
#[derive(Debug)]
pub(crate) struct ResetSentEvent {}

// ResultEvent =================================================================

/// Event fired once the program results have been received and checked
/// against the expectation. It triggers a transition to the
/// `AwaitingFinalReady` state.
#[derive(Debug)]
pub(crate) struct ResultEvent {}

// DoneEvent ===================================================================

/// Event fired when the session is over and triggering a transition to the
/// `Done` state.
///
/// This event can happen at any state, either after the final `READY` was
/// read, or because of an error: an I/O failure on the channel, an image too
/// large to frame, or a mismatch in strict mode.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    /// The error that ended the session early, if any.
    pub error: Option<LoaderError>,
}
impl DoneEvent {
    pub fn completed() -> Self {
        DoneEvent { error: None }
    }

    pub fn failed(error: impl Into<LoaderError>) -> Self {
        DoneEvent {
            error: Some(error.into()),
        }
    }
}

// ExitEvent ===================================================================

/// The last event that can be triggered in the loader protocol state machine
/// and will result in the event loop terminating, handing back the session
/// report (or the error) to the caller that started the state machine.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub error: Option<LoaderError>,
}

// Events enum ==================================================================

/// Events that can be triggered within the loader protocol state machine of
/// `loadcom`.
///
/// Each possible value holds an `event`, which in turn may hold additional data
/// for the state transition. Such data is passed by the origin state for
/// potential use by the target state.
#[derive(Debug)]
pub(crate) enum Event {
    LoadSent(LoadSentEvent),
    Ready(ReadyEvent),
    FrameReady(FrameReadyEvent),
    FrameSent(FrameSentEvent),
    Checksum(ChecksumEvent),
    ResetSent(ResetSentEvent),
    ResultReceived(ResultEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
