//! `loadcom` loader protocol state machine.
//!
//! One session uploads one program: it asks the bootloader to load, sends a
//! single frame, has the device run it and collects the result. The host
//! never races ahead of the device: every byte written is followed by the
//! pacing delay and every response is a fixed-size blocking read.
//!
//! The following state diagram summarizes the different states and transitions
//! of a session (any state can also go straight to `Done` on a channel error,
//! or on a mismatch in strict mode):
//!
//! ```text
//!          START
//!            |
//!            v
//!       .---------.   LOAD\r\n   .---------------.  READY\r\n  .---------.
//!       |  Idle   |------------->| AwaitingReady |------------>| Framing |
//!       '---------'              '---------------'             '---------'
//!                                                                   |
//!                                                          len(LE16)|start(LE16)
//!                                                                   v
//!  .------------.   checksum   .------------------.  frame   .--------------.
//!  | Resetting  |<-------------| AwaitingChecksum |<---------| Transmitting |
//!  '------------'              '------------------'          '--------------'
//!        |
//!        | RESET\r\n
//!        v
//!  .----------------.  result[2]  .--------------------.  READY\r\n  .------.
//!  | AwaitingResult |------------>| AwaitingFinalReady |----------->| Done |
//!  '----------------'             '--------------------'            '------'
//! ```

use super::events::*;
use super::states::*;
use crate::error::Result;
use crate::program::{ExpectedResult, ProgramImage};
use crate::settings::Settings;
use crate::utils::Channel;
use crate::Checksum;

// =============================================================================
// Public Interface
// =============================================================================

/// What happened during a session that went all the way to the end.
///
/// In lenient mode every comparison is recorded here and nothing else; the
/// operator (or the caller) decides what to make of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// The first `READY` matched.
    pub ready: bool,
    /// Number of frame bytes written (header included).
    pub bytes_sent: usize,
    /// Checksum accumulated over the frame bytes sent.
    pub checksum_sent: u8,
    /// Checksum reported by the device.
    pub checksum_received: u8,
    pub checksum_ok: bool,
    /// The two bytes reported by the program after `RESET`.
    pub results: [u8; 2],
    /// `results[0]` equals the first expected byte.
    pub passed: bool,
    /// The final `READY` matched.
    pub final_ready: bool,
}

/// Represents the `loadcom` loader protocol state machine. Use the
/// `factory()` function to get an instance then run it by calling its `run()`
/// method.
pub struct LoaderSession {
    sm: LoaderStates,
}
impl LoaderSession {
    /// The event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set. The session report is returned if the
    /// protocol ran to completion, or the error that stopped it.
    pub fn run(self) -> Result<SessionReport> {
        let mut sm = self.sm;
        loop {
            sm = match sm.step() {
                LoaderStates::Done(done) if done.state.should_exit => return done.finish(),
                next => next,
            };
        }
    }
}

/// Factory function for the `loadcom` loader protocol state machine. Use it to
/// get an instance of the state machine, which you can run by invoking its
/// `run()` method.
///
/// The session takes exclusive ownership of `channel`.
pub fn factory(
    settings: Settings,
    channel: Box<dyn Channel>,
    image: ProgramImage,
    expected: ExpectedResult,
) -> LoaderSession {
    LoaderSession {
        // The machine naturally starts in the `Idle` state.
        sm: LoaderStates::Idle(LoaderSM::new(
            settings,
            Session {
                channel,
                image,
                expected,
                checksum: Checksum::new(),
                report: SessionReport::default(),
            },
        )),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing `loadcom`'s loader protocol.
///
/// The settings and the session data are shared by all states and carried
/// along from one state to the next; only the current state is replaced on a
/// transition.
#[derive(Debug)]
struct LoaderSM<S: Runnable> {
    settings: Settings,
    session: Session,
    state: S,
}
impl<S: Runnable> LoaderSM<S> {
    fn run(&mut self) -> Event {
        self.state.run(&self.settings, &mut self.session)
    }

    /// Move to the state `T` built from `event`. Only transitions for which
    /// `T: From<E>` exists compile.
    fn transition<E, T>(self, event: E) -> LoaderSM<T>
    where
        T: Runnable + From<E>,
    {
        LoaderSM {
            settings: self.settings,
            session: self.session,
            state: event.into(),
        }
    }
}

/// The state machine starts in the `IdleState`.
impl LoaderSM<IdleState> {
    fn new(settings: Settings, session: Session) -> Self {
        LoaderSM {
            settings,
            session,
            state: IdleState {},
        }
    }
}

impl LoaderSM<DoneState> {
    fn finish(mut self) -> Result<SessionReport> {
        match self.state.error.take() {
            Some(e) => Err(e),
            None => Ok(self.session.report),
        }
    }
}

/// An enum wrapper around the states of the loader protocol state machine. It
/// provides a simpler and more intuitive model for manipulating states and
/// their transitions.
enum LoaderStates {
    Idle(LoaderSM<IdleState>),
    AwaitingReady(LoaderSM<AwaitingReadyState>),
    Framing(LoaderSM<FramingState>),
    Transmitting(LoaderSM<TransmittingState>),
    AwaitingChecksum(LoaderSM<AwaitingChecksumState>),
    Resetting(LoaderSM<ResettingState>),
    AwaitingResult(LoaderSM<AwaitingResultState>),
    AwaitingFinalReady(LoaderSM<AwaitingFinalReadyState>),
    Done(LoaderSM<DoneState>),
}
impl LoaderStates {
    /// The unit of work in the state machine event loop. It runs the current
    /// state and decides the next transition from the event it returns.
    fn step(self) -> Self {
        match self {
            LoaderStates::Idle(mut sm) => match sm.run() {
                Event::LoadSent(ev) => LoaderStates::AwaitingReady(sm.transition(ev)),
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::AwaitingReady(mut sm) => match sm.run() {
                Event::Ready(ev) => LoaderStates::Framing(sm.transition(ev)),
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::Framing(mut sm) => match sm.run() {
                Event::FrameReady(ev) => LoaderStates::Transmitting(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::Transmitting(mut sm) => match sm.run() {
                Event::FrameSent(ev) => LoaderStates::AwaitingChecksum(sm.transition(ev)),
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::AwaitingChecksum(mut sm) => match sm.run() {
                Event::Checksum(ev) => LoaderStates::Resetting(sm.transition(ev)),
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::Resetting(mut sm) => match sm.run() {
                Event::ResetSent(ev) => LoaderStates::AwaitingResult(sm.transition(ev)),
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::AwaitingResult(mut sm) => match sm.run() {
                Event::ResultReceived(ev) => LoaderStates::AwaitingFinalReady(sm.transition(ev)),
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::AwaitingFinalReady(mut sm) => match sm.run() {
                Event::Done(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            LoaderStates::Done(mut sm) => match sm.run() {
                Event::Exit(ev) => LoaderStates::Done(sm.transition(ev)),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<LoadSentEvent> for AwaitingReadyState {
    fn from(event: LoadSentEvent) -> AwaitingReadyState {
        AwaitingReadyState {
            header: event.header,
        }
    }
}

impl From<ReadyEvent> for FramingState {
    fn from(event: ReadyEvent) -> FramingState {
        FramingState {
            header: event.header,
        }
    }
}

impl From<FrameReadyEvent> for TransmittingState {
    fn from(event: FrameReadyEvent) -> TransmittingState {
        TransmittingState {
            header: event.header,
        }
    }
}

impl From<FrameSentEvent> for AwaitingChecksumState {
    fn from(_: FrameSentEvent) -> AwaitingChecksumState {
        AwaitingChecksumState {}
    }
}

impl From<ChecksumEvent> for ResettingState {
    fn from(_: ChecksumEvent) -> ResettingState {
        ResettingState {}
    }
}

impl From<ResetSentEvent> for AwaitingResultState {
    fn from(_: ResetSentEvent) -> AwaitingResultState {
        AwaitingResultState {}
    }
}

impl From<ResultEvent> for AwaitingFinalReadyState {
    fn from(_: ResultEvent) -> AwaitingFinalReadyState {
        AwaitingFinalReadyState {}
    }
}

impl From<DoneEvent> for DoneState {
    fn from(event: DoneEvent) -> DoneState {
        DoneState {
            error: event.error,
            should_exit: false,
        }
    }
}
impl From<ExitEvent> for DoneState {
    fn from(event: ExitEvent) -> DoneState {
        DoneState {
            error: event.error,
            should_exit: true,
        }
    }
}
