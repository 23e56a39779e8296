// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for handling shutdown signals during a test run.

use crate::errors::SignalHandlerSetupError;

/// The kind of signal handling to set up for a test run.
///
/// A `SignalHandlerKind` is passed into
/// [`PyUnitRunnerBuilder::build`](crate::runner::PyUnitRunnerBuilder::build).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalHandlerKind {
    /// The standard signal handler. Captures interrupt and termination
    /// signals depending on the platform.
    Standard,

    /// A no-op signal handler that never fires. Useful for tests.
    Noop,
}

impl SignalHandlerKind {
    pub(crate) fn build(self) -> Result<SignalHandler, SignalHandlerSetupError> {
        match self {
            Self::Standard => SignalHandler::new(),
            Self::Noop => Ok(SignalHandler::noop()),
        }
    }
}

/// The shutdown event that cancelled a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ShutdownEvent {
    /// An interrupt (on Unix, SIGINT / Ctrl-C).
    Interrupt,

    /// A termination signal (on Unix, SIGTERM).
    Term,

    /// A hangup (on Unix, SIGHUP).
    Hangup,
}

impl ShutdownEvent {
    /// A human-readable name for this event.
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownEvent::Interrupt => "interrupt",
            ShutdownEvent::Term => "termination signal",
            ShutdownEvent::Hangup => "hangup",
        }
    }
}

/// The signal handler implementation.
#[derive(Debug)]
pub(crate) struct SignalHandler {
    signals: Option<imp::Signals>,
}

impl SignalHandler {
    /// Creates a new `SignalHandler` that handles Ctrl-C and other signals.
    fn new() -> Result<Self, SignalHandlerSetupError> {
        let signals = imp::Signals::new()?;
        Ok(Self {
            signals: Some(signals),
        })
    }

    /// Creates a new `SignalHandler` that does nothing.
    fn noop() -> Self {
        Self { signals: None }
    }

    /// Waits for the next shutdown event. For a no-op handler this pends
    /// forever, so it can always sit in a `select!` branch.
    pub(crate) async fn recv(&mut self) -> ShutdownEvent {
        match &mut self.signals {
            Some(signals) => signals.recv().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(unix)]
mod imp {
    use super::ShutdownEvent;
    use tokio::signal::unix::{Signal, SignalKind, signal};

    /// Signals for SIGINT, SIGTERM and SIGHUP on Unix.
    #[derive(Debug)]
    pub(super) struct Signals {
        sigint: SignalWithDone,
        sigterm: SignalWithDone,
        sighup: SignalWithDone,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            let sigint = SignalWithDone::new(SignalKind::interrupt())?;
            let sigterm = SignalWithDone::new(SignalKind::terminate())?;
            let sighup = SignalWithDone::new(SignalKind::hangup())?;
            Ok(Self {
                sigint,
                sigterm,
                sighup,
            })
        }

        pub(super) async fn recv(&mut self) -> ShutdownEvent {
            loop {
                tokio::select! {
                    recv = self.sigint.signal.recv(), if !self.sigint.done => {
                        match recv {
                            Some(()) => break ShutdownEvent::Interrupt,
                            None => self.sigint.done = true,
                        }
                    }
                    recv = self.sigterm.signal.recv(), if !self.sigterm.done => {
                        match recv {
                            Some(()) => break ShutdownEvent::Term,
                            None => self.sigterm.done = true,
                        }
                    }
                    recv = self.sighup.signal.recv(), if !self.sighup.done => {
                        match recv {
                            Some(()) => break ShutdownEvent::Hangup,
                            None => self.sighup.done = true,
                        }
                    }
                    else => std::future::pending().await,
                }
            }
        }
    }

    #[derive(Debug)]
    struct SignalWithDone {
        signal: Signal,
        done: bool,
    }

    impl SignalWithDone {
        fn new(kind: SignalKind) -> std::io::Result<Self> {
            let signal = signal(kind)?;
            Ok(Self {
                signal,
                done: false,
            })
        }
    }
}

#[cfg(windows)]
mod imp {
    use super::ShutdownEvent;
    use tokio::signal::windows::{CtrlC, ctrl_c};

    #[derive(Debug)]
    pub(super) struct Signals {
        ctrl_c: CtrlC,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            let ctrl_c = ctrl_c()?;
            Ok(Self { ctrl_c })
        }

        pub(super) async fn recv(&mut self) -> ShutdownEvent {
            match self.ctrl_c.recv().await {
                Some(()) => ShutdownEvent::Interrupt,
                // The stream has closed; there is nothing left to wait for.
                None => std::future::pending().await,
            }
        }
    }
}
