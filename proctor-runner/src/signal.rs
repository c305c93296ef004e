// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for turning process signals into a global stop request.

use crate::{errors::SignalHandlerSetupError, runner::CancellationToken};
use tracing::info;

/// The kind of signal handling to set up for a [`TimeoutEnforcer`].
///
/// A `SignalHandlerKind` can be passed into
/// [`TimeoutEnforcerBuilder::build`](crate::runner::TimeoutEnforcerBuilder::build).
///
/// [`TimeoutEnforcer`]: crate::runner::TimeoutEnforcer
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SignalHandlerKind {
    /// The standard signal handler. Interrupt and termination signals request a global stop.
    Standard,

    /// A no-op signal handler. Useful for tests.
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

/// The signal handler implementation.
#[derive(Debug)]
pub(crate) struct SignalHandler {
    signals: Option<imp::Signals>,
}

impl SignalHandler {
    /// Creates a new `SignalHandler` that handles Ctrl-C and other signals.
    #[cfg(any(unix, windows))]
    pub(crate) fn new() -> Result<Self, SignalHandlerSetupError> {
        let signals = imp::Signals::new()?;
        Ok(Self {
            signals: Some(signals),
        })
    }

    /// Creates a new `SignalHandler` that does nothing.
    pub(crate) fn noop() -> Self {
        Self { signals: None }
    }

    pub(crate) async fn recv(&mut self) -> Option<ShutdownEvent> {
        match &mut self.signals {
            Some(signals) => signals.recv().await,
            None => None,
        }
    }

    /// Cancels `stop` whenever a shutdown signal arrives, until every signal stream is exhausted.
    pub(crate) async fn forward_to(mut self, stop: CancellationToken) {
        while let Some(event) = self.recv().await {
            info!(?event, "received shutdown signal, stopping invocations");
            stop.cancel();
        }
    }
}

#[cfg(unix)]
mod imp {
    use super::*;
    use tokio::signal::unix::{Signal, SignalKind, signal};

    /// SIGINT, SIGHUP and SIGTERM streams. A stream is dropped once it is exhausted.
    #[derive(Debug)]
    pub(super) struct Signals {
        interrupt: Option<Signal>,
        hangup: Option<Signal>,
        terminate: Option<Signal>,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            Ok(Self {
                interrupt: Some(signal(SignalKind::interrupt())?),
                hangup: Some(signal(SignalKind::hangup())?),
                terminate: Some(signal(SignalKind::terminate())?),
            })
        }

        pub(super) async fn recv(&mut self) -> Option<ShutdownEvent> {
            loop {
                let (event, received) = tokio::select! {
                    received = next(&mut self.interrupt), if self.interrupt.is_some() => {
                        (ShutdownEvent::Interrupt, received)
                    }
                    received = next(&mut self.hangup), if self.hangup.is_some() => {
                        (ShutdownEvent::Hangup, received)
                    }
                    received = next(&mut self.terminate), if self.terminate.is_some() => {
                        (ShutdownEvent::Term, received)
                    }
                    else => return None,
                };
                if received {
                    return Some(event);
                }
            }
        }
    }

    /// Waits for the next signal on `slot`, clearing it if the stream ends.
    async fn next(slot: &mut Option<Signal>) -> bool {
        let received = match slot {
            Some(signal) => signal.recv().await.is_some(),
            None => false,
        };
        if !received {
            *slot = None;
        }
        received
    }
}

#[cfg(windows)]
mod imp {
    use super::*;
    use tokio::signal::windows::{CtrlC, ctrl_c};

    #[derive(Debug)]
    pub(super) struct Signals {
        ctrl_c: Option<CtrlC>,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            Ok(Self {
                ctrl_c: Some(ctrl_c()?),
            })
        }

        pub(super) async fn recv(&mut self) -> Option<ShutdownEvent> {
            let received = self.ctrl_c.as_mut()?.recv().await;
            if received.is_none() {
                self.ctrl_c = None;
            }
            received.map(|()| ShutdownEvent::Interrupt)
        }
    }
}

/// A signal event that requests a global stop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ShutdownEvent {
    #[cfg(unix)]
    Hangup,
    #[cfg(unix)]
    Term,
    Interrupt,
}
