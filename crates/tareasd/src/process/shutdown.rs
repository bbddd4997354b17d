//! Shutdown notification and the drain budget that comes with it.
//!
//! A [`ShutdownSignal`] blocks the launch thread until the daemon should stop,
//! then hands back a [`ShutdownRequest`] saying why and how long open
//! sessions may take to finish their current message.

use std::fmt;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level::signal_name;
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

/// Budget for sessions to finish once the listener stops accepting.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns a [`ShutdownError`] when the notification source fails.
    fn wait(&self) -> Result<ShutdownRequest, ShutdownError>;
}

/// What ended the serving phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A termination signal, by number.
    Signal(i32),
    /// An in-process request, or the signal source closing.
    Requested,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(number) => match signal_name(*number) {
                Some(name) => f.write_str(name),
                None => write!(f, "signal {number}"),
            },
            Self::Requested => f.write_str("requested"),
        }
    }
}

/// A decision to stop serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    cause: ShutdownCause,
    drain_timeout: Duration,
}

impl ShutdownRequest {
    /// Builds a request that allows sessions `drain_timeout` to finish.
    #[must_use]
    pub fn new(cause: ShutdownCause, drain_timeout: Duration) -> Self {
        Self {
            cause,
            drain_timeout,
        }
    }

    /// Why the daemon is stopping.
    #[must_use]
    pub fn cause(&self) -> ShutdownCause {
        self.cause
    }

    /// How long open sessions may keep running.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another thread panicked while waiting on the same signal source.
    #[error("shutdown signal source poisoned")]
    Poisoned,
}

/// Waits for SIGTERM, SIGINT, SIGQUIT or SIGHUP.
///
/// Handlers are registered by [`SystemShutdownSignal::install`], before the
/// daemon binds, so a signal that arrives during startup is queued rather
/// than killing the process.
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
    drain_timeout: Duration,
}

impl SystemShutdownSignal {
    /// Registers the termination signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] if registration fails.
    pub fn install(drain_timeout: Duration) -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self {
            signals: Mutex::new(signals),
            drain_timeout,
        })
    }
}

impl fmt::Debug for SystemShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemShutdownSignal")
            .field("drain_timeout", &self.drain_timeout)
            .finish_non_exhaustive()
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<ShutdownRequest, ShutdownError> {
        let mut signals = self
            .signals
            .lock()
            .map_err(|_| ShutdownError::Poisoned)?;
        let cause = signals
            .forever()
            .next()
            .map_or(ShutdownCause::Requested, ShutdownCause::Signal);
        debug!(target: PROCESS_TARGET, %cause, "shutdown signal received");
        Ok(ShutdownRequest::new(cause, self.drain_timeout))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use signal_hook::low_level::raise;

    use super::*;

    #[rstest]
    #[case::term(ShutdownCause::Signal(SIGTERM), "SIGTERM")]
    #[case::hangup(ShutdownCause::Signal(SIGHUP), "SIGHUP")]
    #[case::requested(ShutdownCause::Requested, "requested")]
    fn causes_render_by_name(#[case] cause: ShutdownCause, #[case] expected: &str) {
        assert_eq!(cause.to_string(), expected);
    }

    #[test]
    fn signals_raised_after_install_are_delivered_with_the_budget() {
        let budget = Duration::from_millis(250);
        let signal = SystemShutdownSignal::install(budget).expect("install handlers");
        raise(SIGHUP).expect("raise SIGHUP");
        let request = signal.wait().expect("wait for signal");
        assert_eq!(
            request,
            ShutdownRequest::new(ShutdownCause::Signal(SIGHUP), budget)
        );
    }
}
