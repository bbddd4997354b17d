//! Process lifecycle: launch, serve until a shutdown signal, then drain.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_daemon;
pub use shutdown::{
    DEFAULT_DRAIN_TIMEOUT, ShutdownCause, ShutdownError, ShutdownRequest, ShutdownSignal,
    SystemShutdownSignal,
};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
