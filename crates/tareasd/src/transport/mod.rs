//! TCP listener for the daemon.
//!
//! The transport module binds the configured endpoint and accepts connections
//! in a background thread, handing each one to a [`ConnectionHandler`] on its
//! own session thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::listener::ListenerHandle;
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, DrainingHandler, wait_for_count};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
