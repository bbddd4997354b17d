//! Newline-delimited JSON task server.
//!
//! `tareasd` listens on a TCP endpoint configured via [`tareas_config`],
//! accepts any number of concurrent connections, and answers one JSON
//! response per JSON request line. Each connection gets its own session
//! thread; the actual work of every request runs on a fixed-size
//! [`WorkerPool`] shared by all sessions, so execution stays bounded however
//! many clients are connected.
//!
//! Requests name one of four operations:
//!
//! - `TASK` runs a pure computation (`sum`, `upper`, `lower`) from [`tasks`].
//! - `REGISTRO` creates a credential in the [`tareas_store::CredentialStore`].
//! - `LOGIN` verifies a credential.
//! - `GET_TAREAS_HTML` verifies a credential and returns a welcome fragment.
//!
//! The binary entry point is [`run_daemon`], which loads configuration,
//! initialises structured telemetry, opens the credential store, starts the
//! listener, and drains everything when a termination signal arrives. Health
//! reporting hooks emit a structured event at each lifecycle stage.

mod bootstrap;
pub mod dispatch;
mod health;
pub mod pool;
mod process;
pub mod tasks;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, ConfiguredStoreProvider, Daemon, StaticConfigLoader,
    StoreProvider, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use pool::{PoolError, WorkerPool};
pub use process::{
    DEFAULT_DRAIN_TIMEOUT, LaunchError, ShutdownCause, ShutdownError, ShutdownRequest,
    ShutdownSignal, SystemShutdownSignal, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
