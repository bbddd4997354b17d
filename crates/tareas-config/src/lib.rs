//! Configuration shared by the tareas daemon and its tooling.
//!
//! [`Config`] is the single explicit configuration value for the process. It
//! is resolved once at startup from layered sources (defaults, a config file
//! named by `--config-path` or `TAREAS_CONFIG_PATH`, `TAREAS_*` environment
//! variables, then CLI flags) and passed by reference to the components that
//! need it. Nothing downstream reads process state directly.

mod address;
mod defaults;
mod logging;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use address::ListenAddress;
pub use defaults::{
    DEFAULT_BACKLOG, DEFAULT_HASH_ITERATIONS, DEFAULT_HOST, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PORT, DEFAULT_WORKERS, default_backlog,
    default_hash_iterations, default_host, default_log_filter, default_log_filter_string,
    default_log_format, default_max_message_bytes, default_port, default_workers,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TAREAS")]
#[serde(default)]
pub struct Config {
    /// Host name or IP address the listener binds to.
    #[serde(default = "default_host")]
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port the listener binds to.
    #[serde(default = "default_port")]
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Number of worker threads executing routed messages.
    #[serde(default = "default_workers")]
    #[ortho_config(default = DEFAULT_WORKERS)]
    pub workers: usize,
    /// Maximum queue of pending connections handed to `listen(2)`.
    #[serde(default = "default_backlog")]
    #[ortho_config(default = DEFAULT_BACKLOG)]
    pub backlog: u32,
    /// Maximum undelimited bytes buffered per connection.
    #[serde(default = "default_max_message_bytes")]
    #[ortho_config(default = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,
    /// SQLite database holding credentials; unset keeps them in memory.
    #[serde(default)]
    pub database_path: Option<Utf8PathBuf>,
    /// PBKDF2 iterations applied to newly registered passwords.
    #[serde(default = "default_hash_iterations")]
    #[ortho_config(default = DEFAULT_HASH_ITERATIONS)]
    pub hash_iterations: u32,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            backlog: DEFAULT_BACKLOG,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            database_path: None,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Checks values that parse correctly but cannot run a daemon.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.backlog == 0 {
            return Err(ConfigError::ZeroBacklog);
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::ZeroMessageLimit);
        }
        if self.hash_iterations == 0 {
            return Err(ConfigError::ZeroHashIterations);
        }
        Ok(())
    }

    /// Endpoint the listener binds to.
    #[must_use]
    pub fn listen_address(&self) -> ListenAddress {
        ListenAddress::new(self.host.trim(), self.port)
    }

    /// Worker pool capacity.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Listen backlog.
    #[must_use]
    pub const fn backlog(&self) -> u32 {
        self.backlog
    }

    /// Per-connection buffer cap in bytes.
    #[must_use]
    pub const fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Credential database path, if persistence is configured.
    #[must_use]
    pub fn database_path(&self) -> Option<&camino::Utf8Path> {
        self.database_path.as_deref()
    }

    /// PBKDF2 iteration count for new credentials.
    #[must_use]
    pub const fn hash_iterations(&self) -> u32 {
        self.hash_iterations
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Configuration values rejected by [`Config::validate`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The bind host was empty or whitespace.
    #[error("bind host must not be empty")]
    EmptyHost,
    /// The worker pool would have no capacity.
    #[error("worker pool size must be at least 1")]
    ZeroWorkers,
    /// The listen backlog was zero.
    #[error("connection backlog must be at least 1")]
    ZeroBacklog,
    /// The per-connection buffer cap was zero.
    #[error("maximum message size must be at least 1 byte")]
    ZeroMessageLimit,
    /// Passwords would be stored without key stretching.
    #[error("password hash iterations must be at least 1")]
    ZeroHashIterations,
}
