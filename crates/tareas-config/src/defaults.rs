/// Default bind host; loopback keeps a fresh install off the network.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port for the task server.
pub const DEFAULT_PORT: u16 = 6000;

/// Default number of worker threads executing routed messages.
pub const DEFAULT_WORKERS: usize = 8;

/// Default listen backlog handed to the kernel.
pub const DEFAULT_BACKLOG: u32 = 100;

/// Default cap on undelimited bytes buffered per connection (2 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 2 * 1024 * 1024;

/// Default PBKDF2 iteration count for stored passwords.
pub const DEFAULT_HASH_ITERATIONS: u32 = 600_000;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned bind host used where allocation is required (e.g. serde).
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default TCP port, as a serde default function.
#[must_use]
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default worker pool size, as a serde default function.
#[must_use]
pub const fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Default listen backlog, as a serde default function.
#[must_use]
pub const fn default_backlog() -> u32 {
    DEFAULT_BACKLOG
}

/// Default per-connection buffer cap, as a serde default function.
#[must_use]
pub const fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

/// Default PBKDF2 iteration count, as a serde default function.
#[must_use]
pub const fn default_hash_iterations() -> u32 {
    DEFAULT_HASH_ITERATIONS
}

/// Default log filter expression used by the daemon.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}
