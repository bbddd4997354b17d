//! Structured telemetry initialisation for the daemon.
//!
//! Events go to stderr through a single global registry: an [`EnvFilter`]
//! built from `log_filter` in front of a formatting layer chosen by
//! `log_format`. Only the first successful call installs anything; the
//! settings it used are kept so later callers can see what is in effect.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use tareas_config::{Config, LogFormat};

static INSTALLED: OnceCell<TelemetryHandle> = OnceCell::new();

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Settings of the subscriber that is actually installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
    filter: String,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Filter directives of the installed subscriber.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber was installed outside this module.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Installs the global subscriber on first use and reports what is in effect.
///
/// Once a subscriber is installed, `config` is ignored and the handle of
/// the first installation is returned.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the filter does not parse or a foreign
/// subscriber already owns the global slot.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(Clone::clone)
}

fn install(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let filter = build_filter(config.log_filter())?;
    tracing_subscriber::registry()
        .with(output_layer(config.log_format()))
        .with(filter)
        .try_init()?;
    Ok(TelemetryHandle {
        format: config.log_format(),
        filter: config.log_filter().to_owned(),
    })
}

fn build_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn output_layer(format: LogFormat) -> OutputLayer {
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}
