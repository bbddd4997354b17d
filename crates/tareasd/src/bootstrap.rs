//! Daemon bootstrap orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tareas_config::{Config, ConfigError};
use tareas_store::{
    CredentialStore, MemoryCredentialStore, PasswordHasher, SqliteCredentialStore, StoreError,
};
use thiserror::Error;

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Populates the process environment before [`ConfigLoader::load`] runs.
    ///
    /// # Errors
    ///
    /// Returns the `.env` error when a file exists but cannot be read.
    fn prepare_environment(&self) -> Result<(), dotenvy::Error> {
        Ok(())
    }

    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads `.env` and then delegates to [`Config::load`].
#[derive(Debug, Default, Clone)]
pub struct SystemConfigLoader {
    env_file: Option<PathBuf>,
}

impl SystemConfigLoader {
    /// Reads `path` instead of searching for `.env` from the working directory.
    #[must_use]
    pub fn with_env_file(path: impl Into<PathBuf>) -> Self {
        Self {
            env_file: Some(path.into()),
        }
    }
}

impl ConfigLoader for SystemConfigLoader {
    fn prepare_environment(&self) -> Result<(), dotenvy::Error> {
        // Values already present in the environment win over the file.
        let loaded = match &self.env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(drop),
        };
        match loaded {
            Err(error) if error.not_found() => Ok(()),
            other => other,
        }
    }

    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Opens the credential store the configuration asks for.
pub trait StoreProvider: Send + Sync {
    /// Returns a shared handle to the store.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend cannot be opened.
    fn open(&self, config: &Config) -> Result<Arc<dyn CredentialStore>, StoreError>;
}

/// Provider that opens SQLite when `database_path` is set and an in-memory
/// store otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfiguredStoreProvider;

impl StoreProvider for ConfiguredStoreProvider {
    fn open(&self, config: &Config) -> Result<Arc<dyn CredentialStore>, StoreError> {
        let hasher = PasswordHasher::new(config.hash_iterations())?;
        Ok(match config.database_path() {
            Some(path) => Arc::new(SqliteCredentialStore::open(path.as_std_path(), hasher)?),
            None => Arc::new(MemoryCredentialStore::new(hasher)),
        })
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A `.env` file exists but could not be applied.
    #[error("failed to read environment file: {source}")]
    Environment {
        /// Underlying dotenv error.
        #[source]
        source: dotenvy::Error,
    },
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    Invalid {
        /// Rejected value.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The credential store could not be opened.
    #[error("failed to open credential store: {source}")]
    Store {
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    store: Arc<dyn CredentialStore>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the credential store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    /// Settings of the telemetry subscriber in effect.
    #[must_use]
    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Reporter receiving the remaining lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads and validates configuration, installs telemetry, then asks
/// `provider` for the credential store.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered; the reporter has already
/// been told about it.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    provider: &dyn StoreProvider,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match bootstrap_steps(loader, provider) {
        Ok((config, store, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                store,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn bootstrap_steps(
    loader: &dyn ConfigLoader,
    provider: &dyn StoreProvider,
) -> Result<(Config, Arc<dyn CredentialStore>, TelemetryHandle), BootstrapError> {
    loader
        .prepare_environment()
        .map_err(|source| BootstrapError::Environment { source })?;
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::Invalid { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let store = provider
        .open(&config)
        .map_err(|source| BootstrapError::Store { source })?;
    Ok((config, store, telemetry))
}
