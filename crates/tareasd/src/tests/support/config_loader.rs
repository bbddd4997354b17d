//! Configuration sources for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tareas_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loopback configuration on an ephemeral port with cheap password hashing.
#[must_use]
pub fn test_config(workers: usize) -> Config {
    Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        workers,
        hash_iterations: 1_000,
        ..Config::default()
    }
}

/// Loader that fails by passing an unparsable CLI flag.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("tareasd"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
