//! Test harness utilities shared by the behavioural suites.

mod client;
mod config_loader;
mod reporter;
mod shutdown;
mod store;

pub use client::JsonLineClient;
pub use config_loader::{FailingConfigLoader, test_config};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::{TEST_DRAIN_TIMEOUT, TestShutdownSignal};
pub use store::{GatedStoreProvider, StoreGate};
