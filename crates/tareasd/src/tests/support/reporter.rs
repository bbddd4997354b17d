//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tareas_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::process::ShutdownRequest;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady(SocketAddr),
    ShutdownRequested(ShutdownRequest),
    ShutdownCompleted,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }

    /// Polls the recorded events until `select` picks one out.
    pub fn wait_for<T>(
        &self,
        timeout: Duration,
        select: impl Fn(&HealthEvent) -> Option<T>,
    ) -> Option<T> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let found = self.events().iter().find_map(&select);
            if found.is_some() {
                return found;
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    /// Waits for the daemon to announce its bound address.
    pub fn wait_for_listener(&self, timeout: Duration) -> Option<SocketAddr> {
        self.wait_for(timeout, |event| match event {
            HealthEvent::ListenerReady(addr) => Some(*addr),
            _ => None,
        })
    }

    /// Waits for the daemon to acknowledge a shutdown request.
    pub fn wait_for_shutdown_request(&self, timeout: Duration) -> Option<ShutdownRequest> {
        self.wait_for(timeout, |event| match event {
            HealthEvent::ShutdownRequested(request) => Some(*request),
            _ => None,
        })
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, addr: SocketAddr) {
        self.record(HealthEvent::ListenerReady(addr));
    }

    fn shutdown_requested(&self, request: &ShutdownRequest) {
        self.record(HealthEvent::ShutdownRequested(*request));
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}
