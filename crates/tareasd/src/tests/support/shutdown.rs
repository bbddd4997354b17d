//! Shutdown signal that scenarios trigger by hand.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::process::{ShutdownCause, ShutdownError, ShutdownRequest, ShutdownSignal};

/// Drain budget granted when a scenario triggers shutdown.
pub const TEST_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
pub struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<ShutdownRequest, ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(ShutdownRequest::new(
            ShutdownCause::Requested,
            TEST_DRAIN_TIMEOUT,
        ))
    }
}
