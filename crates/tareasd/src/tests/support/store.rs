//! Credential store doubles that let scenarios hold a request mid-flight.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tareas_config::Config;
use tareas_store::{CreateError, CredentialStore, StoreError};

use crate::bootstrap::StoreProvider;

#[derive(Debug, Default)]
struct GateState {
    entered: bool,
    released: bool,
}

/// Holds every `verify` call until [`StoreGate::release`] is called.
#[derive(Debug, Clone, Default)]
pub struct StoreGate {
    inner: Arc<(Mutex<GateState>, Condvar)>,
}

impl StoreGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until a `verify` call is being held, or `timeout` passes.
    pub fn wait_until_entered(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let state = lock.lock().expect("store gate mutex poisoned");
        let (state, _) = cvar
            .wait_timeout_while(state, timeout, |state| !state.entered)
            .expect("store gate mutex poisoned during wait");
        state.entered
    }

    pub fn release(&self) {
        let (lock, cvar) = &*self.inner;
        lock.lock().expect("store gate mutex poisoned").released = true;
        cvar.notify_all();
    }

    fn hold(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("store gate mutex poisoned");
        state.entered = true;
        cvar.notify_all();
        while !state.released {
            state = cvar
                .wait(state)
                .expect("store gate mutex poisoned during wait");
        }
    }
}

/// Accepts every credential, but only once the gate opens.
struct GatedStore {
    gate: StoreGate,
}

impl CredentialStore for GatedStore {
    fn create(&self, _username: &str, _password: &str) -> Result<(), CreateError> {
        Ok(())
    }

    fn verify(&self, _username: &str, _password: &str) -> Result<bool, StoreError> {
        self.gate.hold();
        Ok(true)
    }
}

/// Provider handing the daemon a store behind `gate`.
pub struct GatedStoreProvider {
    pub gate: StoreGate,
}

impl StoreProvider for GatedStoreProvider {
    fn open(&self, _config: &Config) -> Result<Arc<dyn CredentialStore>, StoreError> {
        Ok(Arc::new(GatedStore {
            gate: self.gate.clone(),
        }))
    }
}
