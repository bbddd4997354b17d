//! Process-local credential store.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use tracing::debug;

use crate::errors::{CreateError, StoreError};
use crate::hash::{PasswordHasher, verify_password};
use crate::{CredentialStore, STORE_TARGET, require_fields};

/// Credential store backed by a mutex-guarded map. Records are lost when the
/// process exits.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    hasher: PasswordHasher,
    records: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Builds an empty store using `hasher` for new credentials.
    #[must_use]
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            hasher,
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn create(&self, username: &str, password: &str) -> Result<(), CreateError> {
        require_fields(username, password)?;
        // Hash outside the lock; PBKDF2 is deliberately slow.
        let encoded = self.hasher.hash(password)?;
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        match records.entry(username.to_owned()) {
            Entry::Occupied(_) => Err(CreateError::AlreadyExists {
                username: username.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(encoded);
                debug!(target: STORE_TARGET, username, "credential created");
                Ok(())
            }
        }
    }

    fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let stored = {
            let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
            records.get(username).cloned()
        };
        match stored {
            Some(encoded) => Ok(verify_password(password, &encoded)?),
            None => Ok(false),
        }
    }
}
