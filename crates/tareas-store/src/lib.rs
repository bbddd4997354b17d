//! Credential store used by the tareas daemon.
//!
//! The daemon treats credential storage as an external collaborator reached
//! through two operations: create a credential and verify one. Both are
//! expressed by the [`CredentialStore`] trait. Implementations must be safe to
//! call from many threads at once and must make "create if absent" atomic, so
//! two concurrent registrations of the same username yield exactly one
//! success.
//!
//! Two backends are provided:
//!
//! - [`MemoryCredentialStore`] keeps records in a mutex-guarded map and is
//!   used when no database is configured.
//! - [`SqliteCredentialStore`] persists records in a `usuarios` table whose
//!   `UNIQUE` username column enforces the conflict check.
//!
//! Passwords are never stored in clear; see [`PasswordHasher`].

mod errors;
mod hash;
mod memory;
mod sqlite;

use std::sync::Arc;

pub use errors::{CreateError, HashError, StoreError};
pub use hash::{DEFAULT_ITERATIONS, PasswordHasher, verify_password};
pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// Capability interface over the credential backing store.
pub trait CredentialStore: Send + Sync {
    /// Creates a credential for `username` unless one already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CreateError::MissingFields`] when either value is empty,
    /// [`CreateError::AlreadyExists`] when the username is taken, and
    /// [`CreateError::Store`] when the backend fails.
    fn create(&self, username: &str, password: &str) -> Result<(), CreateError>;

    /// Returns `true` iff a credential exists for `username` and `password`
    /// matches it. Unknown users and wrong passwords both yield `false`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend cannot be queried or holds
    /// an unreadable record.
    fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError>;
}

impl<T> CredentialStore for Arc<T>
where
    T: CredentialStore + ?Sized,
{
    fn create(&self, username: &str, password: &str) -> Result<(), CreateError> {
        (**self).create(username, password)
    }

    fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        (**self).verify(username, password)
    }
}

/// Rejects registrations lacking a usable username or password.
fn require_fields(username: &str, password: &str) -> Result<(), CreateError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(CreateError::MissingFields);
    }
    Ok(())
}
