//! Error types for credential store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the backing store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported an error.
    #[error("credential database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The directory holding the database file could not be created.
    #[error("failed to create database directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A thread panicked while holding the store lock.
    #[error("credential store lock poisoned")]
    Poisoned,
    /// Hashing or decoding a stored password failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Outcomes of a registration that did not create a credential.
#[derive(Debug, Error)]
pub enum CreateError {
    /// Username or password was empty.
    #[error("username and password are required")]
    MissingFields,
    /// A credential already exists for the username.
    #[error("user '{username}' already exists")]
    AlreadyExists {
        /// Username that was already taken.
        username: String,
    },
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<HashError> for CreateError {
    fn from(source: HashError) -> Self {
        Self::Store(StoreError::Hash(source))
    }
}

/// Errors raised while hashing or checking passwords.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HashError {
    /// The system random source could not produce a salt.
    #[error("system random source failed to produce a salt")]
    Random,
    /// A stored hash did not match the expected encoding.
    #[error("stored password hash is malformed")]
    Malformed,
    /// The hasher was configured with zero iterations.
    #[error("password hash iteration count must be non-zero")]
    ZeroIterations,
}
