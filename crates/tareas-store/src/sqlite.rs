//! SQLite-backed credential store.
//!
//! The schema is created on open. Uniqueness of usernames is enforced by the
//! database, so concurrent registrations race on the `UNIQUE` constraint
//! rather than on an application-level check.

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{debug, info};

use crate::errors::{CreateError, StoreError};
use crate::hash::{PasswordHasher, verify_password};
use crate::{CredentialStore, STORE_TARGET, require_fields};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS usuarios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";
const SQL_INSERT: &str = "INSERT INTO usuarios (username, password_hash) VALUES (?1, ?2)";
const SQL_SELECT_HASH: &str = "SELECT password_hash FROM usuarios WHERE username = ?1";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Credential store persisted in a SQLite database.
#[derive(Debug)]
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
    hasher: PasswordHasher,
}

impl SqliteCredentialStore {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the parent directory cannot be created or
    /// SQLite fails to open the file or apply the schema.
    pub fn open(path: &Path, hasher: PasswordHasher) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        info!(
            target: STORE_TARGET,
            path = %path.display(),
            "opened credential database"
        );
        Self::with_connection(conn, hasher)
    }

    #[cfg(test)]
    fn open_in_memory(hasher: PasswordHasher) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        debug!(target: STORE_TARGET, "opened in-memory credential database");
        Self::with_connection(conn, hasher)
    }

    fn with_connection(conn: Connection, hasher: PasswordHasher) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            hasher,
        })
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn create(&self, username: &str, password: &str) -> Result<(), CreateError> {
        require_fields(username, password)?;
        let encoded = self.hasher.hash(password)?;
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        match conn.execute(SQL_INSERT, params![username, encoded]) {
            Ok(_) => {
                debug!(target: STORE_TARGET, username, "credential created");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(CreateError::AlreadyExists {
                    username: username.to_owned(),
                })
            }
            Err(error) => Err(StoreError::Database(error).into()),
        }
    }

    fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let stored: Option<String> = {
            let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
            conn.query_row(SQL_SELECT_HASH, params![username], |row| row.get(0))
                .optional()?
        };
        match stored {
            Some(encoded) => Ok(verify_password(password, &encoded)?),
            None => Ok(false),
        }
    }
}
