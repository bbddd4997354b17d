//! PBKDF2 password hashing.
//!
//! Hashes are self-describing strings of the form
//! `pbkdf2-sha256$<iterations>$<salt hex>$<derived key hex>`, so the iteration
//! count can be raised later without invalidating stored records.

use std::num::NonZeroU32;

use ring::digest::SHA256_OUTPUT_LEN;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::errors::HashError;

/// Iteration count applied to newly hashed passwords.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

const SCHEME: &str = "pbkdf2-sha256";
const ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const SALT_LEN: usize = 16;

/// Produces salted PBKDF2-HMAC-SHA256 hashes.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    /// Builds a hasher that applies `iterations` rounds.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::ZeroIterations`] when `iterations` is zero.
    pub fn new(iterations: u32) -> Result<Self, HashError> {
        let iterations = NonZeroU32::new(iterations).ok_or(HashError::ZeroIterations)?;
        Ok(Self {
            iterations,
            rng: SystemRandom::new(),
        })
    }

    /// Hashes `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Random`] if the system random source fails.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut salt = [0_u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| HashError::Random)?;
        let mut derived = [0_u8; SHA256_OUTPUT_LEN];
        pbkdf2::derive(
            ALGORITHM,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut derived,
        );
        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(derived)
        ))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: NonZeroU32::new(DEFAULT_ITERATIONS).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
        }
    }
}

/// Checks `password` against an encoded hash in constant time.
///
/// # Errors
///
/// Returns [`HashError::Malformed`] when `encoded` was not produced by
/// [`PasswordHasher::hash`].
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, HashError> {
    let parsed = ParsedHash::parse(encoded)?;
    Ok(pbkdf2::verify(
        ALGORITHM,
        parsed.iterations,
        &parsed.salt,
        password.as_bytes(),
        &parsed.derived,
    )
    .is_ok())
}

struct ParsedHash {
    iterations: NonZeroU32,
    salt: Vec<u8>,
    derived: Vec<u8>,
}

impl ParsedHash {
    fn parse(encoded: &str) -> Result<Self, HashError> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(derived), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(HashError::Malformed);
        };
        if scheme != SCHEME {
            return Err(HashError::Malformed);
        }
        let iterations = iterations
            .parse::<NonZeroU32>()
            .map_err(|_| HashError::Malformed)?;
        let salt = hex::decode(salt).map_err(|_| HashError::Malformed)?;
        let derived = hex::decode(derived).map_err(|_| HashError::Malformed)?;
        if derived.len() != SHA256_OUTPUT_LEN || salt.is_empty() {
            return Err(HashError::Malformed);
        }
        Ok(Self {
            iterations,
            salt,
            derived,
        })
    }
}
