//! Argon2id password hashing and verification.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tracing::debug;

use quill_core::config::PasswordConfig;
use quill_core::error::AppError;
use quill_core::result::AppResult;

/// Plaintext behind the dummy hash used to equalize login timing.
const DUMMY_PASSWORD: &str = "quill-timing-equalizer";

/// Hashes and verifies passwords using Argon2id.
///
/// Stored hashes are PHC strings, so verification always uses the parameters
/// embedded in the hash rather than the currently configured ones.
#[derive(Clone)]
pub struct PasswordHasher {
    /// Configured Argon2id instance.
    argon2: Argon2<'static>,
    /// Hash of [`DUMMY_PASSWORD`] under the configured parameters.
    dummy_hash: String,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl PasswordHasher {
    /// Creates a hasher from the configured cost parameters.
    ///
    /// Fails with `Configuration` if the parameters are out of range.
    pub fn new(config: &PasswordConfig) -> AppResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.effective_parallelism(),
            None,
        )
        .map_err(|e| AppError::configuration(format!("Invalid Argon2 parameters: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, DUMMY_PASSWORD)?;

        Ok(Self { argon2, dummy_hash })
    }

    /// Hashes a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> AppResult<String> {
        hash_with(&self.argon2, password)
    }

    /// Verifies a plaintext password against a stored hash.
    ///
    /// Never errors: a malformed or foreign hash simply does not match.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            debug!("Stored password hash is not a valid PHC string");
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Runs a full verification against the dummy hash and reports failure.
    ///
    /// Used when the account does not exist or has no password, so that
    /// response timing does not reveal which emails are registered.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}
