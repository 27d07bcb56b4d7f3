//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so verification reads the cost
//! parameters back from the stored hash rather than from configuration.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;
use thiserror::Error;

use crate::config::PasswordConfig;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("invalid password hash format")]
    InvalidHash,

    /// The password does not match the stored hash.
    #[error("password verification failed")]
    Mismatch,
}

fn argon2(config: &PasswordConfig) -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(
        config.memory_kib,
        config.iterations,
        config.parallelism,
        None,
    )
    .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// hash_password
///
/// Hashes `password` with a fresh random salt using the configured cost.
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2(config)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// verify_password
///
/// Returns `Ok(())` when `password` matches the stored PHC `hash`.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}
