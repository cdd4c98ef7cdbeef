//! One-way hash of the master secret for login checks.
//!
//! Argon2id in PHC string form, with its own random salt per user. The
//! output only ever answers "is this the right secret"; it is never turned
//! into cipher key material.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Version};

use crate::kdf::KdfParams;
use keyward_common::{Error, Result};

/// Hash a master secret for storage.
///
/// # Postconditions
/// - Returns a PHC string embedding algorithm, costs and a fresh salt
/// - Hashing the same secret twice yields different strings
///
/// # Errors
/// - Returns error if the cost parameters are invalid
pub fn hash_password(secret: &[u8], params: &KdfParams) -> Result<String> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2
        .hash_password(secret, &salt)
        .map_err(|e| Error::Crypto(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Check a master secret against a stored PHC string.
///
/// Cost parameters are read from the stored string, so hashes produced
/// under older settings keep verifying.
///
/// # Returns
/// - `Ok(true)` if the secret matches
/// - `Ok(false)` if it does not
/// - `Err(_)` if the stored hash cannot be parsed
pub fn verify_password(secret: &[u8], stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| Error::Crypto(format!("Malformed password hash: {}", e)))?;

    match Argon2::default().verify_password(secret, &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Crypto(format!("Password verification failed: {}", e))),
    }
}
