//! Encryption key derivation from the master secret.
//!
//! Two schemes are supported and the one in force is recorded per user, so
//! changing the configured default never changes which secret opens an
//! existing vault:
//!
//! - [`KeyDerivation::Direct`]: the secret itself is the key material, only
//!   shaped to the cipher's key length. Unsalted and fast, so two users with
//!   the same secret get the same key. Kept for compatibility with vaults
//!   written that way.
//! - [`KeyDerivation::Argon2id`]: memory-hard derivation with a per-user
//!   random salt. Two users with the same secret get different keys.
//!
//! Both paths are unrelated to the login hash in [`crate::password`]: that
//! one uses its own random salt and PHC encoding, and its output is never
//! fed into the cipher.

use argon2::{Algorithm, Argon2, Params, Version};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

use crate::keys::{EncryptionKey, Salt, KEY_LENGTH};
use keyward_common::{Error, Result};

/// Domain tag for the direct scheme.
const DIRECT_KEY_CONTEXT: &[u8] = b"keyward.vault-key.direct.v1";

/// Parameters for Argon2id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters suitable for interactive use.
    ///
    /// These parameters target approximately 0.5-1 second of derivation time.
    pub fn interactive() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Create parameters suitable for sensitive data.
    pub fn sensitive() -> Self {
        Self {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Create moderate parameters for constrained devices.
    pub fn moderate() -> Self {
        Self {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Build the argon2 parameter set, validating the costs.
    pub fn to_argon2(&self) -> Result<Params> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Scheme applied to newly registered users.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum KeyScheme {
    /// Unsalted, deterministic across users.
    #[default]
    Direct,
    /// Salted Argon2id, distinct per user.
    Argon2id {
        /// Argon2id cost parameters.
        params: KdfParams,
    },
}

impl KeyScheme {
    /// Produce the per-user derivation record for a new user.
    ///
    /// Generates a fresh salt for salted schemes.
    pub fn instantiate(&self) -> KeyDerivation {
        match self {
            KeyScheme::Direct => KeyDerivation::Direct,
            KeyScheme::Argon2id { params } => KeyDerivation::Argon2id {
                salt: Salt::generate(),
                params: params.clone(),
            },
        }
    }
}

/// How a particular user's encryption key is derived.
///
/// Stored alongside the user record. Contains no secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum KeyDerivation {
    /// The secret is used as key material directly.
    Direct,
    /// Argon2id over the secret with a per-user salt.
    Argon2id {
        /// Per-user salt.
        salt: Salt,
        /// Argon2id cost parameters.
        params: KdfParams,
    },
}

/// Derive an encryption key from the master secret.
///
/// # Postconditions
/// - The derived key is deterministic given the same secret and derivation
///
/// # Errors
/// - Returns error if Argon2id parameters are invalid
///
/// # Security
/// - Empty secrets are accepted here; callers opening a session reject them
/// - The secret is not stored or logged
pub fn derive_key(secret: &[u8], derivation: &KeyDerivation) -> Result<EncryptionKey> {
    match derivation {
        KeyDerivation::Direct => Ok(derive_direct(secret)),
        KeyDerivation::Argon2id { salt, params } => derive_argon2id(secret, salt, params),
    }
}

fn derive_direct(secret: &[u8]) -> EncryptionKey {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(DIRECT_KEY_CONTEXT);
    hasher.update(secret);

    let digest = hasher.finalize();
    let mut key_bytes = [0u8; KEY_LENGTH];
    key_bytes.copy_from_slice(&digest);

    EncryptionKey::from_bytes(key_bytes)
}

fn derive_argon2id(secret: &[u8], salt: &Salt, params: &KdfParams) -> Result<EncryptionKey> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(secret, salt.as_bytes(), &mut key_bytes)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(EncryptionKey::from_bytes(key_bytes))
}
