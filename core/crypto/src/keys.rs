//! Key types with secure memory handling.
//!
//! Key types zeroize their memory on drop to prevent sensitive data from
//! persisting in memory after a session ends.

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of key-derivation salts in bytes.
pub const SALT_LENGTH: usize = 32;

/// Key used by the field cipher.
///
/// Lives only in session memory. It is deliberately not `Serialize`: there
/// is no code path that can persist or transmit it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; KEY_LENGTH],
}

impl EncryptionKey {
    /// Create an encryption key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey([REDACTED])")
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}
