//! Field-level authenticated encryption using XChaCha20-Poly1305.
//!
//! Each sensitive text field is encrypted on its own and stored as a
//! `(ciphertext, iv)` pair of base64 strings. The 24-byte nonce is large
//! enough to be drawn at random on every call without a realistic chance
//! of repeating under one key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::keys::EncryptionKey;
use keyward_common::{Error, Result};

/// Nonce (IV) size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// One encrypted field as persisted: base64 ciphertext (with tag) and base64 IV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    /// Base64 of `ciphertext || tag`.
    pub ciphertext: String,
    /// Base64 of the 24-byte nonce.
    pub iv: String,
}

/// Encrypt a text field with a fresh IV from the OS random source.
///
/// # Errors
/// - Returns error if the cipher rejects the input
pub fn encrypt_field(key: &EncryptionKey, plaintext: &str) -> Result<EncryptedField> {
    encrypt_field_with_rng(key, plaintext, &mut OsRng)
}

/// Encrypt a text field drawing the IV from `rng`.
///
/// # Postconditions
/// - A new IV is drawn from `rng` on every call
/// - Decoded ciphertext length is plaintext length + TAG_SIZE
///
/// # Security
/// - `rng` must be a cryptographically secure source outside of tests
pub fn encrypt_field_with_rng<R>(
    key: &EncryptionKey,
    plaintext: &str,
    rng: &mut R,
) -> Result<EncryptedField>
where
    R: RngCore + CryptoRng,
{
    let mut iv = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut iv);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedField {
        ciphertext: STANDARD.encode(ciphertext),
        iv: STANDARD.encode(iv),
    })
}

/// Decrypt a text field.
///
/// # Errors
/// All of the following surface as [`Error::Decryption`]:
/// - Ciphertext or IV is not valid base64
/// - IV is not exactly NONCE_SIZE bytes
/// - Ciphertext is shorter than the authentication tag
/// - Authentication fails (wrong key or tampered data)
/// - Plaintext is not valid UTF-8
pub fn decrypt_field(key: &EncryptionKey, field: &EncryptedField) -> Result<String> {
    let iv = STANDARD
        .decode(&field.iv)
        .map_err(|e| Error::Decryption(format!("Malformed IV encoding: {}", e)))?;
    if iv.len() != NONCE_SIZE {
        return Err(Error::Decryption(format!(
            "Invalid IV length: expected {}, got {}",
            NONCE_SIZE,
            iv.len()
        )));
    }

    let ciphertext = STANDARD
        .decode(&field.ciphertext)
        .map_err(|e| Error::Decryption(format!("Malformed ciphertext encoding: {}", e)))?;
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::Decryption("Ciphertext too short".to_string()));
    }

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| Error::Decryption("Authentication failed".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::Decryption("Plaintext is not valid UTF-8".to_string()))
}
