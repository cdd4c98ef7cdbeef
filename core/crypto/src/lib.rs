//! Cryptographic primitives for keyward.
//!
//! This module provides:
//! - Encryption key derivation from the master secret
//! - Field-level authenticated encryption using XChaCha20-Poly1305
//! - The one-way login hash, kept separate from the encryption key
//! - Random password generation for new items
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Every field encryption draws a fresh random IV

pub mod cipher;
pub mod generator;
pub mod kdf;
pub mod keys;
pub mod password;

pub use cipher::{decrypt_field, encrypt_field, encrypt_field_with_rng, EncryptedField};
pub use generator::{
    generate_password, generate_password_with_rng, CharsetConfig, DEFAULT_PASSWORD_LENGTH,
    MAX_PASSWORD_LENGTH,
};
pub use kdf::{derive_key, KdfParams, KeyDerivation, KeyScheme};
pub use keys::{EncryptionKey, Salt, KEY_LENGTH};
pub use password::{hash_password, verify_password};
