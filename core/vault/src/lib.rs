//! Vault engine for keyward.
//!
//! This module provides:
//! - The decrypted item type and its codec to and from stored records
//! - Login verification against the one-way hash
//! - Sessions holding the derived encryption key in memory
//! - A manager tying those to a storage backend
//!
//! # Architecture
//! The vault module sits between the request layer and storage, handling
//! all encryption/decryption so that storage only ever receives ciphertext
//! for sensitive fields.

pub mod config;
pub mod manager;
pub mod record;
pub mod session;
pub mod verifier;

pub use config::VaultConfig;
pub use manager::VaultManager;
pub use record::{to_item, to_record, to_record_with_rng, VaultItem};
pub use session::{LoadedItem, SessionHandle, SessionState, VaultSession};
pub use verifier::CredentialVerifier;
