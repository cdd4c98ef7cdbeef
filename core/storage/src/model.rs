//! Persisted shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyward_common::{RecordId, UserId};
use keyward_crypto::{EncryptedField, KeyDerivation};

/// A registered user as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    /// Unique user id.
    pub id: UserId,
    /// Login email, unique and compared exactly as stored.
    pub email: String,
    /// Argon2id PHC string of the master secret. Login only.
    pub hashed_master_password: String,
    /// How this user's encryption key is derived from the master secret.
    pub key_derivation: KeyDerivation,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// A vault item as stored.
///
/// Title, username and url stay in plaintext so they can be listed and
/// searched without the key. Password and notes are only ever present as
/// ciphertext with their own IV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Assigned by storage on insert; `None` before the first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Owning user.
    pub owner_id: UserId,
    pub title: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub encrypted_password: String,
    pub iv_password: String,
    pub encrypted_notes: String,
    pub iv_notes: String,
    /// Stamped by storage on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by storage on insert and update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VaultRecord {
    /// The stored password ciphertext and IV.
    pub fn password_field(&self) -> EncryptedField {
        EncryptedField {
            ciphertext: self.encrypted_password.clone(),
            iv: self.iv_password.clone(),
        }
    }

    /// The stored notes ciphertext and IV.
    pub fn notes_field(&self) -> EncryptedField {
        EncryptedField {
            ciphertext: self.encrypted_notes.clone(),
            iv: self.iv_notes.clone(),
        }
    }
}
