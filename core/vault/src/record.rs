//! Decrypted vault items and their conversion to stored records.

use rand::{rngs::OsRng, CryptoRng, RngCore};

use keyward_common::{RecordId, Result, SensitiveString, UserId};
use keyward_crypto::{decrypt_field, encrypt_field_with_rng, EncryptionKey};
use keyward_storage::VaultRecord;

/// A vault item in decrypted form.
///
/// Exists only in memory while being shown or edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VaultItem {
    /// `None` for items that have not been stored yet.
    pub id: Option<RecordId>,
    pub title: String,
    pub username: String,
    pub url: Option<String>,
    pub password: SensitiveString,
    /// Empty when the item has no notes.
    pub notes: SensitiveString,
}

impl VaultItem {
    /// Create an unsaved item without url or notes.
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SensitiveString>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            username: username.into(),
            url: None,
            password: password.into(),
            notes: SensitiveString::default(),
        }
    }

    /// Set the url.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the notes.
    pub fn with_notes(mut self, notes: impl Into<SensitiveString>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Case-insensitive substring match over title, username, url and notes.
    ///
    /// An empty query matches everything. The password is never searched.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        if q.is_empty() {
            return true;
        }

        self.title.to_lowercase().contains(&q)
            || self.username.to_lowercase().contains(&q)
            || self
                .url
                .as_deref()
                .is_some_and(|url| url.to_lowercase().contains(&q))
            || self.notes.expose().to_lowercase().contains(&q)
    }
}

/// Encrypt an item into its stored shape using the OS random source.
pub fn to_record(item: &VaultItem, key: &EncryptionKey, owner: &UserId) -> Result<VaultRecord> {
    to_record_with_rng(item, key, owner, &mut OsRng)
}

/// Encrypt an item into its stored shape.
///
/// # Postconditions
/// - Password and notes are encrypted by separate calls, each with its own IV
/// - Absent notes are encrypted as the empty string
/// - Id, title, username and url are copied unchanged
/// - The record is owned by `owner`
pub fn to_record_with_rng<R>(
    item: &VaultItem,
    key: &EncryptionKey,
    owner: &UserId,
    rng: &mut R,
) -> Result<VaultRecord>
where
    R: RngCore + CryptoRng,
{
    let password = encrypt_field_with_rng(key, item.password.expose(), rng)?;
    let notes = encrypt_field_with_rng(key, item.notes.expose(), rng)?;

    Ok(VaultRecord {
        id: item.id.clone(),
        owner_id: owner.clone(),
        title: item.title.clone(),
        username: item.username.clone(),
        url: item.url.clone(),
        encrypted_password: password.ciphertext,
        iv_password: password.iv,
        encrypted_notes: notes.ciphertext,
        iv_notes: notes.iv,
        created_at: None,
        updated_at: None,
    })
}

/// Decrypt a stored record into an item.
///
/// # Errors
/// - `Decryption` if either field fails to decrypt; nothing is returned
///   for the record in that case
pub fn to_item(record: &VaultRecord, key: &EncryptionKey) -> Result<VaultItem> {
    let password = decrypt_field(key, &record.password_field())?;
    let notes = decrypt_field(key, &record.notes_field())?;

    Ok(VaultItem {
        id: record.id.clone(),
        title: record.title.clone(),
        username: record.username.clone(),
        url: record.url.clone(),
        password: password.into(),
        notes: notes.into(),
    })
}
