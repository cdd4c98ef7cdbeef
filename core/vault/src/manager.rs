//! Vault manager tying login, sessions and storage together.

use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::record::VaultItem;
use crate::session::{LoadedItem, VaultSession};
use crate::verifier::CredentialVerifier;
use keyward_common::{Error, RecordId, Result, UserId};
use keyward_storage::VaultStore;

/// Entry point for the request layer.
///
/// Signup and login go through the credential verifier; everything after
/// login takes the [`VaultSession`] returned by [`login`](Self::login), so
/// the master secret is supplied once and never again for decryption.
pub struct VaultManager {
    store: Arc<dyn VaultStore>,
    verifier: CredentialVerifier,
    config: VaultConfig,
}

impl VaultManager {
    /// Create a manager over `store`.
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(store: Arc<dyn VaultStore>, config: VaultConfig) -> Result<Self> {
        config.validate()?;
        let verifier = CredentialVerifier::new(
            store.clone(),
            config.credential_params.clone(),
            config.key_scheme.clone(),
        );
        Ok(Self {
            store,
            verifier,
            config,
        })
    }

    /// Get the storage backend.
    pub fn store(&self) -> &Arc<dyn VaultStore> {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `DuplicateUser` if the email is taken
    /// - `InvalidInput` if email or secret is empty
    pub async fn signup(&self, email: &str, secret: &[u8]) -> Result<UserId> {
        self.verifier.register(email, secret).await
    }

    /// Authenticate and open a session.
    ///
    /// The encryption key is derived with the derivation recorded on the
    /// user at signup, not the one currently configured.
    ///
    /// # Errors
    /// - `InvalidCredentials` on unknown email or wrong secret
    pub async fn login(&self, email: &str, secret: &[u8]) -> Result<VaultSession> {
        let user = self.verifier.authenticate_user(email, secret).await?;

        let secret = Zeroizing::new(secret.to_vec());
        let session = tokio::task::spawn_blocking(move || {
            VaultSession::open(user.id, &secret, &user.key_derivation)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Key derivation task failed: {}", e)))??;

        Ok(session)
    }

    /// Load and decrypt every item of the session's user.
    ///
    /// Unreadable records come back as failed entries instead of failing
    /// the whole call.
    ///
    /// # Errors
    /// - `SessionClosed` if the session is closed
    /// - Storage failure
    pub async fn list(&self, session: &VaultSession) -> Result<Vec<LoadedItem>> {
        ensure_open(session)?;
        let records = self.store.find_records_by_owner(session.user_id()).await?;
        session
            .load_all_concurrent(records, self.config.load_concurrency)
            .await
    }

    /// Load and decrypt one item.
    ///
    /// # Errors
    /// - `NotFound` if the user has no record with this id
    /// - `Decryption` if the record does not decrypt
    pub async fn get(&self, session: &VaultSession, id: &RecordId) -> Result<VaultItem> {
        ensure_open(session)?;
        let record = self
            .store
            .find_record(id, session.user_id())
            .await?
            .ok_or_else(|| Error::NotFound(format!("Record {}", id)))?;
        session.decrypt_one(&record)
    }

    /// Encrypt and store an item.
    ///
    /// Items without an id are inserted; items with one replace the stored
    /// record.
    ///
    /// # Returns
    /// - The record id
    pub async fn save(&self, session: &VaultSession, item: &VaultItem) -> Result<RecordId> {
        match &item.id {
            None => {
                let record = session.save(item, true)?;
                let id = self.store.insert_record(record).await?;
                info!(user = %session.user_id(), record = %id, "Item created");
                Ok(id)
            }
            Some(id) => {
                let record = session.save(item, false)?;
                self.store.update_record(record).await?;
                info!(user = %session.user_id(), record = %id, "Item updated");
                Ok(id.clone())
            }
        }
    }

    /// Delete an item.
    ///
    /// # Errors
    /// - `SessionClosed` if the session is closed
    /// - `NotFound` if the user has no record with this id
    pub async fn delete(&self, session: &VaultSession, id: &RecordId) -> Result<()> {
        ensure_open(session)?;
        self.store.delete_record(id, session.user_id()).await?;
        debug!(user = %session.user_id(), record = %id, "Item deleted");
        Ok(())
    }
}

fn ensure_open(session: &VaultSession) -> Result<()> {
    if session.is_open() {
        Ok(())
    } else {
        Err(Error::SessionClosed)
    }
}
