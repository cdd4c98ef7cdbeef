//! Vault session management.
//!
//! A session holds the derived encryption key in memory for one
//! authenticated user and applies the record codec on load and save.
//! The key is zeroized when the session is closed or dropped.

use futures::stream::{self, StreamExt};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::record::{to_item, to_record_with_rng, VaultItem};
use keyward_common::{Error, RecordId, Result, UserId};
use keyward_crypto::{derive_key, EncryptionKey, KeyDerivation};
use keyward_storage::VaultRecord;

/// Session handle for tracking active sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a new unique session handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// State of the vault session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Key is available.
    Open,
    /// Key has been discarded.
    Closed,
}

/// Outcome of decrypting one record during a batch load.
#[derive(Debug)]
pub struct LoadedItem {
    /// Id of the source record.
    pub record_id: Option<RecordId>,
    /// The decrypted item, or why this record could not be read.
    pub result: Result<VaultItem>,
}

impl LoadedItem {
    /// Whether the record decrypted.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Active vault session.
///
/// Owns the encryption key for the lifetime of a login. Nothing else
/// holds the key, and it is never serialized or logged.
pub struct VaultSession {
    handle: SessionHandle,
    user_id: UserId,
    key: Option<EncryptionKey>,
    state: SessionState,
}

impl VaultSession {
    /// Open a session by deriving the encryption key from the master secret.
    ///
    /// # Preconditions
    /// - The caller has already authenticated `user_id`
    ///
    /// # Postconditions
    /// - The key is derived exactly once and held until `close`
    ///
    /// # Errors
    /// - `InvalidInput` if the secret is empty
    /// - KDF failure
    pub fn open(user_id: UserId, secret: &[u8], derivation: &KeyDerivation) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::InvalidInput(
                "Master secret cannot be empty".to_string(),
            ));
        }

        let key = derive_key(secret, derivation)?;
        let handle = SessionHandle::new();
        info!(user = %user_id, session = handle.as_str(), "Vault session opened");

        Ok(Self {
            handle,
            user_id,
            key: Some(key),
            state: SessionState::Open,
        })
    }

    /// Get the session handle.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Get the user this session belongs to.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if session is open.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    fn key(&self) -> Result<&EncryptionKey> {
        match self.state {
            SessionState::Open => self.key.as_ref().ok_or(Error::SessionClosed),
            SessionState::Closed => Err(Error::SessionClosed),
        }
    }

    /// Decrypt a single record.
    ///
    /// # Errors
    /// - `SessionClosed` if the session is closed
    /// - `NotPermitted` if the record belongs to another user
    /// - `Decryption` if the record does not decrypt under this key
    pub fn decrypt_one(&self, record: &VaultRecord) -> Result<VaultItem> {
        decode(record, self.key()?, &self.user_id)
    }

    /// Decrypt a batch of records, one result per record, in input order.
    ///
    /// A record that fails to decrypt does not affect the others.
    ///
    /// # Errors
    /// - `SessionClosed` if the session is closed; per-record failures are
    ///   reported inside the returned list
    pub fn load_all(&self, records: &[VaultRecord]) -> Result<Vec<LoadedItem>> {
        let key = self.key()?;

        let loaded: Vec<LoadedItem> = records
            .iter()
            .map(|record| LoadedItem {
                record_id: record.id.clone(),
                result: decode(record, key, &self.user_id),
            })
            .collect();

        log_load(&loaded);
        Ok(loaded)
    }

    /// Decrypt a batch of records on the blocking pool.
    ///
    /// At most `concurrency` records are in flight at once. Output order
    /// matches input order. Dropping the returned future stops scheduling
    /// further records; decryptions already running finish on their own.
    ///
    /// # Errors
    /// - `SessionClosed` if the session is closed
    pub async fn load_all_concurrent(
        &self,
        records: Vec<VaultRecord>,
        concurrency: usize,
    ) -> Result<Vec<LoadedItem>> {
        let key = self.key()?.clone();
        let user_id = self.user_id.clone();

        let loaded: Vec<LoadedItem> = stream::iter(records)
            .map(|record| {
                let key = key.clone();
                let user_id = user_id.clone();
                async move {
                    let record_id = record.id.clone();
                    let result =
                        tokio::task::spawn_blocking(move || decode(&record, &key, &user_id))
                            .await
                            .unwrap_or_else(|e| {
                                Err(Error::Vault(format!("Decryption task failed: {}", e)))
                            });
                    LoadedItem { record_id, result }
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        log_load(&loaded);
        Ok(loaded)
    }

    /// Encrypt an item into the shape storage persists.
    ///
    /// # Errors
    /// - `SessionClosed` if the session is closed
    /// - `InvalidInput` if a new item carries an id or an existing one lacks it
    pub fn save(&self, item: &VaultItem, is_new: bool) -> Result<VaultRecord> {
        self.save_with_rng(item, is_new, &mut OsRng)
    }

    /// Like [`save`](Self::save), drawing IVs from `rng`.
    pub fn save_with_rng<R>(&self, item: &VaultItem, is_new: bool, rng: &mut R) -> Result<VaultRecord>
    where
        R: RngCore + CryptoRng,
    {
        let key = self.key()?;

        match (is_new, item.id.is_some()) {
            (true, true) => {
                return Err(Error::InvalidInput(
                    "New item must not carry an id".to_string(),
                ))
            }
            (false, false) => {
                return Err(Error::InvalidInput(
                    "Existing item must carry an id".to_string(),
                ))
            }
            _ => {}
        }

        let record = to_record_with_rng(item, key, &self.user_id, rng)?;
        debug!(user = %self.user_id, is_new, "Item encrypted for storage");
        Ok(record)
    }

    /// Close the session, discarding the key.
    ///
    /// # Postconditions
    /// - Key is zeroized and removed
    /// - Every later operation fails with `SessionClosed`
    pub fn close(&mut self) {
        if self.key.take().is_some() {
            info!(session = self.handle.as_str(), "Vault session closed");
        }
        self.state = SessionState::Closed;
    }
}

impl Drop for VaultSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("handle", &self.handle)
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn decode(record: &VaultRecord, key: &EncryptionKey, user_id: &UserId) -> Result<VaultItem> {
    if &record.owner_id != user_id {
        return Err(Error::NotPermitted(
            "Record belongs to another user".to_string(),
        ));
    }
    to_item(record, key)
}

fn log_load(loaded: &[LoadedItem]) {
    let failed: Vec<String> = loaded
        .iter()
        .filter(|l| !l.is_ok())
        .map(|l| {
            l.record_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "<unsaved>".to_string())
        })
        .collect();

    if failed.is_empty() {
        debug!(count = loaded.len(), "Vault records loaded");
    } else {
        warn!(
            count = loaded.len(),
            failed = failed.len(),
            records = ?failed,
            "Some vault records could not be decrypted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::to_record;
    use keyward_crypto::KEY_LENGTH;

    fn user() -> UserId {
        UserId::new("u_alice").unwrap()
    }

    fn open_session() -> VaultSession {
        VaultSession::open(user(), b"Tr0ub4dor", &KeyDerivation::Direct).unwrap()
    }

    fn stored(session: &VaultSession, title: &str, n: usize) -> VaultRecord {
        let item = VaultItem::new(title, "alice", format!("pw-{}", n)).with_notes("n");
        let mut record = session.save(&item, true).unwrap();
        record.id = Some(RecordId::new(format!("rec-{}", n)).unwrap());
        record
    }

    fn corrupt(record: &mut VaultRecord) {
        record.encrypted_password = "AAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string();
    }

    #[test]
    fn test_session_open() {
        let session = open_session();
        assert!(session.is_open());
        assert_eq!(session.user_id(), &user());
        assert!(!session.handle().as_str().is_empty());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = VaultSession::open(user(), b"", &KeyDerivation::Direct);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_save_then_decrypt() {
        let session = open_session();
        let item = VaultItem::new("Bank", "alice", "s3cr3t!").with_url("bank.com");
        let mut record = session.save(&item, true).unwrap();
        assert_eq!(record.owner_id, user());

        record.id = Some(RecordId::new("rec-1").unwrap());
        let back = session.decrypt_one(&record).unwrap();
        assert_eq!(back.password.expose(), "s3cr3t!");
        assert_eq!(back.url.as_deref(), Some("bank.com"));
    }

    #[test]
    fn test_save_id_rules() {
        let session = open_session();
        let fresh = VaultItem::new("t", "u", "p");
        let mut existing = fresh.clone();
        existing.id = Some(RecordId::new("rec-1").unwrap());

        assert!(matches!(session.save(&existing, true), Err(Error::InvalidInput(_))));
        assert!(matches!(session.save(&fresh, false), Err(Error::InvalidInput(_))));
        assert_eq!(
            session.save(&existing, false).unwrap().id,
            existing.id
        );
    }

    #[test]
    fn test_partial_failure_isolation() {
        let session = open_session();
        let mut records: Vec<_> = (0..3).map(|n| stored(&session, "item", n)).collect();
        corrupt(&mut records[1]);

        let loaded = session.load_all(&records).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded[0].is_ok());
        assert!(matches!(loaded[1].result, Err(Error::Decryption(_))));
        assert!(loaded[2].is_ok());
        assert_eq!(loaded[1].record_id, records[1].id);
        assert_eq!(loaded.iter().filter(|l| l.is_ok()).count(), 2);
    }

    #[test]
    fn test_foreign_record_rejected_per_record() {
        let session = open_session();
        let key = EncryptionKey::from_bytes([1u8; KEY_LENGTH]);
        let foreign = to_record(
            &VaultItem::new("x", "y", "z"),
            &key,
            &UserId::new("u_mallory").unwrap(),
        )
        .unwrap();

        let records = vec![stored(&session, "mine", 0), foreign];
        let loaded = session.load_all(&records).unwrap();
        assert!(loaded[0].is_ok());
        assert!(matches!(loaded[1].result, Err(Error::NotPermitted(_))));
    }

    #[test]
    fn test_closed_session_fails() {
        let mut session = open_session();
        let record = stored(&session, "item", 0);
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.decrypt_one(&record), Err(Error::SessionClosed)));
        assert!(matches!(session.load_all(&[record]), Err(Error::SessionClosed)));
        assert!(matches!(
            session.save(&VaultItem::new("t", "u", "p"), true),
            Err(Error::SessionClosed)
        ));

        // Closing twice is harmless.
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn test_reopen_with_same_secret_reads_records() {
        let mut first = open_session();
        let record = stored(&first, "Bank", 0);
        first.close();

        let second = open_session();
        assert_eq!(second.decrypt_one(&record).unwrap().title, "Bank");
    }

    #[test]
    fn test_wrong_secret_cannot_decrypt() {
        let record = stored(&open_session(), "Bank", 0);
        let wrong = VaultSession::open(user(), b"wrong", &KeyDerivation::Direct).unwrap();
        assert!(matches!(wrong.decrypt_one(&record), Err(Error::Decryption(_))));
    }

    #[tokio::test]
    async fn test_concurrent_load_preserves_order() {
        let session = open_session();
        let mut records: Vec<_> = (0..20).map(|n| stored(&session, "item", n)).collect();
        corrupt(&mut records[7]);

        let loaded = session.load_all_concurrent(records.clone(), 4).await.unwrap();
        assert_eq!(loaded.len(), 20);
        for (n, (loaded, record)) in loaded.iter().zip(&records).enumerate() {
            assert_eq!(loaded.record_id, record.id);
            if n == 7 {
                assert!(matches!(loaded.result, Err(Error::Decryption(_))));
            } else {
                let item = loaded.result.as_ref().unwrap();
                assert_eq!(item.password.expose(), format!("pw-{}", n));
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_load_zero_concurrency_still_runs() {
        let session = open_session();
        let records = vec![stored(&session, "item", 0)];
        let loaded = session.load_all_concurrent(records, 0).await.unwrap();
        assert!(loaded[0].is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_load_on_closed_session() {
        let mut session = open_session();
        session.close();
        assert!(matches!(
            session.load_all_concurrent(Vec::new(), 4).await,
            Err(Error::SessionClosed)
        ));
    }
}
