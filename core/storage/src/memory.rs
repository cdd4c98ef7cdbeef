//! In-memory store for testing.

use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{StoredUser, VaultRecord};
use crate::state::StoreState;
use crate::store::VaultStore;
use keyward_common::{Error, RecordId, Result, UserId};

/// In-memory store.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| Error::Storage("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| Error::Storage("Memory store lock poisoned".to_string()))
    }

    /// Overwrite a stored record in place, bypassing ownership and
    /// timestamp rules. Lets tests simulate corruption at rest.
    #[doc(hidden)]
    pub fn tamper_record(&self, id: &RecordId, f: impl FnOnce(&mut VaultRecord)) -> Result<()> {
        let mut state = self.write()?;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id.as_ref() == Some(id))
            .ok_or_else(|| Error::NotFound(format!("Record {}", id)))?;
        f(record);
        Ok(())
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        Ok(self.read()?.find_user_by_email(email).cloned())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<StoredUser>> {
        Ok(self.read()?.find_user(id).cloned())
    }

    async fn insert_user(&self, user: StoredUser) -> Result<()> {
        self.write()?.insert_user(user)
    }

    async fn find_records_by_owner(&self, owner: &UserId) -> Result<Vec<VaultRecord>> {
        Ok(self.read()?.records_by_owner(owner))
    }

    async fn find_record(&self, id: &RecordId, owner: &UserId) -> Result<Option<VaultRecord>> {
        Ok(self.read()?.find_record(id, owner).cloned())
    }

    async fn insert_record(&self, record: VaultRecord) -> Result<RecordId> {
        self.write()?.insert_record(record)
    }

    async fn update_record(&self, record: VaultRecord) -> Result<()> {
        self.write()?.update_record(record)
    }

    async fn delete_record(&self, id: &RecordId, owner: &UserId) -> Result<()> {
        self.write()?.delete_record(id, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[tokio::test]
    async fn test_user_roundtrip() {
        let store = MemoryStore::new();
        let user = fixtures::user("a@b.com");
        let id = user.id.clone();
        store.insert_user(user).await.unwrap();

        let found = store.find_user_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(store.find_user(&id).await.unwrap().is_some());
        assert!(store.find_user_by_email("x@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_lifecycle() {
        let store = MemoryStore::new();
        let user = fixtures::user("a@b.com");
        let owner = user.id.clone();
        store.insert_user(user).await.unwrap();

        let id1 = store
            .insert_record(fixtures::record(&owner, "Bank"))
            .await
            .unwrap();
        let id2 = store
            .insert_record(fixtures::record(&owner, "Mail"))
            .await
            .unwrap();

        let records = store.find_records_by_owner(&owner).await.unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Bank", "Mail"]);
        assert_eq!(records[0].id.as_ref(), Some(&id1));
        assert!(records[0].created_at.is_some());

        store.delete_record(&id1, &owner).await.unwrap();
        let records = store.find_records_by_owner(&owner).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_ref(), Some(&id2));

        assert!(matches!(
            store.delete_record(&id1, &owner).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_with_id_rejected() {
        let store = MemoryStore::new();
        let user = fixtures::user("a@b.com");
        let owner = user.id.clone();
        store.insert_user(user).await.unwrap();

        let mut record = fixtures::record(&owner, "Bank");
        record.id = Some(RecordId::generate());
        assert!(matches!(
            store.insert_record(record).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_tamper_record() {
        let store = MemoryStore::new();
        let user = fixtures::user("a@b.com");
        let owner = user.id.clone();
        store.insert_user(user).await.unwrap();
        let id = store
            .insert_record(fixtures::record(&owner, "Bank"))
            .await
            .unwrap();

        store
            .tamper_record(&id, |r| r.encrypted_password = "AAAA".to_string())
            .unwrap();

        let record = store.find_record(&id, &owner).await.unwrap().unwrap();
        assert_eq!(record.encrypted_password, "AAAA");
    }
}
