//! Local filesystem store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::{StoredUser, VaultRecord};
use crate::state::StoreState;
use crate::store::VaultStore;
use keyward_common::{RecordId, Result, UserId};

/// Local filesystem store.
///
/// Keeps every user and record in one JSON document. The whole document
/// is rewritten after each mutation, via a temporary file and a rename so
/// a crash mid-write leaves the previous version intact.
pub struct LocalStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl LocalStore {
    /// Open the store at `path`.
    ///
    /// # Postconditions
    /// - Parent directory is created if it doesn't exist
    /// - An existing document is loaded; a missing one starts empty
    ///
    /// # Errors
    /// - Permission denied
    /// - Existing document is not valid JSON
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let state = if path.exists() {
            let bytes = std::fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            StoreState::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Store persisted");
        Ok(())
    }

    /// Apply a mutation and persist the result.
    ///
    /// The in-memory state is only replaced once the write has succeeded.
    async fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T> + Send) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl VaultStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        Ok(self.state.lock().await.find_user_by_email(email).cloned())
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<StoredUser>> {
        Ok(self.state.lock().await.find_user(id).cloned())
    }

    async fn insert_user(&self, user: StoredUser) -> Result<()> {
        self.mutate(move |state| state.insert_user(user)).await
    }

    async fn find_records_by_owner(&self, owner: &UserId) -> Result<Vec<VaultRecord>> {
        Ok(self.state.lock().await.records_by_owner(owner))
    }

    async fn find_record(&self, id: &RecordId, owner: &UserId) -> Result<Option<VaultRecord>> {
        Ok(self.state.lock().await.find_record(id, owner).cloned())
    }

    async fn insert_record(&self, record: VaultRecord) -> Result<RecordId> {
        self.mutate(move |state| state.insert_record(record)).await
    }

    async fn update_record(&self, record: VaultRecord) -> Result<()> {
        self.mutate(move |state| state.update_record(record)).await
    }

    async fn delete_record(&self, id: &RecordId, owner: &UserId) -> Result<()> {
        self.mutate(|state| state.delete_record(id, owner)).await
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").field("path", &self.path).finish()
    }
}
