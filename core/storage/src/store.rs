//! Storage trait definition.

use async_trait::async_trait;

use crate::model::{StoredUser, VaultRecord};
use keyward_common::{RecordId, Result, UserId};

/// Storage backend for users and vault records.
///
/// Backends only handle persisted shapes. Implementations must enforce
/// email uniqueness and scope every record operation by owner.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Get the backend name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Look up a user by exact email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>>;

    /// Look up a user by id.
    async fn find_user(&self, id: &UserId) -> Result<Option<StoredUser>>;

    /// Register a user.
    ///
    /// # Errors
    /// - `DuplicateUser` if the email is already registered
    async fn insert_user(&self, user: StoredUser) -> Result<()>;

    /// All records owned by `owner`, in insertion order.
    async fn find_records_by_owner(&self, owner: &UserId) -> Result<Vec<VaultRecord>>;

    /// One record, if it exists and belongs to `owner`.
    async fn find_record(&self, id: &RecordId, owner: &UserId) -> Result<Option<VaultRecord>>;

    /// Store a new record.
    ///
    /// # Preconditions
    /// - `record.id` is `None`
    ///
    /// # Postconditions
    /// - Returns the id assigned to the record
    /// - `created_at` and `updated_at` are stamped
    async fn insert_record(&self, record: VaultRecord) -> Result<RecordId>;

    /// Replace an existing record.
    ///
    /// # Errors
    /// - `NotFound` if no record with that id belongs to `record.owner_id`
    async fn update_record(&self, record: VaultRecord) -> Result<()>;

    /// Remove a record.
    ///
    /// # Errors
    /// - `NotFound` if no record with that id belongs to `owner`
    async fn delete_record(&self, id: &RecordId, owner: &UserId) -> Result<()>;
}
