//! Store contents and the rules every backend applies to them.
//!
//! Backends differ only in where this state lives; uniqueness, ownership
//! and timestamping are enforced here once.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::{StoredUser, VaultRecord};
use keyward_common::{Error, RecordId, Result, UserId};

/// All users and records held by a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub users: Vec<StoredUser>,
    #[serde(default)]
    pub records: Vec<VaultRecord>,
}

impl StoreState {
    /// Find a user by exact email.
    pub fn find_user_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.iter().find(|u| u.email == email)
    }

    /// Find a user by id.
    pub fn find_user(&self, id: &UserId) -> Option<&StoredUser> {
        self.users.iter().find(|u| &u.id == id)
    }

    /// Add a user.
    ///
    /// # Errors
    /// - `DuplicateUser` if the email or id is already present
    pub fn insert_user(&mut self, user: StoredUser) -> Result<()> {
        if self.find_user_by_email(&user.email).is_some() || self.find_user(&user.id).is_some() {
            return Err(Error::DuplicateUser);
        }
        self.users.push(user);
        Ok(())
    }

    /// All records of one owner, in insertion order.
    pub fn records_by_owner(&self, owner: &UserId) -> Vec<VaultRecord> {
        self.records
            .iter()
            .filter(|r| &r.owner_id == owner)
            .cloned()
            .collect()
    }

    /// One record, if it exists and belongs to `owner`.
    pub fn find_record(&self, id: &RecordId, owner: &UserId) -> Option<&VaultRecord> {
        self.records
            .iter()
            .find(|r| r.id.as_ref() == Some(id) && &r.owner_id == owner)
    }

    /// Store a new record and assign its id.
    ///
    /// # Errors
    /// - `InvalidInput` if the record already carries an id
    /// - `NotFound` if the owner is not a registered user
    pub fn insert_record(&mut self, mut record: VaultRecord) -> Result<RecordId> {
        if record.id.is_some() {
            return Err(Error::InvalidInput(
                "New record must not carry an id".to_string(),
            ));
        }
        if self.find_user(&record.owner_id).is_none() {
            return Err(Error::NotFound(format!("User {}", record.owner_id)));
        }

        let id = RecordId::generate();
        let now = Utc::now();
        record.id = Some(id.clone());
        record.created_at = Some(now);
        record.updated_at = Some(now);
        self.records.push(record);

        Ok(id)
    }

    /// Replace an existing record owned by the same user.
    ///
    /// Keeps the original creation time.
    ///
    /// # Errors
    /// - `InvalidInput` if the record has no id
    /// - `NotFound` if no record with that id belongs to the owner
    pub fn update_record(&mut self, mut record: VaultRecord) -> Result<()> {
        let id = record
            .id
            .clone()
            .ok_or_else(|| Error::InvalidInput("Record to update has no id".to_string()))?;

        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id.as_ref() == Some(&id) && r.owner_id == record.owner_id)
            .ok_or_else(|| Error::NotFound(format!("Record {}", id)))?;

        record.created_at = slot.created_at;
        record.updated_at = Some(Utc::now());
        *slot = record;

        Ok(())
    }

    /// Remove a record owned by `owner`.
    ///
    /// # Errors
    /// - `NotFound` if no record with that id belongs to the owner
    pub fn delete_record(&mut self, id: &RecordId, owner: &UserId) -> Result<()> {
        let before = self.records.len();
        self.records
            .retain(|r| !(r.id.as_ref() == Some(id) && &r.owner_id == owner));

        if self.records.len() == before {
            return Err(Error::NotFound(format!("Record {}", id)));
        }
        Ok(())
    }
}
