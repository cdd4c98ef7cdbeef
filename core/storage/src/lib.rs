//! Storage collaborator for keyward.
//!
//! This module defines the persisted shapes (users with their login hash,
//! vault records holding only ciphertext for sensitive fields), a
//! trait-based interface over storage backends, and two backends:
//! an in-memory store and a single-file JSON store on local disk.
//!
//! # Design Principles
//! - Stores only ever see persisted shapes, never decrypted items
//! - Ownership is enforced here: record lookups, updates and deletes are
//!   scoped by owner id
//! - Async operations: all I/O goes through the async trait

pub mod local;
pub mod memory;
pub mod model;
pub mod registry;
pub mod state;
pub mod store;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use model::{StoredUser, VaultRecord};
pub use registry::{create_default_registry, StoreFactory, StoreRegistry};
pub use store::VaultStore;
