//! Common utilities and types shared across keyward modules.
//!
//! This module provides the error taxonomy and the identifier types that
//! cross crate boundaries, so the crypto, storage and vault layers agree on
//! them without depending on each other.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{RecordId, SensitiveString, UserId};
