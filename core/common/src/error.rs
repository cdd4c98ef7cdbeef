//! Common error types for keyward.

use thiserror::Error;

/// Message used for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Top-level error type for keyward operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Signup with an email that is already registered.
    #[error("User already exists")]
    DuplicateUser,

    /// Unknown email or wrong master secret.
    ///
    /// The message is identical in both cases so callers cannot tell
    /// which one happened.
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    /// Ciphertext, IV and key did not validate together.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Operation attempted on a session whose key has been discarded.
    #[error("Session is closed")]
    SessionClosed,

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Vault operation failed.
    #[error("Vault error: {0}")]
    Vault(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether retrying the same call could succeed.
    ///
    /// Everything the core itself produces is deterministic in its inputs.
    /// Only failures reported by a storage backend may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
