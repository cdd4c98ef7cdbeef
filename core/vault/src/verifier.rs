//! Login verification against the stored one-way hash.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use zeroize::Zeroizing;

use keyward_common::{Error, Result, UserId};
use keyward_crypto::{hash_password, verify_password, KdfParams, KeyScheme};
use keyward_storage::{StoredUser, VaultStore};

/// Checked against a throwaway hash when the email is unknown, so both
/// rejection paths do the same Argon2 work.
const DECOY_SECRET: &[u8] = b"keyward.decoy-login";

/// Registers users and checks master secrets.
///
/// Holds no key material. The hash it stores and checks is unrelated to
/// the encryption key a session derives from the same secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn VaultStore>,
    hash_params: KdfParams,
    key_scheme: KeyScheme,
    decoy_hash: Arc<OnceCell<String>>,
}

impl CredentialVerifier {
    /// Create a verifier over `store`.
    ///
    /// `hash_params` sets the cost of new login hashes; `key_scheme` is
    /// recorded on each new user to fix how their encryption key is derived.
    pub fn new(store: Arc<dyn VaultStore>, hash_params: KdfParams, key_scheme: KeyScheme) -> Self {
        Self {
            store,
            hash_params,
            key_scheme,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `InvalidInput` if email or secret is empty
    /// - `DuplicateUser` if the email is already registered
    pub async fn register(&self, email: &str, secret: &[u8]) -> Result<UserId> {
        if email.is_empty() || secret.is_empty() {
            return Err(Error::InvalidInput("Missing fields".to_string()));
        }

        if self.store.find_user_by_email(email).await?.is_some() {
            debug!("Signup rejected: email already registered");
            return Err(Error::DuplicateUser);
        }

        let hashed = hash_blocking(secret, &self.hash_params).await?;
        let user = StoredUser {
            id: UserId::generate(),
            email: email.to_string(),
            hashed_master_password: hashed,
            key_derivation: self.key_scheme.instantiate(),
            created_at: Utc::now(),
        };
        let id = user.id.clone();

        self.store.insert_user(user).await?;
        info!(user = %id, "User registered");

        Ok(id)
    }

    /// Check an email and master secret, returning the user's id.
    ///
    /// # Errors
    /// - `InvalidCredentials` if the email is unknown or the secret is wrong
    pub async fn authenticate(&self, email: &str, secret: &[u8]) -> Result<UserId> {
        self.authenticate_user(email, secret).await.map(|user| user.id)
    }

    /// Like [`authenticate`](Self::authenticate), returning the full stored user.
    pub async fn authenticate_user(&self, email: &str, secret: &[u8]) -> Result<StoredUser> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            let decoy = self.decoy_hash().await?;
            verify_blocking(secret, decoy).await?;
            debug!("Login rejected");
            return Err(Error::InvalidCredentials);
        };

        if !verify_blocking(secret, &user.hashed_master_password).await? {
            debug!("Login rejected");
            return Err(Error::InvalidCredentials);
        }

        debug!(user = %user.id, "Login accepted");
        Ok(user)
    }

    /// Hash of [`DECOY_SECRET`] at the configured cost, built on first use.
    async fn decoy_hash(&self) -> Result<&str> {
        self.decoy_hash
            .get_or_try_init(|| hash_blocking(DECOY_SECRET, &self.hash_params))
            .await
            .map(String::as_str)
    }
}

/// Run the Argon2 hash off the async executor.
async fn hash_blocking(secret: &[u8], params: &KdfParams) -> Result<String> {
    let secret = Zeroizing::new(secret.to_vec());
    let params = params.clone();
    tokio::task::spawn_blocking(move || hash_password(&secret, &params))
        .await
        .map_err(|e| Error::Crypto(format!("Hashing task failed: {}", e)))?
}

async fn verify_blocking(secret: &[u8], stored: &str) -> Result<bool> {
    let secret = Zeroizing::new(secret.to_vec());
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || verify_password(&secret, &stored))
        .await
        .map_err(|e| Error::Crypto(format!("Verification task failed: {}", e)))?
}
