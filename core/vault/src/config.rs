//! Vault configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use keyward_common::{Error, Result};
use keyward_crypto::{KdfParams, KeyScheme};

/// Default bound on records decrypted in parallel.
pub const DEFAULT_LOAD_CONCURRENCY: usize = 4;

/// Vault configuration.
///
/// Controls how new users are set up and how batches are loaded. Settings
/// that affect existing data (the key scheme) are copied onto each user at
/// signup, so changing them here only affects users registered afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Encryption key derivation applied to new users.
    pub key_scheme: KeyScheme,
    /// Argon2id cost of the login hash.
    pub credential_params: KdfParams,
    /// Maximum number of records decrypted at once.
    pub load_concurrency: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_scheme: KeyScheme::Direct,
            credential_params: KdfParams::interactive(),
            load_concurrency: DEFAULT_LOAD_CONCURRENCY,
        }
    }
}

impl VaultConfig {
    /// Check the configuration for values that would fail later.
    ///
    /// # Errors
    /// - `InvalidInput` if `load_concurrency` is zero
    /// - `Crypto` if any Argon2id parameters are out of range
    pub fn validate(&self) -> Result<()> {
        if self.load_concurrency == 0 {
            return Err(Error::InvalidInput(
                "load_concurrency must be at least 1".to_string(),
            ));
        }
        self.credential_params.to_argon2()?;
        if let KeyScheme::Argon2id { params } = &self.key_scheme {
            params.to_argon2()?;
        }
        Ok(())
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Write configuration to a JSON file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = VaultConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_scheme, KeyScheme::Direct);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VaultConfig::from_json(r#"{ "load_concurrency": 8 }"#).unwrap();
        assert_eq!(config.load_concurrency, 8);
        assert_eq!(config.key_scheme, KeyScheme::Direct);
        assert_eq!(config.credential_params, KdfParams::interactive());
    }

    #[test]
    fn test_argon2id_scheme_from_json() {
        let config = VaultConfig::from_json(
            r#"{
                "key_scheme": {
                    "scheme": "argon2id",
                    "params": { "memory_cost": 1024, "time_cost": 1, "parallelism": 1 }
                }
            }"#,
        )
        .unwrap();
        assert!(matches!(config.key_scheme, KeyScheme::Argon2id { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(VaultConfig::from_json(r#"{ "load_concurrency": 0 }"#).is_err());
        assert!(VaultConfig::from_json(
            r#"{ "credential_params": { "memory_cost": 1, "time_cost": 0, "parallelism": 1 } }"#
        )
        .is_err());
        assert!(VaultConfig::from_json("not json").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("keyward.json");

        let config = VaultConfig {
            load_concurrency: 2,
            ..VaultConfig::default()
        };
        config.save(&path).await.unwrap();

        assert_eq!(VaultConfig::load(&path).await.unwrap(), config);
    }
}
