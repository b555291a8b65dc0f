use serde::Deserialize;

use crate::{StoreError, StoreResult};

/// Scheme used for generated public URLs
pub const PROTOCOL: &str = "https";

/// Public blob endpoint suffix for Azure storage accounts
pub const BLOB_DOMAIN: &str = "blob.core.windows.net";

pub const ENV_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
pub const ENV_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";
pub const ENV_CONTAINER: &str = "AZURE_STORAGE_CONTAINER";

/// Connection settings for the Azure storage account backing the media store.
///
/// Hosts usually pass this as the `storage.azure` block of their own config:
///
/// ```json
/// { "storageAccount": "myaccount", "accessKey": "...", "container": "content" }
/// ```
///
/// Any field left empty is filled from `AZURE_STORAGE_ACCOUNT`,
/// `AZURE_STORAGE_ACCESS_KEY` and `AZURE_STORAGE_CONTAINER` when the store is
/// constructed. Explicit values always win.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub storage_account: String,
    pub access_key: String,
    pub container: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("storage_account", &self.storage_account)
            .field("access_key", &if self.access_key.is_empty() { "" } else { "<redacted>" })
            .field("container", &self.container)
            .finish()
    }
}

impl StorageConfig {
    /// Create a config from explicit values
    pub fn new<A, K, C>(storage_account: A, access_key: K, container: C) -> Self
    where
        A: Into<String>,
        K: Into<String>,
        C: Into<String>,
    {
        Self {
            storage_account: storage_account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Build a config purely from the process environment
    pub fn from_env() -> Self {
        Self::default().with_env_fallback()
    }

    /// Parse the host's JSON config object
    pub fn from_json(value: serde_json::Value) -> StoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Fill empty fields from the process environment
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback(|key| std::env::var(key).ok())
    }

    /// Fill empty fields from an arbitrary lookup (environment-shaped keys)
    pub fn with_fallback<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn fill<F: Fn(&str) -> Option<String>>(field: &mut String, key: &str, lookup: &F) {
            if field.is_empty() {
                if let Some(value) = lookup(key) {
                    *field = value;
                }
            }
        }

        fill(&mut self.storage_account, ENV_ACCOUNT, &lookup);
        fill(&mut self.access_key, ENV_ACCESS_KEY, &lookup);
        fill(&mut self.container, ENV_CONTAINER, &lookup);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Fails with a configuration error naming every missing setting
    pub fn validate(&self) -> StoreResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::configuration(missing.join(", ")))
        }
    }

    /// `https://{account}.blob.core.windows.net/{container}/{blob_name}`
    pub fn public_url(&self, blob_name: &str) -> String {
        format!(
            "{}://{}.{}/{}/{}",
            PROTOCOL, self.storage_account, BLOB_DOMAIN, self.container, blob_name
        )
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.storage_account.trim().is_empty() {
            missing.push("storageAccount");
        }
        if self.access_key.trim().is_empty() {
            missing.push("accessKey");
        }
        if self.container.trim().is_empty() {
            missing.push("container");
        }
        missing
    }
}
