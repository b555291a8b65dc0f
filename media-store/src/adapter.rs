use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::naming::{self, candidate_name, join_blob_path, split_file_name};
use crate::{
    AzureConnector, BlobService, BlobServiceConnector, ContainerAccess, OpenedBlob, StorageConfig,
    StoreError, StoreResult, UploadedFile,
};

/// The storage contract a CMS host consumes.
///
/// Every operation fails with [`StoreError::Configuration`] before touching
/// the network when the adapter is not fully configured.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Upload `file` under `target_dir` (date-based default) and return its
    /// public URL
    async fn save(&self, file: &UploadedFile, target_dir: Option<&str>) -> StoreResult<String>;

    /// Whether a blob with this exact name exists
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Remove `target_dir/name`. Remote failures resolve to `false`.
    async fn delete(&self, name: &str, target_dir: Option<&str>) -> StoreResult<bool>;

    /// Properties plus a streamed body, for serving
    async fn open(&self, name: &str) -> StoreResult<OpenedBlob>;

    /// Cheap readiness check performed before handing out request handlers
    fn check_ready(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Media storage backed by one Azure storage container.
///
/// The remote client is created on first use and memoized for the lifetime of
/// the store; it is never rebuilt.
pub struct AzureBlobStore {
    config: StorageConfig,
    connector: Arc<dyn BlobServiceConnector>,
    client: OnceCell<Arc<dyn BlobService>>,
}

impl std::fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("config", &self.config)
            .field("connected", &self.client.get().is_some())
            .finish()
    }
}

impl AzureBlobStore {
    /// Create a store, filling unset settings from the environment
    pub fn new(config: StorageConfig) -> Self {
        Self::with_connector(config.with_env_fallback(), AzureConnector)
    }

    /// Create from the host's JSON config object
    pub fn from_json(value: serde_json::Value) -> StoreResult<Self> {
        Ok(Self::new(StorageConfig::from_json(value)?))
    }

    /// Create with a custom client factory. The config is used as given.
    pub fn with_connector<C: BlobServiceConnector + 'static>(config: StorageConfig, connector: C) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn container(&self) -> &str {
        &self.config.container
    }

    /// Validate configuration and return the memoized client, building it on
    /// first call. Concurrent first calls still yield a single client.
    pub fn ensure_client(&self) -> StoreResult<Arc<dyn BlobService>> {
        self.config.validate()?;

        let client = self.client.get_or_try_init(|| {
            tracing::debug!(
                account = %self.config.storage_account,
                container = %self.config.container,
                "initializing blob service client"
            );
            self.connector
                .connect(&self.config.storage_account, &self.config.access_key)
        })?;

        Ok(Arc::clone(client))
    }

    /// First free name in `target_dir` for the upload's original filename
    pub async fn unique_file_name(&self, file: &UploadedFile, target_dir: &str) -> StoreResult<String> {
        let (stem, ext) = split_file_name(&file.name);
        let (name, _) = self.free_candidate(target_dir, &stem, &ext, 0).await?;
        Ok(name)
    }

    /// First candidate at or after `attempt` that does not exist yet
    async fn free_candidate(
        &self,
        target_dir: &str,
        stem: &str,
        ext: &str,
        mut attempt: u32,
    ) -> StoreResult<(String, u32)> {
        loop {
            let candidate = candidate_name(target_dir, stem, ext, attempt);
            if !self.exists(&candidate).await? {
                return Ok((candidate, attempt));
            }
            attempt = Self::next_attempt(attempt, stem)?;
        }
    }

    fn next_attempt(attempt: u32, stem: &str) -> StoreResult<u32> {
        attempt
            .checked_add(1)
            .ok_or_else(|| StoreError::invalid(format!("no free name for {stem}")))
    }

    /// Uploads are create-only, so a name taken between the probe and the
    /// write moves on to the next candidate instead of replacing the blob.
    async fn upload(&self, client: &dyn BlobService, file: &UploadedFile, target_dir: &str) -> StoreResult<String> {
        let (stem, ext) = split_file_name(&file.name);
        let (mut blob_name, mut attempt) = self.free_candidate(target_dir, &stem, &ext, 0).await?;

        client
            .create_container_if_not_exists(&self.config.container, ContainerAccess::Blob)
            .await?;

        let content_type = file.resolved_content_type();
        let size = loop {
            match client
                .upload_file(&self.config.container, &blob_name, file.path(), &content_type)
                .await
            {
                Ok(size) => break size,
                Err(err) if err.is_already_exists() => {
                    tracing::debug!(blob = %blob_name, "name taken during upload, retrying");
                    let next = Self::next_attempt(attempt, &stem)?;
                    (blob_name, attempt) = self.free_candidate(target_dir, &stem, &ext, next).await?;
                }
                Err(err) => return Err(err),
            }
        };

        tracing::info!(
            path = %file.path.display(),
            blob = %blob_name,
            size,
            "uploaded temp file"
        );

        Ok(self.config.public_url(&blob_name))
    }
}

#[async_trait]
impl StorageAdapter for AzureBlobStore {
    async fn save(&self, file: &UploadedFile, target_dir: Option<&str>) -> StoreResult<String> {
        let target_dir = target_dir
            .map(str::to_string)
            .unwrap_or_else(naming::current_target_dir);

        let client = self.ensure_client()?;

        self.upload(client.as_ref(), file, &target_dir)
            .await
            .map_err(|err| {
                tracing::error!(path = %file.path.display(), error = %err, "upload failed");
                err
            })
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let client = self.ensure_client()?;

        match client.get_properties(&self.config.container, name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn delete(&self, name: &str, target_dir: Option<&str>) -> StoreResult<bool> {
        let target_dir = target_dir
            .map(str::to_string)
            .unwrap_or_else(naming::current_target_dir);
        let blob_name = join_blob_path(&target_dir, name);

        let client = self.ensure_client()?;

        match client.delete_blob(&self.config.container, &blob_name).await {
            Ok(()) => {
                tracing::info!(blob = %blob_name, "deleted file");
                Ok(true)
            }
            Err(err) => {
                tracing::error!(blob = %blob_name, error = %err, "delete failed");
                Ok(false)
            }
        }
    }

    async fn open(&self, name: &str) -> StoreResult<OpenedBlob> {
        let client = self.ensure_client()?;

        let properties = client.get_properties(&self.config.container, name).await?;
        // Pin the read to the version the properties describe.
        let stream = client
            .download(&self.config.container, name, properties.etag.as_deref())
            .await?;

        Ok(OpenedBlob { properties, stream })
    }

    fn check_ready(&self) -> StoreResult<()> {
        self.ensure_client().map(|_| ())
    }
}
