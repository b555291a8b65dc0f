use std::collections::HashMap;
use std::path::Path;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{BlobProperties, BlobService, ByteStream, ContainerAccess, StoreError, StoreResult};

/// Chunk size used when replaying stored content as a stream
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    data: Bytes,
    etag: String,
    last_modified: i64,
}

/// In-process [`BlobService`] for tests and local development.
///
/// Every call is counted, and a failure status can be injected so callers can
/// exercise the remote error paths without a network.
#[derive(Debug, Default)]
pub struct MemoryBlobService {
    containers: RwLock<HashMap<String, ContainerAccess>>,
    blobs: RwLock<HashMap<(String, String), StoredBlob>>,
    failing: RwLock<HashMap<&'static str, u16>>,
    calls: AtomicUsize,
    versions: AtomicU64,
}

impl MemoryBlobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remote calls issued so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every call to `operation` fail with the given HTTP status.
    ///
    /// Operation names match the [`BlobService`] method names.
    pub fn fail(&self, operation: &'static str, status: u16) {
        self.failing.write().insert(operation, status);
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        self.failing.write().clear();
    }

    /// Seed a blob directly, bypassing upload. Replaces any existing content
    /// and gives the blob a fresh etag.
    pub fn insert<B: Into<Bytes>>(&self, container: &str, name: &str, content_type: &str, data: B) {
        let blob = self.stored(content_type, data.into());
        self.blobs
            .write()
            .insert((container.to_string(), name.to_string()), blob);
    }

    /// Raw content of a stored blob
    pub fn content(&self, container: &str, name: &str) -> Option<Bytes> {
        self.blobs
            .read()
            .get(&(container.to_string(), name.to_string()))
            .map(|blob| blob.data.clone())
    }

    pub fn container_access(&self, container: &str) -> Option<ContainerAccess> {
        self.containers.read().get(container).copied()
    }

    fn stored(&self, content_type: &str, data: Bytes) -> StoredBlob {
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        StoredBlob {
            content_type: content_type.to_string(),
            data,
            etag: format!("\"0x{version:X}\""),
            last_modified: chrono::Utc::now().timestamp(),
        }
    }

    fn enter(&self, operation: &'static str) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.failing.read().get(operation).copied() {
            return Err(StoreError::backend_status(
                status,
                format!("injected failure for {operation}"),
            ));
        }
        Ok(())
    }

    fn lookup(&self, container: &str, name: &str) -> StoreResult<StoredBlob> {
        self.blobs
            .read()
            .get(&(container.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }
}

#[async_trait]
impl BlobService for MemoryBlobService {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> StoreResult<bool> {
        self.enter("create_container_if_not_exists")?;
        let mut containers = self.containers.write();
        if containers.contains_key(container) {
            return Ok(false);
        }
        containers.insert(container.to_string(), access);
        Ok(true)
    }

    async fn upload_file(
        &self,
        container: &str,
        name: &str,
        path: &Path,
        content_type: &str,
    ) -> StoreResult<u64> {
        self.enter("upload_file")?;
        if !self.containers.read().contains_key(container) {
            return Err(StoreError::backend_status(
                404,
                format!("container {container} does not exist"),
            ));
        }

        let data = tokio::fs::read(path).await?;
        let len = data.len() as u64;
        let blob = self.stored(content_type, data.into());

        match self.blobs.write().entry((container.to_string(), name.to_string())) {
            Entry::Occupied(_) => Err(StoreError::already_exists(name)),
            Entry::Vacant(slot) => {
                slot.insert(blob);
                Ok(len)
            }
        }
    }

    async fn get_properties(&self, container: &str, name: &str) -> StoreResult<BlobProperties> {
        self.enter("get_properties")?;
        let blob = self.lookup(container, name)?;
        Ok(BlobProperties {
            content_type: blob.content_type,
            content_length: blob.data.len() as u64,
            etag: Some(blob.etag),
            last_modified: Some(blob.last_modified),
        })
    }

    async fn download(
        &self,
        container: &str,
        name: &str,
        etag: Option<&str>,
    ) -> StoreResult<ByteStream> {
        self.enter("download")?;
        let blob = self.lookup(container, name)?;
        if etag.is_some_and(|etag| etag != blob.etag) {
            return Err(StoreError::backend_status(
                412,
                format!("{name} changed since it was opened"),
            ));
        }

        let chunks: Vec<Result<Bytes, std::io::Error>> = (0..blob.data.len())
            .step_by(READ_CHUNK)
            .map(|start| {
                let end = (start + READ_CHUNK).min(blob.data.len());
                Ok(blob.data.slice(start..end))
            })
            .collect();

        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }

    async fn delete_blob(&self, container: &str, name: &str) -> StoreResult<()> {
        self.enter("delete_blob")?;
        self.blobs
            .write()
            .remove(&(container.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(name))
    }
}
