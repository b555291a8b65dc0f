use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{BlobProperties, ByteStream, ContainerAccess, StoreResult};

/// Remote blob service primitives the adapter is built on.
///
/// Implementations report a missing blob as [`crate::StoreError::NotFound`]
/// and every other remote failure as [`crate::StoreError::Backend`] with the
/// HTTP status when one is known.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Create the container if it does not exist yet. Returns `true` when it
    /// was created, `false` when it was already there.
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> StoreResult<bool>;

    /// Stream a local file into a new block blob, returning the bytes written.
    ///
    /// Never replaces an existing blob: a taken name fails with
    /// [`crate::StoreError::AlreadyExists`].
    async fn upload_file(
        &self,
        container: &str,
        name: &str,
        path: &Path,
        content_type: &str,
    ) -> StoreResult<u64>;

    /// Fetch blob metadata without content
    async fn get_properties(&self, container: &str, name: &str) -> StoreResult<BlobProperties>;

    /// Open a streamed read of the blob content. With `etag` set, the read
    /// fails instead of returning content from a newer version of the blob.
    async fn download(
        &self,
        container: &str,
        name: &str,
        etag: Option<&str>,
    ) -> StoreResult<ByteStream>;

    /// Delete a blob
    async fn delete_blob(&self, container: &str, name: &str) -> StoreResult<()>;
}

/// Builds a [`BlobService`] bound to one account/key pair
pub trait BlobServiceConnector: Send + Sync {
    fn connect(&self, account: &str, access_key: &str) -> StoreResult<Arc<dyn BlobService>>;
}

impl<F> BlobServiceConnector for F
where
    F: Fn(&str, &str) -> StoreResult<Arc<dyn BlobService>> + Send + Sync,
{
    fn connect(&self, account: &str, access_key: &str) -> StoreResult<Arc<dyn BlobService>> {
        self(account, access_key)
    }
}
