use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use azure_core::error::{Error as AzureError, ErrorKind};
use azure_core::request_options::IfMatchCondition;
use azure_storage::StorageCredentials;
use azure_storage_blobs::blob::{BlobBlockType, BlockList};
use azure_storage_blobs::container::PublicAccess;
use azure_storage_blobs::prelude::{BlobClient, BlobContentType, BlobServiceClient, BlockId, ClientBuilder};
use futures_util::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    BlobProperties, BlobService, BlobServiceConnector, ByteStream, ContainerAccess, StoreError,
    StoreResult,
};

/// Size of each staged block. Azure allows 50k blocks per blob, so this caps
/// a single upload at roughly 200GB.
const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// [`BlobService`] backed by the Azure Blob Storage REST API
#[derive(Clone)]
pub struct AzureBlobService {
    account: String,
    client: BlobServiceClient,
}

impl std::fmt::Debug for AzureBlobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobService")
            .field("account", &self.account)
            .finish()
    }
}

impl AzureBlobService {
    /// Shared-key client for `account`
    pub fn new(account: &str, access_key: &str) -> Self {
        let credentials = StorageCredentials::access_key(account.to_string(), access_key.to_string());
        let client = ClientBuilder::new(account.to_string(), credentials).blob_service_client();

        tracing::debug!(account, "created azure blob service client");

        Self {
            account: account.to_string(),
            client,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn blob_client(&self, container: &str, name: &str) -> BlobClient {
        self.client.container_client(container).blob_client(name)
    }

    fn http_status(err: &AzureError) -> Option<u16> {
        match err.kind() {
            ErrorKind::HttpResponse { status, .. } => Some(u16::from(*status)),
            _ => None,
        }
    }

    /// 404 becomes `NotFound`, everything else keeps its status
    fn map_azure_error(err: AzureError, name: &str) -> StoreError {
        match Self::http_status(&err) {
            Some(404) => StoreError::not_found(name),
            Some(status) => StoreError::backend_status(status, err),
            None => StoreError::backend(err),
        }
    }

    /// Upload errors: a taken name (409, or 412 from the create-only
    /// condition) becomes `AlreadyExists`
    fn map_upload_error(err: AzureError, name: &str) -> StoreError {
        match Self::http_status(&err) {
            Some(409) | Some(412) => StoreError::already_exists(name),
            _ => Self::map_azure_error(err, name),
        }
    }
}

/// Splits a reader into blocks of at most `block_size` bytes, holding one
/// block in memory at a time.
///
/// The first block is always returned, even when empty. A short block ends
/// the input.
struct BlockReader<R> {
    reader: R,
    block_size: usize,
    started: bool,
    done: bool,
}

impl<R: AsyncRead + Unpin> BlockReader<R> {
    fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size,
            started: false,
            done: false,
        }
    }

    async fn next_block(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        let mut block = Vec::with_capacity(self.block_size);
        (&mut self.reader)
            .take(self.block_size as u64)
            .read_to_end(&mut block)
            .await?;

        if block.len() < self.block_size {
            self.done = true;
        }
        if block.is_empty() && self.started {
            return Ok(None);
        }
        self.started = true;
        Ok(Some(block))
    }

    /// Whether the first block already holds the whole input
    fn is_single(&self, first: &[u8]) -> bool {
        first.len() < self.block_size
    }
}

#[async_trait]
impl BlobService for AzureBlobService {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> StoreResult<bool> {
        let public_access = match access {
            ContainerAccess::Private => PublicAccess::None,
            ContainerAccess::Blob => PublicAccess::Blob,
            ContainerAccess::Container => PublicAccess::Container,
        };

        match self
            .client
            .container_client(container)
            .create()
            .public_access(public_access)
            .await
        {
            Ok(_) => {
                tracing::debug!(container, "created container");
                Ok(true)
            }
            Err(err) if Self::http_status(&err) == Some(409) => {
                tracing::debug!(container, "container already exists");
                Ok(false)
            }
            Err(err) => Err(Self::map_azure_error(err, container)),
        }
    }

    async fn upload_file(
        &self,
        container: &str,
        name: &str,
        path: &Path,
        content_type: &str,
    ) -> StoreResult<u64> {
        let client = self.blob_client(container, name);
        let file = tokio::fs::File::open(path).await?;
        let mut reader = BlockReader::new(file, BLOCK_SIZE);

        let first = reader.next_block().await?.unwrap_or_default();
        let mut written = first.len() as u64;

        if reader.is_single(&first) {
            client
                .put_block_blob(first)
                .content_type(BlobContentType::from(content_type.to_string()))
                .if_match(IfMatchCondition::NotMatch("*".to_string()))
                .await
                .map_err(|e| Self::map_upload_error(e, name))?;
            return Ok(written);
        }

        let mut blocks = Vec::new();
        let mut next = Some(first);
        while let Some(block) = next {
            let block_id = BlockId::new(uuid::Uuid::new_v4().as_bytes().to_vec());
            client
                .put_block(block_id.clone(), block)
                .await
                .map_err(|e| Self::map_azure_error(e, name))?;
            blocks.push(BlobBlockType::Uncommitted(block_id));

            tracing::trace!(blob = name, blocks = blocks.len(), written, "staged block");

            next = reader.next_block().await?;
            if let Some(block) = &next {
                written += block.len() as u64;
            }
        }

        client
            .put_block_list(BlockList { blocks })
            .content_type(BlobContentType::from(content_type.to_string()))
            .if_match(IfMatchCondition::NotMatch("*".to_string()))
            .await
            .map_err(|e| Self::map_upload_error(e, name))?;

        Ok(written)
    }

    async fn get_properties(&self, container: &str, name: &str) -> StoreResult<BlobProperties> {
        let response = self
            .blob_client(container, name)
            .get_properties()
            .await
            .map_err(|e| Self::map_azure_error(e, name))?;

        let properties = response.blob.properties;
        Ok(BlobProperties {
            content_type: properties.content_type,
            content_length: properties.content_length,
            etag: Some(properties.etag.to_string()),
            last_modified: Some(properties.last_modified.unix_timestamp()),
        })
    }

    async fn download(
        &self,
        container: &str,
        name: &str,
        etag: Option<&str>,
    ) -> StoreResult<ByteStream> {
        let mut request = self.blob_client(container, name).get();
        if let Some(etag) = etag {
            request = request.if_match(IfMatchCondition::Match(etag.to_string()));
        }

        let stream = request
            .into_stream()
            .map_ok(|response| response.data.map_err(std::io::Error::other))
            .map_err(std::io::Error::other)
            .try_flatten();

        Ok(Box::pin(stream))
    }

    async fn delete_blob(&self, container: &str, name: &str) -> StoreResult<()> {
        self.blob_client(container, name)
            .delete()
            .await
            .map_err(|e| Self::map_azure_error(e, name))?;
        Ok(())
    }
}

/// Connects [`AzureBlobService`] clients with shared-key credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureConnector;

impl BlobServiceConnector for AzureConnector {
    fn connect(&self, account: &str, access_key: &str) -> StoreResult<Arc<dyn BlobService>> {
        Ok(Arc::new(AzureBlobService::new(account, access_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn blocks_of(input: &[u8], block_size: usize) -> (bool, Vec<usize>) {
        let mut reader = BlockReader::new(input, block_size);
        let first = reader.next_block().await.unwrap().unwrap();
        let single = reader.is_single(&first);

        let mut sizes = vec![first.len()];
        while let Some(block) = reader.next_block().await.unwrap() {
            sizes.push(block.len());
        }
        (single, sizes)
    }

    #[tokio::test]
    async fn empty_input_is_one_empty_request() {
        assert_eq!(blocks_of(b"", 4).await, (true, vec![0]));
    }

    #[tokio::test]
    async fn short_input_is_one_request() {
        assert_eq!(blocks_of(b"abc", 4).await, (true, vec![3]));
    }

    #[tokio::test]
    async fn exact_block_is_staged_without_trailing_empty_block() {
        assert_eq!(blocks_of(b"abcd", 4).await, (false, vec![4]));
        assert_eq!(blocks_of(b"abcdefgh", 4).await, (false, vec![4, 4]));
    }

    #[tokio::test]
    async fn one_byte_over_adds_a_short_block() {
        assert_eq!(blocks_of(b"abcde", 4).await, (false, vec![4, 1]));
    }

    #[tokio::test]
    async fn real_block_size_boundaries() {
        let data = vec![0u8; BLOCK_SIZE + 1];

        assert_eq!(
            blocks_of(&data[..BLOCK_SIZE - 1], BLOCK_SIZE).await,
            (true, vec![BLOCK_SIZE - 1])
        );
        assert_eq!(
            blocks_of(&data[..BLOCK_SIZE], BLOCK_SIZE).await,
            (false, vec![BLOCK_SIZE])
        );
        assert_eq!(
            blocks_of(&data, BLOCK_SIZE).await,
            (false, vec![BLOCK_SIZE, 1])
        );
    }

    #[tokio::test]
    async fn blocks_preserve_content() {
        let mut reader = BlockReader::new(&b"hello world"[..], 4);
        let mut joined = Vec::new();
        while let Some(block) = reader.next_block().await.unwrap() {
            joined.extend(block);
        }
        assert_eq!(joined, b"hello world");
    }
}
