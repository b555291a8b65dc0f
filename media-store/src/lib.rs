//! # media-store: Azure Blob Storage for CMS media
//!
//! `media-store` lets a content-management host keep uploaded media in an
//! Azure storage container instead of on local disk. It implements the small
//! storage contract hosts expect (save / exists / open / delete) on top of the
//! blob service and adapts failures across that boundary:
//!
//! - **Lazy client**: the remote client is built on first use, once, and only
//!   when account, key and container are all configured
//! - **Idempotent provisioning**: the container is created on upload with
//!   public-read blob access if it is missing
//! - **Streaming**: uploads are staged in fixed-size blocks and downloads are
//!   returned as byte streams, so whole files are never buffered
//! - **Not-found translation**: a remote 404 becomes `false` from `exists` and
//!   a `NotFound` error from `open`, never a transport failure
//!
//! HTTP serving lives in `media-store-axum`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use media_store::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> StoreResult<()> {
//! let store = AzureBlobStore::new(StorageConfig::new("myaccount", "bXlrZXk=", "content"));
//!
//! let upload = UploadedFile::new("/tmp/upload_7f3a", "holiday.png");
//! let url = store.save(&upload, Some("2024/01")).await?;
//! // https://myaccount.blob.core.windows.net/content/2024/01/holiday.png
//!
//! assert!(store.exists("2024/01/holiday.png").await?);
//! assert!(store.delete("holiday.png", Some("2024/01")).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   CMS host       │  ← consumes StorageAdapter
//! ├──────────────────┤
//! │  AzureBlobStore  │  ← config, lazy client, naming, error translation
//! ├──────────────────┤
//! │   BlobService    │  ← remote primitives (Azure, in-memory)
//! └──────────────────┘
//! ```

pub mod adapter;
mod azure;
mod config;
mod error;
mod memory;
pub mod naming;
pub mod store;
mod types;

// Re-export main types for clean API
pub use adapter::{AzureBlobStore, StorageAdapter};
pub use azure::{AzureBlobService, AzureConnector};
pub use config::{StorageConfig, BLOB_DOMAIN, ENV_ACCESS_KEY, ENV_ACCOUNT, ENV_CONTAINER, PROTOCOL};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBlobService;
pub use store::{BlobService, BlobServiceConnector};
pub use types::{
    BlobProperties, ByteStream, ContainerAccess, OpenedBlob, UploadedFile, DEFAULT_CONTENT_TYPE,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AzureBlobStore, BlobService, ByteStream, OpenedBlob, StorageAdapter, StorageConfig,
        StoreError, StoreResult, UploadedFile,
    };
}
