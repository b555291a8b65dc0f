use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Fallback content type when neither the upload nor the extension says otherwise
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file the host has already received and parked on local disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Local temporary path holding the bytes
    pub path: PathBuf,
    /// Original client-side filename
    pub name: String,
    /// MIME type reported by the uploader, if any
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

impl UploadedFile {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, name: S) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            content_type: None,
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared type, else a guess from the original name's extension
    pub fn resolved_content_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .or_else(|| {
                mime_guess::from_path(&self.name)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            })
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }
}

/// Access level applied when a container is provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAccess {
    /// No anonymous access
    Private,
    /// Anonymous read access to blob contents only
    Blob,
    /// Anonymous read access to blobs and container listings
    Container,
}

/// Metadata about a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_type: String,
    pub content_length: u64,
    pub etag: Option<String>,
    pub last_modified: Option<i64>,
}

impl BlobProperties {
    pub fn new<S: Into<String>>(content_type: S, content_length: u64) -> Self {
        Self {
            content_type: content_type.into(),
            content_length,
            etag: None,
            last_modified: None,
        }
    }
}

/// A blob opened for reading: its properties plus a lazily pulled body
pub struct OpenedBlob {
    pub properties: BlobProperties,
    pub stream: ByteStream,
}

impl std::fmt::Debug for OpenedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedBlob")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}
