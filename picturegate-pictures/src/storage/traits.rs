//! Storage backend traits

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Boxed stream of body chunks read from storage
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Canned access-control directive applied at write time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CannedAcl {
    Private,
    #[default]
    PublicRead,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
        }
    }
}

/// Object to be written
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: String,
    pub data: Bytes,
    pub content_type: String,
    pub acl: CannedAcl,
}

/// Result of an upload
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Entity tag reported by the backend, if any
    pub etag: Option<String>,
}

/// An object read back from storage.
///
/// The body is a stream so that callers can forward it without holding the
/// whole payload in memory.
pub struct RetrievedObject {
    pub key: String,
    pub body: ByteStream,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for RetrievedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievedObject")
            .field("key", &self.key)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// Abstract storage backend trait
#[async_trait]
pub trait PictureStorage: Send + Sync {
    /// Write an object, replacing whatever is stored under the same key
    async fn upload(&self, request: UploadRequest) -> Result<UploadResult, StorageError>;

    /// Read an object; `None` when nothing is stored under the key
    async fn retrieve(&self, key: &str) -> Result<Option<RetrievedObject>, StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
