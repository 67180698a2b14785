//! In-memory ephemeral storage backend

use super::traits::*;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use md5::{Digest, Md5};

/// Size of the chunks handed out when streaming a stored object
const CHUNK_SIZE: usize = 64 * 1024;

/// In-memory stored object
struct InMemoryObject {
    data: Bytes,
    etag: String,
    content_type: String,
    acl: CannedAcl,
    last_modified: chrono::DateTime<Utc>,
}

/// Ephemeral (in-memory) storage backend
pub struct EphemeralStorage {
    objects: DashMap<String, InMemoryObject>,
}

impl Default for EphemeralStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStorage {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// ACL recorded for a key at its last write
    pub fn acl(&self, key: &str) -> Option<CannedAcl> {
        self.objects.get(key).map(|obj| obj.acl)
    }

    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        format!("\"{}\"", hex::encode(hasher.finalize()))
    }

    fn chunked(data: Bytes) -> ByteStream {
        let mut chunks: Vec<Result<Bytes, std::io::Error>> = Vec::with_capacity(data.len().div_ceil(CHUNK_SIZE));
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + CHUNK_SIZE).min(data.len());
            chunks.push(Ok(data.slice(offset..end)));
            offset = end;
        }
        Box::pin(futures::stream::iter(chunks))
    }
}

#[async_trait]
impl PictureStorage for EphemeralStorage {
    async fn upload(&self, request: UploadRequest) -> Result<UploadResult, StorageError> {
        let etag = Self::compute_etag(&request.data);

        self.objects.insert(
            request.key,
            InMemoryObject {
                data: request.data,
                etag: etag.clone(),
                content_type: request.content_type,
                acl: request.acl,
                last_modified: Utc::now(),
            },
        );

        Ok(UploadResult { etag: Some(etag) })
    }

    async fn retrieve(&self, key: &str) -> Result<Option<RetrievedObject>, StorageError> {
        let Some(obj) = self.objects.get(key) else {
            return Ok(None);
        };

        Ok(Some(RetrievedObject {
            key: key.to_string(),
            body: Self::chunked(obj.data.clone()),
            content_type: Some(obj.content_type.clone()),
            content_length: Some(obj.data.len() as u64),
            etag: Some(obj.etag.clone()),
            last_modified: Some(obj.last_modified),
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.remove(key);
        Ok(())
    }
}
