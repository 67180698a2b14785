//! Picture gateway service

use crate::host::HostResolver;
use crate::storage::{CannedAcl, PictureStorage, RetrievedObject, StorageError, UploadRequest};
use axum::http::{HeaderMap, Uri};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::sync::Arc;
use tracing::{debug, info};

/// URL prefix the picture routes are mounted under
pub const PICTURES_PREFIX: &str = "/pictures";

/// Suffix appended to a user identifier to form its storage key
pub const KEY_SUFFIX: &str = ".jpg";

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Characters escaped in a single URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Storage key for a user's picture
pub fn build_key(user_id: &str) -> String {
    format!("{user_id}{KEY_SUFFIX}")
}

/// A file received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub key: String,
    pub location: String,
    pub etag: Option<String>,
}

/// Translates picture operations into storage calls
#[derive(Clone)]
pub struct PictureGateway {
    storage: Arc<dyn PictureStorage>,
    host_resolver: Arc<dyn HostResolver>,
}

impl PictureGateway {
    pub fn new(storage: Arc<dyn PictureStorage>, host_resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            storage,
            host_resolver,
        }
    }

    /// Get reference to storage backend
    pub fn storage(&self) -> &Arc<dyn PictureStorage> {
        &self.storage
    }

    /// Store `file` as the picture of `user_id`, replacing any previous one
    pub async fn upload(
        &self,
        user_id: &str,
        file: UploadedFile,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> Result<UploadOutcome, StorageError> {
        let key = build_key(user_id);
        let size = file.data.len();
        let filename = file.filename.unwrap_or_default();
        let request = UploadRequest {
            key: key.clone(),
            data: file.data,
            content_type: file
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            acl: CannedAcl::PublicRead,
        };

        let result = self.storage.upload(request).await?;
        info!(
            user_id = %user_id,
            key = %key,
            filename = %filename,
            size,
            etag = ?result.etag,
            "Picture uploaded"
        );

        Ok(UploadOutcome {
            location: self.location(headers, uri, user_id),
            key,
            etag: result.etag,
        })
    }

    /// Open the stored picture of `user_id`, `None` when there is none
    pub async fn download(&self, user_id: &str) -> Result<Option<RetrievedObject>, StorageError> {
        let key = build_key(user_id);
        let object = self.storage.retrieve(&key).await?;
        debug!(user_id = %user_id, key = %key, found = object.is_some(), "Picture lookup");
        Ok(object)
    }

    /// Remove the picture of `user_id`; succeeds whether or not one existed
    pub async fn delete(&self, user_id: &str) -> Result<(), StorageError> {
        let key = build_key(user_id);
        self.storage.delete(&key).await?;
        info!(user_id = %user_id, key = %key, "Picture deleted");
        Ok(())
    }

    /// Absolute URL of the picture resource for `user_id`
    pub fn location(&self, headers: &HeaderMap, uri: &Uri, user_id: &str) -> String {
        let base = self.host_resolver.resolve(headers, uri);
        format!(
            "{}{}/{}",
            base,
            PICTURES_PREFIX,
            utf8_percent_encode(user_id, PATH_SEGMENT)
        )
    }
}
