//! S3 storage backend

use super::traits::*;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    error::DisplayErrorContext, primitives::ByteStream as S3ByteStream, types::ObjectCannedAcl,
    Client,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Connection settings for an S3 (or S3-compatible) bucket
#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    pub bucket: String,

    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint, e.g. MinIO or a local emulator
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,
}

/// Object storage backed by an S3 bucket
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the default AWS credential chain plus `settings`
    pub async fn from_settings(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.force_path_style)
            .build();

        Self::new(Client::from_conf(config), settings.bucket.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn canned_acl(acl: CannedAcl) -> ObjectCannedAcl {
    match acl {
        CannedAcl::Private => ObjectCannedAcl::Private,
        CannedAcl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

fn backend_error(err: impl std::error::Error) -> StorageError {
    StorageError::Backend(DisplayErrorContext(err).to_string())
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait]
impl PictureStorage for S3Storage {
    async fn upload(&self, request: UploadRequest) -> Result<UploadResult, StorageError> {
        let content_length = i64::try_from(request.data.len())
            .map_err(|_| StorageError::Internal("payload too large".to_string()))?;

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .content_type(request.content_type)
            .content_length(content_length)
            .acl(canned_acl(request.acl))
            .body(S3ByteStream::from(request.data))
            .send()
            .await
            .map_err(backend_error)?;

        let etag = output.e_tag().map(String::from);
        debug!(bucket = %self.bucket, key = %request.key, etag = ?etag, "PutObject complete");

        Ok(UploadResult { etag })
    }

    async fn retrieve(&self, key: &str) -> Result<Option<RetrievedObject>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Ok(None);
            }
            Err(err) => return Err(backend_error(err)),
        };

        let content_type = output.content_type().map(String::from);
        let content_length = output.content_length().and_then(|len| u64::try_from(len).ok());
        let etag = output.e_tag().map(String::from);
        let last_modified = output.last_modified().and_then(to_chrono);

        let body = ReaderStream::new(output.body.into_async_read());

        Ok(Some(RetrievedObject {
            key: key.to_string(),
            body: Box::pin(body),
            content_type,
            content_length,
            etag,
            last_modified,
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{retry::RetryConfig, Credentials};
    use bytes::Bytes;

    /// Client pointed at a port nothing listens on
    fn unreachable_storage() -> S3Storage {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .force_path_style(true)
            .build();
        S3Storage::new(Client::from_conf(config), "pictures")
    }

    #[test]
    fn test_canned_acl_mapping() {
        assert_eq!(canned_acl(CannedAcl::PublicRead), ObjectCannedAcl::PublicRead);
        assert_eq!(canned_acl(CannedAcl::Private), ObjectCannedAcl::Private);
    }

    #[test]
    fn test_timestamp_conversion() {
        let ts = aws_sdk_s3::primitives::DateTime::from_secs(1_700_000_000);
        let converted = to_chrono(&ts).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_settings_defaults() {
        let settings: S3Settings = serde_json::from_str(r#"{"bucket":"avatars"}"#).unwrap();
        assert_eq!(settings.bucket, "avatars");
        assert!(settings.region.is_none());
        assert!(settings.endpoint_url.is_none());
        assert!(!settings.force_path_style);
    }

    #[tokio::test]
    async fn test_upload_failure_is_backend_error() {
        let storage = unreachable_storage();
        assert_eq!(storage.bucket(), "pictures");

        let result = storage
            .upload(UploadRequest {
                key: "abc.jpg".to_string(),
                data: Bytes::from_static(b"jpeg"),
                content_type: "image/jpeg".to_string(),
                acl: CannedAcl::PublicRead,
            })
            .await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn test_retrieve_and_delete_failures_are_backend_errors() {
        let storage = unreachable_storage();

        assert!(matches!(
            storage.retrieve("abc.jpg").await,
            Err(StorageError::Backend(_))
        ));
        assert!(matches!(
            storage.delete("abc.jpg").await,
            Err(StorageError::Backend(_))
        ));
    }
}
