//! Object storage backends

mod ephemeral;
mod s3;
mod traits;


pub use ephemeral::EphemeralStorage;
pub use s3::{S3Settings, S3Storage};
pub use traits::{
    ByteStream, CannedAcl, PictureStorage, RetrievedObject, StorageError, UploadRequest,
    UploadResult,
};

/// Drain a retrieved body into memory
#[cfg(test)]
pub(crate) async fn collect_body(body: ByteStream) -> Result<Vec<u8>, StorageError> {
    use futures::TryStreamExt;

    let chunks: Vec<bytes::Bytes> = body.try_collect().await?;
    Ok(chunks.concat())
}
