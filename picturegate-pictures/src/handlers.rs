//! Picture HTTP request handlers

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use picturegate_core::{ApiError, ErrorCode};
use std::sync::Arc;
use tracing::{error, warn};

use crate::service::{PictureGateway, UploadedFile, DEFAULT_CONTENT_TYPE};
use crate::storage::{RetrievedObject, StorageError};

pub use crate::service::PICTURES_PREFIX;

/// Multipart part carrying the picture
pub const FILE_PART: &str = "fileUpload";

/// Default cap on upload request bodies
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Cache policy sent with downloaded pictures
pub const DOWNLOAD_CACHE_CONTROL: &str = "private, max-age=60";

/// Shared state for picture handlers
pub struct PicturesState {
    pub gateway: PictureGateway,
    pub max_upload_bytes: usize,
}

impl PicturesState {
    pub fn new(gateway: PictureGateway) -> Self {
        Self {
            gateway,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Route table for `/pictures/:user_id`
pub fn picture_routes(state: Arc<PicturesState>) -> Router {
    let limit = state.max_upload_bytes;

    Router::new()
        .route(
            &format!("{PICTURES_PREFIX}/:user_id"),
            get(download_picture)
                .post(upload_picture)
                .delete(delete_picture),
        )
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// POST /pictures/:user_id
pub async fn upload_picture(
    State(state): State<Arc<PicturesState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::new(ErrorCode::InvalidMultipart, rejection.body_text())
    })?;

    let file = read_file_part(&mut multipart)
        .await?
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::MissingFilePart,
                format!("Required part '{FILE_PART}' is missing"),
            )
        })?;

    let outcome = state
        .gateway
        .upload(&user_id, file, &headers, &uri)
        .await
        .map_err(|e| storage_failure(&user_id, &e))?;

    let mut response_headers = HeaderMap::new();
    insert_header(&mut response_headers, header::LOCATION, &outcome.location);
    if let Some(etag) = &outcome.etag {
        insert_header(&mut response_headers, header::ETAG, etag);
    }

    Ok((StatusCode::CREATED, response_headers).into_response())
}

/// GET /pictures/:user_id
pub async fn download_picture(
    State(state): State<Arc<PicturesState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    match state.gateway.download(&user_id).await {
        Ok(Some(object)) => Ok(streamed_file_response(object)),
        Ok(None) => Err(ApiError::new(
            ErrorCode::NoSuchPicture,
            "No picture is stored for this user",
        )
        .with_resource(user_id)),
        Err(e) => Err(storage_failure(&user_id, &e)),
    }
}

/// DELETE /pictures/:user_id
pub async fn delete_picture(
    State(state): State<Arc<PicturesState>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .gateway
        .delete(&user_id)
        .await
        .map_err(|e| storage_failure(&user_id, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the download response for a stored object.
///
/// The body is forwarded chunk by chunk from storage.
pub fn streamed_file_response(object: RetrievedObject) -> Response {
    let mut headers = HeaderMap::new();

    let content_type = object
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(header::CONTENT_TYPE, content_type);

    if let Some(etag) = &object.etag {
        insert_header(&mut headers, header::ETAG, etag);
    }
    if let Some(len) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    if let Some(modified) = object.last_modified {
        let formatted = modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        insert_header(&mut headers, header::LAST_MODIFIED, &formatted);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(DOWNLOAD_CACHE_CONTROL),
    );
    insert_header(
        &mut headers,
        header::CONTENT_DISPOSITION,
        &attachment_disposition(&object.key),
    );

    (StatusCode::OK, headers, Body::from_stream(object.body)).into_response()
}

async fn read_file_part(multipart: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_PART) {
            continue;
        }

        let content_type = field.content_type().map(String::from);
        let filename = field.file_name().map(String::from);
        let data = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(UploadedFile {
            data,
            content_type,
            filename,
        }));
    }
    Ok(None)
}

// === Helper Functions ===

fn attachment_disposition(filename: &str) -> String {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{escaped}\"")
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!(header = %name, "Dropping header with non-visible characters"),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(ErrorCode::EntityTooLarge, "Uploaded file exceeds the size limit")
    } else {
        ApiError::new(ErrorCode::InvalidMultipart, err.body_text())
    }
}

fn storage_failure(user_id: &str, err: &StorageError) -> ApiError {
    error!(user_id = %user_id, error = %err, "Object storage request failed");
    ApiError::new(ErrorCode::StorageFailure, "Object storage request failed")
}
