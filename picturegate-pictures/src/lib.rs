//! Profile picture gateway for picturegate
//!
//! This crate maps the `/pictures` HTTP surface onto an object storage
//! backend. Keys are derived from the user identifier, payloads are written
//! with a public-read ACL, and downloads are streamed straight through.

pub mod handlers;
pub mod host;
pub mod service;
pub mod storage;

pub use handlers::{picture_routes, streamed_file_response, PicturesState, PICTURES_PREFIX};
pub use host::{DefaultHostResolver, HostResolver};
pub use service::{build_key, PictureGateway, UploadOutcome, UploadedFile};
