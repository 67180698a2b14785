//! Core types for picturegate
//!
//! This crate provides the error taxonomy and request identifiers used by the
//! HTTP layer.

pub mod error;
pub mod request_id;

pub use error::{ApiError, ErrorCode};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
