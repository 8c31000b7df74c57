//! Ingress validation: decide whether an upload may enter the pipeline.
//!
//! The declared media type is checked *before* the body is read, so a
//! caller who posts a PDF or a text file gets a 400 without the server
//! buffering the payload or touching the OCR engine.

use crate::error::SnapTexError;
use bytes::Bytes;
use tracing::debug;

/// Check that a declared media type names an image.
///
/// Returns the media type on success. `None` (no `Content-Type` on the
/// multipart field) is rejected like any other non-image type.
pub fn validate_media_type(content_type: Option<&str>) -> Result<&str, SnapTexError> {
    match content_type {
        Some(ct) if ct.trim_start().to_ascii_lowercase().starts_with("image/") => Ok(ct.trim()),
        other => Err(SnapTexError::NotAnImage {
            content_type: other.map(str::to_string),
        }),
    }
}

/// Raw image bytes plus the media type the client declared for them.
///
/// Construction goes through [`ImagePayload::new`], so a value of this type
/// always carries an `image/*` media type.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Bytes,
    media_type: String,
}

impl ImagePayload {
    /// Validate the media type and wrap the bytes.
    pub fn new(bytes: impl Into<Bytes>, media_type: &str) -> Result<Self, SnapTexError> {
        let media_type = validate_media_type(Some(media_type))?.to_ascii_lowercase();
        let bytes = bytes.into();
        debug!("Accepted {} upload ({} bytes)", media_type, bytes.len());
        Ok(Self { bytes, media_type })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the upload; clones the reference count, not the data.
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
