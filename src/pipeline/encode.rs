//! Image encoding: uploaded bytes → base64 `ImageData` for the VLM request.
//!
//! Hosted vision APIs take images as base64 data-URIs inside the JSON body
//! and accept only a handful of formats. Uploads already in one of those
//! formats are passed through untouched; anything else (BMP, TIFF, ...) is
//! decoded and re-encoded as lossless PNG first.

use crate::error::SnapTexError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Media types every supported provider accepts as-is.
const PASSTHROUGH_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg", "image/gif", "image/webp"];

/// Encode an uploaded image for a multimodal chat message.
///
/// `detail: "high"` asks GPT-4-class models for the full tile budget so
/// handwriting and small math glyphs stay legible.
pub fn encode_image(bytes: &[u8], media_type: &str) -> Result<ImageData, SnapTexError> {
    let (payload, mime) = if PASSTHROUGH_TYPES.contains(&media_type) {
        (STANDARD.encode(bytes), media_type)
    } else {
        let img = image::load_from_memory(bytes)
            .map_err(|e| SnapTexError::ImageDecode(e.to_string()))?;
        let png = encode_png(&img).map_err(|e| SnapTexError::ImageDecode(e.to_string()))?;
        debug!("Re-encoded {} upload as PNG", media_type);
        (STANDARD.encode(&png), "image/png")
    };
    debug!("Encoded image → {} bytes base64", payload.len());

    Ok(ImageData::new(payload, mime).with_detail("high"))
}

/// Lossless PNG encoding of a decoded image.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
