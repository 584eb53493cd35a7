//! Base64 image payload decoding

use base64::{Engine, prelude::BASE64_STANDARD};
use image::RgbaImage;

use crate::{Result, ViewerError};

/// Decode a base64-encoded compressed image into RGBA pixels.
///
/// Accepts bare base64 as sent in `streaming_view` messages, or a
/// `data:image/...;base64,` URL. JPEG is the wire format; PNG is accepted too.
/// `surface` only labels the error.
pub fn decode_payload(surface: &str, payload: &str) -> Result<RgbaImage> {
    let encoded = strip_data_url(payload.trim());
    if encoded.is_empty() {
        return Err(ViewerError::decode(surface, "empty payload"));
    }

    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| ViewerError::decode(surface, format!("invalid base64: {e}")))?;

    let image = image::load_from_memory(&bytes)
        .map_err(|e| ViewerError::decode(surface, format!("invalid image: {e}")))?;

    Ok(image.to_rgba8())
}

fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some((_, data)) = payload.split_once("base64,") {
            return data;
        }
    }
    payload
}
