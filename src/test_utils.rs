//! Test utilities for generating frame fixtures and protocol messages
//!
//! Fixtures are synthesized in memory; no captured backend traffic is needed.

#![cfg(any(test, feature = "benchmark"))]

use base64::{Engine, prelude::BASE64_STANDARD};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};

/// JPEG quality used for generated fixtures
pub const FIXTURE_JPEG_QUALITY: u8 = 85;

/// Encode a solid-color image as JPEG bytes.
pub fn jpeg_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, FIXTURE_JPEG_QUALITY)
        .encode(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .expect("in-memory JPEG encoding cannot fail");
    bytes
}

/// Encode a solid-color image as base64 JPEG, as the backend sends it.
pub fn jpeg_base64(width: u32, height: u32, rgb: [u8; 3]) -> String {
    BASE64_STANDARD.encode(jpeg_bytes(width, height, rgb))
}

/// Build a `streaming_view` message carrying the given payloads.
pub fn streaming_view_message(main_view: &str, god_view: Option<&str>) -> String {
    let mut message = serde_json::json!({
        "type": "streaming_view",
        "main_view": main_view,
    });
    if let Some(god_view) = god_view {
        message["god_view"] = serde_json::Value::from(god_view);
    }
    message.to_string()
}

/// Build a `connection_established` message advertising the given scene ids.
pub fn connection_established_message(scene_ids: &[&str]) -> String {
    let scenes: Vec<_> = scene_ids.iter().map(|id| serde_json::json!({ "id": id })).collect();
    let content = serde_json::json!({ "scenes": scenes }).to_string();
    serde_json::json!({ "type": "connection_established", "content": content }).to_string()
}
