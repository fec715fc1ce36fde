// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Image data URIs.
//!
//! Providers take images inline as `data:image/<fmt>;base64,<payload>`; bare base64 is
//! rejected. Results come back either as URLs or as inline base64, so decoding accepts both.

use crate::transport::HttpTransport;
use base64::Engine;
use ccapi_core::{CcApiError, ImageBuffer, Result};
use ::image::codecs::jpeg::JpegEncoder;
use ::image::codecs::png::PngEncoder;
use ::image::{ExtendedColorType, ImageEncoder};

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encodes `buffer` as a JPEG data URI. Alpha is dropped; `quality` is clamped to 1..=100.
///
/// # Errors
///
/// Returns `CcApiError::Image` if encoding fails.
pub fn to_base64_jpeg(buffer: &ImageBuffer, quality: u8) -> Result<String> {
    let (bytes, color) = encodable(buffer, false);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(&bytes, buffer.width(), buffer.height(), color)
        .map_err(|e| CcApiError::Image(format!("JPEG encoding failed: {e}")))?;
    Ok(data_uri(JPEG_DATA_URI_PREFIX, &out))
}

/// Encodes `buffer` as a lossless PNG data URI.
///
/// # Errors
///
/// Returns `CcApiError::Image` if encoding fails.
pub fn to_base64_png(buffer: &ImageBuffer) -> Result<String> {
    Ok(data_uri(PNG_DATA_URI_PREFIX, &to_png_bytes(buffer)?))
}

/// Encodes `buffer` as PNG file bytes.
///
/// # Errors
///
/// Returns `CcApiError::Image` if encoding fails.
pub fn to_png_bytes(buffer: &ImageBuffer) -> Result<Vec<u8>> {
    let (bytes, color) = encodable(buffer, true);
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&bytes, buffer.width(), buffer.height(), color)
        .map_err(|e| CcApiError::Image(format!("PNG encoding failed: {e}")))?;
    Ok(out)
}

fn data_uri(prefix: &str, encoded: &[u8]) -> String {
    let mut uri = String::with_capacity(prefix.len() + encoded.len() * 4 / 3 + 4);
    uri.push_str(prefix);
    base64::engine::general_purpose::STANDARD.encode_string(encoded, &mut uri);
    uri
}

fn encodable(buffer: &ImageBuffer, keep_alpha: bool) -> (Vec<u8>, ExtendedColorType) {
    let bytes = buffer.to_u8();
    match buffer.channels() {
        1 => (bytes, ExtendedColorType::L8),
        4 if keep_alpha => (bytes, ExtendedColorType::Rgba8),
        4 => (
            bytes.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect(),
            ExtendedColorType::Rgb8,
        ),
        _ => (bytes, ExtendedColorType::Rgb8),
    }
}

/// Decodes JPEG/PNG bytes into an [`ImageBuffer`].
///
/// Grayscale stays single-channel, images with alpha become RGBA, everything else RGB.
///
/// # Errors
///
/// Returns `CcApiError::Image` if the bytes are not a supported image.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<ImageBuffer> {
    let decoded = ::image::load_from_memory(bytes)
        .map_err(|e| CcApiError::Image(format!("Failed to decode image: {e}")))?;
    let (width, height) = (decoded.width(), decoded.height());
    let color = decoded.color();

    let (channels, raw): (u8, Vec<u8>) = if color.has_alpha() {
        (4, decoded.into_rgba8().into_raw())
    } else if color.has_color() {
        (3, decoded.into_rgb8().into_raw())
    } else {
        (1, decoded.into_luma8().into_raw())
    };

    let pixels = raw.into_iter().map(|v| f32::from(v) / 255.0).collect();
    ImageBuffer::new(width, height, channels, pixels)
}

/// Decodes inline base64, with or without a `data:` URI prefix.
///
/// # Errors
///
/// Returns `CcApiError::Image` for invalid base64 or undecodable image bytes.
pub fn decode_image_b64(value: &str) -> Result<ImageBuffer> {
    let payload = strip_data_uri(value.trim());
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| CcApiError::Image(format!("Invalid base64 image payload: {e}")))?;
    decode_image_bytes(&bytes)
}

/// Fetches an HTTP(S) URL or decodes an inline base64 payload.
///
/// # Errors
///
/// Returns `CcApiError::Http` for a failed download, `CcApiError::Network` if the request
/// could not be sent, and `CcApiError::Image` for undecodable content.
pub async fn from_url_or_b64(value: &str, transport: &dyn HttpTransport) -> Result<ImageBuffer> {
    let value = value.trim();
    if is_http_url(value) {
        let response = transport.get(value, None, &[]).await?;
        if !response.is_success() {
            return Err(CcApiError::Http { status: response.status, body: response.text() });
        }
        tracing::debug!(url = value, bytes = response.body.len(), "Downloaded image");
        return decode_image_bytes(&response.body);
    }
    decode_image_b64(value)
}

fn is_http_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn strip_data_uri(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some((_, payload)) = value.split_once(',') {
            return payload;
        }
    }
    value
}
