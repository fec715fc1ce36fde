// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Image side of the media codec.

pub mod codec;
pub mod sizing;

pub use codec::{
    decode_image_b64, decode_image_bytes, from_url_or_b64, to_base64_jpeg, to_base64_png,
    to_png_bytes, JPEG_DATA_URI_PREFIX, PNG_DATA_URI_PREFIX,
};
pub use sizing::{aspect_ratio_fit, SizeBounds, SIZE_STEP};
