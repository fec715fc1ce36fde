// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Placeholder substitution at the host boundary.
//!
//! Providers and codecs always return errors. A host that must keep a graph running can opt into
//! [`HandlerPolicy::Substitute`], which swaps a failure for neutral media (one second of silence
//! or a black 512×512 image) and logs the error it swallowed.

use ccapi_core::{ImageBuffer, MediaBuffer, Result};
use serde::{Deserialize, Serialize};

/// Side of the square placeholder image.
pub const PLACEHOLDER_IMAGE_SIDE: u32 = 512;

const PLACEHOLDER_AUDIO_SECS: f64 = 1.0;

/// What to do with an error at the host boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum HandlerPolicy {
    /// Return the error to the host.
    #[default]
    Propagate,
    /// Replace the error with placeholder media (silence or a black image).
    Substitute,
}

impl HandlerPolicy {
    /// Applies the policy to an audio result. The placeholder is mono silence at `sample_rate`.
    ///
    /// # Errors
    ///
    /// The original error under [`HandlerPolicy::Propagate`]; under
    /// [`HandlerPolicy::Substitute`] only if `sample_rate` is zero.
    pub fn audio(self, result: Result<MediaBuffer>, sample_rate: u32) -> Result<MediaBuffer> {
        match (self, result) {
            (Self::Substitute, Err(err)) => {
                tracing::warn!(error = %err, sample_rate, "Substituting silence for failed audio");
                MediaBuffer::silence(sample_rate, 1, PLACEHOLDER_AUDIO_SECS)
            },
            (_, result) => result,
        }
    }

    /// Applies the policy to an image result.
    ///
    /// # Errors
    ///
    /// The original error under [`HandlerPolicy::Propagate`].
    pub fn image(self, result: Result<ImageBuffer>) -> Result<ImageBuffer> {
        match (self, result) {
            (Self::Substitute, Err(err)) => {
                tracing::warn!(error = %err, "Substituting blank image for failed generation");
                Ok(ImageBuffer::blank(PLACEHOLDER_IMAGE_SIDE, PLACEHOLDER_IMAGE_SIDE))
            },
            (_, result) => result,
        }
    }

    /// Like [`HandlerPolicy::image`] for multi-image results; the placeholder is one image.
    ///
    /// # Errors
    ///
    /// The original error under [`HandlerPolicy::Propagate`].
    pub fn images(self, result: Result<Vec<ImageBuffer>>) -> Result<Vec<ImageBuffer>> {
        match result {
            Ok(images) => Ok(images),
            Err(err) => self.image(Err(err)).map(|image| vec![image]),
        }
    }
}
