// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Canonical in-memory media and task types.
//!
//! This module defines the data structures shared by every provider adapter:
//! - [`MediaBuffer`]: Audio samples in [-1.0, 1.0] with explicit channel layout
//! - [`ImageBuffer`]: Row-major `[height, width, channels]` pixels in [0.0, 1.0]
//! - [`GenerationTask`]: In-flight handle of a remote asynchronous job
//!
//! Buffers are never mutated in place; every transformation returns a new buffer.

use crate::error::{CcApiError, Result};
use serde::{Deserialize, Serialize};

/// Arrangement of multi-channel samples inside [`MediaBuffer::samples`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// Frame-major: `L R L R ...`
    Interleaved,
    /// Channel-major: `L L L ... R R R ...` (shape `[channels, frames]`)
    Planar,
}

/// Audio samples with format metadata.
///
/// Invariant: `samples.len() % channels == 0`, `channels > 0`, `sample_rate > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    layout: ChannelLayout,
}

impl MediaBuffer {
    /// Builds a buffer after checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::MalformedAudio` if `channels` or `sample_rate` is zero, or if the
    /// sample count is not a whole number of frames.
    pub fn new(
        samples: Vec<f32>,
        channels: u16,
        sample_rate: u32,
        layout: ChannelLayout,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(CcApiError::MalformedAudio("channel count must be positive".to_string()));
        }
        if sample_rate == 0 {
            return Err(CcApiError::MalformedAudio("sample rate must be positive".to_string()));
        }
        if samples.len() % usize::from(channels) != 0 {
            return Err(CcApiError::MalformedAudio(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self { samples, channels, sample_rate, layout })
    }

    /// A buffer of digital silence lasting `duration_secs`.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::MalformedAudio` for a zero channel count or sample rate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn silence(sample_rate: u32, channels: u16, duration_secs: f64) -> Result<Self> {
        let frames = (f64::from(sample_rate) * duration_secs.max(0.0)).round() as usize;
        Self::new(
            vec![0.0; frames * usize::from(channels)],
            channels,
            sample_rate,
            ChannelLayout::Interleaved,
        )
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Number of samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Returns the samples of one channel in order.
    pub fn channel(&self, index: u16) -> Vec<f32> {
        let channels = usize::from(self.channels);
        let index = usize::from(index);
        if index >= channels {
            return Vec::new();
        }
        match self.layout {
            ChannelLayout::Planar => {
                let frames = self.frames();
                self.samples[index * frames..(index + 1) * frames].to_vec()
            },
            ChannelLayout::Interleaved => {
                self.samples.iter().skip(index).step_by(channels).copied().collect()
            },
        }
    }

    /// Returns a copy of this buffer rearranged into `layout`.
    #[must_use]
    pub fn to_layout(&self, layout: ChannelLayout) -> Self {
        if layout == self.layout || self.channels == 1 {
            return Self { layout, ..self.clone() };
        }
        let channels = usize::from(self.channels);
        let frames = self.frames();
        let mut out = vec![0.0; self.samples.len()];
        for frame in 0..frames {
            for ch in 0..channels {
                let (src, dst) = match layout {
                    ChannelLayout::Interleaved => (ch * frames + frame, frame * channels + ch),
                    ChannelLayout::Planar => (frame * channels + ch, ch * frames + frame),
                };
                out[dst] = self.samples[src];
            }
        }
        Self { samples: out, channels: self.channels, sample_rate: self.sample_rate, layout }
    }
}

/// Row-major pixel buffer, shape `[height, width, channels]`, values in [0.0, 1.0].
///
/// Invariant: `pixels.len() == width * height * channels`, `channels ∈ {1, 3, 4}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<f32>,
}

impl ImageBuffer {
    /// # Errors
    ///
    /// Returns `CcApiError::Image` if the channel count is unsupported or the pixel count does
    /// not match the dimensions.
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<f32>) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(CcApiError::Image(format!("unsupported channel count {channels}")));
        }
        let expected = (width as usize) * (height as usize) * usize::from(channels);
        if pixels.len() != expected {
            return Err(CcApiError::Image(format!(
                "expected {expected} values for {width}x{height}x{channels}, got {}",
                pixels.len()
            )));
        }
        Ok(Self { width, height, channels, pixels })
    }

    /// A black RGB image.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize) * 3;
        Self { width, height, channels: 3, pixels: vec![0.0; len] }
    }

    /// Converts a host image tensor into the canonical layout.
    ///
    /// Accepted shapes are `[H, W]` (grayscale), `[H, W, C]` and `[B, H, W, C]`. For batched
    /// input only the first image is taken.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::Image` for other ranks, an empty batch, or mismatched data length.
    pub fn from_host_tensor(shape: &[usize], data: &[f32]) -> Result<Self> {
        let (height, width, channels) = match *shape {
            [h, w] => (h, w, 1),
            [h, w, c] => (h, w, c),
            [0, ..] => return Err(CcApiError::Image("empty image batch".to_string())),
            [b, h, w, c] => {
                if b > 1 {
                    tracing::debug!(batch = b, "Using first image of batch");
                }
                (h, w, c)
            },
            _ => {
                return Err(CcApiError::Image(format!("unsupported image tensor shape {shape:?}")))
            },
        };
        let len = height * width * channels;
        if data.len() < len {
            return Err(CcApiError::Image(format!(
                "tensor shape {shape:?} needs {len} values, got {}",
                data.len()
            )));
        }
        let width = u32::try_from(width)
            .map_err(|_| CcApiError::Image(format!("width {width} exceeds u32::MAX")))?;
        let height = u32::try_from(height)
            .map_err(|_| CcApiError::Image(format!("height {height} exceeds u32::MAX")))?;
        let channels = u8::try_from(channels)
            .map_err(|_| CcApiError::Image(format!("unsupported channel count {channels}")))?;
        Self::new(width, height, channels, data[..len].to_vec())
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub const fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Quantizes to 8-bit values, clamping to [0, 255].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_u8(&self) -> Vec<u8> {
        self.pixels.iter().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8).collect()
    }
}

/// Status of a remote generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// Maps a provider status label. Unrecognized labels are treated as `Processing`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "TASK_STATUS_QUEUED" => Self::Queued,
            "TASK_STATUS_PROCESSING" => Self::Processing,
            "TASK_STATUS_SUCCEEDED" => Self::Succeeded,
            "TASK_STATUS_FAILED" => Self::Failed,
            other => {
                tracing::warn!(status = other, "Unrecognized task status, treating as processing");
                Self::Processing
            },
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// In-flight handle of one remote job. Lives for one node invocation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub result_url: Option<String>,
    pub failure_reason: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_buffer_rejects_partial_frame() {
        let err = MediaBuffer::new(vec![0.0; 3], 2, 24_000, ChannelLayout::Interleaved);
        assert!(matches!(err, Err(CcApiError::MalformedAudio(_))));
    }

    #[test]
    fn test_layout_conversion() {
        let interleaved =
            MediaBuffer::new(
                vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0],
                2,
                8000,
                ChannelLayout::Interleaved,
            )
                .unwrap();
        let planar = interleaved.to_layout(ChannelLayout::Planar);
        assert_eq!(planar.samples(), &[1.0, 2.0, 3.0, -1.0, -2.0, -3.0]);
        assert_eq!(planar.channel(1), vec![-1.0, -2.0, -3.0]);
        assert_eq!(planar.to_layout(ChannelLayout::Interleaved), interleaved);
    }

    #[test]
    fn test_silence_duration() {
        let silence = MediaBuffer::silence(24_000, 1, 1.0).unwrap();
        assert_eq!(silence.frames(), 24_000);
        assert!((silence.duration_secs() - 1.0).abs() < f64::EPSILON);
        assert!(silence.samples().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_image_from_host_tensor_batched() {
        let data = vec![0.5; 2 * 2 * 2 * 3];
        let image = ImageBuffer::from_host_tensor(&[2, 2, 2, 3], &data).unwrap();
        assert_eq!((image.width(), image.height(), image.channels()), (2, 2, 3));
        assert_eq!(image.pixels().len(), 12);
    }

    #[test]
    fn test_image_rejects_bad_channel_count() {
        assert!(ImageBuffer::new(1, 1, 2, vec![0.0, 0.0]).is_err());
        assert!(ImageBuffer::from_host_tensor(&[1, 1, 1, 1, 1], &[0.0]).is_err());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(TaskStatus::from_label("TASK_STATUS_SUCCEEDED"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::from_label("TASK_STATUS_FAILED"), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_label("TASK_STATUS_QUEUED"), TaskStatus::Queued);
        assert_eq!(TaskStatus::from_label("TASK_STATUS_WARMING_UP"), TaskStatus::Processing);
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
