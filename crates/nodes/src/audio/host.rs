// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Conversion between host waveform tensors and [`MediaBuffer`].
//!
//! The host hands audio over as a flat `f32` slice plus a shape. Batched waveforms are always
//! `[batch, channels, time]`; a bare 2-D waveform may be either `[channels, time]` or
//! `[time, channels]`, which cannot be told apart reliably from the shape alone. Callers should
//! pass a [`WaveformLayout`] when they know it.

use ccapi_core::{CcApiError, ChannelLayout, MediaBuffer, Result};

/// Axis order of a 2-D host waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformLayout {
    /// `[channels, time]`
    ChannelsFirst,
    /// `[time, channels]`
    ChannelsLast,
}

/// A host waveform: flat data in row-major order with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct HostWaveform {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
    pub sample_rate: u32,
}

/// Normalizes a host waveform into a planar [`MediaBuffer`].
///
/// Accepted shapes are `[time]`, `[channels, time]` / `[time, channels]` and
/// `[batch, channels, time]` (first batch item is used).
///
/// Without a `layout` hint a 2-D shape is guessed: channels-first when
/// `shape[0] <= 2 && shape[0] < shape[1]`, otherwise channels-last. The guess is logged
/// because short clips are easily misread (a 2-sample mono clip looks like stereo).
///
/// # Errors
///
/// Returns `CcApiError::MalformedAudio` if the shape is unsupported, does not match the data
/// length, or describes more than `u16::MAX` channels.
pub fn from_host_waveform(
    shape: &[usize],
    data: &[f32],
    sample_rate: u32,
    layout: Option<WaveformLayout>,
) -> Result<MediaBuffer> {
    let expected: usize = shape.iter().product();
    if shape.is_empty() || expected != data.len() {
        return Err(CcApiError::MalformedAudio(format!(
            "waveform shape {shape:?} does not match {} samples",
            data.len()
        )));
    }

    let (channels, planar): (usize, Vec<f32>) = match *shape {
        [_] => (1, data.to_vec()),
        [rows, cols] => match layout.unwrap_or_else(|| guess_layout(rows, cols)) {
            WaveformLayout::ChannelsFirst => (rows, data.to_vec()),
            WaveformLayout::ChannelsLast => (cols, transpose(data, rows, cols)),
        },
        [0, _, _] => {
            return Err(CcApiError::MalformedAudio("empty waveform batch".to_string()))
        },
        [batch, channels, time] => {
            if batch > 1 {
                tracing::debug!(batch, "Using first item of batched waveform");
            }
            (channels, data[..channels * time].to_vec())
        },
        _ => {
            return Err(CcApiError::MalformedAudio(format!(
                "unsupported waveform rank {} (shape {shape:?})",
                shape.len()
            )))
        },
    };

    let channels = u16::try_from(channels)
        .map_err(|_| CcApiError::MalformedAudio(format!("{channels} channels exceeds u16::MAX")))?;
    MediaBuffer::new(planar, channels, sample_rate, ChannelLayout::Planar)
}

/// Converts a buffer to the host's `[1, channels, time]` waveform.
pub fn to_host_waveform(buffer: &MediaBuffer) -> HostWaveform {
    let planar = buffer.to_layout(ChannelLayout::Planar);
    HostWaveform {
        shape: vec![1, usize::from(planar.channels()), planar.frames()],
        sample_rate: planar.sample_rate(),
        data: planar.into_samples(),
    }
}

fn guess_layout(rows: usize, cols: usize) -> WaveformLayout {
    let guess = if rows <= 2 && rows < cols {
        WaveformLayout::ChannelsFirst
    } else {
        WaveformLayout::ChannelsLast
    };
    tracing::warn!(
        rows,
        cols,
        ?guess,
        "Guessing channel axis of 2-D waveform; pass an explicit layout for short clips"
    );
    guess
}

fn transpose(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0; data.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}
