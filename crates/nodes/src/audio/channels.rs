// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use ccapi_core::{CcApiError, ChannelLayout, MediaBuffer, Result};

/// Converts `buffer` to `target_channels` without changing its duration or layout.
///
/// - mono → N: the channel is duplicated
/// - N → mono: channels are averaged
/// - N → N: unchanged copy
///
/// # Errors
///
/// Returns `CcApiError::Configuration` for any other channel mapping (e.g. 6 → 2); guessing a
/// downmix matrix would silently reshape the audio.
pub fn resample_channels(buffer: &MediaBuffer, target_channels: u16) -> Result<MediaBuffer> {
    let source = buffer.channels();
    if source == target_channels {
        return Ok(buffer.clone());
    }

    let planes: Vec<Vec<f32>> = if source == 1 && target_channels > 1 {
        let mono = buffer.channel(0);
        vec![mono; usize::from(target_channels)]
    } else if target_channels == 1 {
        vec![average_channels(buffer)]
    } else {
        return Err(CcApiError::Configuration(format!(
            "cannot convert {source}-channel audio to {target_channels} channels"
        )));
    };

    tracing::debug!(from = source, to = target_channels, "Converted channel count");

    let planar = MediaBuffer::new(
        planes.concat(),
        target_channels,
        buffer.sample_rate(),
        ChannelLayout::Planar,
    )?;
    Ok(planar.to_layout(buffer.layout()))
}

fn average_channels(buffer: &MediaBuffer) -> Vec<f32> {
    let channels = buffer.channels();
    let scale = 1.0 / f32::from(channels);
    let mut mixed = vec![0.0_f32; buffer.frames()];
    for ch in 0..channels {
        for (acc, sample) in mixed.iter_mut().zip(buffer.channel(ch)) {
            *acc += sample * scale;
        }
    }
    mixed
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_to_stereo_duplicates() {
        let mono = MediaBuffer::new(vec![0.1, 0.2, 0.3], 1, 24_000, ChannelLayout::Planar).unwrap();
        let stereo = resample_channels(&mono, 2).unwrap();
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.channel(0), vec![0.1, 0.2, 0.3]);
        assert_eq!(stereo.channel(1), vec![0.1, 0.2, 0.3]);
        assert_eq!(stereo.duration_secs(), mono.duration_secs());
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let stereo =
            MediaBuffer::new(vec![1.0, 0.0, 0.5, -0.5], 2, 24_000, ChannelLayout::Interleaved)
                .unwrap();
        let mono = resample_channels(&stereo, 1).unwrap();
        assert_eq!(mono.samples(), &[0.5, 0.0]);
        assert_eq!(mono.duration_secs(), stereo.duration_secs());
        assert_eq!(mono.layout(), ChannelLayout::Interleaved);
    }

    #[test]
    fn test_layout_preserved_for_interleaved_upmix() {
        let mono = MediaBuffer::new(vec![0.1, 0.2], 1, 8_000, ChannelLayout::Interleaved).unwrap();
        let stereo = resample_channels(&mono, 2).unwrap();
        assert_eq!(stereo.layout(), ChannelLayout::Interleaved);
        assert_eq!(stereo.samples(), &[0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_unsupported_mapping() {
        let surround = MediaBuffer::silence(48_000, 6, 0.01).unwrap();
        let err = resample_channels(&surround, 2).unwrap_err();
        assert!(matches!(err, CcApiError::Configuration(_)));
    }
}
