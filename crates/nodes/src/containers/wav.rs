// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! WAV container encoding.

use ccapi_core::{CcApiError, ChannelLayout, MediaBuffer, Result};
use std::io::Cursor;

/// Quantizes one float sample to signed 16-bit.
///
/// Out-of-range input is clamped before scaling so it saturates instead of wrapping.
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_i16(sample: f32) -> i16 {
    let scaled = (sample.clamp(-1.0, 1.0) * 32_768.0).round();
    scaled.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Encodes `buffer` as a 16-bit PCM WAV file at the buffer's sample rate.
///
/// # Errors
///
/// Returns `CcApiError::Codec` if the WAV writer fails.
pub fn to_wav_bytes(buffer: &MediaBuffer) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let interleaved = buffer.to_layout(ChannelLayout::Interleaved);
    let mut out = Vec::with_capacity(44 + interleaved.samples().len() * 2);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut out), spec)
            .map_err(|e| CcApiError::Codec(format!("Failed to start WAV writer: {e}")))?;
        for sample in interleaved.samples() {
            writer
                .write_sample(quantize_i16(*sample))
                .map_err(|e| CcApiError::Codec(format!("Failed to write WAV sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| CcApiError::Codec(format!("Failed to finalize WAV: {e}")))?;
    }

    tracing::debug!(
        bytes = out.len(),
        channels = buffer.channels(),
        sample_rate = buffer.sample_rate(),
        "Encoded WAV"
    );
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::audio::from_pcm_bytes;

    fn read_back(wav: &[u8]) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        (reader.spec(), samples)
    }

    #[test]
    fn test_quantize_clamps_instead_of_wrapping() {
        assert_eq!(quantize_i16(1.5), i16::MAX);
        assert_eq!(quantize_i16(-3.0), i16::MIN);
        assert_eq!(quantize_i16(0.0), 0);
        assert_eq!(quantize_i16(0.5), 16_384);
    }

    #[test]
    fn test_header_matches_buffer() {
        let buffer = MediaBuffer::silence(22_050, 2, 0.1).unwrap();
        let wav = to_wav_bytes(&buffer).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        let (spec, samples) = read_back(&wav);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22_050);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples.len(), buffer.samples().len());
    }

    #[test]
    fn test_planar_buffer_written_interleaved() {
        let buffer =
            MediaBuffer::new(vec![0.5, 0.5, -0.5, -0.5], 2, 8_000, ChannelLayout::Planar).unwrap();
        let (_, samples) = read_back(&to_wav_bytes(&buffer).unwrap());
        assert_eq!(samples, vec![16_384, -16_384, 16_384, -16_384]);
    }

    #[test]
    fn test_pcm16_roundtrip_within_quantization() {
        let original: Vec<i16> = vec![0, 1, -1, 12_345, -12_345, i16::MAX, i16::MIN, 7, -300, 299];
        let bytes: Vec<u8> = original.iter().flat_map(|v| v.to_le_bytes()).collect();

        let decoded = from_pcm_bytes(&bytes, 16, 24_000, 2).unwrap();
        let (_, reread) = read_back(&to_wav_bytes(&decoded).unwrap());
        let redecoded: Vec<u8> = reread.iter().flat_map(|v| v.to_le_bytes()).collect();
        let again = from_pcm_bytes(&redecoded, 16, 24_000, 2).unwrap();

        for (a, b) in decoded.samples().iter().zip(again.samples()) {
            assert!((a - b).abs() <= 1.0 / 32_768.0, "{a} vs {b}");
        }
        assert_eq!(reread, original);
    }
}
