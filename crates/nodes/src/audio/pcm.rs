// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Raw PCM decoding.

use ccapi_core::{CcApiError, ChannelLayout, MediaBuffer, Result};

/// Interprets `bytes` as interleaved little-endian PCM and returns a planar buffer
/// (`[channels, frames]`) normalized to [-1.0, 1.0].
///
/// Supported widths:
/// - 8-bit: unsigned with a 128 offset (WAV convention)
/// - 16/24/32-bit: signed
///
/// Samples are divided by `2^(bits-1)`, so the most negative code maps to exactly -1.0.
///
/// For 16-bit input a single trailing odd byte is dropped with a warning instead of failing;
/// network-chunked TTS payloads regularly end on one.
///
/// # Errors
///
/// Returns `CcApiError::MalformedAudio` for an unsupported width, a zero channel count or
/// sample rate, or a byte length (after dropping a dangling 16-bit byte) that is not a whole
/// number of frames.
pub fn from_pcm_bytes(
    bytes: &[u8],
    sample_width_bits: u16,
    sample_rate: u32,
    channels: u16,
) -> Result<MediaBuffer> {
    let width = match sample_width_bits {
        8 | 16 | 24 | 32 => usize::from(sample_width_bits / 8),
        other => {
            return Err(CcApiError::MalformedAudio(format!(
                "unsupported PCM sample width: {other} bits"
            )))
        },
    };
    if channels == 0 {
        return Err(CcApiError::MalformedAudio("channel count must be positive".to_string()));
    }

    // A 16-bit payload may end on one dangling byte; nothing else is tolerated.
    let dangling = if sample_width_bits == 16 { bytes.len() % 2 } else { 0 };
    let usable = bytes.len() - dangling;
    let frame_bytes = width * usize::from(channels);
    if usable % frame_bytes != 0 {
        return Err(CcApiError::MalformedAudio(format!(
            "{} bytes is not a whole number of {}-bit {}-channel frames",
            bytes.len(),
            sample_width_bits,
            channels
        )));
    }
    if dangling > 0 {
        // TODO: revisit whether truncated 16-bit payloads should fail once providers stop
        // splitting samples across chunks.
        tracing::warn!(
            total_bytes = bytes.len(),
            "Truncating dangling byte from 16-bit PCM payload"
        );
    }

    let samples: Vec<f32> = bytes[..usable].chunks_exact(width).map(decode_sample).collect();
    let interleaved = MediaBuffer::new(samples, channels, sample_rate, ChannelLayout::Interleaved)?;
    Ok(interleaved.to_layout(ChannelLayout::Planar))
}

#[allow(clippy::cast_possible_truncation)]
fn decode_sample(raw: &[u8]) -> f32 {
    match *raw {
        [b] => (f32::from(b) - 128.0) / 128.0,
        [b0, b1] => f32::from(i16::from_le_bytes([b0, b1])) / 32_768.0,
        [b0, b1, b2] => {
            // Sign-extend the 24-bit value through the top byte.
            let value = i32::from_le_bytes([0, b0, b1, b2]) >> 8;
            (f64::from(value) / 8_388_608.0) as f32
        },
        [b0, b1, b2, b3] => {
            (f64::from(i32::from_le_bytes([b0, b1, b2, b3])) / 2_147_483_648.0) as f32
        },
        _ => 0.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn pcm16(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_16bit_normalization() {
        let buffer = from_pcm_bytes(&pcm16(&[0, 16_384, -32_768, 32_767]), 16, 24_000, 1).unwrap();
        assert_eq!(buffer.samples()[0], 0.0);
        assert_eq!(buffer.samples()[1], 0.5);
        assert_eq!(buffer.samples()[2], -1.0);
        assert_eq!(buffer.samples()[3], 32_767.0 / 32_768.0);
        assert_eq!(buffer.sample_rate(), 24_000);
        assert_eq!(buffer.layout(), ChannelLayout::Planar);
    }

    #[test]
    fn test_odd_length_16bit_drops_final_byte() {
        let mut bytes = pcm16(&[1000, -1000, 2000]);
        bytes.push(0x7f);
        let buffer = from_pcm_bytes(&bytes, 16, 16_000, 1).unwrap();
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.samples()[2], 2000.0 / 32_768.0);
    }

    #[test]
    fn test_16bit_partial_stereo_frame_is_malformed() {
        let err = from_pcm_bytes(&pcm16(&[100, -100, 200]), 16, 48_000, 2).unwrap_err();
        assert!(matches!(err, CcApiError::MalformedAudio(_)));

        // The dangling byte is dropped first; the rest must still be whole frames.
        let mut bytes = pcm16(&[100, -100, 200]);
        bytes.push(0x01);
        assert!(from_pcm_bytes(&bytes, 16, 48_000, 2).is_err());

        let mut bytes = pcm16(&[100, -100, 200, -200]);
        bytes.push(0x01);
        assert_eq!(from_pcm_bytes(&bytes, 16, 48_000, 2).unwrap().frames(), 2);
    }

    #[test]
    fn test_stereo_reshaped_to_planar() {
        let bytes = pcm16(&[100, -100, 200, -200, 300, -300]);
        let buffer = from_pcm_bytes(&bytes, 16, 48_000, 2).unwrap();
        assert_eq!(buffer.frames(), 3);
        let left: Vec<f32> = [100.0, 200.0, 300.0].iter().map(|v| v / 32_768.0).collect();
        assert_eq!(buffer.channel(0), left);
        assert_eq!(&buffer.samples()[..3], left.as_slice());
    }

    #[test]
    fn test_8bit_is_unsigned() {
        let buffer = from_pcm_bytes(&[0, 128, 192], 8, 8_000, 1).unwrap();
        assert_eq!(buffer.samples(), &[-1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_24bit_sign_extension() {
        // -1 and the most negative 24-bit value
        let bytes = [0xff, 0xff, 0xff, 0x00, 0x00, 0x80];
        let buffer = from_pcm_bytes(&bytes, 24, 48_000, 1).unwrap();
        assert!((buffer.samples()[0] + 1.0 / 8_388_608.0).abs() < f32::EPSILON);
        assert_eq!(buffer.samples()[1], -1.0);
    }

    #[test]
    fn test_24bit_partial_sample_is_malformed() {
        let err = from_pcm_bytes(&[0, 0, 0, 0], 24, 48_000, 1).unwrap_err();
        assert!(matches!(err, CcApiError::MalformedAudio(_)));
    }

    #[test]
    fn test_unsupported_width_is_malformed() {
        let err = from_pcm_bytes(&[0, 0], 12, 48_000, 1).unwrap_err();
        assert!(matches!(err, CcApiError::MalformedAudio(_)));
    }

    #[test]
    fn test_empty_payload_yields_empty_buffer() {
        let buffer = from_pcm_bytes(&[], 16, 24_000, 1).unwrap();
        assert_eq!(buffer.frames(), 0);
    }
}
