// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Container-aware audio decoding backed by symphonia.

use super::ContainerHint;
use ccapi_core::{CcApiError, ChannelLayout, MediaBuffer, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decodes a WAV/MP3/OGG/FLAC payload into a planar buffer in [-1.0, 1.0].
///
/// The hint only steers probing; the container is detected from the bytes.
///
/// # Errors
///
/// Returns `CcApiError::Codec` if the payload cannot be probed, has no audio track, or uses
/// an unsupported codec.
pub fn from_container_bytes(bytes: &[u8], container: ContainerHint) -> Result<MediaBuffer> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes.to_vec())),
        MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(extension) = container.extension() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CcApiError::Codec(format!("Failed to probe {container} payload: {e}")))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .default_track()
        .ok_or_else(|| CcApiError::Codec(format!("No audio track found in {container} payload")))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channel_count = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CcApiError::Codec(format!("Failed to create {container} decoder: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut packet_count = 0u64;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => break,
            Err(e) => {
                tracing::warn!("Error reading {} packet: {}", container, e);
                break;
            },
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let spec = *audio_buf.spec();
                sample_rate = Some(spec.rate);
                channel_count = Some(spec.channels.count());

                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec)
                });
                buf.copy_interleaved_ref(audio_buf);
                samples.extend_from_slice(buf.samples());
                packet_count += 1;
            },
            Err(Error::DecodeError(err)) => {
                tracing::warn!("{} decode error (continuing): {}", container, err);
            },
            Err(e) => {
                return Err(CcApiError::Codec(format!("Failed to decode {container} packet: {e}")));
            },
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| CcApiError::Codec(format!("No sample rate found in {container} payload")))?;
    let channel_count = channel_count
        .ok_or_else(|| CcApiError::Codec(format!("No channel info found in {container} payload")))?;
    let channels = u16::try_from(channel_count)
        .map_err(|_| CcApiError::Codec(format!("Channel count {channel_count} exceeds u16::MAX")))?;

    tracing::debug!(
        packets = packet_count,
        sample_rate,
        channels,
        "Decoded {} payload",
        container
    );

    let interleaved = MediaBuffer::new(samples, channels, sample_rate, ChannelLayout::Interleaved)
        .map_err(|e| CcApiError::Codec(format!("Decoded {container} audio is inconsistent: {e}")))?;
    Ok(interleaved.to_layout(ChannelLayout::Planar))
}
