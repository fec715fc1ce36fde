// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Scoped WAV files for multipart uploads.

use crate::audio::resample_channels;
use crate::containers::to_wav_bytes;
use ccapi_core::{CcApiError, MediaBuffer, Result};
use std::io::Write;
use std::path::Path;

/// Validation applied before an upload file is written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadConstraints {
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    /// Channel count the provider expects; `None` keeps the source channels.
    pub channels: Option<u16>,
}

impl UploadConstraints {
    /// Voice-clone reference audio: 10 s to 5 min, mono.
    pub const fn voice_clone() -> Self {
        Self { min_duration_secs: 10.0, max_duration_secs: 300.0, channels: Some(1) }
    }

    /// # Errors
    ///
    /// Returns `CcApiError::DurationOutOfRange` if `duration_secs` is outside the bounds.
    pub fn check_duration(&self, duration_secs: f64) -> Result<()> {
        if duration_secs < self.min_duration_secs || duration_secs > self.max_duration_secs {
            return Err(CcApiError::DurationOutOfRange {
                duration_secs,
                min_secs: self.min_duration_secs,
                max_secs: self.max_duration_secs,
            });
        }
        Ok(())
    }
}

/// A WAV file on disk that is deleted when dropped.
#[derive(Debug)]
pub struct UploadFile {
    file: tempfile::NamedTempFile,
    size_bytes: u64,
}

impl UploadFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// File name to send in the multipart part.
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map_or_else(|| "audio.wav".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Validates `buffer` against `constraints` and writes it to a temporary WAV file.
///
/// Duration is checked before anything touches the disk or the network.
///
/// # Errors
///
/// Returns `CcApiError::DurationOutOfRange` for audio outside the allowed duration,
/// `CcApiError::MalformedAudio` for an empty buffer the bounds still admit, or an I/O or codec
/// error if the file cannot be written.
pub fn to_upload_file(buffer: &MediaBuffer, constraints: &UploadConstraints) -> Result<UploadFile> {
    constraints.check_duration(buffer.duration_secs())?;
    if buffer.frames() == 0 {
        return Err(CcApiError::MalformedAudio("cannot upload empty audio".to_string()));
    }

    let converted;
    let buffer = match constraints.channels {
        Some(target) if target != buffer.channels() => {
            converted = resample_channels(buffer, target)?;
            &converted
        },
        _ => buffer,
    };

    let wav = to_wav_bytes(buffer)?;
    let mut file = tempfile::Builder::new().prefix("ccapi-upload-").suffix(".wav").tempfile()?;
    file.write_all(&wav)?;
    file.flush()?;

    tracing::debug!(
        path = %file.path().display(),
        bytes = wav.len(),
        duration_secs = buffer.duration_secs(),
        "Wrote upload file"
    );
    Ok(UploadFile { file, size_bytes: wav.len() as u64 })
}
