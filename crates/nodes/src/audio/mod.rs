// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Audio side of the media codec: raw PCM decoding, channel conversion, host waveform
//! conversion and upload files.

pub mod channels;
pub mod host;
pub mod pcm;
pub mod upload;

pub use channels::resample_channels;
pub use host::{from_host_waveform, to_host_waveform, HostWaveform, WaveformLayout};
pub use pcm::from_pcm_bytes;
pub use upload::{to_upload_file, UploadConstraints, UploadFile};
