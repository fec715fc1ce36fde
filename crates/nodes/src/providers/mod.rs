// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Provider adapters built on the transport and media codec layers.

pub mod ppio;
pub mod seedream;
pub mod tts;
pub mod voice_clone;

pub use ppio::{PpioClient, TaskQuery, VideoResolution, WanOptions};
pub use seedream::{SeedreamBackend, SeedreamClient, SeedreamRequest, SeedreamSize};
pub use tts::{decode_doubao_response, decode_minimax_response, SpeechAudio, SpeechFormat};
pub use voice_clone::{clone_voice, upload_reference_audio, VoiceCloneRequest};
