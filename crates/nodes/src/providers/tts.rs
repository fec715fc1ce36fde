// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Text-to-speech response decoding.
//!
//! Speech providers return audio inline: MiniMax as a hex string under `data.audio`, Doubao as
//! base64 under `data`, possibly split across a stream of concatenated JSON objects.

#[cfg(feature = "symphonia")]
use crate::containers::{from_container_bytes, ContainerHint};
use crate::audio::from_pcm_bytes;
use crate::transport::HttpTransport;
use base64::Engine;
use ccapi_core::{CcApiError, Credential, MediaBuffer, Result};
use serde_json::{json, Value};
use std::str::FromStr;

pub const MINIMAX_TTS_ENDPOINT: &str = "https://api.minimaxi.com/v1/t2a_v2";
pub const MINIMAX_SPEECH_MODEL: &str = "speech-2.5-hd-preview";

/// Doubao marks the closing object of a stream with this code; it never carries audio.
const DOUBAO_STREAM_END: i64 = 20_000_000;

/// Encoding the provider was asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechFormat {
    Pcm,
    Wav,
    Mp3,
}

impl SpeechFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pcm => "pcm",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

impl FromStr for SpeechFormat {
    type Err = CcApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcm" => Ok(Self::Pcm),
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            other => Err(CcApiError::Configuration(format!("unsupported speech format '{other}'"))),
        }
    }
}

/// What the audio bytes look like, as requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechAudio {
    pub format: SpeechFormat,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SpeechAudio {
    /// Raw PCM at 8 kHz is 8-bit unsigned; every other rate is 16-bit.
    pub const fn pcm_width_bits(&self) -> u16 {
        if self.sample_rate == 8_000 {
            8
        } else {
            16
        }
    }

    /// Decodes raw audio bytes in this format.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::MalformedAudio` for empty or unreadable PCM and `CcApiError::Codec`
    /// for undecodable containers.
    pub fn decode(&self, bytes: &[u8]) -> Result<MediaBuffer> {
        if bytes.is_empty() {
            return Err(CcApiError::MalformedAudio("speech payload is empty".to_string()));
        }
        match self.format {
            SpeechFormat::Pcm => {
                from_pcm_bytes(bytes, self.pcm_width_bits(), self.sample_rate, self.channels)
            },
            #[cfg(feature = "symphonia")]
            SpeechFormat::Wav => from_container_bytes(bytes, ContainerHint::Wav),
            #[cfg(feature = "symphonia")]
            SpeechFormat::Mp3 => from_container_bytes(bytes, ContainerHint::Mp3),
            #[cfg(not(feature = "symphonia"))]
            other => Err(CcApiError::Codec(format!(
                "{} decoding requires the `symphonia` feature",
                other.as_str()
            ))),
        }
    }
}

fn check_base_resp(body: &Value) -> Result<()> {
    let Some(base) = body.get("base_resp") else {
        return Ok(());
    };
    let code = base.get("status_code").and_then(Value::as_i64).unwrap_or(-1);
    if code != 0 {
        let message = base.get("status_msg").and_then(Value::as_str).unwrap_or("Unknown error");
        return Err(CcApiError::Provider { code, message: message.to_string() });
    }
    Ok(())
}

/// Decodes a MiniMax `t2a_v2` response (`data.audio` as hex).
///
/// # Errors
///
/// Returns `CcApiError::Provider` when `base_resp.status_code` is non-zero,
/// `CcApiError::Parse` for a missing or non-hex payload, and any decoding error.
pub fn decode_minimax_response(body: &Value, audio: &SpeechAudio) -> Result<MediaBuffer> {
    check_base_resp(body)?;
    let encoded = body
        .pointer("/data/audio")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CcApiError::Parse("speech response has no data.audio".to_string()))?;
    let bytes =
        hex::decode(encoded).map_err(|e| CcApiError::Parse(format!("invalid hex audio: {e}")))?;
    audio.decode(&bytes)
}

/// Decodes a Doubao response body.
///
/// The body is either one JSON object or several concatenated ones. Each audio fragment is
/// decoded from base64 on its own and the bytes are joined in order.
///
/// # Errors
///
/// Returns `CcApiError::Provider` for an error code other than 0 or the end-of-stream marker,
/// `CcApiError::Parse` when no fragment carries audio, and any decoding error.
pub fn decode_doubao_response(body: &str, audio: &SpeechAudio) -> Result<MediaBuffer> {
    let mut bytes = Vec::new();
    let mut fragments = 0_usize;
    for object in serde_json::Deserializer::from_str(body).into_iter::<Value>() {
        let object = object?;
        let code = object.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code == DOUBAO_STREAM_END {
            continue;
        }
        if code != 0 {
            let message =
                object.get("message").and_then(Value::as_str).unwrap_or("Unknown error");
            return Err(CcApiError::Provider { code, message: message.to_string() });
        }
        if let Some(data) = object.get("data").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            base64::engine::general_purpose::STANDARD
                .decode_vec(data, &mut bytes)
                .map_err(|e| CcApiError::Parse(format!("invalid base64 audio: {e}")))?;
            fragments += 1;
        }
    }
    if fragments == 0 {
        return Err(CcApiError::Parse("speech response carried no audio".to_string()));
    }
    tracing::debug!(fragments, bytes = bytes.len(), "Joined speech fragments");
    audio.decode(&bytes)
}

/// A MiniMax synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimaxSpeechRequest {
    pub model: String,
    pub text: String,
    pub voice_id: String,
    pub speed: f32,
    pub volume: f32,
    pub pitch: i32,
    pub emotion: Option<String>,
    pub audio: SpeechAudio,
    /// Only sent for MP3 output.
    pub bitrate: u32,
}

impl MinimaxSpeechRequest {
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            model: MINIMAX_SPEECH_MODEL.to_string(),
            text: text.into(),
            voice_id: voice_id.into(),
            speed: 1.0,
            volume: 1.0,
            pitch: 0,
            emotion: None,
            audio: SpeechAudio { format: SpeechFormat::Mp3, sample_rate: 32_000, channels: 1 },
            bitrate: 128_000,
        }
    }

    pub fn payload(&self) -> Value {
        let mut payload = json!({
            "model": self.model,
            "text": self.text,
            "stream": false,
            "voice_setting": {
                "voice_id": self.voice_id,
                "speed": self.speed,
                "vol": self.volume,
                "pitch": self.pitch,
            },
            "audio_setting": {
                "sample_rate": self.audio.sample_rate,
                "format": self.audio.format.as_str(),
                "channel": self.audio.channels,
            },
        });
        if let Some(emotion) = &self.emotion {
            payload["voice_setting"]["emotion"] = json!(emotion);
        }
        if self.audio.format == SpeechFormat::Mp3 {
            payload["audio_setting"]["bitrate"] = json!(self.bitrate);
        }
        payload
    }
}

/// Synthesizes speech through MiniMax.
///
/// # Errors
///
/// Returns `CcApiError::Http` for a non-2xx status and the errors of
/// [`decode_minimax_response`].
pub async fn minimax_speech(
    transport: &dyn HttpTransport,
    endpoint: &str,
    credential: &Credential,
    request: &MinimaxSpeechRequest,
) -> Result<MediaBuffer> {
    let response = transport.post_json(endpoint, Some(credential), &request.payload()).await?;
    if !response.is_success() {
        return Err(CcApiError::Http { status: response.status, body: response.text() });
    }
    let body: Value = response.json()?;
    let audio = decode_minimax_response(&body, &request.audio)?;
    tracing::info!(
        voice = %request.voice_id,
        duration_secs = audio.duration_secs(),
        "Speech synthesized"
    );
    Ok(audio)
}
