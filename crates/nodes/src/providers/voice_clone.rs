// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! MiniMax voice cloning: reference upload and clone request.

use crate::audio::{to_upload_file, UploadConstraints};
use crate::transport::{HttpTransport, MultipartFile, MultipartForm};
use ccapi_core::{CcApiError, Credential, MediaBuffer, Result};
use serde_json::{json, Value};

pub const MINIMAX_UPLOAD_ENDPOINT: &str = "https://api.minimaxi.com/v1/files/upload";
pub const MINIMAX_VOICE_CLONE_ENDPOINT: &str = "https://api.minimaxi.com/v1/voice_clone";

/// Upload purpose of the audio to clone.
pub const PURPOSE_VOICE_CLONE: &str = "voice_clone";
/// Upload purpose of the optional prompt sample.
pub const PURPOSE_PROMPT_AUDIO: &str = "prompt_audio";

fn check_base_resp(body: &Value) -> Result<()> {
    let code = body.pointer("/base_resp/status_code").and_then(Value::as_i64).unwrap_or(-1);
    if code == 0 {
        return Ok(());
    }
    let message =
        body.pointer("/base_resp/status_msg").and_then(Value::as_str).unwrap_or("Unknown error");
    Err(CcApiError::Provider { code, message: message.to_string() })
}

/// Validates and uploads reference audio, returning the provider's file id.
///
/// The audio is checked against [`UploadConstraints::voice_clone`] before any I/O, downmixed to
/// mono and written to a temporary WAV that is removed once this returns, whether or not the
/// upload succeeded.
///
/// # Errors
///
/// Returns `CcApiError::DurationOutOfRange` for audio outside 10–300 s, `CcApiError::Http` for a
/// non-2xx status, `CcApiError::Provider` for a non-zero `base_resp.status_code`, and
/// `CcApiError::Parse` if no `file.file_id` is returned.
pub async fn upload_reference_audio(
    transport: &dyn HttpTransport,
    endpoint: &str,
    credential: &Credential,
    audio: &MediaBuffer,
    purpose: &str,
) -> Result<String> {
    let upload = to_upload_file(audio, &UploadConstraints::voice_clone())?;
    let form = MultipartForm {
        fields: vec![("purpose".to_string(), purpose.to_string())],
        file: MultipartFile {
            field: "file".to_string(),
            file_name: upload.file_name(),
            mime: "audio/wav".to_string(),
            path: upload.path().to_path_buf(),
        },
    };

    let response = transport.post_multipart(endpoint, Some(credential), &form).await?;
    drop(upload);

    if !response.is_success() {
        return Err(CcApiError::Http { status: response.status, body: response.text() });
    }
    let body: Value = response.json()?;
    check_base_resp(&body)?;

    // file_id is numeric in current responses; accept a string too.
    let file_id = match body.pointer("/file/file_id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(CcApiError::Parse("upload response has no file.file_id".to_string())),
    };
    tracing::info!(%file_id, purpose, "Uploaded reference audio");
    Ok(file_id)
}

/// Parameters of a clone request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCloneRequest {
    /// File id of the uploaded reference audio.
    pub file_id: String,
    /// Id to register the cloned voice under. 8–256 characters, starting with a letter.
    pub voice_id: String,
    /// Uploaded prompt sample and its transcript.
    pub prompt: Option<(String, String)>,
    /// Text for the demo clip and the model that renders it.
    pub preview: Option<(String, String)>,
    pub noise_reduction: bool,
    pub volume_normalization: bool,
}

impl VoiceCloneRequest {
    /// # Errors
    ///
    /// Returns `CcApiError::Configuration` if `voice_id` breaks the provider's naming rules.
    pub fn payload(&self) -> Result<Value> {
        validate_voice_id(&self.voice_id)?;
        let mut payload = json!({
            "file_id": self.file_id,
            "voice_id": self.voice_id,
            "need_noise_reduction": self.noise_reduction,
            "need_volume_normalization": self.volume_normalization,
            "aigc_watermark": false,
        });
        if let Some((prompt_audio, prompt_text)) = &self.prompt {
            payload["clone_prompt"] =
                json!({ "prompt_audio": prompt_audio, "prompt_text": prompt_text });
        }
        if let Some((text, model)) = &self.preview {
            payload["text"] = json!(text);
            payload["model"] = json!(model);
        }
        Ok(payload)
    }
}

fn validate_voice_id(voice_id: &str) -> Result<()> {
    let len = voice_id.chars().count();
    let starts_with_letter = voice_id.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let allowed = voice_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let bad_tail = voice_id.ends_with('-') || voice_id.ends_with('_');
    if !(8..=256).contains(&len) || !starts_with_letter || !allowed || bad_tail {
        return Err(CcApiError::Configuration(format!(
            "invalid voice id '{voice_id}': 8-256 letters, digits, '-' or '_', starting with a \
             letter and not ending in '-' or '_'"
        )));
    }
    Ok(())
}

/// Registers a cloned voice. Returns the demo clip URL, if the provider rendered one.
///
/// # Errors
///
/// Returns `CcApiError::Configuration` for an invalid voice id, `CcApiError::Http` for a
/// non-2xx status and `CcApiError::Provider` for a non-zero `base_resp.status_code`.
pub async fn clone_voice(
    transport: &dyn HttpTransport,
    endpoint: &str,
    credential: &Credential,
    request: &VoiceCloneRequest,
) -> Result<Option<String>> {
    let response = transport.post_json(endpoint, Some(credential), &request.payload()?).await?;
    if !response.is_success() {
        return Err(CcApiError::Http { status: response.status, body: response.text() });
    }
    let body: Value = response.json()?;
    check_base_resp(&body)?;
    tracing::info!(voice_id = %request.voice_id, "Voice cloned");
    Ok(body
        .get("demo_audio")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{Method, MockTransport};

    fn reference(secs: f64) -> MediaBuffer {
        MediaBuffer::silence(16_000, 2, secs).unwrap()
    }

    #[tokio::test]
    async fn test_upload_sends_file_and_purpose() {
        let transport = MockTransport::new();
        transport.push_json(
            200,
            &json!({"file": {"file_id": 3_141_592}, "base_resp": {"status_code": 0}}),
        );

        let id = upload_reference_audio(
            &transport,
            MINIMAX_UPLOAD_ENDPOINT,
            &Credential::new("k"),
            &reference(12.0),
            PURPOSE_VOICE_CLONE,
        )
        .await
        .unwrap();

        assert_eq!(id, "3141592");
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::PostMultipart);
        assert!(request.file_existed);
        let form = request.form.as_ref().unwrap();
        assert_eq!(form.file.field, "file");
        assert_eq!(form.file.mime, "audio/wav");
        assert_eq!(form.fields, vec![("purpose".to_string(), "voice_clone".to_string())]);
        assert!(!form.file.path.exists());
    }

    #[tokio::test]
    async fn test_short_reference_never_uploaded() {
        let transport = MockTransport::new();
        let err = upload_reference_audio(
            &transport,
            MINIMAX_UPLOAD_ENDPOINT,
            &Credential::new("k"),
            &reference(9.5),
            PURPOSE_VOICE_CLONE,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CcApiError::DurationOutOfRange { .. }));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_failure() {
        let transport = MockTransport::new();
        transport.push_json(
            200,
            &json!({"base_resp": {"status_code": 2013, "status_msg": "invalid params"}}),
        );
        let err = upload_reference_audio(
            &transport,
            MINIMAX_UPLOAD_ENDPOINT,
            &Credential::new("k"),
            &reference(20.0),
            PURPOSE_PROMPT_AUDIO,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CcApiError::Provider { code: 2013, .. }));
        assert!(!transport.requests()[0].form.as_ref().unwrap().file.path.exists());
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_transport_error() {
        let transport = MockTransport::new();
        transport.push_error(CcApiError::Network("reset".to_string()));
        let result = upload_reference_audio(
            &transport,
            MINIMAX_UPLOAD_ENDPOINT,
            &Credential::new("k"),
            &reference(20.0),
            PURPOSE_VOICE_CLONE,
        )
        .await;
        assert!(result.is_err());
        let request = &transport.requests()[0];
        assert!(request.file_existed);
        assert!(!request.form.as_ref().unwrap().file.path.exists());
    }

    #[test]
    fn test_voice_id_rules() {
        let mut request = VoiceCloneRequest {
            file_id: "1".to_string(),
            voice_id: "cloned_voice_001".to_string(),
            prompt: None,
            preview: Some(("hello".to_string(), "speech-2.5-hd-preview".to_string())),
            noise_reduction: false,
            volume_normalization: true,
        };
        let payload = request.payload().unwrap();
        assert_eq!(payload["model"], "speech-2.5-hd-preview");
        assert!(payload.get("clone_prompt").is_none());

        for bad in ["short", "1starts_with_digit", "ends_with_dash-", "has space inside"] {
            request.voice_id = bad.to_string();
            assert!(request.payload().is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_clone_returns_demo_url() {
        let transport = MockTransport::new();
        transport.push_json(
            200,
            &json!({
                "demo_audio": "https://cdn.example.com/demo.mp3",
                "base_resp": {"status_code": 0}
            }),
        );
        let request = VoiceCloneRequest {
            file_id: "1".to_string(),
            voice_id: "cloned_voice_001".to_string(),
            prompt: Some(("2".to_string(), "sample text".to_string())),
            preview: None,
            noise_reduction: true,
            volume_normalization: false,
        };
        let demo =
            clone_voice(&transport, MINIMAX_VOICE_CLONE_ENDPOINT, &Credential::new("k"), &request)
                .await
                .unwrap();
        assert_eq!(demo.as_deref(), Some("https://cdn.example.com/demo.mp3"));
        let payload = transport.requests()[0].json.clone().unwrap();
        assert_eq!(payload["clone_prompt"]["prompt_audio"], "2");
    }
}
