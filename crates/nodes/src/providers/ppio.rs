// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! PPIO async video models.
//!
//! Every model is submitted to `{base}/async/{model}` and polled through the shared
//! `{base}/async/task-result` endpoint.

use crate::image::to_base64_png;
use crate::transport::{parse_task_status, AsyncTaskClient, HttpTransport, PollPolicy};
use bytes::Bytes;
use ccapi_core::{CcApiError, Credential, GenerationTask, ImageBuffer, Result, Sleeper};
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.ppinfra.com/v3";

pub const WAN_I2V_MODEL: &str = "wan-2.5-i2v-preview";
pub const WAN_T2V_MODEL: &str = "wan-2.5-t2v-preview";

/// Output sizes accepted by the Wan 2.5 text-to-video model.
pub const WAN_T2V_SIZES: &[&str] = &[
    "832*480", "480*832", "624*624", "1280*720", "720*1280", "960*960", "1088*832", "832*1088",
    "1920*1080", "1080*1920", "1440*1440", "1632*1248", "1248*1632",
];

/// Client for PPIO's async generation API.
#[derive(Clone)]
pub struct PpioClient {
    transport: Arc<dyn HttpTransport>,
    tasks: AsyncTaskClient,
    base_url: String,
}

/// Result of a one-shot task query: the raw document plus its parsed status.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub raw: Value,
    pub task: GenerationTask,
}

impl PpioClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let status_url = format!("{base_url}/async/task-result");
        let tasks = AsyncTaskClient::new(transport.clone(), sleeper, status_url);
        Self { transport, tasks, base_url }
    }

    /// Submit endpoint of `model`.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/async/{model}", self.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn tasks(&self) -> &AsyncTaskClient {
        &self.tasks
    }

    /// Submits a video job to `model` and waits for the video URL.
    ///
    /// # Errors
    ///
    /// Any submission, polling or timeout error from [`AsyncTaskClient`].
    pub async fn generate_video(
        &self,
        model: &str,
        payload: &Value,
        credential: &Credential,
        policy: &PollPolicy,
    ) -> Result<String> {
        let endpoint = self.endpoint(model);
        let task_id = self.tasks.submit(&endpoint, payload, credential).await?;
        let url = self.tasks.wait_until_done(&task_id, credential, policy).await?;
        tracing::info!(model, %task_id, video_url = %url, "Video generated");
        Ok(url)
    }

    /// Fetches the current state of a task once, without polling.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::Http` for a non-2xx status and `CcApiError::Parse` for a body
    /// that is not a task document.
    pub async fn query_task(&self, task_id: &str, credential: &Credential) -> Result<TaskQuery> {
        let query = [("task_id".to_string(), task_id.to_string())];
        let response =
            self.transport.get(self.tasks.status_url(), Some(credential), &query).await?;
        if !response.is_success() {
            return Err(CcApiError::Http { status: response.status, body: response.text() });
        }
        let raw: Value = response.json()?;
        let task = parse_task_status(task_id, &raw)?;
        Ok(TaskQuery { raw, task })
    }

    /// Downloads a generated artifact. Result URLs are pre-signed, so no credential is sent.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::Http` for a non-2xx status.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self.transport.get(url, None, &[]).await?;
        if !response.is_success() {
            return Err(CcApiError::Http { status: response.status, body: response.text() });
        }
        tracing::debug!(url, bytes = response.body.len(), "Downloaded artifact");
        Ok(response.body)
    }
}

/// Output resolution of image-to-video jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoResolution {
    P480,
    P720,
    #[default]
    P1080,
}

impl VideoResolution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P480 => "480P",
            Self::P720 => "720P",
            Self::P1080 => "1080P",
        }
    }
}

/// Options shared by the Wan 2.5 models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WanOptions {
    /// Clip length in seconds: 5 or 10.
    pub duration_secs: u32,
    pub prompt_extend: bool,
    pub watermark: bool,
    /// Generate a soundtrack.
    pub audio: bool,
    pub seed: Option<u32>,
    pub negative_prompt: Option<String>,
    /// Soundtrack to use instead of a generated one.
    pub audio_url: Option<String>,
}

impl Default for WanOptions {
    fn default() -> Self {
        Self {
            duration_secs: 5,
            prompt_extend: true,
            watermark: false,
            audio: true,
            seed: None,
            negative_prompt: None,
            audio_url: None,
        }
    }
}

impl WanOptions {
    fn validate(&self) -> Result<()> {
        if !matches!(self.duration_secs, 5 | 10) {
            return Err(CcApiError::Configuration(format!(
                "Wan duration must be 5 or 10 seconds, got {}",
                self.duration_secs
            )));
        }
        Ok(())
    }

    fn apply(&self, payload: &mut Value) {
        payload["parameters"]["duration"] = json!(self.duration_secs);
        payload["parameters"]["prompt_extend"] = json!(self.prompt_extend);
        payload["parameters"]["watermark"] = json!(self.watermark);
        payload["parameters"]["audio"] = json!(self.audio);
        if let Some(seed) = self.seed {
            payload["parameters"]["seed"] = json!(seed);
        }
        if let Some(negative) = self.negative_prompt.as_deref().filter(|s| !s.is_empty()) {
            payload["input"]["negative_prompt"] = json!(negative);
        }
        if let Some(audio_url) = self.audio_url.as_deref().filter(|s| !s.is_empty()) {
            payload["input"]["audio_url"] = json!(audio_url);
        }
    }
}

/// Payload for Wan 2.5 image-to-video. The first frame is sent as a PNG data URI.
///
/// # Errors
///
/// Returns `CcApiError::Configuration` for an unsupported duration and `CcApiError::Image`
/// if the frame cannot be encoded.
pub fn wan_image_to_video(
    prompt: &str,
    first_frame: &ImageBuffer,
    resolution: VideoResolution,
    options: &WanOptions,
) -> Result<Value> {
    options.validate()?;
    let mut payload = json!({
        "input": { "prompt": prompt, "img_url": to_base64_png(first_frame)? },
        "parameters": { "resolution": resolution.as_str() },
    });
    options.apply(&mut payload);
    Ok(payload)
}

/// Payload for Wan 2.5 text-to-video. `size` is one of [`WAN_T2V_SIZES`].
///
/// # Errors
///
/// Returns `CcApiError::Configuration` for an unsupported size or duration.
pub fn wan_text_to_video(prompt: &str, size: &str, options: &WanOptions) -> Result<Value> {
    options.validate()?;
    if !WAN_T2V_SIZES.contains(&size) {
        return Err(CcApiError::Configuration(format!(
            "unsupported Wan size '{size}', expected one of {}",
            WAN_T2V_SIZES.join(", ")
        )));
    }
    let mut payload = json!({
        "input": { "prompt": prompt },
        "parameters": { "size": size },
    });
    options.apply(&mut payload);
    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, RecordingSleeper};
    use crate::transport::HttpResponse;
    use std::time::Duration;

    fn client(transport: &Arc<MockTransport>) -> PpioClient {
        PpioClient::new(
            transport.clone(),
            Arc::new(RecordingSleeper::new()),
            "https://api.example.com/v3/",
        )
    }

    #[test]
    fn test_endpoints() {
        let client = client(&Arc::new(MockTransport::new()));
        assert_eq!(
            client.endpoint(WAN_I2V_MODEL),
            "https://api.example.com/v3/async/wan-2.5-i2v-preview"
        );
        assert_eq!(client.tasks().status_url(), "https://api.example.com/v3/async/task-result");
    }

    #[tokio::test]
    async fn test_generate_video_submits_then_polls() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(200, &json!({"task_id": "t-1"}))
            .push_json(200, &json!({"task": {"status": "TASK_STATUS_QUEUED"}}))
            .push_json(
                200,
                &json!({
                    "task": {"task_id": "t-1", "status": "TASK_STATUS_SUCCEEDED"},
                    "videos": [{"video_url": "https://cdn.example.com/v.mp4"}]
                }),
            );

        let payload =
            wan_text_to_video("a cat surfing", "1280*720", &WanOptions::default()).unwrap();
        let url = client(&transport)
            .generate_video(
                WAN_T2V_MODEL,
                &payload,
                &Credential::new("k"),
                &PollPolicy::new(Duration::from_secs(5), 10),
            )
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/v.mp4");
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].url, "https://api.example.com/v3/async/wan-2.5-t2v-preview");
        assert_eq!(requests[0].json.as_ref().unwrap()["parameters"]["size"], "1280*720");
    }

    #[tokio::test]
    async fn test_query_task_keeps_raw_document() {
        let transport = Arc::new(MockTransport::new());
        let doc = json!({
            "task": {"task_id": "t-9", "status": "TASK_STATUS_PROCESSING", "progress_percent": 40}
        });
        transport.push_json(200, &doc);

        let result = client(&transport).query_task("t-9", &Credential::new("k")).await.unwrap();
        assert_eq!(result.raw, doc);
        assert_eq!(result.task.status, ccapi_core::TaskStatus::Processing);
        assert!(result.task.result_url.is_none());
    }

    #[tokio::test]
    async fn test_download_sends_no_credential() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(HttpResponse::new(200, vec![0_u8, 0, 0, 24]));
        let bytes = client(&transport).download("https://cdn.example.com/v.mp4").await.unwrap();
        assert_eq!(bytes.len(), 4);
        assert!(transport.requests()[0].bearer.is_none());
    }

    #[test]
    fn test_image_to_video_payload() {
        let frame = ImageBuffer::blank(32, 16);
        let options = WanOptions {
            seed: Some(42),
            negative_prompt: Some("blurry".to_string()),
            audio_url: Some(String::new()),
            ..WanOptions::default()
        };
        let payload =
            wan_image_to_video("pan left", &frame, VideoResolution::P720, &options).unwrap();

        let img_url = payload["input"]["img_url"].as_str().unwrap();
        assert!(img_url.starts_with("data:image/png;base64,"));
        assert_eq!(payload["input"]["negative_prompt"], "blurry");
        assert!(payload["input"].get("audio_url").is_none());
        assert_eq!(payload["parameters"]["resolution"], "720P");
        assert_eq!(payload["parameters"]["seed"], 42);
        assert_eq!(payload["parameters"]["duration"], 5);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = WanOptions { duration_secs: 7, ..WanOptions::default() };
        assert!(matches!(
            wan_text_to_video("x", "1280*720", &options),
            Err(CcApiError::Configuration(_))
        ));
        assert!(wan_text_to_video("x", "1000*1000", &WanOptions::default()).is_err());
    }
}
