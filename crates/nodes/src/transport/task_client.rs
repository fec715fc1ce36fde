// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Submit-then-poll driver for asynchronous generation jobs.
//!
//! The protocol is the one shared by the async video providers:
//!
//! - `POST <endpoint>` with a JSON payload returns `{"task_id": "..."}`.
//! - `GET <status_url>?task_id=<id>` returns
//!   `{"task": {"task_id", "status", "reason"}, "videos": [{"video_url"}]}`.
//!
//! Polls are strictly sequential and the only suspension points are the HTTP calls and the
//! sleep between attempts. There is no wall-clock deadline: `interval * max_attempts` is the
//! effective timeout. Abandoning the wait does not cancel the remote job.

use crate::transport::HttpTransport;
use ccapi_core::{CcApiError, Credential, GenerationTask, Result, Sleeper, TaskStatus};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// How long to keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), max_attempts: 120 }
    }
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }
}

/// Drives one provider's submit/poll protocol.
#[derive(Clone)]
pub struct AsyncTaskClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    status_url: String,
}

impl AsyncTaskClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        status_url: impl Into<String>,
    ) -> Self {
        Self { transport, sleeper, status_url: status_url.into() }
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    /// Submits a job and returns its task id. Never retried.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::Submission` with the raw body if the status is not 200 or the
    /// response has no `task_id`, and `CcApiError::Network` if the request could not be sent.
    pub async fn submit(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        credential: &Credential,
    ) -> Result<String> {
        let response = self.transport.post_json(endpoint, Some(credential), payload).await?;
        let rejected = || CcApiError::Submission { status: response.status, body: response.text() };

        if response.status != 200 {
            return Err(rejected());
        }
        let task_id = response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|v| v.get("task_id").and_then(serde_json::Value::as_str).map(str::to_string))
            .filter(|id| !id.is_empty())
            .ok_or_else(rejected)?;

        tracing::info!(%endpoint, %task_id, "Submitted generation task");
        Ok(task_id)
    }

    /// Queries the task status once.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::Http` for a non-2xx status, `CcApiError::Parse` for a body that is
    /// not a task status document, or `CcApiError::Network` if the request failed.
    pub async fn poll_once(
        &self,
        task_id: &str,
        credential: &Credential,
    ) -> Result<GenerationTask> {
        let query = [("task_id".to_string(), task_id.to_string())];
        let response = self.transport.get(&self.status_url, Some(credential), &query).await?;
        if !response.is_success() {
            return Err(CcApiError::Http { status: response.status, body: response.text() });
        }
        parse_task_status(task_id, &response.json()?)
    }

    /// Polls until the task reaches a terminal state and returns its result URL.
    ///
    /// Transient errors (network, HTTP status, malformed body) on a single attempt are
    /// absorbed and retried; if the final attempt fails that way, the error is reported as the
    /// timeout's cause. Sleeps happen only between attempts.
    ///
    /// # Errors
    ///
    /// - `CcApiError::TaskFailed` with the provider's reason when the task fails
    /// - `CcApiError::ResultMissing` when the task succeeds without a media URL
    /// - `CcApiError::TaskTimeout` after `max_attempts` polls without a terminal state
    pub async fn wait_until_done(
        &self,
        task_id: &str,
        credential: &Credential,
        policy: &PollPolicy,
    ) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=policy.max_attempts {
            match self.poll_once(task_id, credential).await {
                Ok(task) => {
                    last_error = None;
                    match task.status {
                        TaskStatus::Succeeded => {
                            let url = task.result_url.ok_or_else(|| CcApiError::ResultMissing {
                                task_id: task_id.to_string(),
                            })?;
                            tracing::info!(%task_id, attempt, "Task succeeded");
                            return Ok(url);
                        },
                        TaskStatus::Failed => {
                            return Err(CcApiError::TaskFailed {
                                task_id: task_id.to_string(),
                                reason: task
                                    .failure_reason
                                    .unwrap_or_else(|| "Unknown error".to_string()),
                            });
                        },
                        status @ (TaskStatus::Queued | TaskStatus::Processing) => {
                            tracing::debug!(
                                %task_id,
                                attempt,
                                max_attempts = policy.max_attempts,
                                ?status,
                                "Task not finished yet"
                            );
                        },
                    }
                },
                Err(e) if e.is_transient() => {
                    tracing::debug!(%task_id, attempt, error = %e, "Poll attempt failed, retrying");
                    last_error = Some(e.to_string());
                },
                Err(e) => return Err(e),
            }

            if attempt < policy.max_attempts {
                self.sleeper.sleep(policy.interval).await;
            }
        }

        Err(CcApiError::TaskTimeout {
            task_id: task_id.to_string(),
            attempts: policy.max_attempts,
            last_error,
        })
    }

    /// Submits `payload` and waits for the result URL.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::submit`] or [`Self::wait_until_done`].
    pub async fn run(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        credential: &Credential,
        policy: &PollPolicy,
    ) -> Result<String> {
        let task_id = self.submit(endpoint, payload, credential).await?;
        self.wait_until_done(&task_id, credential, policy).await
    }
}

#[derive(Deserialize)]
struct StatusDocument {
    task: TaskDocument,
    #[serde(default)]
    videos: Vec<VideoDocument>,
}

#[derive(Deserialize)]
struct TaskDocument {
    #[serde(default)]
    task_id: Option<String>,
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct VideoDocument {
    #[serde(default)]
    video_url: Option<String>,
}

/// Parses a task status document into a [`GenerationTask`].
///
/// # Errors
///
/// Returns `CcApiError::Parse` if the document has no `task.status`.
pub fn parse_task_status(task_id: &str, body: &serde_json::Value) -> Result<GenerationTask> {
    let doc = StatusDocument::deserialize(body)
        .map_err(|e| CcApiError::Parse(format!("unexpected task status document: {e}")))?;

    Ok(GenerationTask {
        task_id: doc
            .task
            .task_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| task_id.to_string()),
        status: TaskStatus::from_label(&doc.task.status),
        result_url: doc
            .videos
            .into_iter()
            .next()
            .and_then(|v| v.video_url)
            .filter(|url| !url.is_empty()),
        failure_reason: doc.task.reason.filter(|r| !r.is_empty()),
    })
}
