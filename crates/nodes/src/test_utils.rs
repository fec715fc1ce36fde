// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Test utilities for adapter testing

use crate::transport::{HttpResponse, HttpTransport, MultipartForm};
use async_trait::async_trait;
use ccapi_core::{CcApiError, Credential, Result, Sleeper};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    PostJson,
    PostMultipart,
}

/// One request seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub json: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    pub form: Option<MultipartForm>,
    /// Whether the multipart file existed on disk when the request was sent.
    pub file_existed: bool,
}

/// Transport that replays scripted responses and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response.
    pub fn push_json(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.push_response(HttpResponse::new(status, body.to_string()))
    }

    pub fn push_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queues a transport-level failure.
    pub fn push_error(&self, error: CcApiError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Response returned once the queue is empty.
    pub fn repeat_json(&self, status: u16, body: &serde_json::Value) -> &Self {
        *self.fallback.lock().unwrap() = Some(HttpResponse::new(status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, request: RecordedRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CcApiError::Network("no scripted response left".to_string()))
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        credential: Option<&Credential>,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        self.next(RecordedRequest {
            method: Method::PostJson,
            url: url.to_string(),
            bearer: credential.map(|c| c.expose().to_string()),
            json: Some(body.clone()),
            query: Vec::new(),
            form: None,
            file_existed: false,
        })
    }

    async fn get(
        &self,
        url: &str,
        credential: Option<&Credential>,
        query: &[(String, String)],
    ) -> Result<HttpResponse> {
        self.next(RecordedRequest {
            method: Method::Get,
            url: url.to_string(),
            bearer: credential.map(|c| c.expose().to_string()),
            json: None,
            query: query.to_vec(),
            form: None,
            file_existed: false,
        })
    }

    async fn post_multipart(
        &self,
        url: &str,
        credential: Option<&Credential>,
        form: &MultipartForm,
    ) -> Result<HttpResponse> {
        self.next(RecordedRequest {
            method: Method::PostMultipart,
            url: url.to_string(),
            bearer: credential.map(|c| c.expose().to_string()),
            json: None,
            query: Vec::new(),
            form: Some(form.clone()),
            file_existed: form.file.path.exists(),
        })
    }
}

/// Sleeper that records requested durations and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
