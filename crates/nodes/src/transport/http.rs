// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! HTTP transport seam.
//!
//! Adapters talk to providers only through [`HttpTransport`], so the poll loop and the
//! payload builders can be tested against a scripted transport. Non-2xx statuses are returned
//! as ordinary [`HttpResponse`]s; only connection-level failures are errors here, and it is up
//! to the caller to decide what a given status means.

use async_trait::async_trait;
use bytes::Bytes;
use ccapi_core::{Credential, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// # Errors
    ///
    /// Returns `CcApiError::Parse` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// A file part of a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub path: PathBuf,
}

/// Multipart form: plain text fields plus one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: MultipartFile,
}

/// Minimal HTTP client used by every adapter.
///
/// A `Some` credential is sent as `Authorization: Bearer <credential>`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// `POST url` with a JSON body.
    async fn post_json(
        &self,
        url: &str,
        credential: Option<&Credential>,
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;

    /// `GET url?query`.
    async fn get(
        &self,
        url: &str,
        credential: Option<&Credential>,
        query: &[(String, String)],
    ) -> Result<HttpResponse>;

    /// `POST url` with a multipart body. The file is read from disk at call time.
    async fn post_multipart(
        &self,
        url: &str,
        credential: Option<&Credential>,
        form: &MultipartForm,
    ) -> Result<HttpResponse>;
}

#[cfg(feature = "http")]
pub use reqwest_transport::{HttpSettings, ReqwestTransport};

#[cfg(feature = "http")]
mod reqwest_transport {
    use super::{HttpResponse, HttpTransport, MultipartForm};
    use async_trait::async_trait;
    use ccapi_core::{CcApiError, Credential, Result};
    use std::time::Duration;

    /// Timeouts applied to every request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HttpSettings {
        pub request_timeout: Duration,
        pub connect_timeout: Duration,
    }

    impl Default for HttpSettings {
        fn default() -> Self {
            Self {
                request_timeout: Duration::from_secs(30),
                connect_timeout: Duration::from_secs(5),
            }
        }
    }

    /// [`HttpTransport`] backed by a shared `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// # Errors
        ///
        /// Returns `CcApiError::Configuration` if the TLS backend cannot be initialized.
        pub fn new(settings: HttpSettings) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(settings.request_timeout)
                .connect_timeout(settings.connect_timeout)
                .build()
                .map_err(|e| {
                    CcApiError::Configuration(format!("Failed to initialize HTTP client: {e}"))
                })?;
            Ok(Self { client })
        }

        fn parse_url(url: &str, query: &[(String, String)]) -> Result<url::Url> {
            let parsed = if query.is_empty() {
                url::Url::parse(url)
            } else {
                url::Url::parse_with_params(url, query)
            };
            parsed.map_err(|e| CcApiError::Configuration(format!("Invalid URL '{url}': {e}")))
        }

        async fn send(
            request: reqwest::RequestBuilder,
            credential: Option<&Credential>,
        ) -> Result<HttpResponse> {
            let request = match credential {
                Some(credential) => request.bearer_auth(credential.expose()),
                None => request,
            };
            let response = request
                .send()
                .await
                .map_err(|e| CcApiError::Network(format!("HTTP request failed: {e}")))?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| CcApiError::Network(format!("Failed to read response body: {e}")))?;
            Ok(HttpResponse { status, body })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn post_json(
            &self,
            url: &str,
            credential: Option<&Credential>,
            body: &serde_json::Value,
        ) -> Result<HttpResponse> {
            let url = Self::parse_url(url, &[])?;
            tracing::debug!(%url, "POST");
            Self::send(self.client.post(url).json(body), credential).await
        }

        async fn get(
            &self,
            url: &str,
            credential: Option<&Credential>,
            query: &[(String, String)],
        ) -> Result<HttpResponse> {
            let url = Self::parse_url(url, query)?;
            tracing::debug!(%url, "GET");
            Self::send(self.client.get(url), credential).await
        }

        async fn post_multipart(
            &self,
            url: &str,
            credential: Option<&Credential>,
            form: &MultipartForm,
        ) -> Result<HttpResponse> {
            let url = Self::parse_url(url, &[])?;
            let data = tokio::fs::read(&form.file.path).await?;
            tracing::debug!(%url, bytes = data.len(), "POST multipart");

            let part = reqwest::multipart::Part::bytes(data)
                .file_name(form.file.file_name.clone())
                .mime_str(&form.file.mime)
                .map_err(|e| CcApiError::Configuration(format!("Invalid MIME type: {e}")))?;
            let mut multipart = reqwest::multipart::Form::new();
            for (name, value) in &form.fields {
                multipart = multipart.text(name.clone(), value.clone());
            }
            multipart = multipart.part(form.file.field.clone(), part);

            Self::send(self.client.post(url).multipart(multipart), credential).await
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used)]
    mod tests {
        use super::*;

        #[test]
        fn test_query_is_encoded() {
            let url = ReqwestTransport::parse_url(
                "https://api.example.com/v3/async/task-result",
                &[("task_id".to_string(), "a b&c".to_string())],
            )
            .unwrap();
            assert_eq!(url.query(), Some("task_id=a+b%26c"));
        }

        #[test]
        fn test_invalid_url_is_configuration_error() {
            let err = ReqwestTransport::parse_url("not a url", &[]).unwrap_err();
            assert!(matches!(err, CcApiError::Configuration(_)));
        }
    }
}
