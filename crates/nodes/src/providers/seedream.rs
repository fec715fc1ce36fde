// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Seedream 4.0 image generation (synchronous).
//!
//! The same model is reachable through Volcengine Ark and through PPIO; the two differ in
//! payload field names, response shape and size bounds. Responses are memoized in a
//! [`RequestCache`] keyed by the normalized payload, so re-running an unchanged graph does not
//! bill a second generation.

use crate::image::{aspect_ratio_fit, from_url_or_b64, to_base64_jpeg, SizeBounds};
use crate::transport::HttpTransport;
use ccapi_core::cache::RequestCache;
use ccapi_core::{CcApiError, Credential, ImageBuffer, Result};
use serde_json::{json, Value};
use std::sync::Arc;

pub const VOLCENGINE_ENDPOINT: &str = "https://ark.cn-beijing.volces.com/api/v3/images/generations";
pub const VOLCENGINE_MODEL: &str = "doubao-seedream-4-0-250828";
pub const PPIO_MODEL_PATH: &str = "seedream-4.0";

const REFERENCE_JPEG_QUALITY: u8 = 90;
const DEFAULT_SIDE: u32 = 2048;

/// Which API fronts the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedreamBackend {
    Volcengine,
    Ppio,
}

impl SeedreamBackend {
    pub const fn bounds(self) -> SizeBounds {
        match self {
            Self::Volcengine => SizeBounds::seedream(),
            Self::Ppio => SizeBounds::ppio_seedream(),
        }
    }
}

/// Requested output size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedreamSize {
    /// Provider preset such as `"2K"`.
    Preset(String),
    /// Explicit dimensions, sent as-is.
    Custom { width: u32, height: u32 },
    /// Fit the first reference image into the backend's bounds; 2048×2048 without one.
    FollowReference,
}

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedreamRequest {
    pub prompt: String,
    pub reference_images: Vec<ImageBuffer>,
    pub size: SeedreamSize,
    /// Let the model return a coherent image sequence.
    pub sequential: bool,
    pub max_images: u32,
    pub watermark: bool,
}

impl SeedreamRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_images: Vec::new(),
            size: SeedreamSize::FollowReference,
            sequential: false,
            max_images: 1,
            watermark: false,
        }
    }

    fn size_string(&self, backend: SeedreamBackend) -> Result<String> {
        match &self.size {
            SeedreamSize::Preset(preset) => Ok(preset.clone()),
            SeedreamSize::Custom { width, height } => Ok(format!("{width}x{height}")),
            SeedreamSize::FollowReference => {
                let (width, height) = match self.reference_images.first() {
                    Some(reference) => {
                        aspect_ratio_fit(reference.width(), reference.height(), &backend.bounds())?
                    },
                    None => (DEFAULT_SIDE, DEFAULT_SIDE),
                };
                Ok(format!("{width}x{height}"))
            },
        }
    }

    /// Builds the JSON body for `backend`.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::NoConformingSize` if a reference cannot be fitted, or
    /// `CcApiError::Image` if a reference image cannot be encoded.
    pub fn payload(&self, backend: SeedreamBackend) -> Result<Value> {
        let images = self
            .reference_images
            .iter()
            .map(|image| to_base64_jpeg(image, REFERENCE_JPEG_QUALITY))
            .collect::<Result<Vec<_>>>()?;
        let size = self.size_string(backend)?;
        let sequential = if self.sequential { "auto" } else { "disabled" };

        let payload = match backend {
            SeedreamBackend::Volcengine => {
                let mut payload = json!({
                    "model": VOLCENGINE_MODEL,
                    "prompt": self.prompt,
                    "size": size,
                    "response_format": "b64_json",
                    "sequential_image_generation": sequential,
                    "stream": false,
                    "watermark": self.watermark,
                });
                if self.sequential {
                    payload["sequential_image_generation_options"] =
                        json!({ "max_images": self.max_images });
                }
                if !images.is_empty() {
                    payload["image"] = json!(images);
                }
                payload
            },
            SeedreamBackend::Ppio => {
                let mut payload = json!({
                    "prompt": self.prompt,
                    "size": size,
                    "sequential_image_generation": sequential,
                    "max_images": self.max_images,
                    "watermark": self.watermark,
                });
                if !images.is_empty() {
                    payload["images"] = json!(images);
                }
                payload
            },
        };
        Ok(payload)
    }
}

/// Sends Seedream requests and decodes the returned images.
pub struct SeedreamClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<RequestCache<Vec<ImageBuffer>>>,
    backend: SeedreamBackend,
    endpoint: String,
}

impl SeedreamClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<RequestCache<Vec<ImageBuffer>>>,
        backend: SeedreamBackend,
        endpoint: impl Into<String>,
    ) -> Self {
        Self { transport, cache, backend, endpoint: endpoint.into() }
    }

    /// Generates images, serving repeats of an identical request from the cache.
    ///
    /// Only successful results are cached.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::Http` for a rejected request, `CcApiError::Parse` for a response
    /// without images, and any image decoding or download error.
    pub async fn generate(
        &self,
        request: &SeedreamRequest,
        credential: &Credential,
    ) -> Result<Vec<ImageBuffer>> {
        let payload = request.payload(self.backend)?;
        let key = RequestCache::<Vec<ImageBuffer>>::key_for(&payload);
        if let Some(images) = self.cache.get(&key) {
            tracing::info!(images = images.len(), "Serving Seedream result from cache");
            return Ok(images);
        }

        let response = self.transport.post_json(&self.endpoint, Some(credential), &payload).await?;
        if !response.is_success() {
            return Err(CcApiError::Http { status: response.status, body: response.text() });
        }
        let body: Value = response.json()?;

        let mut images = Vec::new();
        for reference in result_references(self.backend, &body) {
            images.push(from_url_or_b64(&reference, self.transport.as_ref()).await?);
        }
        if images.is_empty() {
            return Err(CcApiError::Parse("Seedream response contained no images".to_string()));
        }

        tracing::info!(
            images = images.len(),
            backend = ?self.backend,
            "Seedream generation finished"
        );
        self.cache.insert(key, images.clone());
        Ok(images)
    }
}

/// URLs or inline payloads of the generated images.
fn result_references(backend: SeedreamBackend, body: &Value) -> Vec<String> {
    fn ark_item(item: &Value) -> Option<&str> {
        item.get("b64_json").or_else(|| item.get("url")).and_then(Value::as_str)
    }

    let (items, pick): (_, fn(&Value) -> Option<&str>) = match backend {
        SeedreamBackend::Volcengine => (body["data"].as_array(), ark_item),
        SeedreamBackend::Ppio => (body["images"].as_array(), Value::as_str),
    };
    items
        .map(|items| items.iter().filter_map(pick).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::image::{to_base64_png, PNG_DATA_URI_PREFIX};
    use crate::test_utils::MockTransport;
    use crate::transport::HttpResponse;
    use base64::Engine;
    use ccapi_core::cache::CachePolicy;
    use ccapi_core::clock::ManualClock;

    fn cache() -> Arc<RequestCache<Vec<ImageBuffer>>> {
        Arc::new(RequestCache::new(CachePolicy::default(), Arc::new(ManualClock::new())))
    }

    fn tiny_png_b64() -> String {
        let uri = to_base64_png(&ImageBuffer::blank(2, 2)).unwrap();
        uri[PNG_DATA_URI_PREFIX.len()..].to_string()
    }

    #[test]
    fn test_follow_reference_uses_fitted_size() {
        let mut request = SeedreamRequest::new("a lighthouse");
        request.reference_images.push(ImageBuffer::blank(1920, 1080));
        let payload = request.payload(SeedreamBackend::Volcengine).unwrap();
        assert_eq!(payload["size"], "1920x1072");
        assert_eq!(payload["image"].as_array().unwrap().len(), 1);
        assert_eq!(payload["response_format"], "b64_json");
        assert!(payload.get("sequential_image_generation_options").is_none());
    }

    #[test]
    fn test_default_size_without_reference() {
        let payload = SeedreamRequest::new("x").payload(SeedreamBackend::Ppio).unwrap();
        assert_eq!(payload["size"], "2048x2048");
        assert!(payload.get("images").is_none());
        assert_eq!(payload["sequential_image_generation"], "disabled");
    }

    #[test]
    fn test_sequential_options() {
        let mut request = SeedreamRequest::new("storyboard");
        request.sequential = true;
        request.max_images = 4;
        request.size = SeedreamSize::Preset("2K".to_string());

        let volc = request.payload(SeedreamBackend::Volcengine).unwrap();
        assert_eq!(volc["sequential_image_generation"], "auto");
        assert_eq!(volc["sequential_image_generation_options"]["max_images"], 4);
        assert_eq!(volc["size"], "2K");

        let ppio = request.payload(SeedreamBackend::Ppio).unwrap();
        assert_eq!(ppio["max_images"], 4);
    }

    #[tokio::test]
    async fn test_generate_decodes_and_caches() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, &json!({"data": [{"b64_json": tiny_png_b64()}]}));
        let client = SeedreamClient::new(
            transport.clone(),
            cache(),
            SeedreamBackend::Volcengine,
            VOLCENGINE_ENDPOINT,
        );

        let request = SeedreamRequest::new("a lighthouse");
        let first = client.generate(&request, &Credential::new("k")).await.unwrap();
        let second = client.generate(&request, &Credential::new("k")).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_ppio_urls_are_downloaded() {
        let png = base64::engine::general_purpose::STANDARD.decode(tiny_png_b64()).unwrap();
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(200, &json!({"images": ["https://cdn.example.com/1.png"]}))
            .push_response(HttpResponse::new(200, png));
        let client = SeedreamClient::new(
            transport.clone(),
            cache(),
            SeedreamBackend::Ppio,
            "https://api.example.com/v3/seedream-4.0",
        );

        let images =
            client.generate(&SeedreamRequest::new("x"), &Credential::new("k")).await.unwrap();
        assert_eq!(images[0].width(), 2);
        assert_eq!(transport.requests()[1].url, "https://cdn.example.com/1.png");
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_json(500, &json!({"error": "overloaded"}))
            .push_json(200, &json!({"data": []}));
        let cache = cache();
        let client = SeedreamClient::new(
            transport.clone(),
            cache.clone(),
            SeedreamBackend::Volcengine,
            VOLCENGINE_ENDPOINT,
        );
        let request = SeedreamRequest::new("x");

        let err = client.generate(&request, &Credential::new("k")).await.unwrap_err();
        assert!(matches!(err, CcApiError::Http { status: 500, .. }));
        let err = client.generate(&request, &Credential::new("k")).await.unwrap_err();
        assert!(matches!(err, CcApiError::Parse(_)));
        assert_eq!(cache.info().total_entries, 0);
    }
}
