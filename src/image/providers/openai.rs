//! OpenAI image generation provider (dall-e-3).

use crate::error::{parse_retry_after, sanitize_error_message, Result, SceneGenError};
use crate::image::provider::ImageProvider;
use crate::image::types::{GeneratedImage, GenerationRequest, ImageProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const GENERATIONS_PATH: &str = "/v1/images/generations";

const MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

/// Environment variables checked for the API key, in order.
const API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "openai_api_key"];

/// Builder for OpenAiImageProvider.
#[derive(Debug, Clone, Default)]
pub struct OpenAiImageProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl OpenAiImageProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY`, then `openai_api_key`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API base URL (default `https://api.openai.com`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Shares an existing HTTP client instead of creating a new one.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<OpenAiImageProvider> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            })
            .ok_or_else(|| {
                SceneGenError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(OpenAiImageProvider {
            client: self.client.unwrap_or_default(),
            api_key,
            generations_url: format!("{base_url}{GENERATIONS_PATH}"),
        })
    }
}

/// OpenAI image generation provider.
pub struct OpenAiImageProvider {
    client: reqwest::Client,
    api_key: String,
    generations_url: String,
}

impl OpenAiImageProvider {
    /// Creates a new `OpenAiImageProviderBuilder`.
    pub fn builder() -> OpenAiImageProviderBuilder {
        OpenAiImageProviderBuilder::new()
    }

    fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> SceneGenError {
        let text = sanitize_error_message(text);
        if status == 402 {
            return SceneGenError::Billing(text);
        }
        if status == 429 {
            // insufficient_quota is not transient
            if text.contains("insufficient_quota") || text.contains("exceeded your current quota") {
                return SceneGenError::Billing(text);
            }
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return SceneGenError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return SceneGenError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("content_policy")
        {
            return SceneGenError::ContentBlocked(text);
        }
        SceneGenError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedImage>> {
        let start = Instant::now();
        let body = OpenAiImageRequest::from_generation_request(request);

        let response = self
            .client
            .post(&self.generations_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &text, &headers));
        }

        let openai_response: OpenAiImageResponse = response.json().await?;
        let images = openai_response.into_images();

        tracing::debug!(
            model = MODEL,
            count = images.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI image generation complete"
        );

        Ok(images)
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::OpenAI
    }

    async fn health_check(&self) -> Result<()> {
        if self.api_key.starts_with("sk-") {
            Ok(())
        } else {
            Err(SceneGenError::Auth("Invalid API key format".into()))
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest<'a> {
    model: &'static str,
    prompt: &'a str,
    n: u32,
    size: &'static str,
    quality: &'static str,
}

impl<'a> OpenAiImageRequest<'a> {
    fn from_generation_request(req: &'a GenerationRequest) -> Self {
        Self {
            model: MODEL,
            prompt: &req.prompt,
            n: req.count,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

impl OpenAiImageResponse {
    /// Keeps every entry that carries a non-empty URL, in order.
    fn into_images(self) -> Vec<GeneratedImage> {
        self.data
            .into_iter()
            .filter_map(|d| {
                let url = d.url.filter(|u| !u.is_empty())?;
                Some(
                    GeneratedImage::new(url, ImageProviderKind::OpenAI)
                        .with_revised_prompt(d.revised_prompt),
                )
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = OpenAiImageProviderBuilder::new().api_key("sk-test").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_builder_base_url() {
        let provider = OpenAiImageProvider::builder()
            .api_key("sk-test")
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(
            provider.generations_url,
            "http://localhost:8080/v1/images/generations"
        );
    }

    #[test]
    fn test_builder_default_url() {
        let provider = OpenAiImageProvider::builder()
            .api_key("sk-test")
            .build()
            .unwrap();
        assert_eq!(
            provider.generations_url,
            "https://api.openai.com/v1/images/generations"
        );
    }

    #[test]
    fn test_request_construction_for_scene() {
        let req = GenerationRequest::for_scene("A sunset");
        let openai_req = OpenAiImageRequest::from_generation_request(&req);

        assert_eq!(
            openai_req.prompt,
            "High quality realistic image: A sunset. Professional photography, detailed, clear focus."
        );
        assert_eq!(openai_req.model, "dall-e-3");
        assert_eq!(openai_req.n, 1);
        assert_eq!(openai_req.size, "1024x1024");
        assert_eq!(openai_req.quality, "standard");
    }

    #[test]
    fn test_request_body_shape() {
        let req = GenerationRequest::new("x");
        let json = serde_json::to_value(OpenAiImageRequest::from_generation_request(&req)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "model": "dall-e-3",
                "prompt": "x",
                "n": 1,
                "size": "1024x1024",
                "quality": "standard",
            })
        );
    }

    #[test]
    fn test_response_deserialization_url() {
        let json = r#"{"created": 1, "data": [{"url": "https://example.com/img.png", "revised_prompt": "A beautiful sunset over the ocean"}]}"#;
        let resp: OpenAiImageResponse = serde_json::from_str(json).unwrap();
        let images = resp.into_images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://example.com/img.png");
        assert_eq!(
            images[0].revised_prompt.as_deref(),
            Some("A beautiful sunset over the ocean")
        );
    }

    #[test]
    fn test_response_without_urls_is_empty() {
        let json = r#"{"data": [{"b64_json": "AQID"}, {"url": ""}]}"#;
        let resp: OpenAiImageResponse = serde_json::from_str(json).unwrap();
        assert!(resp.into_images().is_empty());

        let resp: OpenAiImageResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.into_images().is_empty());
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();

        assert!(matches!(
            OpenAiImageProvider::parse_error(401, "bad key", &headers),
            SceneGenError::Auth(_)
        ));
        assert!(matches!(
            OpenAiImageProvider::parse_error(429, r#"{"error":{"code":"insufficient_quota"}}"#, &headers),
            SceneGenError::Billing(_)
        ));
        assert!(matches!(
            OpenAiImageProvider::parse_error(400, r#"{"error":{"code":"content_policy_violation"}}"#, &headers),
            SceneGenError::ContentBlocked(_)
        ));
        assert!(matches!(
            OpenAiImageProvider::parse_error(500, "oops", &headers),
            SceneGenError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_parse_error_rate_limit_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "7".parse().unwrap());

        match OpenAiImageProvider::parse_error(429, "slow down", &headers) {
            SceneGenError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(std::time::Duration::from_secs(7)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health_check_key_format() {
        let good = OpenAiImageProvider::builder().api_key("sk-test").build().unwrap();
        assert!(good.health_check().await.is_ok());

        let bad = OpenAiImageProvider::builder().api_key("nope").build().unwrap();
        assert!(bad.health_check().await.is_err());
    }
}
