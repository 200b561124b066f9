//! Image provider trait and utilities.

use crate::error::{Result, SceneGenError};
use crate::image::types::{GeneratedImage, GenerationRequest, ImageProviderKind};
use async_trait::async_trait;
use std::time::Duration;

/// Delay before the first retry when the provider gives no hint.
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates images for the given request.
    ///
    /// An empty list means the provider answered but produced nothing.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedImage>>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ImageProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ImageProviderKind::OpenAI => "OpenAI (DALL-E)",
        }
    }

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

/// Extension trait for providers with retry logic.
#[async_trait]
pub trait ImageProviderExt: ImageProvider {
    /// Generates with automatic retries on transient failures.
    ///
    /// Waits for the provider's `Retry-After` hint when there is one,
    /// otherwise backs off exponentially from one second.
    async fn generate_with_retries(
        &self,
        request: &GenerationRequest,
        max_retries: u32,
    ) -> Result<Vec<GeneratedImage>> {
        let mut attempt = 0;
        loop {
            match self.generate(request).await {
                Ok(images) => return Ok(images),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = e.retry_after().unwrap_or_else(|| backoff_delay(attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient error: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T: ImageProvider + ?Sized> ImageProviderExt for T {}

/// Exponential backoff: 1s, 2s, 4s, ... capped at 64s.
fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF * 2u32.saturating_pow(attempt.min(6))
}

/// What a generation call produced for one scene.
#[derive(Debug)]
pub enum Generation {
    /// At least one image came back.
    Images(Vec<GeneratedImage>),
    /// The provider answered with no images.
    Nothing,
    /// The call failed; the error has already been logged.
    Failed(SceneGenError),
}

impl Generation {
    /// Returns the first generated image with a usable URL, if any.
    pub fn first(&self) -> Option<&GeneratedImage> {
        match self {
            Self::Images(images) => images.iter().find(|img| !img.url.is_empty()),
            _ => None,
        }
    }
}

/// Requests images from a provider, turning every failure into a
/// [`Generation::Failed`] instead of an error.
pub async fn request_images(
    provider: &dyn ImageProvider,
    request: &GenerationRequest,
    max_retries: u32,
) -> Generation {
    match provider.generate_with_retries(request, max_retries).await {
        Ok(images) if images.is_empty() => Generation::Nothing,
        Ok(images) => Generation::Images(images),
        Err(e) => {
            tracing::error!(provider = provider.name(), "image generation request failed: {e}");
            Generation::Failed(e)
        }
    }
}
