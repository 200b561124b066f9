//! Core types for image generation.

use serde::{Deserialize, Serialize};

/// Prefix wrapped around every scene prompt before submission.
const PROMPT_PREFIX: &str = "High quality realistic image: ";
/// Suffix appended to every scene prompt before submission.
const PROMPT_SUFFIX: &str = ". Professional photography, detailed, clear focus.";

/// Image provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// OpenAI image models (DALL-E).
    OpenAI,
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// A request to generate one or more images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The prompt sent to the provider, verbatim.
    pub prompt: String,
    /// Number of images requested.
    pub count: u32,
}

impl GenerationRequest {
    /// Creates a new request for a single image.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            count: 1,
        }
    }

    /// Creates a request for a scene, wrapping its prompt in the fixed
    /// photographic style.
    pub fn for_scene(prompt: &str) -> Self {
        Self::new(enhance_prompt(prompt))
    }

    /// Sets the number of images to generate.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Wraps a scene prompt in the fixed photographic style.
pub fn enhance_prompt(prompt: &str) -> String {
    format!("{PROMPT_PREFIX}{prompt}{PROMPT_SUFFIX}")
}

/// A generated image, addressed by the URL the provider returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use = "generated image should be downloaded"]
pub struct GeneratedImage {
    /// Location of the image bytes.
    pub url: String,
    /// Prompt as rewritten by the provider, if it reported one.
    pub revised_prompt: Option<String>,
    /// Provider that generated this image.
    pub provider: ImageProviderKind,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(url: impl Into<String>, provider: ImageProviderKind) -> Self {
        Self {
            url: url.into(),
            revised_prompt: None,
            provider,
        }
    }

    /// Attaches the provider's rewritten prompt.
    pub fn with_revised_prompt(mut self, revised_prompt: Option<String>) -> Self {
        self.revised_prompt = revised_prompt;
        self
    }
}
