//! Error types for scene image generation.

use std::time::Duration;

/// Errors that can occur while loading a script or generating images.
#[derive(Debug, thiserror::Error)]
pub enum SceneGenError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Account has no remaining quota or billing is not set up.
    #[error("billing error: {0}")]
    Billing(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// A single scene entry could not be understood.
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    /// The script document has no `visual_script` list.
    #[error("missing key 'visual_script' in script")]
    MissingScenes,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., reading the script or saving a file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SceneGenError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Result type alias for scene generation operations.
pub type Result<T> = std::result::Result<T, SceneGenError>;

/// Maximum length of an API error body carried into an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Redacts anything that looks like an OpenAI key and truncates long bodies.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split(' ')
        .map(|word| {
            if word.starts_with("sk-") && word.len() > 8 {
                "sk-***".to_string()
            } else {
                word.to_string()
            }
        })
        .collect();
    let mut message = redacted.join(" ");

    if message.chars().count() > MAX_ERROR_MESSAGE_LEN {
        message = message.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        message.push_str("...");
    }
    message
}
