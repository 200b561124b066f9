//! Image generation providers.

#[cfg(feature = "openai-image")]
mod openai;

#[cfg(feature = "openai-image")]
pub use openai::{OpenAiImageProvider, OpenAiImageProviderBuilder};
