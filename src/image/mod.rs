//! Image generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::{request_images, Generation, ImageProvider, ImageProviderExt};
pub use types::{enhance_prompt, GeneratedImage, GenerationRequest, ImageProviderKind};
