#![warn(missing_docs)]
//! scenegen - one generated image per scene of a visual script.
//!
//! Reads a JSON visual script, asks an image provider for one picture per
//! scene, and downloads each result to `scene_<id>.jpg`.
//!
//! # Quick Start
//!
//! ```no_run
//! use scenegen::{HttpFetcher, OpenAiImageProvider, Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> scenegen::Result<()> {
//!     let client = reqwest::Client::new();
//!     let provider = OpenAiImageProvider::builder().client(client.clone()).build()?;
//!     let pipeline = Pipeline::new(
//!         Arc::new(provider),
//!         Arc::new(HttpFetcher::new(client)),
//!         PipelineConfig::new("resources/images"),
//!     );
//!     let report = pipeline.run("resources/scripts/script.json").await?;
//!     println!("saved {} images", report.saved());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `openai-image`: OpenAI (dall-e-3)
//! - `cli`: Command-line interface

pub mod download;
mod error;
pub mod image;
pub mod pipeline;
pub mod script;

// Re-export error types at crate root
pub use error::{Result, SceneGenError};

pub use download::{download_image, DownloadOutcome, FetchedResource, HttpFetcher, ImageFetcher};
pub use image::{
    request_images, GeneratedImage, Generation, GenerationRequest, ImageProvider,
    ImageProviderExt, ImageProviderKind,
};
pub use pipeline::{Pipeline, PipelineConfig, RunReport, SceneOutcome, SceneReport};
pub use script::{load_script, Scene, VisualScript};

#[cfg(feature = "openai-image")]
pub use image::providers::{OpenAiImageProvider, OpenAiImageProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::download::{HttpFetcher, ImageFetcher};
    pub use crate::error::{Result, SceneGenError};
    pub use crate::image::{GeneratedImage, GenerationRequest, ImageProvider, ImageProviderExt};
    pub use crate::pipeline::{Pipeline, PipelineConfig, RunReport};
    pub use crate::script::{Scene, VisualScript};

    #[cfg(feature = "openai-image")]
    pub use crate::image::providers::OpenAiImageProvider;
}
