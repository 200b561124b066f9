//! Scene-by-scene generation pipeline.
//!
//! Loads a visual script, then for each scene in order: requests an image,
//! downloads the first result to `scene_<id>.jpg`, and waits a fixed delay
//! before the next scene. A failing scene is recorded and skipped; only a
//! script that cannot be loaded stops the run.

use crate::download::{download_image, DownloadOutcome, ImageFetcher};
use crate::error::Result;
use crate::image::{request_images, Generation, GenerationRequest, ImageProvider};
use crate::script::{load_script, VisualScript};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default pause between scenes.
pub const DEFAULT_SCENE_DELAY: Duration = Duration::from_secs(2);

/// Settings for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory images are written to. Created if missing.
    pub output_dir: PathBuf,
    /// Pause between consecutive scenes.
    pub scene_delay: Duration,
    /// Images requested per scene. Only the first is downloaded.
    pub images_per_scene: u32,
    /// Retries for transient generation errors (0 disables).
    pub max_retries: u32,
}

impl PipelineConfig {
    /// Creates a config writing to `output_dir` with default settings.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            scene_delay: DEFAULT_SCENE_DELAY,
            images_per_scene: 1,
            max_retries: 0,
        }
    }

    /// Sets the pause between scenes.
    pub fn with_scene_delay(mut self, delay: Duration) -> Self {
        self.scene_delay = delay;
        self
    }

    /// Sets the retry budget for transient generation errors.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// What happened to one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SceneOutcome {
    /// The image was written to `path`.
    Saved { path: PathBuf },
    /// The provider produced no usable image.
    NoImage,
    /// The image URL answered with a non-200 status.
    DownloadRejected { status: u16 },
    /// Something failed while processing the scene.
    Failed { reason: String },
}

impl SceneOutcome {
    /// Returns true if an image file was written.
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Outcome of one scene together with its position and identifier.
#[derive(Debug, Clone, Serialize)]
pub struct SceneReport {
    /// Position in the script.
    pub index: usize,
    /// Identifier, when the scene could be decoded.
    pub scene_id: Option<String>,
    /// What happened.
    #[serde(flatten)]
    pub outcome: SceneOutcome,
}

/// Summary of a complete run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// One entry per scene, in script order.
    pub scenes: Vec<SceneReport>,
}

impl RunReport {
    /// Scenes whose image was saved.
    pub fn saved(&self) -> usize {
        self.scenes.iter().filter(|s| s.outcome.is_saved()).count()
    }

    /// Scenes that produced no file without an error.
    pub fn skipped(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| {
                matches!(
                    s.outcome,
                    SceneOutcome::NoImage | SceneOutcome::DownloadRejected { .. }
                )
            })
            .count()
    }

    /// Scenes that failed with an error.
    pub fn failed(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| matches!(s.outcome, SceneOutcome::Failed { .. }))
            .count()
    }

    /// Paths of all saved images, in script order.
    pub fn saved_paths(&self) -> Vec<&Path> {
        self.scenes
            .iter()
            .filter_map(|s| match &s.outcome {
                SceneOutcome::Saved { path } => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }
}

/// Drives a visual script through generation and download.
pub struct Pipeline {
    provider: Arc<dyn ImageProvider>,
    fetcher: Arc<dyn ImageFetcher>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline from its collaborators.
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        fetcher: Arc<dyn ImageFetcher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            fetcher,
            config,
        }
    }

    /// Loads the script at `script_path` and processes every scene.
    ///
    /// Returns an error only if the output directory cannot be created or
    /// the script cannot be loaded; in both cases no scene is processed.
    pub async fn run(&self, script_path: impl AsRef<Path>) -> Result<RunReport> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let script = load_script(script_path).await?;
        Ok(self.run_script(&script).await)
    }

    /// Processes every scene of an already-loaded script.
    ///
    /// The output directory must exist.
    pub async fn run_script(&self, script: &VisualScript) -> RunReport {
        tracing::info!(
            scenes = script.len(),
            provider = self.provider.name(),
            output_dir = %self.config.output_dir.display(),
            "starting image generation"
        );

        let mut report = RunReport::default();
        for index in 0..script.len() {
            if index > 0 && !self.config.scene_delay.is_zero() {
                tokio::time::sleep(self.config.scene_delay).await;
            }

            let scene_report = match self.process_scene(script, index).await {
                Ok(scene_report) => scene_report,
                Err(e) => {
                    tracing::error!(index, "error processing scene: {e}");
                    SceneReport {
                        index,
                        scene_id: script.scene(index).ok().map(|s| s.scene_id(index)),
                        outcome: SceneOutcome::Failed {
                            reason: e.to_string(),
                        },
                    }
                }
            };
            report.scenes.push(scene_report);
        }

        tracing::info!(
            saved = report.saved(),
            skipped = report.skipped(),
            failed = report.failed(),
            "image generation completed"
        );
        report
    }

    async fn process_scene(&self, script: &VisualScript, index: usize) -> Result<SceneReport> {
        let scene = script.scene(index)?;
        let scene_id = scene.scene_id(index);
        let report = |outcome: SceneOutcome| SceneReport {
            index,
            scene_id: Some(scene_id.clone()),
            outcome,
        };

        tracing::info!(index, scene_id = %scene_id, prompt = %scene.prompt, "generating image");

        let request =
            GenerationRequest::for_scene(&scene.prompt).with_count(self.config.images_per_scene);
        let generation =
            request_images(self.provider.as_ref(), &request, self.config.max_retries).await;

        let image = match (&generation, generation.first()) {
            (Generation::Failed(e), _) => {
                return Ok(report(SceneOutcome::Failed {
                    reason: e.to_string(),
                }))
            }
            (_, Some(image)) => image,
            (_, None) => {
                tracing::warn!(index, scene_id = %scene_id, "no image generated for scene");
                return Ok(report(SceneOutcome::NoImage));
            }
        };

        if let Some(revised) = &image.revised_prompt {
            tracing::debug!(index, revised_prompt = %revised, "provider revised prompt");
        }

        let path = self.config.output_dir.join(scene.file_name(index));
        let outcome = match download_image(self.fetcher.as_ref(), &image.url, &path).await? {
            DownloadOutcome::Saved(path) => SceneOutcome::Saved { path },
            DownloadOutcome::Rejected { status } => SceneOutcome::DownloadRejected { status },
        };
        Ok(report(outcome))
    }
}
