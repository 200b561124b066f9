//! CLI for scenegen - generate one image per scene of a visual script.

use anyhow::Context;
use clap::Parser;
use scenegen::{HttpFetcher, ImageProvider, Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scenegen")]
#[command(about = "Generate one AI image per scene of a visual script")]
#[command(version)]
struct Cli {
    /// Path to the visual script JSON
    #[arg(
        short,
        long,
        env = "SCENEGEN_SCRIPT",
        default_value = "resources/scripts/script.json"
    )]
    script: PathBuf,

    /// Directory the images are written to
    #[arg(
        short,
        long,
        env = "SCENEGEN_OUTPUT_DIR",
        default_value = "resources/images"
    )]
    output_dir: PathBuf,

    /// Seconds to wait between scenes
    #[arg(long, default_value_t = 2)]
    delay_secs: u64,

    /// Retries for rate-limited or transient generation errors
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the OpenAI API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let mut builder = scenegen::OpenAiImageProvider::builder().client(client.clone());
    if let Some(key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(url) = cli.base_url {
        builder = builder.base_url(url);
    }
    let provider = builder.build()?;
    if let Err(e) = provider.health_check().await {
        tracing::warn!("{e}");
    }

    let config = PipelineConfig::new(&cli.output_dir)
        .with_scene_delay(Duration::from_secs(cli.delay_secs))
        .with_max_retries(cli.retries);
    let pipeline = Pipeline::new(Arc::new(provider), Arc::new(HttpFetcher::new(client)), config);

    let report = pipeline
        .run(&cli.script)
        .await
        .with_context(|| format!("cannot process script {}", cli.script.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Image generation completed: {} saved, {} skipped, {} failed",
            report.saved(),
            report.skipped(),
            report.failed()
        );
    }

    Ok(())
}
