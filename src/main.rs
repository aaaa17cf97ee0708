use bot_service::{Orchestrator, PipelineContext};
use clap::Parser;
use dogecloud_core::{AppConfig, CoreError};
use image_host::ImgurClient;
use reddit_client::RedditClient;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "dogecloud=info,bot_service=info,reddit_client=info,cloud_engine=info,image_host=info";

/// Replies to busy Reddit threads with a doge word cloud of their comments.
#[derive(Debug, Parser)]
#[command(name = "dogecloud", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Make a single pass over the hot listing and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting dogecloud with {}", args.config.display());

    let config = AppConfig::load(&args.config).map_err(|e| {
        tracing::error!("Cannot start: {}", e);
        CoreError::from(e)
    })?;

    let context = PipelineContext::bootstrap(&config)?;
    let reddit = RedditClient::new(config.reddit.clone())?;
    reddit.login().await?;
    let imgur = ImgurClient::new(&config.imgur)?;

    let mut orchestrator = Orchestrator::new(reddit, imgur, context);
    if args.once {
        let summary = orchestrator.run_once().await?;
        tracing::info!(
            "Single pass done: {} completed, {} abandoned, {} rate limited",
            summary.completed,
            summary.abandoned,
            summary.rate_limited
        );
        return Ok(());
    }

    orchestrator.run_forever().await;
    Ok(())
}
