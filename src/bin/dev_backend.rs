use deepguard::{backend, common::{Config, DevMode}};

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deepguard-dev-backend")]
#[command(about = "Local verification backend for development")]
struct Args {
    /// Run in development mode (store feedback under ./dev_data)
    #[arg(long)]
    dev: bool,

    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding dev_backend.bind
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting DeepGuard dev backend (dev_mode: {})", args.dev);

    let config = Config::resolve(args.config.as_deref())?;
    let dev_mode = DevMode::new(args.dev)?;
    let bind = args.bind.unwrap_or_else(|| config.dev_backend.bind.clone());

    tracing::info!(
        "Scripted verdict: is_live={} confidence={} risk_score={:?}",
        config.dev_backend.is_live, config.dev_backend.confidence, config.dev_backend.risk_score
    );

    backend::serve(&config, &bind, dev_mode.feedback_dir()).await?;
    Ok(())
}
