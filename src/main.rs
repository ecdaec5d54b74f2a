use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use mirror_scraper::api::{self, AppState};
use mirror_scraper::config;
use mirror_scraper::scrape::Scraper;
use mirror_scraper::store;

#[derive(Debug, Parser)]
#[command(author, version, about = "Serve the scrape and read endpoints")]
struct Args {
    /// Path to YAML config file (optional; environment variables also apply)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the listen address from the config
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let store = store::open_store(&cfg.store).await?;
    let scraper = Scraper::from_config(&cfg)?;
    let state = AppState {
        store,
        scraper: Arc::new(scraper),
        source_label: cfg.scrape.source_label.clone(),
    };

    let bind = args.bind.unwrap_or_else(|| cfg.app.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, username = %cfg.app.username, "starting http server");
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
