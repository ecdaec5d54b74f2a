use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use mirror_scraper::config;
use mirror_scraper::scrape::Scraper;
use mirror_scraper::store;
use mirror_scraper::ScrapeResponse;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run a single scrape, store the posts and print the JSON result"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let store = store::open_store(&cfg.store).await?;
    let scraper = Scraper::from_config(&cfg)?;

    let (response, failed) = match scraper.scrape_and_store(store.as_ref()).await {
        Ok(report) => (
            ScrapeResponse::success(report.posts.len(), cfg.scrape.source_label.clone()),
            false,
        ),
        Err(err) => {
            error!(error = %err, "scrape failed");
            (ScrapeResponse::failure(err), true)
        }
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
