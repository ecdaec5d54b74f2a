use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mirror_scraper::scrape::extract_posts;

/// Extract posts from a saved mirror page, without touching the network or
/// the store. Handy when a mirror changes its markup.
#[derive(Parser, Debug)]
struct Args {
    /// Saved HTML page
    #[arg(long)]
    file: PathBuf,

    /// Profile handle the page belongs to
    #[arg(long)]
    username: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let html = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let extracted = extract_posts(&html, args.username.trim_start_matches('@'))?;

    eprintln!("extracted {} post(s), skipped {}", extracted.posts.len(), extracted.skipped);
    println!("{}", serde_json::to_string_pretty(&extracted.posts)?);
    Ok(())
}
