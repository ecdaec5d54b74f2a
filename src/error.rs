use std::time::Duration;
use thiserror::Error;

/// Terminal failures of a scrape run. Per-element skips are not errors and
/// never show up here.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("all mirrors failed: {last_cause}")]
    FetchExhausted { last_cause: String },
    #[error("markup could not be parsed: {0}")]
    ParseFailure(String),
    #[error("no post elements found")]
    NoPostsFound,
    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),
    #[error("scrape run exceeded {0:?}")]
    TimedOut(Duration),
}
